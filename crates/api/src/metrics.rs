use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    client_errors: AtomicUsize,
    downstream_errors: AtomicUsize,

    // Timing (in microseconds)
    total_upload_time_us: AtomicU64,
    total_analyze_time_us: AtomicU64,
    total_persist_time_us: AtomicU64,

    // Counts
    uploads: AtomicUsize,
    analyses: AtomicUsize,
    records_saved: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Success,
    ClientError,
    DownstreamError,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            client_errors: AtomicUsize::new(0),
            downstream_errors: AtomicUsize::new(0),
            total_upload_time_us: AtomicU64::new(0),
            total_analyze_time_us: AtomicU64::new(0),
            total_persist_time_us: AtomicU64::new(0),
            uploads: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
            records_saved: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, outcome: Outcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::Success => &self.successful_requests,
            Outcome::ClientError => &self.client_errors,
            Outcome::DownstreamError => &self.downstream_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self, duration: Duration) {
        self.total_upload_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_analyze(&self, duration: Duration) {
        self.total_analyze_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.analyses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist(&self, duration: Duration) {
        self.total_persist_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.records_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            downstream_errors: self.downstream_errors.load(Ordering::Relaxed),
            avg_upload_time_ms: self.avg_time_ms(&self.total_upload_time_us, &self.uploads),
            avg_analyze_time_ms: self.avg_time_ms(&self.total_analyze_time_us, &self.analyses),
            avg_persist_time_ms: self.avg_time_ms(&self.total_persist_time_us, &self.records_saved),
            records_saved: self.records_saved.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub client_errors: usize,
    pub downstream_errors: usize,
    pub avg_upload_time_ms: f64,
    pub avg_analyze_time_ms: f64,
    pub avg_persist_time_ms: f64,
    pub records_saved: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
