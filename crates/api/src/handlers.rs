use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use extract::{DocumentLocation, FieldRecord};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::metrics::{MetricsSnapshot, Outcome, TimedOperation};

#[derive(Deserialize)]
struct UploadRequest {
    /// Base64-encoded image bytes
    image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    message: &'static str,
    extracted_data: FieldRecord,
}

#[derive(Serialize)]
pub struct HealthResponse {
    database: String,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("upload", request_id = %request_id);

    let result = process_upload(&state, &body).instrument(span).await;

    match &result {
        Ok(_) => state.metrics.record_request(Outcome::Success),
        Err(e) => {
            error!(
                request_id = %request_id,
                status = e.status().as_u16(),
                error = %error_chain(e),
                "Upload failed"
            );
            state.metrics.record_request(e.outcome());
        }
    }

    result.map(Json)
}

async fn process_upload(state: &AppState, body: &[u8]) -> Result<UploadResponse, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingBody);
    }

    let request: UploadRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    let image = request
        .image
        .as_deref()
        .ok_or(ingest::IngestError::MissingImage)?;
    let bytes = ingest::decode_image(image)?;

    // Step 1: store the image
    let key = ingest::generate_object_key();
    let timer = TimedOperation::start();
    let stored = state
        .object_store
        .put_image(&key, bytes)
        .await
        .map_err(ApiError::Storage)?;
    state.metrics.record_upload(timer.elapsed());

    // Step 2: OCR + field extraction
    let location = DocumentLocation {
        bucket: stored.bucket.clone(),
        name: stored.key.clone(),
    };
    let timer = TimedOperation::start();
    let extracted = state
        .extractor
        .extract_document(state.analyzer.as_ref(), &location)
        .await;
    state.metrics.record_analyze(timer.elapsed());
    let record = extracted?;

    // Step 3: persist
    let row = store::PassportRecord {
        date_of_birth: record.date_of_birth().unwrap_or_default().to_string(),
        expiry_date: record.expiry_date().unwrap_or_default().to_string(),
        image_url: stored.url.clone(),
    };
    let timer = TimedOperation::start();
    let id = state
        .records
        .insert(&row)
        .await
        .map_err(ApiError::Database)?;
    state.metrics.record_persist(timer.elapsed());

    info!(record_id = id, key = %stored.key, "Passport processed");

    Ok(UploadResponse {
        message: "Success",
        extracted_data: record,
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.records.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse { database })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// "outer: inner: root" for logging; the response only ever shows the outer message.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
