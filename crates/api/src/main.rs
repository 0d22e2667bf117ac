mod config;
mod error;
mod handlers;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use config::{AppConfig, DatabaseBackend, DatabaseConfig, PostgresConfig, StorageBackend};
use extract::{DocumentAnalyzer, Extractor, FieldSchema, TextractClient};
use ingest::{LocalObjectStore, ObjectStore, S3ObjectStore};
use metrics::Metrics;
use store::{PgConnectOptions, PgRecordStore, RecordStore, SqliteRecordStore};

/// Collaborators for the upload pipeline, built once at startup.
pub(crate) struct AppState {
    object_store: Arc<dyn ObjectStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    records: Arc<dyn RecordStore>,
    extractor: Arc<Extractor>,
    metrics: Arc<Metrics>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init_tracing(&config.logging);

    let state = Arc::new(build_state(&config).await?);
    info!(
        variant = ?config.schema,
        region = %config.aws.region,
        storage = ?config.storage.backend,
        database = ?config.database.backend,
        "Pipeline configured"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .context(format!("Failed to bind {}", config.server.bind_addr))?;

    info!("Server listening on http://{}", config.server.bind_addr);

    axum::serve(listener, app(state, config.server.max_body_bytes)).await?;
    Ok(())
}

async fn build_state(config: &AppConfig) -> Result<AppState> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;

    let object_store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3ObjectStore::from_sdk_config(
            &sdk_config,
            config.storage.endpoint.as_deref(),
            config.storage.bucket.clone(),
            config.storage.public_url_base.clone(),
            Duration::from_secs(config.storage.request_timeout_secs),
        )),
        StorageBackend::Local => Arc::new(LocalObjectStore::new(
            config.storage.local_root.clone(),
            config.storage.bucket.clone(),
        )),
    };

    let analyzer = TextractClient::from_sdk_config(
        &sdk_config,
        config.ocr.endpoint.as_deref(),
        Duration::from_secs(config.ocr.request_timeout_secs),
    );

    Ok(AppState {
        object_store,
        analyzer: Arc::new(analyzer),
        records: build_record_store(&config.database)?,
        extractor: Arc::new(Extractor::new(FieldSchema::for_variant(config.schema))),
        metrics: Metrics::new(),
    })
}

fn build_record_store(config: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        DatabaseBackend::Sqlite => {
            if let Some(dir) = config.path.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)
                        .context(format!("Failed to create database directory: {:?}", dir))?;
                }
            }
            Ok(Arc::new(SqliteRecordStore::open(&config.path)?))
        }
        DatabaseBackend::Postgres => Ok(Arc::new(PgRecordStore::connect_lazy(
            pg_options(&config.postgres)?,
            config.postgres.max_connections,
            Duration::from_secs(config.postgres.acquire_timeout_secs),
        ))),
    }
}

fn pg_options(pg: &PostgresConfig) -> Result<PgConnectOptions> {
    let mut options = match &pg.url {
        Some(url) => url
            .parse::<PgConnectOptions>()
            .context("Invalid Postgres connection url")?,
        None => PgConnectOptions::new(),
    };

    if let Some(host) = &pg.host {
        options = options.host(host);
    }
    if let Some(port) = pg.port {
        options = options.port(port);
    }
    if let Some(user) = &pg.user {
        options = options.username(user);
    }
    if let Some(password) = &pg.password {
        options = options.password(password);
    }
    if let Some(database) = &pg.database {
        options = options.database(database);
    }

    Ok(options)
}

pub(crate) fn app(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
