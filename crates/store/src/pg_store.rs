use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::{debug, info};

use crate::{PassportRecord, RecordStore};

/// Writes into an existing `passport_data` table on Postgres.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool that opens connections on first use, so startup does not wait on
    /// the database.
    pub fn connect_lazy(options: PgConnectOptions, max_connections: u32, acquire_timeout: Duration) -> Self {
        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or_default(),
            "PgRecordStore configured"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Self::new(pool)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &PassportRecord) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO passport_data (date_of_birth, expiry_date, s3_image_url)
            VALUES ($1, $2, $3)
            RETURNING id::BIGINT
            "#,
        )
        .bind(&record.date_of_birth)
        .bind(&record.expiry_date)
        .bind(&record.image_url)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert passport record")?;

        debug!(id, "Inserted passport record");
        Ok(id)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
