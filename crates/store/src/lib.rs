pub mod pg_store;
pub mod sqlite_store;

pub use pg_store::PgRecordStore;
pub use sqlite_store::SqliteRecordStore;
pub use sqlx::postgres::PgConnectOptions;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One processed document, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportRecord {
    pub date_of_birth: String,
    pub expiry_date: String,
    pub image_url: String,
}

/// Write-only sink for extracted records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one row and return its id. Never updates an existing row.
    async fn insert(&self, record: &PassportRecord) -> Result<i64>;

    /// Cheap liveness check for the health endpoint
    async fn ping(&self) -> Result<()>;
}
