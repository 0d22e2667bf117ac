use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{PassportRecord, RecordStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS passport_data (
     id            INTEGER PRIMARY KEY AUTOINCREMENT,
     date_of_birth TEXT NOT NULL,
     expiry_date   TEXT NOT NULL,
     s3_image_url  TEXT NOT NULL,
     created_at    TEXT NOT NULL
 );";

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite record database")?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize passport_data schema")?;

        info!("SqliteRecordStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &PassportRecord) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO passport_data (date_of_birth, expiry_date, s3_image_url, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.date_of_birth,
                record.expiry_date,
                record.image_url,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert passport record")?;

        let id = conn.last_insert_rowid();
        debug!(id, "Inserted passport record");
        Ok(id)
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("Database ping failed")?;
        Ok(())
    }
}
