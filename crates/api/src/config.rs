use anyhow::{Context, Result};
use extract::DocumentVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub database: DatabaseConfig,
    pub schema: DocumentVariant,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound on the JSON body carrying the base64 image
    pub max_body_bytes: usize,
}

/// Credentials come from the default AWS provider chain
/// (`AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`, profile, instance role).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,    // S3 or an S3-compatible service
    Local, // Directory on disk
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Replaces the regional S3 endpoint (MinIO, LocalStack)
    pub endpoint: Option<String>,
    pub public_url_base: Option<String>,
    pub local_root: PathBuf,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Replaces the regional Textract endpoint
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub path: PathBuf,
    pub postgres: PostgresConfig,
}

/// Either a full `url` or the individual `DB_*` parts; parts override the url.
/// Anything left unset falls back to libpq's `PG*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
                max_body_bytes: 10 * 1024 * 1024,
            },
            aws: AwsConfig {
                region: "us-east-1".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                bucket: "passports".to_string(),
                endpoint: None,
                public_url_base: None,
                local_root: PathBuf::from("data/uploads"),
                request_timeout_secs: 30,
            },
            ocr: OcrConfig {
                endpoint: None,
                request_timeout_secs: 60,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Sqlite,
                path: PathBuf::from("data/passports.db"),
                postgres: PostgresConfig {
                    max_connections: 5,
                    acquire_timeout_secs: 10,
                    ..Default::default()
                },
            },
            schema: DocumentVariant::Plain,
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with environment variables, after loading `.env`
    /// from the working directory or one of its parents.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an explicit env file. A missing file is not an
    /// error; variables already set in the process win over the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Err(e) = dotenvy::from_path(path) {
            if !e.not_found() {
                return Err(e).context(format!("Failed to load env file: {:?}", path));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup` (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(addr) = get("PASSPORT_BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(limit) = get("PASSPORT_MAX_BODY_BYTES") {
            config.server.max_body_bytes = parse("PASSPORT_MAX_BODY_BYTES", &limit)?;
        }

        if let Some(region) = get("PASSPORT_AWS_REGION").or_else(|| get("AWS_REGION")) {
            config.aws.region = region;
        }

        if let Some(backend) = get("PASSPORT_STORAGE_BACKEND") {
            config.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "s3" => StorageBackend::S3,
                "local" => StorageBackend::Local,
                other => anyhow::bail!("Unknown storage backend: {}", other),
            };
        }
        if let Some(bucket) = get("PASSPORT_S3_BUCKET").or_else(|| get("S3_BUCKET")) {
            config.storage.bucket = bucket;
        }
        config.storage.endpoint = get("PASSPORT_S3_ENDPOINT");
        config.storage.public_url_base = get("PASSPORT_S3_PUBLIC_URL");
        if let Some(root) = get("PASSPORT_LOCAL_STORAGE_DIR") {
            config.storage.local_root = PathBuf::from(root);
        }
        if let Some(timeout) = get("PASSPORT_STORAGE_TIMEOUT_SECS") {
            config.storage.request_timeout_secs = parse("PASSPORT_STORAGE_TIMEOUT_SECS", &timeout)?;
        }

        config.ocr.endpoint = get("PASSPORT_OCR_ENDPOINT");
        if let Some(timeout) = get("PASSPORT_OCR_TIMEOUT_SECS") {
            config.ocr.request_timeout_secs = parse("PASSPORT_OCR_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(backend) = get("PASSPORT_DB_BACKEND") {
            config.database.backend = match backend.to_ascii_lowercase().as_str() {
                "sqlite" => DatabaseBackend::Sqlite,
                "postgres" | "postgresql" => DatabaseBackend::Postgres,
                other => anyhow::bail!("Unknown database backend: {}", other),
            };
        }
        if let Some(path) = get("PASSPORT_DB_PATH") {
            config.database.path = PathBuf::from(path);
        }
        let pg = &mut config.database.postgres;
        pg.url = get("PASSPORT_DATABASE_URL").or_else(|| get("DATABASE_URL"));
        pg.host = get("DB_HOST");
        if let Some(port) = get("DB_PORT") {
            pg.port = Some(parse("DB_PORT", &port)?);
        }
        pg.user = get("DB_USER");
        pg.password = get("DB_PASSWORD");
        pg.database = get("DB_NAME");
        if let Some(max) = get("PASSPORT_DB_MAX_CONNECTIONS") {
            pg.max_connections = parse("PASSPORT_DB_MAX_CONNECTIONS", &max)?;
        }

        if let Some(variant) = get("PASSPORT_SCHEMA_VARIANT") {
            config.schema = DocumentVariant::from_str(&variant)?;
        }

        if let Some(level) = get("PASSPORT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = get("PASSPORT_LOG_JSON") {
            config.logging.json = parse("PASSPORT_LOG_JSON", &json)?;
        }

        Ok(config)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .context(format!("Invalid value for {}: {:?}", key, value))
}
