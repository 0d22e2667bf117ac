pub mod storage;

pub use storage::{LocalObjectStore, ObjectStore, S3ObjectStore, StoredObject};

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Standard alphabet; padding optional, non-zero trailing bits tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// `data:image/jpeg;base64,` style prefix some clients send.
static DATA_URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:[A-Za-z0-9.+/-]+;base64,").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Image data is required.")]
    MissingImage,

    #[error("Image data is not valid base64.")]
    InvalidBase64,
}

/// Decode the base64 image payload of an upload request.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, IngestError> {
    let trimmed = payload.trim();
    let encoded: String = DATA_URL_PREFIX
        .replace(trimmed, "")
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if encoded.is_empty() {
        return Err(IngestError::MissingImage);
    }

    let bytes = LENIENT
        .decode(encoded.as_bytes())
        .map_err(|_| IngestError::InvalidBase64)?;
    if bytes.is_empty() {
        return Err(IngestError::MissingImage);
    }

    Ok(bytes)
}

/// Object key for an image uploaded at `at`: `passport_<unix millis>_<id>.jpg`.
pub fn object_key_at(at: DateTime<Utc>, id: Uuid) -> String {
    format!("passport_{}_{}.jpg", at.timestamp_millis(), id)
}

/// Unique per call, even for uploads landing in the same millisecond.
pub fn generate_object_key() -> String {
    object_key_at(Utc::now(), Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_decode_image() {
        let bytes = decode_image("/9j/4AAQ").unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_decode_strips_data_url() {
        let bytes = decode_image("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_blank_and_garbage() {
        assert_eq!(decode_image("").unwrap_err(), IngestError::MissingImage);
        assert_eq!(decode_image("   ").unwrap_err(), IngestError::MissingImage);
        assert_eq!(
            decode_image("data:image/png;base64,").unwrap_err(),
            IngestError::MissingImage
        );
        assert_eq!(decode_image("not base64!").unwrap_err(), IngestError::InvalidBase64);
    }

    #[test]
    fn test_decode_line_wrapped_and_unpadded() {
        assert_eq!(decode_image("aGVs\r\nbG8=\n").unwrap(), b"hello");
        assert_eq!(decode_image("aGVs bG8=").unwrap(), b"hello");
        assert_eq!(decode_image("aGVsbG8").unwrap(), b"hello");
        let jpeg = decode_image("data:image/jpeg;base64,\n/9j/\n4AAQ").unwrap();
        assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_object_key_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            object_key_at(at, id),
            "passport_1700000000123_67e55044-10b1-426f-9247-bb680e5fe0c8.jpg"
        );
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let keys: HashSet<String> = (0..1000).map(|_| generate_object_key()).collect();
        assert_eq!(keys.len(), 1000);

        let key = keys.iter().next().unwrap();
        assert!(key.starts_with("passport_") && key.ends_with(".jpg"));
        let id = key.trim_end_matches(".jpg").rsplit('_').next().unwrap();
        assert!(Uuid::parse_str(id).is_ok(), "{key}");
    }
}
