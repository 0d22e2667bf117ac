use thiserror::Error;

use crate::fields::CanonicalField;

/// Why a date string could not be normalized. Every variant carries the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("empty date string")]
    Empty,

    #[error("expected \"<day> <month> <year>\", got {count} token(s) in \"{input}\"")]
    TokenCount { input: String, count: usize },

    #[error("unrecognized month \"{month}\" in \"{input}\"")]
    UnknownMonth { input: String, month: String },

    #[error("invalid {part} \"{token}\" in \"{input}\"")]
    InvalidNumber {
        input: String,
        part: &'static str,
        token: String,
    },

    #[error("\"{input}\" is not a calendar date")]
    InvalidDate { input: String },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No blocks found in OCR response.")]
    NoBlocks,

    #[error("Required data not found in OCR response: {}", join_fields(.0))]
    MissingFields(Vec<CanonicalField>),

    #[error("Invalid {field} value: {source}")]
    InvalidDate {
        field: CanonicalField,
        #[source]
        source: DateParseError,
    },

    /// The OCR collaborator failed; the cause stays out of the message.
    #[error("Document analysis failed.")]
    Analysis(#[source] anyhow::Error),
}

impl ExtractError {
    /// True when the failure came from the data itself rather than the transport.
    pub fn is_content_error(&self) -> bool {
        !matches!(self, ExtractError::Analysis(_))
    }
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
