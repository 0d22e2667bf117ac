use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::metrics::Outcome;

/// Every way an upload can fail, mapped onto a status and a single message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing request body.")]
    MissingBody,

    #[error("Invalid JSON in request body.")]
    InvalidJson,

    #[error(transparent)]
    Image(#[from] ingest::IngestError),

    #[error("Failed to upload image to storage.")]
    Storage(#[source] anyhow::Error),

    /// Missing fields, bad dates or an empty OCR result: the message is shown as is.
    #[error(transparent)]
    Extraction(extract::ExtractError),

    #[error("Failed to extract data from passport image.")]
    Analysis(#[source] extract::ExtractError),

    #[error("Failed to save extracted data to the database.")]
    Database(#[source] anyhow::Error),
}

impl From<extract::ExtractError> for ApiError {
    fn from(err: extract::ExtractError) -> Self {
        if err.is_content_error() {
            ApiError::Extraction(err)
        } else {
            ApiError::Analysis(err)
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingBody | ApiError::InvalidJson | ApiError::Image(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Storage(_)
            | ApiError::Extraction(_)
            | ApiError::Analysis(_)
            | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.status().is_client_error() {
            Outcome::ClientError
        } else {
            Outcome::DownstreamError
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
