//! Error types for the deck generation service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deck_merge::{MergeError, TemplateIssue};
use deck_store::StoreError;
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;

/// Startup and configuration errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid API token entry {0:?}, expected TOKEN=USER")]
    InvalidTokenEntry(String),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template catalog: {0}")]
    CatalogParse(#[source] serde_json::Error),

    #[error("Failed to parse field catalog: {0}")]
    FieldCatalog(#[source] MergeError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned to API callers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Either templateId or templateUrl is required")]
    MissingIdentifier,

    #[error("Template not found: {id}")]
    MissingTemplate { id: String, status: StatusCode },

    #[error("Failed to fetch template: {0}")]
    Fetch(String),

    #[error("Template exceeds {limit} bytes")]
    TemplateTooLarge { limit: u64 },

    #[error("{source}")]
    Store {
        #[source]
        source: StoreError,
        status: StatusCode,
    },

    #[error("Failed to store generated file: {0}")]
    StorageUpload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Parse failures: an unreadable archive is the caller's fault
    pub fn parse_failure(source: StoreError) -> Self {
        let status = match source {
            StoreError::CorruptArchive(_) => StatusCode::BAD_REQUEST,
            StoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::Store { source, status }
    }

    /// Render failures: template syntax and unknown tags are the caller's fault
    pub fn render_failure(source: StoreError) -> Self {
        let status = match source {
            StoreError::Merge(MergeError::TemplateSyntax(_))
            | StoreError::Merge(MergeError::UnknownTag { .. }) => StatusCode::BAD_REQUEST,
            StoreError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::Store { source, status }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::MissingIdentifier => StatusCode::BAD_REQUEST,
            ApiError::TemplateTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingTemplate { status, .. } | ApiError::Store { status, .. } => *status,
            ApiError::Fetch(_) | ApiError::StorageUpload(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<Vec<TemplateIssue>> {
        match self {
            ApiError::Store { source: StoreError::Merge(err), .. } => {
                Some(err.issues()).filter(|issues| !issues.is_empty())
            }
            _ => None,
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<TemplateIssue>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorResponse { error: self.to_string(), details: self.details() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_failure_status() {
        let syntax = StoreError::Merge(MergeError::TemplateSyntax(vec![TemplateIssue::new(
            "unclosed_tag",
            "Opening tag {{#a}} is never closed",
        )]));
        let err = ApiError::render_failure(syntax);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.details().unwrap()[0].id, "unclosed_tag");

        let corrupt = ApiError::render_failure(StoreError::CorruptArchive("eof".into()));
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(corrupt.details().is_none());
    }

    #[test]
    fn test_parse_failure_status() {
        let corrupt = ApiError::parse_failure(StoreError::CorruptArchive("eof".into()));
        assert_eq!(corrupt.status(), StatusCode::BAD_REQUEST);
        assert_eq!(corrupt.to_string(), "Corrupt archive: eof");
    }

    #[test]
    fn test_size_limits_map_to_payload_too_large() {
        let too_large = || StoreError::TooLarge {
            what: "Part ppt/slides/slide1.xml".into(),
            size: 1 << 61,
            limit: 64,
        };
        assert_eq!(ApiError::parse_failure(too_large()).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::render_failure(too_large()).status(), StatusCode::PAYLOAD_TOO_LARGE);

        let fetched = ApiError::TemplateTooLarge { limit: 1024 };
        assert_eq!(fetched.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(fetched.to_string(), "Template exceeds 1024 bytes");
    }

    #[test]
    fn test_missing_template_status_is_per_call_site() {
        let err = ApiError::MissingTemplate { id: "t1".into(), status: StatusCode::NOT_FOUND };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MissingIdentifier.status(), StatusCode::BAD_REQUEST);
    }
}
