//! s3gate Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for s3gate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Literal body message returned when an upload carries no file part
pub const MISSING_FILE_MESSAGE: &str = "No Such file";

/// Broad category of a storage provider failure.
///
/// Only used for logging today; every category maps to the same
/// external response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotFound,
    AccessDenied,
    Throttled,
    Other,
}

impl ProviderErrorKind {
    /// Classify a provider error code (e.g. `NoSuchKey`, `SlowDown`)
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchUpload") => Self::NotFound,
            Some(
                "AccessDenied"
                | "AllAccessDisabled"
                | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch"
                | "ExpiredToken"
                | "Forbidden",
            ) => Self::AccessDenied,
            Some(
                "SlowDown"
                | "Throttling"
                | "ThrottlingException"
                | "RequestLimitExceeded"
                | "TooManyRequests"
                | "TooManyRequestsException",
            ) => Self::Throttled,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Throttled => "throttled",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// s3gate error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{}", MISSING_FILE_MESSAGE)]
    MissingFile,

    #[error("Upload failed: {message}")]
    Upload { status: StatusCode, message: String },

    // Storage provider errors
    #[error("{operation} failed: {message}")]
    Provider {
        operation: &'static str,
        kind: ProviderErrorKind,
        code: Option<String>,
        message: String,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a parameter validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::MissingFile => StatusCode::BAD_REQUEST,
            Error::Upload { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code exposed in the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::MissingFile => "MISSING_FILE",
            Error::Upload { .. } => "UPLOAD_ERROR",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Provider failure category, if this came from the storage provider
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Error::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Error response envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}

/// Body sent when an upload has no file part
#[derive(Debug, Serialize)]
pub struct MissingFileResponse {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Error::MissingFile = self {
            return (
                status,
                Json(MissingFileResponse {
                    error: MISSING_FILE_MESSAGE.to_string(),
                }),
            )
                .into_response();
        }

        let message = match &self {
            Error::Provider { message, .. } => message.clone(),
            Error::Upload { message, .. } => message.clone(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_provider_codes() {
        assert_eq!(ProviderErrorKind::from_code(Some("NoSuchKey")), ProviderErrorKind::NotFound);
        assert_eq!(ProviderErrorKind::from_code(Some("NoSuchBucket")), ProviderErrorKind::NotFound);
        assert_eq!(ProviderErrorKind::from_code(Some("AccessDenied")), ProviderErrorKind::AccessDenied);
        assert_eq!(ProviderErrorKind::from_code(Some("SlowDown")), ProviderErrorKind::Throttled);
        assert_eq!(ProviderErrorKind::from_code(Some("InternalError")), ProviderErrorKind::Other);
        assert_eq!(ProviderErrorKind::from_code(None), ProviderErrorKind::Other);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::MissingFile.status(), StatusCode::BAD_REQUEST);

        let provider = Error::Provider {
            operation: "GetObject",
            kind: ProviderErrorKind::NotFound,
            code: Some("NoSuchKey".into()),
            message: "The specified key does not exist.".into(),
        };
        // Not-found stays a generic failure
        assert_eq!(provider.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(provider.code(), "INTERNAL_SERVER_ERROR");
        assert_eq!(provider.provider_kind(), Some(ProviderErrorKind::NotFound));
    }
}
