//! Response envelope shared by the intake handlers and the gateway client.
//!
//! Every endpoint answers `{ "data": T, "error": null }` on success or
//! `{ "data": null, "error": { "code", "message" } }` on failure. Both keys are
//! always present on the wire.

use serde::{Deserialize, Serialize};

/// Machine-readable failure codes surfaced by the intake handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidBody,
    MissingDocument,
    MissingMedia,
    MissingPrimaryId,
    StoreFailed,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidBody => "INVALID_BODY",
            ErrorCode::MissingDocument => "MISSING_DOCUMENT",
            ErrorCode::MissingMedia => "MISSING_MEDIA",
            ErrorCode::MissingPrimaryId => "MISSING_PRIMARY_ID",
            ErrorCode::StoreFailed => "STORE_FAILED",
        }
    }

    /// HTTP status that accompanies the code.
    pub const fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidBody | ErrorCode::MissingDocument | ErrorCode::MissingPrimaryId => {
                400
            }
            ErrorCode::MissingMedia => 422,
            ErrorCode::StoreFailed => 500,
        }
    }
}

/// Error half of the envelope. The code stays a plain string so clients keep
/// working when the backend introduces new codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(ApiErrorBody {
                code: code.as_str().to_string(),
                message: message.into(),
                details: None,
            }),
        }
    }

    /// Collapse the envelope: an error body wins over data, and a missing
    /// payload is reported as `Err(None)`.
    pub fn into_result(self) -> Result<T, Option<ApiErrorBody>> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(Some(error)),
            (Some(data), None) => Ok(data),
            (None, None) => Err(None),
        }
    }
}
