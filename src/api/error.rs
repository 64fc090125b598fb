//! Response translation: backend outcomes to HTTP payloads.
//!
//! Every failure leaves the API as `{"code": <u32>, "message": <string>}` with
//! the HTTP status bound to its [`ErrorCode`]. Codes are stable; messages are
//! informational.

use axum::{
    Json,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::error;
use utoipa::ToSchema;

use crate::{application::ApplicationError, rbac::GateError};

const REDACTED_MESSAGE: &str = "internal server error";

/// Closed set of failure kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidDryRun,
    Unauthenticated,
    PermissionDenied,
    ApplicationNotExist,
    ApplicationApplyFailed,
    ApplicationDryRunFailed,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::InvalidRequest => 10000,
            Self::InvalidDryRun => 10001,
            Self::Unauthenticated => 12002,
            Self::PermissionDenied => 11017,
            Self::ApplicationNotExist => 10012,
            Self::ApplicationApplyFailed => 10028,
            Self::ApplicationDryRunFailed => 10029,
            Self::Internal => 500,
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidRequest
            | Self::InvalidDryRun
            | Self::ApplicationApplyFailed
            | Self::ApplicationDryRunFailed => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::ApplicationNotExist => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// How much backend detail reaches callers for server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDetailPolicy {
    /// Replace internal failure messages with a generic text.
    #[default]
    Redact,
    /// Forward backend messages verbatim.
    Passthrough,
}

impl FromStr for ErrorDetailPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "redact" => Ok(Self::Redact),
            "passthrough" => Ok(Self::Passthrough),
            _ => Err(format!(
                "invalid error detail policy: {value} (expected redact or passthrough)"
            )),
        }
    }
}

impl fmt::Display for ErrorDetailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redact => f.write_str("redact"),
            Self::Passthrough => f.write_str("passthrough"),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: u32,
    pub message: String,
}

/// Empty acknowledgement returned by mutations.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmptyResponse {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps a backend failure to its external code, applying `policy` to
    /// server-side failures.
    #[must_use]
    pub fn from_application(err: &ApplicationError, policy: ErrorDetailPolicy) -> Self {
        let code = match err {
            ApplicationError::NotFound(_) => ErrorCode::ApplicationNotExist,
            ApplicationError::ApplyFailed(_) => ErrorCode::ApplicationApplyFailed,
            ApplicationError::DryRunFailed(_) => ErrorCode::ApplicationDryRunFailed,
            ApplicationError::Database(_) | ApplicationError::Corrupt(_) => ErrorCode::Internal,
        };

        let message = match (code, policy) {
            (ErrorCode::Internal, ErrorDetailPolicy::Redact) => REDACTED_MESSAGE.to_string(),
            _ => err.to_string(),
        };

        Self { code, message }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let code = match err {
            GateError::Unauthenticated => ErrorCode::Unauthenticated,
            GateError::Forbidden { .. } => ErrorCode::PermissionDenied,
        };
        Self::new(code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.code(),
            message: self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

/// Serializes a successful payload, or emits the failure.
///
/// Serialization errors are reported as an internal failure rather than a
/// truncated success.
pub fn respond<T: Serialize>(outcome: Result<T, ApiError>) -> Response {
    let body = outcome.and_then(|payload| {
        serde_json::to_vec(&payload).map_err(|err| {
            error!("Failed to serialize response: {err}");
            ApiError::new(ErrorCode::Internal, REDACTED_MESSAGE)
        })
    });

    match body {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => err.into_response(),
    }
}
