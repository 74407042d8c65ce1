use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Shared error type used across all crates in the request plane.
///
/// Every variant carries enough to build the wire error envelope
/// (`{error: {code, message, details, recovery_suggestions, request_id}, status_code}`)
/// without the caller having to reconstruct it by hand.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        details: Value,
        recovery_suggestions: Vec<String>,
    },

    #[error("authorization denied: {message}")]
    Authorization {
        message: String,
        details: Value,
    },

    #[error("tenant isolation violation: {message}")]
    TenantIsolation { message: String, details: Value },

    #[error("tenant validation failed: {message}")]
    TenantValidation { message: String, details: Value },

    #[error("memory access denied: {message}")]
    MemoryAccess { message: String, details: Value },

    #[error("validation failed: {message}")]
    Validation { message: String, details: Value },

    #[error("resource not found: {message}")]
    ResourceNotFound { message: String, details: Value },

    #[error("rate limit exceeded")]
    RateLimitExceeded {
        limit: u64,
        remaining: u64,
        reset_time: i64,
        retry_after: u64,
    },

    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, details: Value },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable error code surfaced on the wire; contract from the error taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Authentication { .. } => "AUTH-001",
            Error::Authorization { .. } => "AUTH-002",
            Error::TenantIsolation { .. } | Error::TenantValidation { .. } => "ERROR-003",
            Error::MemoryAccess { .. } => "DATA-002",
            Error::Validation { .. } => "VALIDATION-001",
            Error::ResourceNotFound { .. } => "RESOURCE-001",
            Error::RateLimitExceeded { .. } => "ERROR-004",
            Error::ServiceUnavailable { .. } => "SERVICE-001",
            Error::Io(_) | Error::Json(_) | Error::Other(_) => "UNKNOWN-001",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Error::Authorization { .. }
            | Error::MemoryAccess { .. }
            | Error::TenantIsolation { .. }
            | Error::TenantValidation { .. } => StatusCode::FORBIDDEN,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Error::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_) | Error::Json(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            Error::Authentication { details, .. }
            | Error::Authorization { details, .. }
            | Error::TenantIsolation { details, .. }
            | Error::TenantValidation { details, .. }
            | Error::MemoryAccess { details, .. }
            | Error::Validation { details, .. }
            | Error::ResourceNotFound { details, .. }
            | Error::ServiceUnavailable { details, .. } => details.clone(),
            Error::RateLimitExceeded {
                limit,
                remaining,
                reset_time,
                retry_after,
            } => json!({
                "limit": limit,
                "remaining": remaining,
                "reset_time": reset_time,
                "retry_after": retry_after,
            }),
            Error::Io(_) | Error::Json(_) | Error::Other(_) => Value::Null,
        }
    }

    fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Error::Authentication {
                recovery_suggestions,
                ..
            } => recovery_suggestions.clone(),
            Error::RateLimitExceeded { retry_after, .. } => {
                vec![format!("retry after {retry_after}s")]
            }
            _ => Vec::new(),
        }
    }

    /// Construct the wire envelope, tagging it with a fresh `request_id` unless
    /// the caller already has one to correlate against (e.g. from the inbound request).
    pub fn to_envelope(&self, request_id: Option<Uuid>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                details: self.details(),
                recovery_suggestions: self.recovery_suggestions(),
                request_id: request_id.unwrap_or_else(Uuid::new_v4),
            },
            status_code: self.status().as_u16(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
    pub recovery_suggestions: Vec<String>,
    pub request_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
    pub status_code: u16,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let envelope = self.to_envelope(None);
        let status = StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_envelope_carries_retry_after() {
        let err = Error::RateLimitExceeded {
            limit: 1000,
            remaining: 0,
            reset_time: 1_700_000_060,
            retry_after: 42,
        };
        let envelope = err.to_envelope(None);
        assert_eq!(envelope.error.code, "ERROR-004");
        assert_eq!(envelope.status_code, 429);
        assert_eq!(envelope.error.recovery_suggestions[0], "retry after 42s");
    }

    #[test]
    fn authentication_error_maps_to_401_auth_001() {
        let err = Error::Authentication {
            message: "invalid signature".into(),
            details: Value::Null,
            recovery_suggestions: vec!["re-authenticate".into()],
        };
        assert_eq!(err.code(), "AUTH-001");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn resource_not_found_maps_to_404_resource_001() {
        let err = Error::ResourceNotFound {
            message: "session not found".into(),
            details: Value::Null,
        };
        assert_eq!(err.code(), "RESOURCE-001");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn memory_access_maps_to_403_data_002() {
        let err = Error::MemoryAccess {
            message: "cross-user access denied".into(),
            details: Value::Null,
        };
        assert_eq!(err.code(), "DATA-002");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
