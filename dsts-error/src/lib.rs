//! Shared error taxonomy for the Device Security Token Service.
//!
//! Every component returns a [`DstsError`]. The two request facades
//! (HTTP/JSON and binary RPC) share a single kind-to-code mapping here
//! rather than duplicating it at each endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Operator-facing reason strings, mirroring the wording the source used
/// for each failure case. HTTP responses surface these; RPC responses do
/// not (the RPC status carries only the numeric code).
pub mod reasons {
    pub const REQUEST_PARSING_FAILED: &str = "error parsing request parameters";
    pub const INVALID_CLIENT_ASSERTION_TYPE: &str = "invalid client assertion type specified";
    pub const MISSING_CLIENT_ASSERTION: &str = "client assertion type is not specified";
    pub const ASSERTION_EXPIRED: &str = "presented client assertion is expired";
    pub const ASSERTION_NOT_VALID_YET: &str = "presented client assertion is not yet valid";
    pub const INVALID_DEVICE_CERTIFICATE: &str = "invalid device certificate presented";
    pub const AUTHENTICATION_BLOCKED: &str = "device authentication is blocked for this device";
    pub const APP_ID_NOT_SPECIFIED: &str = "app_id parameter was not specified";
    pub const DEVICE_ID_NOT_SPECIFIED: &str = "device_id parameter was not specified";
    pub const TOMBSTONED_DEVICE: &str = "device is no longer enrolled and has been deleted";
    pub const INVALID_DEVICE_CHALLENGE: &str = "presented nonce does not match the issued challenge";
    pub const INVALID_ENROLLMENT_TOKEN: &str = "the presented enrollment token is not valid";
    pub const EXPIRED_ENROLLMENT_TOKEN: &str = "the presented enrollment token has expired";
    pub const UNSUPPORTED_SIGNING_ALG: &str = "client assertion uses an unsupported signing algorithm";
}

/// The full error taxonomy (spec §7). One kind per row of the mapping
/// table; the two facades translate a kind into their own status codes.
#[derive(Debug, thiserror::Error)]
pub enum DstsError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("not found")]
    NotFound,

    /// Tombstoned device. HTTP surfaces this as 410 Gone; the RPC facade
    /// has no analogous status and maps it to NotFound instead.
    #[error("{0}")]
    Gone(String),

    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// A durable-store operation exceeded its per-operation deadline.
    #[error("server busy, please retry")]
    DatabaseBusy,

    #[error("duplicate entry")]
    DuplicateEntry,

    #[error("internal error")]
    Internal(String),
}

impl DstsError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn gone(reason: impl Into<String>) -> Self {
        Self::Gone(reason.into())
    }

    pub fn internal(reason: impl std::fmt::Display) -> Self {
        Self::Internal(reason.to_string())
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Gone(_) => StatusCode::GONE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::DatabaseBusy => StatusCode::TOO_MANY_REQUESTS,
            Self::DuplicateEntry => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// RPC code per the spec's kind->code table. `Gone` has no RPC
    /// analogue and is reported as `NotFound` on that facade.
    pub fn rpc_code(&self) -> tonic::Code {
        match self {
            Self::InvalidRequest(_) => tonic::Code::InvalidArgument,
            Self::Unauthorized(_) => tonic::Code::Unauthenticated,
            Self::NotFound | Self::Gone(_) => tonic::Code::NotFound,
            Self::UnsupportedMediaType => tonic::Code::InvalidArgument,
            Self::DatabaseBusy => tonic::Code::ResourceExhausted,
            Self::DuplicateEntry => tonic::Code::AlreadyExists,
            Self::Internal(_) => tonic::Code::Internal,
        }
    }

    /// Operator-facing message for the HTTP JSON error body. The source
    /// never surfaces internal detail to callers over the wire.
    pub fn http_message(&self) -> String {
        match self {
            Self::InvalidRequest(reason)
            | Self::Unauthorized(reason)
            | Self::Gone(reason) => reason.clone(),
            Self::NotFound => "not found".to_string(),
            Self::UnsupportedMediaType => "unsupported media type".to_string(),
            Self::DatabaseBusy => "server busy, please retry".to_string(),
            Self::DuplicateEntry => "duplicate entry".to_string(),
            Self::Internal(_) => "internal error".to_string(),
        }
    }
}

impl From<DstsError> for tonic::Status {
    fn from(err: DstsError) -> Self {
        let code = err.rpc_code();
        match &err {
            // Never leak internal detail over RPC; the discriminating
            // reason is for logs only.
            DstsError::Internal(_) => tonic::Status::new(code, "internal error"),
            _ => tonic::Status::new(code, err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HttpErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for DstsError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = HttpErrorBody {
            code: status.as_u16(),
            message: self.http_message(),
        };
        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DstsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tombstoned_device_maps_to_http_gone_and_rpc_not_found() {
        let err = DstsError::gone(reasons::TOMBSTONED_DEVICE);
        assert_eq!(err.http_status(), StatusCode::GONE);
        assert_eq!(err.rpc_code(), tonic::Code::NotFound);
    }

    #[test]
    fn database_busy_maps_to_429_and_resource_exhausted() {
        let err = DstsError::DatabaseBusy;
        assert_eq!(err.http_status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.rpc_code(), tonic::Code::ResourceExhausted);
    }

    #[test]
    fn internal_errors_never_leak_detail_over_rpc() {
        let err = DstsError::internal("postgres connection reset by peer");
        let status: tonic::Status = err.into();
        assert_eq!(status.message(), "internal error");
    }
}
