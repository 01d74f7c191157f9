use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use dsts_error::DstsError;
use serde::de::DeserializeOwned;

/// Form body extraction for the token endpoints (spec §6.2). Unlike
/// `axum::Form`, a missing or mismatched `Content-Type` is reported as
/// our own `UnsupportedMediaType` kind rather than axum's rejection body,
/// so both facades share one error shape.
pub struct FormBody<T>(pub T);

impl<T, S> FromRequest<S> for FormBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = DstsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("application/x-www-form-urlencoded") {
            return Err(DstsError::UnsupportedMediaType);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| DstsError::invalid_request(e.to_string()))?;
        serde_urlencoded::from_bytes(&bytes)
            .map(FormBody)
            .map_err(|e| DstsError::invalid_request(e.to_string()))
    }
}
