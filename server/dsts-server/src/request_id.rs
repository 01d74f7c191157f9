use axum::http::HeaderMap;

pub const REQUEST_ID_HEADER: &str = "request_id";

/// The request-id handling shared by both facades (spec §4.8): use the
/// caller-supplied id if present, otherwise mint a fresh uuid v4.
pub fn extract_or_generate(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate)
}

pub fn generate() -> String {
    uuid::Uuid::new_v4().to_string()
}
