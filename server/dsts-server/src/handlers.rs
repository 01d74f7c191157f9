//! HTTP/JSON handlers for the request facade (spec §6.2). Every route
//! here returns `Result<impl IntoResponse, DstsError>` — failures flow
//! straight through `DstsError`'s own `IntoResponse` impl, so there is no
//! per-handler error translation to keep in sync.

use crate::state::DstsServer;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use dsts_error::{reasons, DstsError, Result};
use dsts_telemetry::Metrics;
use serde::{Deserialize, Serialize};

const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<DstsServer>) -> impl IntoResponse {
    state.metrics.render_prometheus_text()
}

#[derive(Debug, Serialize)]
pub struct SigningKeysResponse {
    keys: Vec<dsts_sts::JsonWebKey>,
}

pub async fn signing_keys(State(state): State<DstsServer>) -> impl IntoResponse {
    Json(SigningKeysResponse {
        keys: state.signer.jwks().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DeviceChallengeQuery {
    device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponseBody {
    challenge: String,
}

pub async fn device_authentication_challenge(
    State(state): State<DstsServer>,
    Query(query): Query<DeviceChallengeQuery>,
) -> Result<Json<ChallengeResponseBody>> {
    let device_id = match query.device_id.filter(|v| !v.is_empty()) {
        Some(id) => id,
        None => {
            Metrics::incr(&state.metrics.device_auth_challenge_bad_requests);
            return Err(DstsError::invalid_request(reasons::DEVICE_ID_NOT_SPECIFIED));
        }
    };
    let challenge = dsts_sts::issue_challenge(state.cache.as_ref(), &device_id)
        .await
        .inspect_err(|_| Metrics::incr(&state.metrics.device_auth_challenge_internal_errors))?;
    Metrics::incr(&state.metrics.device_auth_challenge_responses);
    Ok(Json(ChallengeResponseBody { challenge }))
}

#[derive(Debug, Deserialize)]
pub struct AppChallengeQuery {
    app_id: Option<String>,
}

pub async fn app_authentication_challenge(
    State(state): State<DstsServer>,
    Query(query): Query<AppChallengeQuery>,
) -> Result<Json<ChallengeResponseBody>> {
    let app_id = query
        .app_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DstsError::invalid_request(reasons::APP_ID_NOT_SPECIFIED))?;
    let challenge = dsts_sts::issue_challenge(state.cache.as_ref(), &app_id).await?;
    Ok(Json(ChallengeResponseBody { challenge }))
}

#[derive(Debug, Deserialize)]
pub struct DeviceTokenForm {
    client_assertion_type: String,
    client_assertion: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponseBody {
    access_token: String,
    expires_at: DateTime<Utc>,
}

fn check_assertion_type(assertion_type: &str) -> Result<()> {
    if assertion_type.is_empty() {
        return Err(DstsError::invalid_request(reasons::MISSING_CLIENT_ASSERTION));
    }
    if assertion_type != JWT_BEARER_ASSERTION_TYPE {
        return Err(DstsError::invalid_request(reasons::INVALID_CLIENT_ASSERTION_TYPE));
    }
    Ok(())
}

pub async fn device_authentication_token(
    State(state): State<DstsServer>,
    crate::form::FormBody(form): crate::form::FormBody<DeviceTokenForm>,
) -> Result<Json<AccessTokenResponseBody>> {
    if let Err(err) = check_assertion_type(&form.client_assertion_type) {
        Metrics::incr(&state.metrics.device_auth_bad_requests);
        return Err(err);
    }
    let minted = dsts_sts::authenticate_device(
        &state.store,
        state.cache.as_ref(),
        &state.signer,
        &form.client_assertion,
    )
    .await
    .map_err(|err| {
        match &err {
            DstsError::Unauthorized(_) => Metrics::incr(&state.metrics.device_auth_blocked),
            DstsError::InvalidRequest(_) => Metrics::incr(&state.metrics.device_auth_bad_requests),
            _ => Metrics::incr(&state.metrics.device_auth_internal_errors),
        }
        err
    })?;
    Metrics::incr(&state.metrics.device_auth_responses);
    Ok(Json(AccessTokenResponseBody {
        access_token: minted.access_token,
        expires_at: minted.expires_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AppTokenForm {
    app_id: String,
    client_assertion_type: String,
    client_assertion: String,
}

pub async fn app_authentication_token(
    State(state): State<DstsServer>,
    crate::form::FormBody(form): crate::form::FormBody<AppTokenForm>,
) -> Result<Json<AccessTokenResponseBody>> {
    if let Err(err) = check_assertion_type(&form.client_assertion_type) {
        Metrics::incr(&state.metrics.app_auth_bad_requests);
        return Err(err);
    }
    let minted = dsts_sts::authenticate_app(
        &state.store,
        state.cache.as_ref(),
        &state.signer,
        &form.app_id,
        &form.client_assertion,
    )
    .await
    .map_err(|err| {
        match &err {
            DstsError::InvalidRequest(_) => Metrics::incr(&state.metrics.app_auth_bad_requests),
            DstsError::Unauthorized(_) => {}
            _ => Metrics::incr(&state.metrics.app_auth_internal_errors),
        }
        err
    })?;
    Metrics::incr(&state.metrics.app_auth_responses);
    Ok(Json(AccessTokenResponseBody {
        access_token: minted.access_token,
        expires_at: minted.expires_at,
    }))
}
