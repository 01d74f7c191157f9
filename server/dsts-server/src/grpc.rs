//! The binary RPC facade (spec §4.8, §6.1): a `tonic` service sitting
//! side by side with the HTTP/JSON facade over the same `DstsServer`
//! state, sharing `DstsError`'s kind-to-code mapping via `Into<Status>`.

pub mod proto {
    tonic::include_proto!("dsts.v1");
}

use crate::request_id;
use crate::state::DstsServer;
use chrono::{DateTime, Utc};
use dsts_error::{DstsError, Result as DstsResult};
use dsts_store::models::{CertificateUpdate, DeviceFilter, DeviceUpdate, Pagination};
use proto::device_security_token_service_server::DeviceSecurityTokenService;
use proto::*;
use std::time::SystemTime;
use tonic::{Request, Response, Status};

fn to_timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

fn response_header(request_id: String, code: tonic::Code) -> DstsResponseHeader {
    DstsResponseHeader {
        protocol_version: "1".to_string(),
        status: code as u32,
        status_message: String::new(),
        request_id,
        response_time: Some(prost_types::Timestamp::from(SystemTime::now())),
    }
}

fn incoming_request_id(header: &Option<DstsRequestHeader>) -> String {
    header
        .as_ref()
        .map(|h| h.request_id.clone())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(request_id::generate)
}

/// Parse the `ListDevices` filter grammar (spec §4.3): a single
/// `key=value` pair, the only accepted key being `enabled` with value
/// `true`/`false`. An empty filter means unfiltered; anything else is
/// malformed.
fn parse_device_filter(filter: &str) -> DstsResult<DeviceFilter> {
    if filter.is_empty() {
        return Ok(DeviceFilter::None);
    }
    let (key, value) = filter
        .split_once('=')
        .ok_or_else(|| DstsError::invalid_request(dsts_error::reasons::REQUEST_PARSING_FAILED))?;
    if key != "enabled" {
        return Err(DstsError::invalid_request(dsts_error::reasons::REQUEST_PARSING_FAILED));
    }
    match value {
        "true" => Ok(DeviceFilter::Enabled(true)),
        "false" => Ok(DeviceFilter::Enabled(false)),
        _ => Err(DstsError::invalid_request(dsts_error::reasons::REQUEST_PARSING_FAILED)),
    }
}

fn device_to_proto(device: &dsts_store::models::Device) -> Device {
    Device {
        device_id: device.device_id.clone(),
        tenant_id: device.tenant_id.clone(),
        is_enabled: device.is_enabled,
        is_lost: device.is_lost,
        certificate_thumbprint: device.certificate_thumbprint.clone(),
        previous_certificate_thumbprint: device.previous_certificate_thumbprint.clone().unwrap_or_default(),
        certificate_issued_at: Some(to_timestamp(device.certificate_issued_at)),
        certificate_expires_at: Some(to_timestamp(device.certificate_expires_at)),
        created_at: Some(to_timestamp(device.created_at)),
        updated_at: Some(to_timestamp(device.updated_at)),
        service_id: device.service_id.clone(),
        hardware_hash: device.hardware_hash.clone().unwrap_or_default(),
    }
}

pub struct DstsGrpcService {
    state: DstsServer,
}

impl DstsGrpcService {
    pub fn new(state: DstsServer) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl DeviceSecurityTokenService for DstsGrpcService {
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);
        Ok(Response::new(PingResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            message: req.message,
            server_time: Some(prost_types::Timestamp::from(SystemTime::now())),
        }))
    }

    async fn create_device(
        &self,
        request: Request<CreateDeviceRequest>,
    ) -> Result<Response<CreateDeviceResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let device = self
            .state
            .devices
            .create_device(dsts_device::CreateDeviceRequest {
                tenant_id: req.tid,
                device_id: req.device_id,
                device_certificate_der: req.device_certificate,
                management_service: Some(req.management_service).filter(|v| !v.is_empty()),
                hardware_hash: Some(req.hardware_hash).filter(|v| !v.is_empty()),
            })
            .await?;

        Ok(Response::new(CreateDeviceResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            create_time: Some(to_timestamp(device.created_at)),
        }))
    }

    async fn get_device(&self, request: Request<GetDeviceRequest>) -> Result<Response<GetDeviceResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let device = self.state.devices.get_device(&req.tid, &req.device_id).await?;

        Ok(Response::new(GetDeviceResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            device: Some(device_to_proto(&device)),
        }))
    }

    async fn list_devices(
        &self,
        request: Request<ListDevicesRequest>,
    ) -> Result<Response<ListDevicesResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let filter = parse_device_filter(&req.filter)?;
        let pagination = Pagination {
            limit: req.page_size,
            page: req.page_number,
        };
        let devices = self
            .state
            .devices
            .list_devices(&req.tid, filter, pagination)
            .await?;
        let next_page = if devices.len() as i64 == pagination.limit() {
            pagination.page() + 1
        } else {
            0
        };

        Ok(Response::new(ListDevicesResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            devices: devices.iter().map(device_to_proto).collect(),
            next_page,
        }))
    }

    async fn update_device(
        &self,
        request: Request<UpdateDeviceRequest>,
    ) -> Result<Response<UpdateDeviceResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let mut update = DeviceUpdate::default();
        if req.update_mask_paths.iter().any(|p| p == "is_enabled") {
            update.is_enabled = Some(req.is_enabled);
        }
        if req.update_mask_paths.iter().any(|p| p == "is_lost") {
            update.is_lost = Some(req.is_lost);
        }
        if req.update_mask_paths.iter().any(|p| p == "device_certificate") {
            let cert = dsts_crypto::certificate::ParsedCertificate::parse_der(&req.device_certificate)
                .map_err(|e| DstsError::invalid_request(e.to_string()))?;
            dsts_crypto::certificate::verify_certificate(&cert, Utc::now())
                .map_err(|e| DstsError::invalid_request(e.to_string()))?;
            dsts_crypto::certificate::verify_device_identity(&cert, &req.device_id, &req.tid)
                .map_err(|e| DstsError::invalid_request(e.to_string()))?;
            update.certificate = Some(CertificateUpdate {
                thumbprint: cert.thumbprint(),
                issued_at: cert.not_before,
                expires_at: cert.not_after,
            });
        }
        if update.is_empty() {
            return Err(DstsError::invalid_request("update request carried no fields to change").into());
        }

        let device = self.state.devices.update_device(&req.tid, &req.device_id, update).await?;

        Ok(Response::new(UpdateDeviceResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            update_time: Some(to_timestamp(device.updated_at)),
        }))
    }

    async fn delete_device(
        &self,
        request: Request<DeleteDeviceRequest>,
    ) -> Result<Response<DeleteDeviceResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        self.state.devices.delete_device(&req.tid, &req.device_id).await?;

        Ok(Response::new(DeleteDeviceResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            delete_time: Some(prost_types::Timestamp::from(SystemTime::now())),
        }))
    }

    async fn create_enrollment_token(
        &self,
        request: Request<CreateEnrollmentTokenRequest>,
    ) -> Result<Response<CreateEnrollmentTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let (token, expires_at) =
            dsts_sts::create_enrollment_token(&self.state.store, &req.tid, req.lifetime_days).await?;
        incr_metric(&self.state, |m| &m.enrollment_tokens_created);

        Ok(Response::new(CreateEnrollmentTokenResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            issued_at: Some(prost_types::Timestamp::from(SystemTime::now())),
            expires_at: Some(to_timestamp(expires_at)),
            token,
        }))
    }

    async fn get_enrollment_token(
        &self,
        request: Request<GetEnrollmentTokenRequest>,
    ) -> Result<Response<GetEnrollmentTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let record = self.state.store.get_enrollment_token_for_tenant(&req.tid).await?;

        Ok(Response::new(GetEnrollmentTokenResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            token: record.token,
            expires_at: Some(to_timestamp(record.expires_at)),
        }))
    }

    async fn delete_enrollment_token(
        &self,
        request: Request<DeleteEnrollmentTokenRequest>,
    ) -> Result<Response<DeleteEnrollmentTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        self.state.store.delete_enrollment_token(&req.tid).await?;

        Ok(Response::new(DeleteEnrollmentTokenResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            delete_time: Some(prost_types::Timestamp::from(SystemTime::now())),
        }))
    }

    async fn validate_enrollment_token(
        &self,
        request: Request<ValidateEnrollmentTokenRequest>,
    ) -> Result<Response<ValidateEnrollmentTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let result = dsts_sts::validate_enrollment_token(&self.state.store, &req.token).await;
        let (tid, is_valid, status) = match result {
            Ok(tid) => {
                incr_metric(&self.state, |m| &m.enrollment_tokens_validated);
                (tid, true, tonic::Code::Ok)
            }
            Err(DstsError::Unauthorized(_)) => {
                incr_metric(&self.state, |m| &m.enrollment_tokens_invalid);
                (String::new(), false, tonic::Code::Unauthenticated)
            }
            Err(other) => return Err(other.into()),
        };

        Ok(Response::new(ValidateEnrollmentTokenResponse {
            header: Some(response_header(request_id, status)),
            tid,
            is_valid,
        }))
    }

    async fn get_device_authentication_challenge(
        &self,
        request: Request<GetDeviceAuthenticationChallengeRequest>,
    ) -> Result<Response<ChallengeResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let challenge = dsts_sts::issue_challenge(self.state.cache.as_ref(), &req.device_id).await?;

        Ok(Response::new(ChallengeResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            challenge,
            expires_at: Some(prost_types::Timestamp::from(
                SystemTime::now() + dsts_cache::keys::CHALLENGE_TTL,
            )),
        }))
    }

    async fn get_app_authentication_challenge(
        &self,
        request: Request<GetAppAuthenticationChallengeRequest>,
    ) -> Result<Response<ChallengeResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let challenge = dsts_sts::issue_challenge(self.state.cache.as_ref(), &req.app_id).await?;

        Ok(Response::new(ChallengeResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            challenge,
            expires_at: Some(prost_types::Timestamp::from(
                SystemTime::now() + dsts_cache::keys::CHALLENGE_TTL,
            )),
        }))
    }

    async fn authenticate_device(
        &self,
        request: Request<AuthenticateDeviceRequest>,
    ) -> Result<Response<AccessTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);
        check_assertion_type(&req.assertion_type)?;

        let minted = dsts_sts::authenticate_device(
            &self.state.store,
            self.state.cache.as_ref(),
            &self.state.signer,
            &req.assertion,
        )
        .await?;

        Ok(Response::new(AccessTokenResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            access_token: minted.access_token,
            expires_at: Some(to_timestamp(minted.expires_at)),
        }))
    }

    async fn authenticate_app(
        &self,
        request: Request<AuthenticateAppRequest>,
    ) -> Result<Response<AccessTokenResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);
        check_assertion_type(&req.assertion_type)?;

        let minted = dsts_sts::authenticate_app(
            &self.state.store,
            self.state.cache.as_ref(),
            &self.state.signer,
            &req.app_id,
            &req.assertion,
        )
        .await?;

        Ok(Response::new(AccessTokenResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            access_token: minted.access_token,
            expires_at: Some(to_timestamp(minted.expires_at)),
        }))
    }

    async fn get_signing_key(
        &self,
        request: Request<GetSigningKeyRequest>,
    ) -> Result<Response<GetSigningKeyResponse>, Status> {
        let req = request.into_inner();
        let request_id = incoming_request_id(&req.header);

        let keys = self
            .state
            .signer
            .jwks()
            .iter()
            .map(|jwk| JsonWebKey {
                kty: jwk.kty.to_string(),
                alg: jwk.alg.to_string(),
                r#use: jwk.use_.to_string(),
                kid: jwk.kid.clone(),
                n: jwk.n.clone(),
                e: jwk.e.clone(),
            })
            .collect();

        Ok(Response::new(GetSigningKeyResponse {
            header: Some(response_header(request_id, tonic::Code::Ok)),
            keys,
        }))
    }
}

const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

fn check_assertion_type(assertion_type: &str) -> DstsResult<()> {
    if assertion_type.is_empty() {
        return Err(DstsError::invalid_request(dsts_error::reasons::MISSING_CLIENT_ASSERTION));
    }
    if assertion_type != JWT_BEARER_ASSERTION_TYPE {
        return Err(DstsError::invalid_request(
            dsts_error::reasons::INVALID_CLIENT_ASSERTION_TYPE,
        ));
    }
    Ok(())
}

fn incr_metric(state: &DstsServer, select: impl FnOnce(&dsts_telemetry::Metrics) -> &std::sync::atomic::AtomicU64) {
    dsts_telemetry::Metrics::incr(select(&state.metrics));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_means_unfiltered() {
        assert!(matches!(parse_device_filter("").unwrap(), DeviceFilter::None));
    }

    #[test]
    fn enabled_true_and_false_parse() {
        assert!(matches!(parse_device_filter("enabled=true").unwrap(), DeviceFilter::Enabled(true)));
        assert!(matches!(parse_device_filter("enabled=false").unwrap(), DeviceFilter::Enabled(false)));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(parse_device_filter("disabled=true").is_err());
    }

    #[test]
    fn bad_value_is_rejected() {
        assert!(parse_device_filter("enabled=yes").is_err());
    }

    #[test]
    fn missing_equals_sign_is_rejected() {
        assert!(parse_device_filter("enabled").is_err());
    }
}
