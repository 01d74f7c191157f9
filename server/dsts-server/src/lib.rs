//! The Device Security Token Service request facade (spec §4.8): one
//! `DstsServer` state backs both the HTTP/JSON router and the binary
//! RPC service.

pub mod form;
pub mod grpc;
pub mod handlers;
pub mod request_id;
pub mod routes;
pub mod state;

pub use state::DstsServer;

use grpc::proto::device_security_token_service_server::DeviceSecurityTokenServiceServer;
use grpc::DstsGrpcService;

pub fn create_http_router(state: DstsServer) -> axum::Router {
    routes::create_router(state)
}

pub fn create_grpc_service(state: DstsServer) -> DeviceSecurityTokenServiceServer<DstsGrpcService> {
    DeviceSecurityTokenServiceServer::new(DstsGrpcService::new(state))
}
