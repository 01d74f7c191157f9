//! The Authoritative Store (spec §4.3): the durable, transactional
//! Postgres-backed source of truth for devices, enrollment tokens,
//! registered apps, signing keys and management services. Every
//! operation runs under [`pool::OPERATION_TIMEOUT`]; a deadline miss is
//! reported as `DstsError::DatabaseBusy` rather than left to hang.

pub mod devices;
pub mod enrollment_tokens;
mod error_map;
pub mod management_services;
pub mod models;
pub mod pool;
pub mod registered_apps;
pub mod signing_keys;
pub mod tombstones;

pub use pool::PoolConfig;

use sqlx::PgPool;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &PoolConfig) -> dsts_error::Result<Self> {
        let pool = pool::connect(config).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> dsts_error::Result<()> {
        pool::run_migrations(&self.pool).await
    }
}
