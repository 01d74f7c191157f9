use dsts_error::{DstsError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Per-operation deadline applied around every store call. A query that
/// doesn't complete within this window is reported as `DatabaseBusy` so
/// the caller can retry rather than wait indefinitely on a starved pool.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PoolConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: String,
    pub max_connections: u32,
}

pub async fn connect(config: &PoolConfig) -> Result<PgPool> {
    let url = format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        config.user, config.password, config.host, config.port, config.database, config.ssl_mode
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(OPERATION_TIMEOUT)
        .connect(&url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to the database");
            DstsError::internal(e)
        })
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "failed to run database migrations");
        DstsError::internal(e)
    })
}

/// Bound any store future by [`OPERATION_TIMEOUT`], mapping an elapsed
/// deadline to `DatabaseBusy` so callers can surface an HTTP 429 / RPC
/// `ResourceExhausted` instead of hanging.
pub async fn with_deadline<F, T>(fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(OPERATION_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(DstsError::DatabaseBusy),
    }
}
