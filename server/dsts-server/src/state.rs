use dsts_cache::Cache;
use dsts_config::Config;
use dsts_device::{DeviceManager, ManagementServiceRegistry};
use dsts_error::Result;
use dsts_sts::TokenSigner;
use dsts_store::{PoolConfig, Store};
use dsts_telemetry::Metrics;
use std::sync::Arc;

/// Aggregated state shared by the HTTP and RPC facades (spec §4.8): one
/// `DstsServer` backs both `axum`'s router and `tonic`'s service.
#[derive(Clone)]
pub struct DstsServer {
    pub config: Arc<Config>,
    pub store: Store,
    pub cache: Arc<dyn Cache>,
    pub signer: Arc<TokenSigner>,
    pub devices: Arc<DeviceManager>,
    pub metrics: Arc<Metrics>,
}

impl DstsServer {
    /// Sequential startup (spec §5): connect store, migrate, load
    /// management services, init cache, init signing key. Registered-app
    /// upsert happens separately once this state exists, since it needs
    /// the store but not the rest of the server.
    pub async fn bootstrap(config: Config, cache: Arc<dyn Cache>) -> Result<Self> {
        let pool_config = PoolConfig {
            host: config.database.db_hostname.clone(),
            port: config.database.db_port,
            database: config.database.db_name.clone(),
            user: config.database.user.clone(),
            password: config.database.password.clone(),
            ssl_mode: config.database.ssl_mode.clone(),
            max_connections: config.database.max_open_connections,
        };
        let store = Store::connect(&pool_config).await?;
        if config.database.migrate_enabled {
            store.migrate().await?;
        }

        let services = ManagementServiceRegistry::load(store.list_management_services().await?);
        let signer = TokenSigner::initialize(&store).await?;
        let devices = DeviceManager::new(store.clone(), cache.clone(), services);

        Ok(Self {
            config: Arc::new(config),
            store,
            cache,
            signer: Arc::new(signer),
            devices: Arc::new(devices),
            metrics: Arc::new(Metrics::default()),
        })
    }
}
