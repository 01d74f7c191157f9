use clap::Parser;
use dsts_cache::{Cache, NullCache, RedisCache};
use dsts_server::{create_grpc_service, create_http_router, DstsServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Device Security Token Service
#[derive(Parser, Debug)]
#[command(name = "dsts-server")]
#[command(about = "Issues and validates device/app security tokens")]
struct Args {
    /// Configuration file path, overrides DSTS_CONFIG_LOCATION
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => dsts_config::load_from_path(path)?,
        None => dsts_config::load()?,
    };

    dsts_logging::init(&config.logging.log_level, true);

    info!(version = env!("CARGO_PKG_VERSION"), "starting dsts-server");

    let cache: Arc<dyn Cache> = if config.cache.enabled {
        let url = format!(
            "redis://{}:{}/{}",
            config.cache.cache_hostname, config.cache.cache_port, config.cache.cache_db
        );
        Arc::new(RedisCache::connect(&url).await?)
    } else {
        Arc::new(NullCache)
    };

    let server = DstsServer::bootstrap(config.clone(), cache).await?;
    upsert_registered_apps(&server, &config.server.registered_app_keys).await;

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.server.rest_port));
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.server.rpc_port));

    let http_router = create_http_router(server.clone());
    let grpc_service = create_grpc_service(server.clone());

    info!(%http_addr, "REST facade listening");
    info!(%grpc_addr, "RPC facade listening");

    let http_task = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(http_addr).await?;
        axum::serve(listener, http_router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let grpc_task = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, shutdown_signal())
            .await
    });

    let (http_result, grpc_result) = tokio::join!(http_task, grpc_task);
    if let Err(err) = http_result? {
        error!(error = %err, "REST facade exited with an error");
    }
    if let Err(err) = grpc_result? {
        error!(error = %err, "RPC facade exited with an error");
    }

    Ok(())
}

/// Upsert every registered app named in the registered-apps document
/// whose key file is actually present (spec §5). A missing document or
/// a malformed one fails startup; a missing individual key file just
/// skips that one entry.
async fn upsert_registered_apps(server: &DstsServer, registered_app_keys_path: &str) {
    let document = match dsts_config::load_registered_apps(registered_app_keys_path) {
        Ok(document) => document,
        Err(err) => {
            error!(error = %err, "failed to load registered apps document");
            return;
        }
    };

    for app in document.registered_apps {
        let Ok(public_key) = std::fs::read_to_string(&app.public_key_file) else {
            continue;
        };
        if let Err(err) = server
            .store
            .add_or_update_registered_app(&app.id, &app.name, app.enabled, &public_key)
            .await
        {
            error!(error = %err, app_id = %app.id, "failed to upsert registered app");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
