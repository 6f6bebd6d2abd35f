//! lineupd - queue registry server

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lineup::cli::Args;
use lineup::{Hub, LineupServer, LineupService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lineup=info,lineupd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.server_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.bind_addr,
        in_memory = args.in_memory,
        data_path = %args.data_path.display(),
        "starting lineupd"
    );

    let registry = args.open_registry(&config)?;
    let hub = Hub::with_config(config.hub.clone());
    let service = LineupService::new(registry, hub);
    let server = LineupServer::new(config, service.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    let result = server.run_until(shutdown).await;

    service.registry().flush()?;
    tracing::info!("server shutdown complete");

    result.map_err(Into::into)
}
