use tokio::net::TcpListener;

use whatsapp_relay::config;
use whatsapp_relay::lifecycle::{startup, wait_for_signal, Shutdown};
use whatsapp_relay::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, warnings) = config::load_from_env();

    init_logging(&config.observability)?;

    tracing::info!("whatsapp-relay v{} starting", env!("CARGO_PKG_VERSION"));

    startup::report_config(&config, &warnings);
    startup::init_metrics(&config.observability);

    let shutdown = Shutdown::new();
    let relay = startup::prepare(config)?;

    let listener = TcpListener::bind(relay.listen_addr()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Server running"
    );

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    startup::serve(relay, listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
