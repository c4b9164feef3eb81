use anyhow::Result;
use chargemanager::cli::Args;
use chargemanager::config::Config;
use chargemanager::engine::{ChargeManager, ExitReason};
use chargemanager::gateway::{MqttPublisher, MqttSubscription, client_id_base};
use chargemanager::logging::init_logging;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    args.apply(&mut config);
    config.normalize();

    // An unusable VIN is the only fatal startup condition
    if let Err(e) = config.validate() {
        let _ = Args::command().print_help();
        eprintln!("\nError: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("chargemanager {} starting up", env!("APP_VERSION"));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let base = client_id_base();
    let publisher = Arc::new(MqttPublisher::new(&config.mqtt, &base));
    let mut subscription = MqttSubscription::new(&config.mqtt, &base);

    let mut manager = ChargeManager::new(config, publisher);
    match manager.run(&mut subscription, cancel).await {
        ExitReason::Stopped(condition) => info!("Controller stopped: {}", condition),
        ExitReason::Interrupted => info!("Controller interrupted"),
    }

    Ok(ExitCode::SUCCESS)
}

/// Cancel the controller on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
    info!("shutdown signal received");
    cancel.cancel();
}
