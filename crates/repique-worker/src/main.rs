// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery worker binary.
//!
//! Wires the Redis store, configuration caches, and messaging stack, then
//! runs the orchestrator either once (`--once`) or on the `WORKER_INTERVAL`
//! period until a termination signal arrives.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use repique_config::{
    ConfigLoader, CredentialSource, EnvCredentialSource, JourneyConfigSource, TemplateStore,
    WorkerSettings,
};
use repique_core::{JourneyScanner, Messenger, RepiqueError, StateStore};
use repique_messaging::{
    MessagingClient, StsClient, StsSettings, WhatsAppClient, WhatsAppConfig,
};
use repique_store::{RedisClient, RedisScanner, RedisStateStore};
use repique_worker::{shutdown, Orchestrator, Processor};

/// Abandonment-recovery worker for WhatsApp customer journeys.
#[derive(Parser, Debug)]
#[command(name = "repique-worker", version, about, long_about = None)]
struct Cli {
    /// Run a single pass and exit instead of looping on WORKER_INTERVAL.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(error = %e, "worker terminated with error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RepiqueError> {
    let settings = WorkerSettings::from_env()?;
    let cancel = shutdown::install_signal_handler();

    let client = RedisClient::connect(&settings.store.redis).await?;
    let store: Arc<dyn StateStore> = Arc::new(RedisStateStore::new(
        client.clone(),
        settings.store.state_ttl,
    ));
    let scanner: Arc<dyn JourneyScanner> =
        Arc::new(RedisScanner::new(client, settings.store.scan_count));

    let config_source: Arc<dyn JourneyConfigSource> =
        Arc::new(ConfigLoader::new(&settings.appconfig_endpoint)?);
    let templates = Arc::new(TemplateStore::new(&settings.appconfig_endpoint)?);

    let credentials = EnvCredentialSource
        .resolve(&settings.whatsapp.secret_name)
        .await?;
    let sts = StsClient::new(StsSettings {
        endpoint: settings.whatsapp.sts_endpoint.clone(),
        client_id: credentials.client_id,
        client_secret: credentials.client_secret,
        timeout: settings.whatsapp.timeout,
    })?;
    let whatsapp = WhatsAppClient::new(
        WhatsAppConfig {
            api_endpoint: settings.whatsapp.api_endpoint.clone(),
            phone_number_id: settings.whatsapp.phone_number_id.clone(),
            timeout: settings.whatsapp.timeout,
            max_retries: settings.whatsapp.max_retries,
            retry_delay: settings.whatsapp.retry_delay,
        },
        sts,
    )?;
    let messenger: Arc<dyn Messenger> = Arc::new(MessagingClient::new(templates, whatsapp));

    let processor = Processor::new(store, messenger);
    let orchestrator = Orchestrator::new(scanner, config_source, processor);

    if cli.once {
        orchestrator.run(&cancel).await?;
        return Ok(());
    }

    info!(interval = ?settings.interval, "worker running in local mode");
    let mut interval = tokio::time::interval(settings.interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match orchestrator.run(&cancel).await {
                    Ok(_) => {}
                    Err(RepiqueError::Cancelled) => break,
                    Err(e) => error!(error = %e, "worker run failed"),
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    info!("worker shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber. `DEBUG` switches the default filter
/// to debug level; `RUST_LOG` overrides both.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let default_level = if repique_config::debug_enabled() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
