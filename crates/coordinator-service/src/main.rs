use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coordinator_config::ConfigLoader;
use coordinator_core::CoordinatorBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

#[derive(Parser)]
#[command(name = "coordinator-service")]
#[command(about = "Agent Intent Coordinator Service", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "COORDINATOR_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the coordinator service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli).await,
	}
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("Starting Agent Intent Coordinator Service");
	info!("Loading configuration from: {:?}", cli.config);

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	info!("Configuration loaded successfully");
	info!("Coordinator name: {}", config.coordinator.name);
	info!("Chain id: {}", config.coordinator.chain_id);
	info!("HTTP port: {}", config.coordinator.http_port);

	let http_port = config.coordinator.http_port;
	let coordinator = CoordinatorBuilder::new(config)
		.with_storage_factory(
			"memory",
			coordinator_storage::implementations::memory::create_storage,
		)
		.with_storage_factory(
			"file",
			coordinator_storage::implementations::file::create_storage,
		)
		.with_identity_factory(
			"memory",
			coordinator_identity::implementations::memory::create_registry,
		)
		.build()
		.context("Failed to build coordinator")?;

	let coordinator = Arc::new(coordinator);

	// Mirror every lifecycle transition into the logs
	let mut events = coordinator.event_bus().subscribe();
	let event_handle = tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(event) => {
					let t = event.transition();
					info!(
						intent_id = %t.intent_id,
						previous = ?t.previous_status,
						new = %t.new_status,
						principal = %t.acting_principal,
						"intent transition"
					);
				}
				Err(RecvError::Lagged(missed)) => {
					warn!(missed, "event subscriber lagged, transitions dropped from log");
				}
				Err(RecvError::Closed) => break,
			}
		}
	});

	let http_coordinator = coordinator.clone();
	let http_handle = tokio::spawn(async move { api::serve(http_coordinator, http_port).await });

	let shutdown_signal = setup_shutdown_signal();

	info!("Agent Intent Coordinator Service started successfully");

	shutdown_signal.await;

	info!("Shutdown signal received, stopping services...");

	http_handle.abort();
	event_handle.abort();

	info!("Agent Intent Coordinator Service stopped");
	Ok(())
}

async fn validate_config(cli: Cli) -> Result<()> {
	info!("Validating configuration file: {:?}", cli.config);

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	info!("Configuration is valid");
	info!("Coordinator name: {}", config.coordinator.name);
	info!("Chain id: {}", config.coordinator.chain_id);
	info!("Contract address: {}", config.coordinator.contract_address);
	info!("Lock window: {}s", config.coordinator.lock_window_secs);
	info!("Storage backend: {}", config.storage.backend);
	info!("Identity backend: {}", config.identity.backend);
	for relay in &config.coordinator.trusted_relays {
		info!("Trusted relay: {}", relay);
	}

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
