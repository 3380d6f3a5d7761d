//! Relay broker binary.
//!
//! Runs the broker as a foreground process: accepts TCP connections,
//! registers named services, and routes request/response traffic between
//! them until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use relay_broker::{BrokerConfig, BrokerConfigFile, BrokerCore};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Broker command line arguments.
#[derive(Parser, Debug)]
#[command(name = "relay-broker")]
#[command(about = "Relay service mesh broker")]
struct Args {
	/// Address to listen on, overriding the config file and default.
	#[arg(short, long, value_name = "HOST:PORT")]
	addr: Option<String>,

	/// Optional TOML config file with an `[ipc]` table.
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging.
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.init();

	info!("starting relay-broker");

	let mut config = match &args.config {
		Some(path) => {
			let contents = std::fs::read_to_string(path)?;
			let file: BrokerConfigFile = toml::from_str(&contents)?;
			BrokerConfig::from_file(file)
		}
		None => BrokerConfig::default(),
	};

	if let Some(addr) = args.addr {
		config.addr = addr;
	}

	info!(addr = %config.addr, "effective configuration");

	let core = Arc::new(BrokerCore::with_config(config));
	let shutdown = CancellationToken::new();

	let signal_shutdown = shutdown.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("received ctrl-c, shutting down");
			signal_shutdown.cancel();
		}
	});

	relay_broker::serve(core, shutdown).await?;

	info!("relay-broker exited cleanly");
	Ok(())
}
