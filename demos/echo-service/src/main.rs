//! Sample service demonstrating [`relay_client::ServiceClient`]: registers
//! as `echo` and answers every request with the bytes it was sent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use clap::Parser;
use relay_client::{ClientConfig, ServiceClient, ServiceHandler};
use tracing::info;

/// Echo service command line arguments.
#[derive(Parser, Debug)]
#[command(name = "echo-service")]
#[command(about = "Sample relay service that echoes its input")]
struct Args {
	/// Address of the broker to register with.
	#[arg(long, default_value = "127.0.0.1:9999", value_name = "HOST:PORT")]
	broker_addr: String,

	/// Service name to register under.
	#[arg(long, default_value = "echo")]
	name: String,
}

struct EchoHandler;

impl ServiceHandler for EchoHandler {
	fn call(&self, method: String, data: Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, String>> + Send>> {
		Box::pin(async move {
			info!(method = %method, bytes = data.len(), "echoing request");
			Ok(data)
		})
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

	let args = Args::parse();

	let service = ServiceClient::connect(&args.broker_addr, &args.name, Arc::new(EchoHandler), ClientConfig::default()).await?;
	info!(name = %service.name(), broker_addr = %args.broker_addr, "registered with broker");

	tokio::signal::ctrl_c().await?;
	info!("received ctrl-c, shutting down");

	Ok(())
}
