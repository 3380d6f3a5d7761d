//! TCP gateway: translates newline-delimited JSON calls into broker requests.
//!
//! Each connected client writes one JSON object per line,
//! `{"service": "...", "method": "...", "data": <any JSON value>}`, and
//! reads back one JSON response line per request,
//! `{"ok": true, "data": <value>}` or `{"ok": false, "error": "..."}`. This
//! is the minimal "native TCP, future protocols"
//! adapter named alongside the HTTP gateway; it carries no framing beyond
//! newlines because its only job is to demonstrate the gateway contract,
//! not to be a production wire protocol in its own right.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use relay_client::{CallError, ClientConfig, Coordinator};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// TCP gateway command line arguments.
#[derive(Parser, Debug)]
#[command(name = "relay-gateway-tcp")]
#[command(about = "Newline-delimited JSON-over-TCP adapter for the relay broker")]
struct Args {
	/// Address the gateway's TCP listener binds on.
	#[arg(long, default_value = "127.0.0.1:8081", value_name = "HOST:PORT")]
	listen: SocketAddr,

	/// Address of the broker to dial.
	#[arg(long, default_value = "127.0.0.1:9999", value_name = "HOST:PORT")]
	broker_addr: String,

	/// Verbose logging.
	#[arg(short, long)]
	verbose: bool,
}

#[derive(Deserialize)]
struct CallLine {
	service: String,
	method: String,
	#[serde(default)]
	data: serde_json::Value,
}

#[derive(Serialize)]
struct OkLine {
	ok: bool,
	data: serde_json::Value,
}

#[derive(Serialize)]
struct ErrLine {
	ok: bool,
	error: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.init();

	let coordinator = Arc::new(Coordinator::connect(&args.broker_addr, ClientConfig::default()).await?);
	info!(broker_addr = %args.broker_addr, "connected to broker");

	let listener = TcpListener::bind(args.listen).await?;
	info!(addr = %args.listen, "relay-gateway-tcp listening");

	loop {
		let (stream, peer) = listener.accept().await?;
		let coordinator = Arc::clone(&coordinator);
		tokio::spawn(async move {
			info!(%peer, "client connected");
			handle_client(stream, coordinator).await;
			info!(%peer, "client disconnected");
		});
	}
}

async fn handle_client(stream: TcpStream, coordinator: Arc<Coordinator>) {
	let (read_half, mut write_half) = stream.into_split();
	let mut lines = BufReader::new(read_half).lines();
	let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

	let writer_task = tokio::spawn(async move {
		while let Some(line) = out_rx.recv().await {
			if write_half.write_all(line.as_bytes()).await.is_err() {
				break;
			}
			if write_half.write_all(b"\n").await.is_err() {
				break;
			}
			if write_half.flush().await.is_err() {
				break;
			}
		}
	});

	loop {
		let line = match lines.next_line().await {
			Ok(Some(line)) if !line.trim().is_empty() => line,
			Ok(Some(_)) => continue,
			Ok(None) => break,
			Err(e) => {
				warn!(error = %e, "read error, closing connection");
				break;
			}
		};

		let out_tx = out_tx.clone();
		let coordinator = Arc::clone(&coordinator);
		tokio::spawn(async move {
			let response = process_line(&coordinator, &line).await;
			let _ = out_tx.send(response);
		});
	}

	drop(out_tx);
	let _ = writer_task.await;
}

async fn process_line(coordinator: &Coordinator, line: &str) -> String {
	let call: CallLine = match serde_json::from_str(line) {
		Ok(call) => call,
		Err(e) => {
			return serde_json::to_string(&ErrLine {
				ok: false,
				error: format!("invalid call line: {e}"),
			})
			.unwrap();
		}
	};

	let data = serde_json::to_vec(&call.data).unwrap_or_default();
	match coordinator.call(&call.service, &call.method, data).await {
		Ok(data) => {
			let value = serde_json::from_slice(&data).unwrap_or(serde_json::Value::Null);
			serde_json::to_string(&OkLine { ok: true, data: value }).unwrap()
		}
		Err(err) => serde_json::to_string(&err_line(err)).unwrap(),
	}
}

fn err_line(err: CallError) -> ErrLine {
	match err {
		CallError::Remote { message } => ErrLine { ok: false, error: message },
		other => ErrLine { ok: false, error: other.to_string() },
	}
}
