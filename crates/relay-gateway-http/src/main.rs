//! HTTP gateway: translates REST calls into broker requests.
//!
//! Endpoints:
//! - `POST /services/:name/:method` — calls `name.method` with the request
//!   body as the opaque payload, returning the service's reply verbatim.
//! - `GET  /healthz`                — liveness probe for the gateway itself.
//!
//! The gateway holds one [`Coordinator`] connection to the broker, shared
//! across requests; it never touches broker internals directly (no
//! registry, no pending table), matching the gateway adapter contract.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use relay_client::{CallError, ClientConfig, Coordinator};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP gateway command line arguments.
#[derive(Parser, Debug)]
#[command(name = "relay-gateway-http")]
#[command(about = "HTTP adapter for the relay broker")]
struct Args {
	/// Address the gateway's HTTP server listens on.
	#[arg(long, default_value = "127.0.0.1:8080", value_name = "HOST:PORT")]
	listen: SocketAddr,

	/// Address of the broker to dial.
	#[arg(long, default_value = "127.0.0.1:9999", value_name = "HOST:PORT")]
	broker_addr: String,

	/// Verbose logging.
	#[arg(short, long)]
	verbose: bool,
}

#[derive(Clone)]
struct AppState {
	coordinator: Arc<Coordinator>,
}

async fn healthz() -> &'static str {
	"ok"
}

async fn call_service(State(state): State<AppState>, Path((service, method)): Path<(String, String)>, body: axum::body::Bytes) -> Response {
	match state.coordinator.call(&service, &method, body.to_vec()).await {
		Ok(data) => match serde_json::from_slice::<serde_json::Value>(&data) {
			Ok(value) => Json(value).into_response(),
			Err(_) => (StatusCode::OK, data).into_response(),
		},
		Err(err) => call_error_response(err),
	}
}

fn call_error_response(err: CallError) -> Response {
	// The core's error envelope carries a human message only (spec §6: "No
	// structured error codes in the core"), so the gateway cannot distinguish
	// e.g. service-not-found from any other remote error without parsing
	// prose; every remote error maps to the same status.
	let (status, message) = match &err {
		CallError::Remote { message } => (StatusCode::BAD_GATEWAY, message.clone()),
		CallError::Timeout => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
		CallError::ConnectionClosed => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
		CallError::Io(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
	};
	(status, Json(json!({ "error": message }))).into_response()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.init();

	let coordinator = Coordinator::connect(&args.broker_addr, ClientConfig::default()).await?;
	info!(broker_addr = %args.broker_addr, "connected to broker");

	let state = AppState {
		coordinator: Arc::new(coordinator),
	};

	let app = Router::new()
		.route("/healthz", get(healthz))
		.route("/services/:service/:method", post(call_service))
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	let listener = tokio::net::TcpListener::bind(args.listen).await?;
	info!(addr = %args.listen, "relay-gateway-http listening");
	axum::serve(listener, app).await?;

	Ok(())
}
