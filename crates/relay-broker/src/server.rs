//! Accept loop and liveness sweeper.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::core::BrokerCore;

/// Binds `core.config.addr` and serves connections until `shutdown` fires.
///
/// Spawns one task per accepted connection plus a single sweeper task that
/// periodically evicts connections that have gone quiet past
/// `heartbeat_expiry`.
pub async fn serve(core: Arc<BrokerCore>, shutdown: CancellationToken) -> std::io::Result<()> {
	let listener = TcpListener::bind(&core.config.addr).await?;
	tracing::info!(addr = %core.config.addr, "broker listening");
	run(listener, core, shutdown).await
}

/// Serves connections on an already-bound listener until `shutdown` fires.
///
/// Split out from [`serve`] so tests can bind an ephemeral port (`:0`) and
/// learn the real address via [`TcpListener::local_addr`] before serving.
pub async fn run(listener: TcpListener, core: Arc<BrokerCore>, shutdown: CancellationToken) -> std::io::Result<()> {
	let sweep_core = Arc::clone(&core);
	let sweep_shutdown = shutdown.clone();
	let sweeper = tokio::spawn(sweep_loop(sweep_core, sweep_shutdown));

	loop {
		tokio::select! {
			() = shutdown.cancelled() => {
				tracing::info!("shutdown requested, stopping accept loop");
				break;
			}
			accepted = listener.accept() => {
				match accepted {
					Ok((stream, _addr)) => {
						let core = Arc::clone(&core);
						tokio::spawn(crate::connection::handle_connection(core, stream));
					}
					Err(e) => {
						tracing::error!(error = %e, "failed to accept connection");
					}
				}
			}
		}
	}

	sweeper.abort();
	Ok(())
}

async fn sweep_loop(core: Arc<BrokerCore>, shutdown: CancellationToken) {
	let mut interval = tokio::time::interval(core.config.sweep_interval);
	loop {
		tokio::select! {
			() = shutdown.cancelled() => break,
			_ = interval.tick() => {
				let kicked = core.liveness.sweep(core.config.heartbeat_expiry);
				if !kicked.is_empty() {
					tracing::info!(count = kicked.len(), "evicted stale connections");
				}
			}
		}
	}
}
