//! Shared broker state.
//!
//! # Key types
//!
//! | Type | Owns |
//! |------|------|
//! | [`BrokerCore`] | everything below, plus id allocation and config; passed to [`crate::serve`]/[`crate::run`] |
//! | [`crate::registry::Registry`] | service name -> connection sink |
//! | [`crate::pending::PendingTable`] | in-flight routed requests |
//! | [`Liveness`] | per-connection last-seen timestamp + cancellation |
//!
//! # Concurrency and ordering
//!
//! The registry and pending table are independent locks; routing a request
//! takes the registry lock to resolve the target sink, releases it, then
//! takes the pending-table lock to record the entry. Neither lock is ever
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::pending::PendingTable;
use crate::registry::{ConnId, Registry};

/// Per-connection liveness bookkeeping for the heartbeat sweeper.
#[derive(Default)]
pub struct Liveness {
	seen: Mutex<HashMap<ConnId, (Instant, CancellationToken)>>,
}

impl Liveness {
	fn new() -> Self {
		Self::default()
	}

	/// Registers a new connection and returns the token its handler task
	/// should select on to notice a sweeper-initiated kick.
	pub fn track(&self, conn_id: ConnId) -> CancellationToken {
		let token = CancellationToken::new();
		self.seen.lock().unwrap().insert(conn_id, (Instant::now(), token.clone()));
		token
	}

	/// Records that a frame was just received from `conn_id`.
	pub fn touch(&self, conn_id: ConnId) {
		if let Some(entry) = self.seen.lock().unwrap().get_mut(&conn_id) {
			entry.0 = Instant::now();
		}
	}

	/// Drops bookkeeping for a connection that has already disconnected.
	pub fn forget(&self, conn_id: ConnId) {
		self.seen.lock().unwrap().remove(&conn_id);
	}

	/// Cancels every connection whose last activity is older than `expiry`.
	///
	/// Returns the ids kicked, for logging.
	pub fn sweep(&self, expiry: Duration) -> Vec<ConnId> {
		let now = Instant::now();
		let mut seen = self.seen.lock().unwrap();
		let stale: Vec<ConnId> = seen
			.iter()
			.filter(|(_, (last_seen, _))| now.duration_since(*last_seen) > expiry)
			.map(|(id, _)| *id)
			.collect();
		for id in &stale {
			if let Some((_, token)) = seen.remove(id) {
				token.cancel();
			}
		}
		stale
	}
}

/// Shared state for one running broker.
pub struct BrokerCore {
	/// Service-name routing table.
	pub registry: Registry,
	/// In-flight routed requests.
	pub pending: PendingTable,
	/// Per-connection liveness tracking.
	pub liveness: Liveness,
	/// Effective configuration.
	pub config: BrokerConfig,
	next_conn_id: AtomicU64,
	next_wire_id: AtomicU64,
}

impl BrokerCore {
	/// Builds a core with default configuration.
	#[must_use]
	pub fn new() -> Self {
		Self::with_config(BrokerConfig::default())
	}

	/// Builds a core with explicit configuration.
	#[must_use]
	pub fn with_config(config: BrokerConfig) -> Self {
		Self {
			registry: Registry::new(),
			pending: PendingTable::new(),
			liveness: Liveness::new(),
			config,
			next_conn_id: AtomicU64::new(1),
			next_wire_id: AtomicU64::new(1),
		}
	}

	/// Allocates the next process-local connection id.
	pub fn next_conn_id(&self) -> ConnId {
		ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Allocates the next globally-unique wire request id used to
	/// correlate a routed request with its eventual response.
	pub fn next_wire_id(&self) -> String {
		format!("r:{}", self.next_wire_id.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for BrokerCore {
	fn default() -> Self {
		Self::new()
	}
}
