//! Service-name -> connection registry.
//!
//! # Invariants
//!
//! 1. At most one live connection owns a given service name at a time.
//!    Enforced in: [`Registry::register`]. Tested by: `registry::tests`.
//! 2. A name disappears from lookups in the same instant its connection's
//!    entry is removed — there is no window where `lookup` succeeds for a
//!    connection that `unregister_conn` has already processed. Enforced in:
//!    both operations taking the same `Mutex`. Tested by:
//!    `registry::tests::unregister_removes_all_names_for_connection`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::error::RegistryError;
use relay_proto::Frame;

/// Process-local identifier for one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

/// Outbound channel to a connection's dedicated writer task.
///
/// Sending never blocks and a full receiver (a closed connection) is
/// reported by [`mpsc::error::SendError`], which callers treat as
/// [`crate::error::RouteError::Unreachable`].
pub type ConnSink = mpsc::UnboundedSender<Frame>;

struct Entry {
	conn_id: ConnId,
	sink: ConnSink,
	registered_at: Instant,
}

#[derive(Default)]
struct State {
	by_name: HashMap<String, Entry>,
	names_by_conn: HashMap<ConnId, HashSet<String>>,
}

/// Maps registered service names to the connection currently serving them.
#[derive(Default)]
pub struct Registry {
	state: Mutex<State>,
}

impl Registry {
	/// Creates an empty registry.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `name` as served by `conn_id`.
	///
	/// Re-registering the same name from the same connection is a no-op
	/// that refreshes `registered_at`. Registering a name already owned by
	/// a different connection fails with [`RegistryError::AlreadyRegistered`].
	pub fn register(&self, name: &str, conn_id: ConnId, sink: ConnSink) -> Result<(), RegistryError> {
		let mut state = self.state.lock().unwrap();
		if let Some(existing) = state.by_name.get(name)
			&& existing.conn_id != conn_id
		{
			return Err(RegistryError::AlreadyRegistered(name.to_string()));
		}

		state.by_name.insert(
			name.to_string(),
			Entry {
				conn_id,
				sink,
				registered_at: Instant::now(),
			},
		);
		state.names_by_conn.entry(conn_id).or_default().insert(name.to_string());
		Ok(())
	}

	/// Looks up the sink currently serving `name`.
	#[must_use]
	pub fn lookup(&self, name: &str) -> Option<ConnSink> {
		self.state.lock().unwrap().by_name.get(name).map(|e| e.sink.clone())
	}

	/// Looks up both the owning connection id and sink currently serving
	/// `name`, so a caller can later correlate a disconnect of that
	/// connection with requests it was handed.
	#[must_use]
	pub fn lookup_with_conn(&self, name: &str) -> Option<(ConnId, ConnSink)> {
		self.state.lock().unwrap().by_name.get(name).map(|e| (e.conn_id, e.sink.clone()))
	}

	/// Removes every name `conn_id` owns, returning them.
	///
	/// Called once a connection's handler task observes disconnect, so any
	/// pending requests addressed to it can be failed and its names become
	/// available for the next registrant.
	pub fn unregister_conn(&self, conn_id: ConnId) -> Vec<String> {
		let mut state = self.state.lock().unwrap();
		let Some(names) = state.names_by_conn.remove(&conn_id) else {
			return Vec::new();
		};
		for name in &names {
			if state.by_name.get(name).is_some_and(|e| e.conn_id == conn_id) {
				state.by_name.remove(name);
			}
		}
		names.into_iter().collect()
	}

	/// Lists every currently registered service name.
	#[must_use]
	pub fn service_names(&self) -> Vec<String> {
		self.state.lock().unwrap().by_name.keys().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sink() -> (ConnSink, mpsc::UnboundedReceiver<Frame>) {
		mpsc::unbounded_channel()
	}

	#[test]
	fn register_then_lookup_succeeds() {
		let registry = Registry::new();
		let (tx, _rx) = sink();
		registry.register("echo", ConnId(1), tx).unwrap();
		assert!(registry.lookup("echo").is_some());
	}

	#[test]
	fn register_from_different_connection_is_rejected() {
		let registry = Registry::new();
		let (tx1, _rx1) = sink();
		let (tx2, _rx2) = sink();
		registry.register("echo", ConnId(1), tx1).unwrap();
		let err = registry.register("echo", ConnId(2), tx2).unwrap_err();
		assert_eq!(err, RegistryError::AlreadyRegistered("echo".to_string()));
	}

	#[test]
	fn reregister_same_connection_is_idempotent() {
		let registry = Registry::new();
		let (tx, _rx) = sink();
		registry.register("echo", ConnId(1), tx.clone()).unwrap();
		registry.register("echo", ConnId(1), tx).unwrap();
		assert!(registry.lookup("echo").is_some());
	}

	#[test]
	fn unregister_removes_all_names_for_connection() {
		let registry = Registry::new();
		let (tx, _rx) = sink();
		registry.register("echo", ConnId(1), tx.clone()).unwrap();
		registry.register("mirror", ConnId(1), tx).unwrap();

		let removed = registry.unregister_conn(ConnId(1));
		assert_eq!(removed.len(), 2);
		assert!(registry.lookup("echo").is_none());
		assert!(registry.lookup("mirror").is_none());
	}

	#[test]
	fn unregister_does_not_evict_a_different_connections_reregistration() {
		let registry = Registry::new();
		let (tx1, _rx1) = sink();
		let (tx2, _rx2) = sink();
		registry.register("echo", ConnId(1), tx1).unwrap();
		registry.unregister_conn(ConnId(1));
		registry.register("echo", ConnId(2), tx2).unwrap();

		// Late cleanup for the first connection must not clobber the second.
		registry.unregister_conn(ConnId(1));
		assert!(registry.lookup("echo").is_some());
	}
}
