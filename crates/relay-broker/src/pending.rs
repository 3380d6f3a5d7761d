//! Pending-request table: tracks routed requests awaiting a response.
//!
//! Caller-supplied frame ids are only unique within the caller's own
//! connection, so the broker never uses them as table keys directly.
//! [`PendingTable::insert`] is always called with an id this table's owner
//! allocated itself (see [`crate::core::BrokerCore::next_wire_id`]),
//! mirroring how a routed request's wire id and its originating id are
//! distinct.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::registry::{ConnId, ConnSink};

/// Where a pending request's response must be delivered.
pub struct PendingEntry {
	/// The connection that issued the request, used to fail its requests in
	/// bulk on disconnect without scanning for a matching sink.
	pub origin_conn: ConnId,
	/// Channel back to the origin connection's writer task.
	pub origin_sink: ConnSink,
	/// The connection the request was forwarded to, used to fail requests
	/// awaiting a reply from a target that has since disconnected.
	pub target_conn: ConnId,
	/// The id the origin used on its own `Request` frame, restored onto the
	/// response before it is handed back.
	pub origin_id: String,
	/// The service name the request was routed to, for diagnostics.
	pub target_service: String,
	/// When this entry should be treated as timed out.
	pub deadline: Instant,
}

/// Tracks in-flight requests keyed by the broker's own wire id.
#[derive(Default)]
pub struct PendingTable {
	entries: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingTable {
	/// Creates an empty table.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a newly routed request under `wire_id`.
	pub fn insert(&self, wire_id: String, entry: PendingEntry) {
		self.entries.lock().unwrap().insert(wire_id, entry);
	}

	/// Removes and returns the entry for `wire_id`, if still pending.
	///
	/// Used both when a response arrives (the normal path) and when a
	/// connection disconnects (to fail its outstanding requests).
	#[must_use]
	pub fn take(&self, wire_id: &str) -> Option<PendingEntry> {
		self.entries.lock().unwrap().remove(wire_id)
	}

	/// Removes and returns every entry whose origin is `conn_id`.
	///
	/// Called when a connection disconnects, so requests it issued are not
	/// left dangling forever waiting for a deadline that will eventually
	/// fire anyway, but are failed immediately instead.
	#[must_use]
	pub fn take_all_for_origin(&self, conn_id: ConnId) -> Vec<(String, PendingEntry)> {
		let mut entries = self.entries.lock().unwrap();
		let expired_keys: Vec<String> = entries
			.iter()
			.filter(|(_, e)| e.origin_conn == conn_id)
			.map(|(k, _)| k.clone())
			.collect();
		expired_keys.into_iter().filter_map(|k| entries.remove(&k).map(|e| (k, e))).collect()
	}

	/// Removes and returns every entry whose target is `conn_id`.
	///
	/// Called when a connection disconnects, so requests forwarded to it are
	/// failed immediately rather than left to time out.
	#[must_use]
	pub fn take_all_for_target(&self, conn_id: ConnId) -> Vec<(String, PendingEntry)> {
		let mut entries = self.entries.lock().unwrap();
		let matching_keys: Vec<String> = entries
			.iter()
			.filter(|(_, e)| e.target_conn == conn_id)
			.map(|(k, _)| k.clone())
			.collect();
		matching_keys.into_iter().filter_map(|k| entries.remove(&k).map(|e| (k, e))).collect()
	}

	/// Removes and returns every entry whose deadline is at or before `now`.
	///
	/// Intended to be driven by the broker's periodic sweeper.
	#[must_use]
	pub fn reap_expired(&self, now: Instant) -> Vec<(String, PendingEntry)> {
		let mut entries = self.entries.lock().unwrap();
		let expired_keys: Vec<String> = entries
			.iter()
			.filter(|(_, e)| e.deadline <= now)
			.map(|(k, _)| k.clone())
			.collect();
		expired_keys.into_iter().filter_map(|k| entries.remove(&k).map(|e| (k, e))).collect()
	}

	/// Number of currently pending requests. Used by tests and diagnostics.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.lock().unwrap().len()
	}

	/// `true` if no requests are pending.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
