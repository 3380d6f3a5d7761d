//! Trait implemented by services that answer inbound requests.

use std::future::Future;
use std::pin::Pin;

/// Answers one routed `method` call with its raw `data` payload.
///
/// Implementations run inside a spawned task per inbound request, so a slow
/// handler never blocks the connection's read loop from noticing the next
/// frame (in particular, its own heartbeats keep flowing).
pub trait ServiceHandler: Send + Sync + 'static {
	/// Handles one call, returning the raw response payload or an error
	/// message to send back instead.
	fn call(&self, method: String, data: Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, String>> + Send>>;
}
