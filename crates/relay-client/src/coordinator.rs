//! Caller-side facade: connect to the broker and make routed calls.

use std::time::Duration;

use relay_proto::Frame;

use crate::config::ClientConfig;
use crate::conn::Connection;
use crate::error::CallError;

/// A connection to the broker used purely to call other services.
///
/// Used by gateway adapters and by any service that needs to call a peer
/// but does not itself answer inbound requests. A [`crate::ServiceClient`]
/// may also call other services over its own connection; `Coordinator` is
/// for callers that have nothing to register.
pub struct Coordinator {
	conn: Connection,
	default_deadline: Duration,
}

impl Coordinator {
	/// Connects to the broker at `addr`.
	pub async fn connect(addr: &str, config: ClientConfig) -> Result<Self, CallError> {
		let conn = Connection::connect(addr, config.max_message_size, None).await?;
		Ok(Self {
			conn,
			default_deadline: config.request_deadline,
		})
	}

	/// Calls `method` on `service`, using the configured default deadline.
	pub async fn call(&self, service: &str, method: &str, data: Vec<u8>) -> Result<Vec<u8>, CallError> {
		self.call_with_deadline(service, method, data, self.default_deadline).await
	}

	/// Calls `method` on `service`, overriding the default deadline.
	pub async fn call_with_deadline(&self, service: &str, method: &str, data: Vec<u8>, deadline: Duration) -> Result<Vec<u8>, CallError> {
		let id = self.conn.next_id();
		let frame = Frame::request(id, service, method, data);
		let response = self.conn.call_raw(frame, deadline).await?;

		if response.is_error_response() {
			return Err(CallError::remote(&response.data));
		}

		Ok(response.data)
	}
}
