//! Service-side facade: register a name with the broker and answer calls.

use std::sync::Arc;
use std::time::Duration;

use relay_proto::Frame;

use crate::config::ClientConfig;
use crate::conn::Connection;
use crate::error::CallError;
use crate::handler::ServiceHandler;

/// A connection registered under a service name, serving inbound requests
/// through a [`ServiceHandler`] and sending periodic heartbeats.
///
/// May also call other services over the same connection via
/// [`ServiceClient::call`], since one socket to the broker serves both
/// directions.
pub struct ServiceClient {
	conn: Connection,
	name: String,
	default_deadline: Duration,
}

impl ServiceClient {
	/// Connects to `addr`, registers as `name`, and starts a background
	/// heartbeat task. Inbound requests are dispatched to `handler`.
	pub async fn connect(addr: &str, name: &str, handler: Arc<dyn ServiceHandler>, config: ClientConfig) -> Result<Self, CallError> {
		let conn = Connection::connect(addr, config.max_message_size, Some(handler)).await?;

		let mut register_frame = Frame::register(name);
		register_frame.id = conn.next_id();
		let ack = conn.call_raw(register_frame, config.request_deadline).await?;
		if ack.is_error_response() {
			return Err(CallError::remote(&ack.data));
		}

		let heartbeat_conn = conn.clone();
		let heartbeat_interval = config.heartbeat_interval;
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(heartbeat_interval);
			ticker.tick().await; // first tick fires immediately
			loop {
				ticker.tick().await;
				heartbeat_conn.send(Frame::heartbeat());
			}
		});

		Ok(Self {
			conn,
			name: name.to_string(),
			default_deadline: config.request_deadline,
		})
	}

	/// The service name this client registered under.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Calls `method` on `service`, using the configured default deadline.
	///
	/// A registered service is free to call other services over the same
	/// connection it uses to receive requests.
	pub async fn call(&self, service: &str, method: &str, data: Vec<u8>) -> Result<Vec<u8>, CallError> {
		let id = self.conn.next_id();
		let frame = Frame::request(id, service, method, data);
		let response = self.conn.call_raw(frame, self.default_deadline).await?;

		if response.is_error_response() {
			return Err(CallError::remote(&response.data));
		}

		Ok(response.data)
	}
}
