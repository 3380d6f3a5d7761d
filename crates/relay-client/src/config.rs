//! Client-side configuration shared by [`crate::Coordinator`] and
//! [`crate::ServiceClient`].

use std::time::Duration;

/// Tunables for a connection to the broker.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Ceiling on a single frame's declared body length, in bytes.
	pub max_message_size: usize,
	/// Default deadline for [`crate::Coordinator::call`].
	pub request_deadline: Duration,
	/// How often [`crate::ServiceClient`] sends a heartbeat frame.
	pub heartbeat_interval: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			max_message_size: relay_proto::DEFAULT_MAX_MESSAGE_SIZE,
			request_deadline: Duration::from_secs(30),
			heartbeat_interval: Duration::from_secs(30),
		}
	}
}
