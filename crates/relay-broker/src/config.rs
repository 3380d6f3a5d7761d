//! Broker configuration.

use std::time::Duration;

/// Runtime configuration for a [`crate::BrokerCore`], read by [`crate::serve`]/[`crate::run`].
///
/// Defaults match a development deployment: a generous message size, a
/// heartbeat every 30s, and a 5 minute expiry for connections that stop
/// sending them.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
	/// Address the broker listens on.
	pub addr: String,
	/// Ceiling on a single frame's declared body length, in bytes.
	pub max_message_size: usize,
	/// Expected interval between client heartbeats.
	pub heartbeat_interval: Duration,
	/// A connection that has not been heard from (heartbeat or any frame)
	/// for this long is considered dead and evicted.
	pub heartbeat_expiry: Duration,
	/// How often the liveness sweeper scans for expired connections.
	pub sweep_interval: Duration,
	/// Default deadline for a routed request awaiting a response.
	pub request_deadline: Duration,
}

impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			addr: "127.0.0.1:9999".to_string(),
			max_message_size: relay_proto::DEFAULT_MAX_MESSAGE_SIZE,
			heartbeat_interval: Duration::from_secs(30),
			heartbeat_expiry: Duration::from_secs(5 * 60),
			sweep_interval: Duration::from_secs(10),
			request_deadline: Duration::from_secs(30),
		}
	}
}

/// Raw, optional fields as loaded from a TOML config file under an `[ipc]`
/// table. Any field left unset falls back to [`BrokerConfig::default`].
#[derive(Debug, Default, serde::Deserialize)]
pub struct BrokerConfigFile {
	/// Top-level `[ipc]` table.
	#[serde(default)]
	pub ipc: IpcSection,
}

/// The `[ipc]` section of a broker config file.
#[derive(Debug, Default, serde::Deserialize)]
pub struct IpcSection {
	/// See [`BrokerConfig::addr`].
	pub addr: Option<String>,
	/// See [`BrokerConfig::max_message_size`].
	pub max_message_size: Option<usize>,
	/// Seconds. See [`BrokerConfig::heartbeat_interval`].
	pub heartbeat_interval_secs: Option<u64>,
	/// Seconds. See [`BrokerConfig::heartbeat_expiry`].
	pub heartbeat_expiry_secs: Option<u64>,
	/// Seconds. See [`BrokerConfig::sweep_interval`].
	pub sweep_interval_secs: Option<u64>,
	/// Seconds. See [`BrokerConfig::request_deadline`].
	pub request_deadline_secs: Option<u64>,
}

impl BrokerConfig {
	/// Merges an optional, partially-populated config file on top of
	/// [`BrokerConfig::default`].
	#[must_use]
	pub fn from_file(file: BrokerConfigFile) -> Self {
		let defaults = Self::default();
		Self {
			addr: file.ipc.addr.unwrap_or(defaults.addr),
			max_message_size: file.ipc.max_message_size.unwrap_or(defaults.max_message_size),
			heartbeat_interval: file
				.ipc
				.heartbeat_interval_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.heartbeat_interval),
			heartbeat_expiry: file
				.ipc
				.heartbeat_expiry_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.heartbeat_expiry),
			sweep_interval: file
				.ipc
				.sweep_interval_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.sweep_interval),
			request_deadline: file
				.ipc
				.request_deadline_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.request_deadline),
		}
	}
}
