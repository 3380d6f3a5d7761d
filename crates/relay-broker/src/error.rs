//! Broker-level error taxonomy.

/// Errors from registry operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
	/// A different, still-live connection already owns this service name.
	#[error("service {0:?} is already registered by another connection")]
	AlreadyRegistered(String),
}

/// Why a routed request could not be delivered.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum RouteError {
	/// No connection is currently registered under the requested service name.
	#[error("Service '{0}' not found")]
	ServiceNotFound(String),
	/// The target connection's write side has gone away.
	#[error("service {0:?} is no longer reachable")]
	Unreachable(String),
	/// No response arrived before the request's deadline.
	#[error("request to {0:?} timed out")]
	Timeout(String),
	/// The request originated from a connection that never sent `Register`.
	#[error("connection must register a service name before sending requests")]
	NotRegistered,
}
