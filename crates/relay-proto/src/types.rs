//! Wire types exchanged between services, gateways, and the broker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// The kind of a [`Frame`] on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameKind {
	/// A call from one party to a named service/method.
	Request = 1,
	/// The reply to a previously seen [`FrameKind::Request`].
	Response = 2,
	/// Announces that this connection serves a given service name.
	Register = 3,
	/// A liveness ping sent by a connected service.
	Heartbeat = 4,
}

impl FrameKind {
	pub(crate) fn from_tag(tag: u8) -> Result<Self, super::FrameError> {
		match tag {
			1 => Ok(Self::Request),
			2 => Ok(Self::Response),
			3 => Ok(Self::Register),
			4 => Ok(Self::Heartbeat),
			other => Err(super::FrameError::UnknownKind(other)),
		}
	}
}

/// A single framed message on the wire.
///
/// `service`/`method` are meaningful for [`FrameKind::Request`] and
/// [`FrameKind::Register`]; `data` carries the caller-defined request or
/// response payload as opaque bytes (typically JSON, but the codec does not
/// interpret it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
	/// Discriminates the frame's purpose.
	pub kind: FrameKind,
	/// Correlates a `Response` with the `Request` that produced it.
	pub id: String,
	/// Target (or, for `Register`, own) service name.
	pub service: String,
	/// Method name within `service`. Empty for `Register`/`Heartbeat`.
	pub method: String,
	/// Free-form string metadata, e.g. `error="true"` on an error response.
	pub metadata: HashMap<String, String>,
	/// Opaque payload bytes.
	pub data: Vec<u8>,
}

impl Frame {
	/// Builds a `Request` frame.
	#[must_use]
	pub fn request(id: impl Into<String>, service: impl Into<String>, method: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			kind: FrameKind::Request,
			id: id.into(),
			service: service.into(),
			method: method.into(),
			metadata: HashMap::new(),
			data,
		}
	}

	/// Builds a `Response` frame carrying a successful result.
	#[must_use]
	pub fn response_ok(id: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			kind: FrameKind::Response,
			id: id.into(),
			service: String::new(),
			method: String::new(),
			metadata: HashMap::new(),
			data,
		}
	}

	/// Builds a `Response` frame carrying an error.
	///
	/// Sets `metadata.error="true"` and encodes `message` as the JSON body
	/// `{"error": message}`, the envelope any conforming client in any
	/// language can parse. There is no structured error code on the wire.
	#[must_use]
	pub fn response_err(id: impl Into<String>, message: impl Into<String>) -> Self {
		let mut metadata = HashMap::new();
		metadata.insert("error".to_string(), "true".to_string());
		let data = serde_json::to_vec(&json!({ "error": message.into() })).expect("a JSON object of one string field always serializes");
		Self {
			kind: FrameKind::Response,
			id: id.into(),
			service: String::new(),
			method: String::new(),
			metadata,
			data,
		}
	}

	/// Builds a `Register` frame.
	#[must_use]
	pub fn register(service: impl Into<String>) -> Self {
		Self {
			kind: FrameKind::Register,
			id: String::new(),
			service: service.into(),
			method: String::new(),
			metadata: HashMap::new(),
			data: Vec::new(),
		}
	}

	/// Builds a `Heartbeat` frame.
	#[must_use]
	pub fn heartbeat() -> Self {
		Self {
			kind: FrameKind::Heartbeat,
			id: String::new(),
			service: String::new(),
			method: String::new(),
			metadata: HashMap::new(),
			data: Vec::new(),
		}
	}

	/// `true` if this response frame's metadata marks it as an error envelope.
	#[must_use]
	pub fn is_error_response(&self) -> bool {
		self.kind == FrameKind::Response && self.metadata.get("error").is_some_and(|v| v == "true")
	}
}
