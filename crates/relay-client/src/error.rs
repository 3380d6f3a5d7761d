//! Errors a caller can observe from the async coordinator.

/// Everything that can go wrong making or serving a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
	/// No response arrived before the deadline.
	#[error("call timed out")]
	Timeout,
	/// The connection to the broker closed before a response arrived.
	#[error("connection to broker closed")]
	ConnectionClosed,
	/// The broker or the target service returned an error response.
	#[error("remote error: {message}")]
	Remote {
		/// The `error` field of the response's JSON body.
		message: String,
	},
	/// The connection to the broker could not be established or failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl CallError {
	/// Builds a [`CallError::Remote`] from an error response's JSON body,
	/// `{"error": "<message>"}`. Falls back to an empty message if the body
	/// doesn't parse — the caller already knows `is_error_response()` was
	/// `true`, this just extracts the human-readable text.
	#[must_use]
	pub(crate) fn remote(data: &[u8]) -> Self {
		let message = serde_json::from_slice::<serde_json::Value>(data)
			.ok()
			.and_then(|body| body.get("error").and_then(|v| v.as_str()).map(str::to_string))
			.unwrap_or_default();
		Self::Remote { message }
	}
}
