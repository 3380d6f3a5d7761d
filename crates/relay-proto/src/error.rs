//! Errors produced by frame encoding and decoding.

/// Everything that can go wrong turning bytes into a [`crate::Frame`] or back.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
	/// Declared frame length exceeded the configured ceiling.
	#[error("frame of {len} bytes exceeds the {max} byte limit")]
	TooLarge {
		/// The declared (or encoded) length that was rejected.
		len: usize,
		/// The ceiling it was checked against.
		max: usize,
	},
	/// The body ended before a field's declared length was satisfied.
	#[error("frame body truncated")]
	Truncated,
	/// A string field's bytes were not valid UTF-8.
	#[error("invalid utf-8 in frame field: {0}")]
	InvalidUtf8(String),
	/// The tag byte did not match any [`crate::FrameKind`] variant.
	#[error("unknown frame kind tag: {0}")]
	UnknownKind(u8),
	/// The metadata bytes were not a valid UTF-8 JSON object of strings.
	#[error("invalid metadata json: {0}")]
	InvalidMetadata(#[from] serde_json::Error),
	/// The underlying transport failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl FrameError {
	/// `true` if this error reflects the peer closing or resetting the
	/// connection rather than a protocol violation.
	#[must_use]
	pub fn is_disconnect(&self) -> bool {
		match self {
			Self::Io(e) => matches!(
				e.kind(),
				std::io::ErrorKind::UnexpectedEof
					| std::io::ErrorKind::BrokenPipe
					| std::io::ErrorKind::ConnectionReset
			),
			_ => false,
		}
	}
}
