//! Length-prefixed binary framing for [`Frame`](crate::Frame) values.
//!
//! Wire shape, all integers little-endian:
//!
//! ```text
//! u32  total_len           (byte length of everything that follows)
//! u8   kind
//! u32  id_len      + bytes
//! u32  service_len + bytes
//! u32  method_len  + bytes
//! u32  metadata_len + bytes of a UTF-8 JSON object whose values are
//!      strings (zero length is permitted and decodes to an empty map)
//! u32  data_len + bytes
//! ```
//!
//! `total_len` is checked against a caller-supplied ceiling before any body
//! bytes are read, so a malicious or corrupt peer cannot force an
//! unbounded allocation.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Frame, FrameError, FrameKind};

const LEN_PREFIX_BYTES: usize = 4;

/// Reads one [`Frame`] from `input`.
///
/// `max_message_size` bounds the declared total length; frames larger than
/// this are rejected before their body is read.
pub async fn read_frame<R: AsyncRead + Unpin>(
	input: &mut R,
	max_message_size: usize,
) -> Result<Frame, FrameError> {
	let total_len = read_u32(input).await? as usize;
	if total_len > max_message_size {
		tracing::warn!(len = total_len, max = max_message_size, "rejecting oversized frame before reading its body");
		return Err(FrameError::TooLarge {
			len: total_len,
			max: max_message_size,
		});
	}

	let mut body = vec![0u8; total_len];
	input.read_exact(&mut body).await?;

	decode_body(&body)
}

/// Writes `frame` to `output` and flushes it.
///
/// Returns [`FrameError::TooLarge`] if the encoded frame would exceed
/// `max_message_size` rather than writing a truncated or oversized message.
pub async fn write_frame<W: AsyncWrite + Unpin>(
	output: &mut W,
	frame: &Frame,
	max_message_size: usize,
) -> Result<(), FrameError> {
	let body = encode_body(frame)?;
	if body.len() > max_message_size {
		return Err(FrameError::TooLarge {
			len: body.len(),
			max: max_message_size,
		});
	}

	output.write_all(&(body.len() as u32).to_le_bytes()).await?;
	output.write_all(&body).await?;
	output.flush().await?;
	Ok(())
}

async fn read_u32<R: AsyncRead + Unpin>(input: &mut R) -> Result<u32, FrameError> {
	let mut buf = [0u8; LEN_PREFIX_BYTES];
	input.read_exact(&mut buf).await?;
	Ok(u32::from_le_bytes(buf))
}

fn encode_body(frame: &Frame) -> Result<Vec<u8>, FrameError> {
	let mut buf = Vec::new();
	buf.push(frame.kind as u8);
	put_string(&mut buf, &frame.id);
	put_string(&mut buf, &frame.service);
	put_string(&mut buf, &frame.method);

	let metadata_json = if frame.metadata.is_empty() { Vec::new() } else { serde_json::to_vec(&frame.metadata)? };
	buf.extend_from_slice(&(metadata_json.len() as u32).to_le_bytes());
	buf.extend_from_slice(&metadata_json);

	buf.extend_from_slice(&(frame.data.len() as u32).to_le_bytes());
	buf.extend_from_slice(&frame.data);
	Ok(buf)
}

fn decode_body(body: &[u8]) -> Result<Frame, FrameError> {
	let mut cur = Cursor { buf: body, pos: 0 };

	let kind = FrameKind::from_tag(cur.take_u8()?)?;
	let id = cur.take_string()?;
	let service = cur.take_string()?;
	let method = cur.take_string()?;

	let metadata_len = cur.take_u32()? as usize;
	let metadata_bytes = cur.take_bytes(metadata_len)?;
	let metadata: HashMap<String, String> = if metadata_bytes.is_empty() { HashMap::new() } else { serde_json::from_slice(metadata_bytes)? };

	let data_len = cur.take_u32()? as usize;
	let data = cur.take_bytes(data_len)?.to_vec();

	Ok(Frame {
		kind,
		id,
		service,
		method,
		metadata,
		data,
	})
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
	buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
	buf.extend_from_slice(s.as_bytes());
}

struct Cursor<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
		let end = self.pos.checked_add(n).ok_or(FrameError::Truncated)?;
		let slice = self.buf.get(self.pos..end).ok_or(FrameError::Truncated)?;
		self.pos = end;
		Ok(slice)
	}

	fn take_u8(&mut self) -> Result<u8, FrameError> {
		Ok(self.take_bytes(1)?[0])
	}

	fn take_u32(&mut self) -> Result<u32, FrameError> {
		let bytes: [u8; 4] = self.take_bytes(4)?.try_into().map_err(|_| FrameError::Truncated)?;
		Ok(u32::from_le_bytes(bytes))
	}

	fn take_string(&mut self) -> Result<String, FrameError> {
		let len = self.take_u32()? as usize;
		let bytes = self.take_bytes(len)?;
		String::from_utf8(bytes.to_vec()).map_err(|e| FrameError::InvalidUtf8(e.to_string()))
	}
}
