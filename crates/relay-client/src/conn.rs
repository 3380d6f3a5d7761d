//! One TCP connection to the broker: a writer task draining an outbound
//! queue, a reader task dispatching inbound frames, and a table of
//! in-flight calls awaiting their response.
//!
//! This is the coordinator half of the same request/response dance the
//! broker's own connection handler drives on the other end: callers never
//! block on a socket write, and a response is matched to its call purely
//! by the id the call chose, with no assumption that responses arrive in
//! the order calls were made.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use relay_proto::{Frame, FrameKind};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use crate::error::CallError;
use crate::handler::ServiceHandler;

struct Shared {
	write_tx: mpsc::UnboundedSender<Frame>,
	pending: Mutex<HashMap<String, oneshot::Sender<Result<Frame, CallError>>>>,
	next_id: AtomicU64,
}

impl Shared {
	fn fail_all_pending(&self) {
		let mut pending = self.pending.lock().unwrap();
		for (_, tx) in pending.drain() {
			let _ = tx.send(Err(CallError::ConnectionClosed));
		}
	}
}

/// A live connection to the broker.
#[derive(Clone)]
pub struct Connection {
	shared: Arc<Shared>,
}

impl Connection {
	/// Dials `addr` and starts the writer/reader tasks.
	///
	/// When `handler` is `Some`, inbound `Request` frames are dispatched to
	/// it and answered; with `None`, inbound requests are rejected with a
	/// `not_implemented` error (the shape a pure caller, like a gateway,
	/// needs).
	pub async fn connect(addr: &str, max_message_size: usize, handler: Option<Arc<dyn ServiceHandler>>) -> std::io::Result<Self> {
		let stream = TcpStream::connect(addr).await?;
		let (mut read_half, write_half) = stream.into_split();
		let (write_tx, mut outbox) = mpsc::unbounded_channel::<Frame>();

		let shared = Arc::new(Shared {
			write_tx,
			pending: Mutex::new(HashMap::new()),
			next_id: AtomicU64::new(1),
		});

		tokio::spawn(async move {
			let mut write_half = write_half;
			while let Some(frame) = outbox.recv().await {
				if let Err(e) = relay_proto::write_frame(&mut write_half, &frame, max_message_size).await {
					tracing::warn!(error = %e, "write to broker failed");
					break;
				}
			}
		});

		let reader_shared = Arc::clone(&shared);
		tokio::spawn(async move {
			loop {
				match relay_proto::read_frame(&mut read_half, max_message_size).await {
					Ok(frame) => handle_inbound(&reader_shared, &handler, frame),
					Err(e) => {
						if !e.is_disconnect() {
							tracing::warn!(error = %e, "read from broker failed");
						}
						break;
					}
				}
			}
			reader_shared.fail_all_pending();
		});

		Ok(Self { shared })
	}

	/// Allocates the next locally-unique frame id.
	#[must_use]
	pub fn next_id(&self) -> String {
		format!("c:{}", self.shared.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Queues `frame` for the writer task without waiting for a reply.
	pub fn send(&self, frame: Frame) {
		let _ = self.shared.write_tx.send(frame);
	}

	/// Sends `frame` (which must carry an id from [`Connection::next_id`])
	/// and awaits the correspondingly-idded response, failing with
	/// [`CallError::Timeout`] if none arrives within `deadline`.
	pub async fn call_raw(&self, frame: Frame, deadline: Duration) -> Result<Frame, CallError> {
		let id = frame.id.clone();
		let (tx, rx) = oneshot::channel();
		self.shared.pending.lock().unwrap().insert(id.clone(), tx);
		self.send(frame);

		match tokio::time::timeout(deadline, rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(CallError::ConnectionClosed),
			Err(_) => {
				self.shared.pending.lock().unwrap().remove(&id);
				Err(CallError::Timeout)
			}
		}
	}
}

fn handle_inbound(shared: &Arc<Shared>, handler: &Option<Arc<dyn ServiceHandler>>, frame: Frame) {
	match frame.kind {
		FrameKind::Response => {
			let waiter = shared.pending.lock().unwrap().remove(&frame.id);
			if let Some(tx) = waiter {
				let _ = tx.send(Ok(frame));
			} else {
				tracing::warn!(id = %frame.id, "response for unknown or already-resolved call");
			}
		}
		FrameKind::Request => {
			let id = frame.id.clone();
			let write_tx = shared.write_tx.clone();
			match handler.clone() {
				Some(handler) => {
					tokio::spawn(async move {
						let response = match handler.call(frame.method, frame.data).await {
							Ok(data) => Frame::response_ok(id, data),
							Err(message) => Frame::response_err(id, message),
						};
						let _ = write_tx.send(response);
					});
				}
				None => {
					let _ = write_tx.send(Frame::response_err(id, "this connection does not serve requests"));
				}
			}
		}
		FrameKind::Heartbeat | FrameKind::Register => {
			tracing::trace!(kind = ?frame.kind, "ignoring unexpected frame kind from broker");
		}
	}
}
