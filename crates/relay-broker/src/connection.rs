//! Per-connection state machine: reads frames, dispatches them, and owns
//! the connection's dedicated writer task.

use std::sync::Arc;
use std::time::Instant;

use relay_proto::{Frame, FrameKind};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::core::BrokerCore;
use crate::error::RouteError;
use crate::pending::PendingEntry;
use crate::registry::ConnId;

fn route_error_response(id: String, err: RouteError) -> Frame {
	Frame::response_err(id, err.to_string())
}

/// Drives one accepted connection until it disconnects or is kicked by the
/// liveness sweeper.
pub async fn handle_connection(core: Arc<BrokerCore>, stream: TcpStream) {
	let conn_id = core.next_conn_id();
	let peer = stream.peer_addr().ok();
	tracing::info!(conn_id = conn_id.0, ?peer, "connection accepted");

	let (mut read_half, write_half) = stream.into_split();
	let (sink, mut outbox) = mpsc::unbounded_channel::<Frame>();
	let max_message_size = core.config.max_message_size;

	let writer_task = tokio::spawn(async move {
		let mut write_half = write_half;
		while let Some(frame) = outbox.recv().await {
			if let Err(e) = relay_proto::write_frame(&mut write_half, &frame, max_message_size).await {
				tracing::warn!(error = %e, "write failed, closing connection");
				break;
			}
		}
	});

	let cancel = core.liveness.track(conn_id);
	let mut self_name: Option<String> = None;

	loop {
		tokio::select! {
			() = cancel.cancelled() => {
				tracing::info!(conn_id = conn_id.0, "connection kicked by liveness sweeper");
				break;
			}
			result = relay_proto::read_frame(&mut read_half, core.config.max_message_size) => {
				match result {
					Ok(frame) => {
						core.liveness.touch(conn_id);
						dispatch(&core, conn_id, &sink, &mut self_name, frame);
					}
					Err(e) => {
						if !e.is_disconnect() {
							tracing::warn!(error = %e, conn_id = conn_id.0, "frame read error, closing connection");
						}
						break;
					}
				}
			}
		}
	}

	cleanup(&core, conn_id);
	drop(sink);
	let _ = writer_task.await;
	tracing::info!(conn_id = conn_id.0, "connection closed");
}

fn dispatch(core: &Arc<BrokerCore>, conn_id: ConnId, sink: &mpsc::UnboundedSender<Frame>, self_name: &mut Option<String>, frame: Frame) {
	match frame.kind {
		FrameKind::Register => handle_register(core, conn_id, sink, self_name, frame),
		FrameKind::Request => handle_request(core, conn_id, self_name, sink, frame),
		FrameKind::Response => handle_response(core, frame),
		FrameKind::Heartbeat => {
			tracing::trace!(conn_id = conn_id.0, "heartbeat");
		}
	}
}

fn handle_register(core: &Arc<BrokerCore>, conn_id: ConnId, sink: &mpsc::UnboundedSender<Frame>, self_name: &mut Option<String>, frame: Frame) {
	let name = frame.service;
	match core.registry.register(&name, conn_id, sink.clone()) {
		Ok(()) => {
			tracing::info!(conn_id = conn_id.0, service = %name, "registered");
			*self_name = Some(name);
			let _ = sink.send(Frame::response_ok(frame.id, Vec::new()));
		}
		Err(e) => {
			let _ = sink.send(Frame::response_err(frame.id, e.to_string()));
		}
	}
}

fn handle_request(core: &Arc<BrokerCore>, conn_id: ConnId, self_name: &Option<String>, sink: &mpsc::UnboundedSender<Frame>, frame: Frame) {
	if self_name.is_none() {
		let _ = sink.send(route_error_response(frame.id, RouteError::NotRegistered));
		return;
	}

	let Some((target_conn, target_sink)) = core.registry.lookup_with_conn(&frame.service) else {
		let _ = sink.send(route_error_response(frame.id, RouteError::ServiceNotFound(frame.service.clone())));
		return;
	};

	let wire_id = core.next_wire_id();
	let deadline = Instant::now() + core.config.request_deadline;
	let entry = PendingEntry {
		origin_conn: conn_id,
		origin_sink: sink.clone(),
		target_conn,
		origin_id: frame.id.clone(),
		target_service: frame.service.clone(),
		deadline,
	};

	let mut forwarded = frame;
	let origin_id = forwarded.id;
	forwarded.id = wire_id.clone();
	let target_service = forwarded.service.clone();

	core.pending.insert(wire_id.clone(), entry);

	if target_sink.send(forwarded).is_err() {
		if let Some(entry) = core.pending.take(&wire_id) {
			let _ = entry.origin_sink.send(route_error_response(entry.origin_id, RouteError::Unreachable(target_service)));
		}
		return;
	}

	let core = Arc::clone(core);
	let deadline_dur = core.config.request_deadline;
	tokio::spawn(async move {
		tokio::time::sleep(deadline_dur).await;
		if let Some(entry) = core.pending.take(&wire_id) {
			let _ = entry.origin_sink.send(route_error_response(origin_id, RouteError::Timeout(entry.target_service)));
		}
	});
}

fn handle_response(core: &Arc<BrokerCore>, frame: Frame) {
	let Some(entry) = core.pending.take(&frame.id) else {
		tracing::warn!(id = %frame.id, "response for unknown or expired request");
		return;
	};

	let mut out = frame;
	out.id = entry.origin_id;
	let _ = entry.origin_sink.send(out);
}

fn cleanup(core: &Arc<BrokerCore>, conn_id: ConnId) {
	core.liveness.forget(conn_id);
	let names = core.registry.unregister_conn(conn_id);
	if !names.is_empty() {
		tracing::info!(conn_id = conn_id.0, ?names, "unregistered on disconnect");
	}

	for (_wire_id, entry) in core.pending.take_all_for_origin(conn_id) {
		let _ = entry.origin_sink.send(route_error_response(entry.origin_id, RouteError::Unreachable(entry.target_service.clone())));
	}

	for (_wire_id, entry) in core.pending.take_all_for_target(conn_id) {
		let _ = entry.origin_sink.send(route_error_response(entry.origin_id, RouteError::Unreachable(entry.target_service.clone())));
	}
}
