//! End-to-end routing scenarios driven over real TCP connections.

mod common;

use std::time::Duration;

use common::TestBroker;
use relay_proto::{Frame, FrameKind};

#[tokio::test(flavor = "current_thread")]
async fn register_and_route_request_succeeds() {
	let broker = TestBroker::start().await;

	let mut echo = broker.connect().await;
	echo.register("echo").await;

	let mut caller = broker.connect().await;
	caller.register("caller").await;
	caller.send(&Frame::request("1", "echo", "ping", b"hi".to_vec())).await;

	let inbound = echo.recv().await;
	assert_eq!(inbound.kind, FrameKind::Request);
	assert_eq!(inbound.service, "echo");
	assert_eq!(inbound.method, "ping");
	assert_ne!(inbound.id, "1", "broker must rewrite the wire id");

	echo.send(&Frame::response_ok(inbound.id, b"hi back".to_vec())).await;

	let resp = caller.recv().await;
	assert_eq!(resp.id, "1", "caller must see its own id restored");
	assert_eq!(resp.data, b"hi back");
	assert!(!resp.is_error_response());
}

#[tokio::test(flavor = "current_thread")]
async fn request_to_unknown_service_returns_error() {
	let broker = TestBroker::start().await;

	let mut caller = broker.connect().await;
	caller.register("caller").await;
	caller.send(&Frame::request("1", "nobody", "ping", Vec::new())).await;

	let resp = caller.recv().await;
	assert!(resp.is_error_response());
	let body: serde_json::Value = serde_json::from_slice(&resp.data).unwrap();
	assert_eq!(body, serde_json::json!({ "error": "Service 'nobody' not found" }));
}

#[tokio::test(flavor = "current_thread")]
async fn request_before_register_is_rejected() {
	let broker = TestBroker::start().await;

	let mut caller = broker.connect().await;
	caller.send(&Frame::request("1", "echo", "ping", Vec::new())).await;

	let resp = caller.recv().await;
	assert!(resp.is_error_response());
	let body: serde_json::Value = serde_json::from_slice(&resp.data).unwrap();
	assert_eq!(body["error"], "connection must register a service name before sending requests");
}

#[tokio::test(flavor = "current_thread")]
async fn duplicate_registration_from_different_connection_is_rejected() {
	let broker = TestBroker::start().await;

	let mut first = broker.connect().await;
	first.register("echo").await;

	let mut second = broker.connect().await;
	second.send(&Frame::register("echo")).await;
	let resp = second.recv().await;
	assert!(resp.is_error_response());
	let body: serde_json::Value = serde_json::from_slice(&resp.data).unwrap();
	assert_eq!(body["error"], "service \"echo\" is already registered by another connection");
}

#[tokio::test(flavor = "current_thread")]
async fn target_disconnect_before_response_fails_pending_request() {
	let broker = TestBroker::start().await;

	let echo = broker.connect().await;
	let mut echo = echo;
	echo.register("echo").await;

	let mut caller = broker.connect().await;
	caller.register("caller").await;
	caller.send(&Frame::request("1", "echo", "ping", Vec::new())).await;

	let inbound = echo.recv().await;
	drop(echo);

	let resp = caller.try_recv_timeout(Duration::from_secs(2)).await.expect("expected an error response");
	assert_eq!(resp.id, "1");
	assert!(resp.is_error_response());
	let body: serde_json::Value = serde_json::from_slice(&resp.data).unwrap();
	assert_eq!(body["error"], "service \"echo\" is no longer reachable");
	let _ = inbound;
}

#[tokio::test(flavor = "current_thread")]
async fn request_times_out_when_target_never_responds() {
	let broker = TestBroker::start().await;

	let mut echo = broker.connect().await;
	echo.register("echo").await;

	let mut caller = broker.connect().await;
	caller.register("caller").await;
	caller.send(&Frame::request("1", "echo", "ping", Vec::new())).await;

	let _inbound = echo.recv().await;
	// Never reply; the broker's per-request deadline (300ms in tests) fires.
	let resp = caller.try_recv_timeout(Duration::from_secs(2)).await.expect("expected a timeout response");
	assert_eq!(resp.id, "1");
	assert!(resp.is_error_response());
	let body: serde_json::Value = serde_json::from_slice(&resp.data).unwrap();
	assert_eq!(body["error"], "request to \"echo\" timed out");
}

#[tokio::test(flavor = "current_thread")]
async fn disconnecting_origin_does_not_panic_target() {
	let broker = TestBroker::start().await;

	let mut echo = broker.connect().await;
	echo.register("echo").await;

	let mut caller = broker.connect().await;
	caller.register("caller").await;
	caller.send(&Frame::request("1", "echo", "ping", Vec::new())).await;

	let inbound = echo.recv().await;
	drop(caller);

	// The target should still be able to reply without the broker panicking
	// even though nobody will read the response.
	echo.send(&Frame::response_ok(inbound.id, Vec::new())).await;
	broker.shutdown();
}
