//! End-to-end: a real broker, a registered service, and a calling coordinator.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use relay_broker::{BrokerConfig, BrokerCore};
use relay_client::{CallError, ClientConfig, Coordinator, ServiceClient, ServiceHandler};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct EchoHandler;

impl ServiceHandler for EchoHandler {
	fn call(&self, method: String, data: Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, String>> + Send>> {
		Box::pin(async move {
			if method == "fail" {
				return Err("handler asked to fail".to_string());
			}
			Ok(data)
		})
	}
}

async fn start_broker() -> String {
	let mut config = BrokerConfig::default();
	config.addr = "127.0.0.1:0".to_string();
	config.request_deadline = Duration::from_millis(500);

	let listener = TcpListener::bind(&config.addr).await.unwrap();
	let addr = listener.local_addr().unwrap();
	let core = Arc::new(BrokerCore::with_config(config));
	let shutdown = CancellationToken::new();
	tokio::spawn(async move {
		relay_broker::run(listener, core, shutdown).await.unwrap();
	});
	addr.to_string()
}

#[tokio::test(flavor = "current_thread")]
async fn coordinator_calls_registered_service_and_gets_its_data_back() {
	let addr = start_broker().await;

	let _echo = ServiceClient::connect(&addr, "echo", Arc::new(EchoHandler), ClientConfig::default())
		.await
		.expect("service should register");

	let coordinator = Coordinator::connect(&addr, ClientConfig::default())
		.await
		.expect("coordinator should connect");

	let reply = coordinator.call("echo", "ping", b"hello".to_vec()).await.unwrap();
	assert_eq!(reply, b"hello");
}

#[tokio::test(flavor = "current_thread")]
async fn handler_error_surfaces_as_remote_error() {
	let addr = start_broker().await;

	let _echo = ServiceClient::connect(&addr, "echo", Arc::new(EchoHandler), ClientConfig::default())
		.await
		.unwrap();
	let coordinator = Coordinator::connect(&addr, ClientConfig::default()).await.unwrap();

	let err = coordinator.call("echo", "fail", Vec::new()).await.unwrap_err();
	match err {
		CallError::Remote { message } => assert_eq!(message, "handler asked to fail"),
		other => panic!("expected a remote error, got {other:?}"),
	}
}

#[tokio::test(flavor = "current_thread")]
async fn call_to_unregistered_service_fails_fast() {
	let addr = start_broker().await;
	let coordinator = Coordinator::connect(&addr, ClientConfig::default()).await.unwrap();

	let err = coordinator.call("nobody", "ping", Vec::new()).await.unwrap_err();
	match err {
		CallError::Remote { message } => assert_eq!(message, "Service 'nobody' not found"),
		other => panic!("expected a remote error, got {other:?}"),
	}
}

#[tokio::test(flavor = "current_thread")]
async fn duplicate_registration_is_rejected() {
	let addr = start_broker().await;

	let _first = ServiceClient::connect(&addr, "echo", Arc::new(EchoHandler), ClientConfig::default())
		.await
		.unwrap();

	let err = ServiceClient::connect(&addr, "echo", Arc::new(EchoHandler), ClientConfig::default())
		.await
		.unwrap_err();
	match err {
		CallError::Remote { message } => assert_eq!(message, "service \"echo\" is already registered by another connection"),
		other => panic!("expected a remote error, got {other:?}"),
	}
}
