//! Connection lifecycle scenarios: oversized frames and heartbeat liveness.

mod common;

use std::time::Duration;

use common::TestBroker;
use relay_broker::BrokerConfig;
use relay_proto::Frame;

#[tokio::test(flavor = "current_thread")]
async fn oversized_frame_closes_only_the_offending_connection() {
	let mut config = BrokerConfig::default();
	config.addr = "127.0.0.1:0".to_string();
	config.max_message_size = 64;
	let broker = TestBroker::start_with_config(config).await;

	let mut bystander = broker.connect().await;
	bystander.register("bystander").await;

	let mut offender = broker.connect().await;
	offender.write_raw_len(65).await;

	// The offending connection is closed without a response; the broker keeps
	// serving everyone else.
	let closed = tokio::time::timeout(Duration::from_secs(2), offender.recv_raw()).await;
	assert!(closed.is_err() || closed.unwrap().is_err(), "offending connection should be closed, not answered");

	bystander.send(&Frame::heartbeat()).await;
	assert!(broker.core.registry.lookup("bystander").is_some(), "unrelated connection must remain registered");
}

#[tokio::test(flavor = "current_thread")]
async fn heartbeats_keep_a_connection_registered_past_its_first_expiry_window() {
	let mut config = BrokerConfig::default();
	config.addr = "127.0.0.1:0".to_string();
	config.heartbeat_expiry = Duration::from_millis(150);
	config.sweep_interval = Duration::from_millis(20);
	let broker = TestBroker::start_with_config(config).await;

	let mut echo = broker.connect().await;
	echo.register("echo").await;

	for _ in 0..4 {
		tokio::time::sleep(Duration::from_millis(50)).await;
		echo.send(&Frame::heartbeat()).await;
	}

	assert!(broker.core.registry.lookup("echo").is_some(), "heartbeats must prevent reaping");
}

#[tokio::test(flavor = "current_thread")]
async fn silence_past_expiry_reaps_the_connection_and_clears_its_registration() {
	let mut config = BrokerConfig::default();
	config.addr = "127.0.0.1:0".to_string();
	config.heartbeat_expiry = Duration::from_millis(100);
	config.sweep_interval = Duration::from_millis(20);
	let broker = TestBroker::start_with_config(config).await;

	let mut echo = broker.connect().await;
	echo.register("echo").await;

	// No further traffic; wait past expiry + a couple of sweep ticks.
	tokio::time::sleep(Duration::from_millis(300)).await;

	assert!(broker.core.registry.lookup("echo").is_none(), "a silent connection must be reaped and unregistered");

	// The connection really is closed, not merely unregistered.
	let result = echo.try_recv_timeout(Duration::from_millis(200)).await;
	assert!(result.is_none(), "reaped connection should produce EOF, not a frame");
}
