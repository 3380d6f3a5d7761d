use std::sync::Arc;
use std::time::Duration;

use relay_broker::{BrokerConfig, BrokerCore};
use relay_proto::Frame;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub struct TestBroker {
	pub addr: std::net::SocketAddr,
	pub core: Arc<BrokerCore>,
	shutdown: CancellationToken,
}

impl TestBroker {
	pub async fn start() -> Self {
		let mut config = BrokerConfig::default();
		config.addr = "127.0.0.1:0".to_string();
		config.request_deadline = Duration::from_millis(300);
		Self::start_with_config(config).await
	}

	pub async fn start_with_config(config: BrokerConfig) -> Self {
		let listener = TcpListener::bind(&config.addr).await.unwrap();
		let addr = listener.local_addr().unwrap();
		let core = Arc::new(BrokerCore::with_config(config));
		let shutdown = CancellationToken::new();

		let run_core = Arc::clone(&core);
		let run_shutdown = shutdown.clone();
		tokio::spawn(async move {
			relay_broker::run(listener, run_core, run_shutdown).await.unwrap();
		});

		Self { addr, core, shutdown }
	}

	pub async fn connect(&self) -> TestConn {
		let stream = TcpStream::connect(self.addr).await.unwrap();
		TestConn { stream }
	}

	pub fn shutdown(&self) {
		self.shutdown.cancel();
	}
}

pub struct TestConn {
	stream: TcpStream,
}

impl TestConn {
	pub async fn send(&mut self, frame: &Frame) {
		relay_proto::write_frame(&mut self.stream, frame, relay_proto::DEFAULT_MAX_MESSAGE_SIZE)
			.await
			.unwrap();
	}

	pub async fn recv(&mut self) -> Frame {
		relay_proto::read_frame(&mut self.stream, relay_proto::DEFAULT_MAX_MESSAGE_SIZE)
			.await
			.unwrap()
	}

	pub async fn try_recv_timeout(&mut self, timeout: Duration) -> Option<Frame> {
		tokio::time::timeout(timeout, self.recv()).await.ok()
	}

	/// Writes a bare `total_length` prefix declaring `len` bytes of body,
	/// without ever writing the body — enough to exercise the reader's
	/// oversize check, which fires before any body bytes are read.
	pub async fn write_raw_len(&mut self, len: u32) {
		use tokio::io::AsyncWriteExt;
		self.stream.write_all(&len.to_le_bytes()).await.unwrap();
		self.stream.flush().await.unwrap();
	}

	/// Reads one frame, surfacing the raw [`relay_proto::FrameError`]
	/// instead of panicking, so callers can assert the connection closed.
	pub async fn recv_raw(&mut self) -> Result<Frame, relay_proto::FrameError> {
		relay_proto::read_frame(&mut self.stream, relay_proto::DEFAULT_MAX_MESSAGE_SIZE).await
	}

	pub async fn register(&mut self, service: &str) {
		self.send(&Frame::register(service)).await;
		let ack = self.recv().await;
		assert!(!ack.is_error_response(), "registration failed: {ack:?}");
	}
}
