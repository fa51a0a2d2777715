//! The node runtime: owns the listener, the shared context every
//! handler and worker needs, and the accept loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::error::MeshError;
use crate::handlers;
use crate::monitor;
use crate::oplog::OperationLog;
use crate::retry;
use crate::state::SharedState;
use crate::types::PeerEndpoint;

/// Everything a handler or background worker needs to act on behalf
/// of this node. Cheap to clone (wraps an `Arc` internally via
/// `Node::run`'s `Arc<NodeContext>`).
pub struct NodeContext {
	pub id: u32,
	pub self_addr: String,
	pub shared_dir: PathBuf,
	pub state: SharedState,
	pub oplog: OperationLog,
	pub peers: Vec<PeerEndpoint>,
}

impl NodeContext {
	/// Every configured peer except this node itself, identified by
	/// `(ip, port)`. Used by PeerMonitor and DELETE broadcast to skip
	/// sending to self.
	pub fn other_peers(&self) -> impl Iterator<Item = &PeerEndpoint> {
		let self_addr = self.self_addr.clone();
		self.peers.iter().filter(move |p| p.address() != self_addr)
	}
}

pub struct Node {
	ctx: Arc<NodeContext>,
	retry_interval: Duration,
	monitor_interval: Duration,
}

impl Node {
	pub fn new(ctx: NodeContext, retry_interval: Duration, monitor_interval: Duration) -> Self {
		Node { ctx: Arc::new(ctx), retry_interval, monitor_interval }
	}

	pub fn context(&self) -> Arc<NodeContext> {
		self.ctx.clone()
	}

	/// Bind the listener, spawn the background workers, and accept
	/// connections forever. There is no cooperative shutdown; the
	/// process exits abruptly when killed.
	pub async fn run(self, listener: TcpListener) -> Result<(), MeshError> {
		let retry_ctx = self.ctx.clone();
		let retry_interval = self.retry_interval;
		tokio::spawn(async move {
			retry::run_retry_worker(retry_ctx, retry_interval).await;
		});

		let monitor_ctx = self.ctx.clone();
		let monitor_interval = self.monitor_interval;
		tokio::spawn(async move {
			monitor::run_peer_monitor(monitor_ctx, monitor_interval).await;
		});

		loop {
			let (stream, peer_addr) = listener.accept().await?;
			let conn_ctx = self.ctx.clone();
			tokio::spawn(async move {
				handle_connection(conn_ctx, stream, peer_addr.to_string()).await;
			});
		}
	}
}

async fn handle_connection(ctx: Arc<NodeContext>, stream: TcpStream, peer_addr: String) {
	if let Err(e) = handlers::dispatch(ctx, stream).await {
		tracing::warn!(peer = %peer_addr, error = %e, "connection handling failed");
	}
}
