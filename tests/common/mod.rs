use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use meshsync::node::{Node, NodeContext};
use meshsync::oplog::OperationLog;
use meshsync::state::SharedState;
use meshsync::types::PeerEndpoint;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Reserve an ephemeral TCP port and immediately release it. Useful
/// for handing a peer an address that is guaranteed to refuse
/// connections until a node actually binds to it later.
pub fn reserve_addr() -> String {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
	drop(listener);
	format!("127.0.0.1:{}", port)
}

pub struct Harness {
	pub ctx: Arc<NodeContext>,
	pub addr: String,
	pub shared_dir: PathBuf,
	_handle: JoinHandle<()>,
}

/// Start a node bound to an OS-assigned port, with short worker
/// intervals suited to fast tests.
pub async fn start_node(id: u32, shared_dir: PathBuf, state_dir: PathBuf, peers: Vec<PeerEndpoint>) -> Harness {
	start_node_at(id, "127.0.0.1:0", shared_dir, state_dir, peers).await
}

/// Start a node bound to a specific address (used to simulate a peer
/// "coming back up" at a previously-reserved, previously-refusing
/// address).
pub async fn start_node_at(id: u32, addr: &str, shared_dir: PathBuf, state_dir: PathBuf, peers: Vec<PeerEndpoint>) -> Harness {
	let listener = TcpListener::bind(addr).await.unwrap();
	let bound_addr = listener.local_addr().unwrap().to_string();

	std::fs::create_dir_all(&state_dir).unwrap();
	let state = SharedState::load(state_dir.join("state.json")).unwrap();
	let oplog = OperationLog::new(state_dir.join("operations.log"));

	let ctx = NodeContext { id, self_addr: bound_addr.clone(), shared_dir: shared_dir.clone(), state, oplog, peers };
	let node = Node::new(ctx, Duration::from_millis(150), Duration::from_millis(150));
	let ctx_handle = node.context();

	let handle = tokio::spawn(async move {
		let _ = node.run(listener).await;
	});

	// give the accept loop a moment to actually start looping
	tokio::time::sleep(Duration::from_millis(20)).await;

	Harness { ctx: ctx_handle, addr: bound_addr, shared_dir, _handle: handle }
}

pub fn peer_of(harness: &Harness, id: u32) -> PeerEndpoint {
	let (ip, port) = harness.addr.split_once(':').unwrap();
	PeerEndpoint { id, ip: ip.to_string(), port: port.to_string() }
}
