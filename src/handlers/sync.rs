//! SYNC handler: log-replay mode. Not the reconciliation algorithm,
//! which pulls files via LIST + REQUEST_FILE and lives in
//! `reconcile.rs`. This SYNC streams the operation log itself, for a
//! caller rebuilding a causal history rather than a directory.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::MeshError;
use crate::node::NodeContext;
use crate::protocol::{write_ndjson_and_close, Message};

pub async fn handle(ctx: &Arc<NodeContext>, msg: &Message, stream: &mut TcpStream) -> Result<(), MeshError> {
	let since = msg.timestamp;
	let ops = ctx.oplog.load_since(since)?;
	tracing::debug!(since, count = ops.len(), peer = %msg.from, "replaying operation log");
	write_ndjson_and_close(stream, &ops).await
}
