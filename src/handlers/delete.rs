//! DELETE handler: remove a file from the shared directory. A missing
//! file is not an error; the operation is still journaled, both when
//! received from a peer and when triggered locally.

use std::sync::Arc;

use crate::node::NodeContext;
use crate::protocol::{dial_and_send, Message};
use crate::time::now_secs;
use crate::types::{OpKind, Operation};
use crate::validation::resolve_in_shared;

async fn remove_if_present(path: &std::path::Path) -> std::io::Result<()> {
	match tokio::fs::remove_file(path).await {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(e) => Err(e),
	}
}

/// Server-side handler for an inbound DELETE, whether it originated
/// from another peer's broadcast or (via `delete_local_and_broadcast`)
/// from our own CLI.
pub async fn handle(ctx: &Arc<NodeContext>, msg: &Message) {
	let file_name = msg.file_name.clone().unwrap_or_default();
	let path = resolve_in_shared(&ctx.shared_dir, &file_name);

	if let Err(e) = remove_if_present(&path).await {
		tracing::warn!(file = %file_name, error = %e, "failed to delete file");
	}

	if let Err(e) = ctx.oplog.append(&Operation::new(OpKind::Delete, file_name.clone(), msg.from.clone(), now_secs())) {
		tracing::warn!(error = %e, "failed to append DELETE op");
	}
}

/// User-initiated delete: remove locally, journal it, then broadcast
/// DELETE to every other configured peer in parallel. A broadcast
/// failure to one peer is logged but never fails the local delete.
/// The peer will pick the deletion up on its own operation log via a
/// future SYNC, or not at all; there are no tombstones.
pub async fn delete_local_and_broadcast(ctx: &Arc<NodeContext>, file_name: &str) -> Result<(), crate::error::MeshError> {
	let path = resolve_in_shared(&ctx.shared_dir, file_name);
	remove_if_present(&path).await?;

	let now = now_secs();
	ctx.oplog.append(&Operation::new(OpKind::Delete, file_name, ctx.self_addr.clone(), now))?;

	let msg = Message::delete(ctx.self_addr.clone(), file_name, now);
	let mut handles = Vec::new();
	for peer in ctx.other_peers() {
		let addr = peer.address();
		let msg = msg.clone();
		handles.push(tokio::spawn(async move {
			if let Err(e) = dial_and_send(&addr, &msg).await {
				tracing::warn!(peer = %addr, error = %e, "DELETE broadcast failed");
			}
		}));
	}
	for h in handles {
		let _ = h.await;
	}

	Ok(())
}
