//! LIST handler: snapshot the shared directory and return it.

use std::sync::Arc;

use crate::node::NodeContext;
use crate::protocol::Message;
use crate::tree::build_file_tree;

pub async fn handle(ctx: &Arc<NodeContext>) -> Message {
	let dir = ctx.shared_dir.clone();
	// BuildFileTree does blocking I/O; keep it off the async executor
	// the way every other disk-bound call in this crate does.
	let tree = tokio::task::spawn_blocking(move || build_file_tree(&dir))
		.await
		.unwrap_or_else(|_| crate::types::FileNode::empty_dir("shared", 0));
	Message::list_response(ctx.self_addr.clone(), tree)
}
