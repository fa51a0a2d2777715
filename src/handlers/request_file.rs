//! REQUEST_FILE handler: serve one file's bytes, or an ERROR if it
//! can't be opened. A failed open is not journaled; `OpKind` has no
//! slot for it, so the ERROR response is the only record.

use std::sync::Arc;

use crate::node::NodeContext;
use crate::protocol::Message;
use crate::time::now_secs;
use crate::types::{OpKind, Operation};
use crate::validation::resolve_in_shared;

pub async fn handle(ctx: &Arc<NodeContext>, msg: &Message) -> Message {
	let file_name = msg.file_name.clone().unwrap_or_default();
	let path = resolve_in_shared(&ctx.shared_dir, &file_name);

	match tokio::fs::read(&path).await {
		Ok(data) => {
			let now = now_secs();
			if let Err(e) = ctx.oplog.append(&Operation::new(OpKind::RequestTransfer, file_name.clone(), msg.from.clone(), now)) {
				tracing::warn!(error = %e, "failed to append REQUEST_TRANSFER op");
			}
			tracing::debug!(file = %file_name, peer = %msg.from, "served REQUEST_FILE");
			Message::transfer(ctx.self_addr.clone(), file_name, data, now)
		}
		Err(e) => {
			tracing::warn!(file = %file_name, peer = %msg.from, error = %e, "failed to open requested file");
			Message::error(ctx.self_addr.clone(), file_name, "no se pudo abrir el archivo")
		}
	}
}
