//! TRANSFER handler: receive a pushed file, applying the
//! last-writer-wins rule on the destination.

use std::path::Path;
use std::sync::Arc;

use crate::error::MeshError;
use crate::node::NodeContext;
use crate::oplog::OperationLog;
use crate::protocol::Message;
use crate::time::{mod_time_secs, now_secs};
use crate::types::{OpKind, Operation};

/// Write `data` to `path`, applying last-writer-wins against the
/// destination's current modification time. `timestamp == 0` is
/// treated as "now", the same rule applied on every inbound write
/// path in this crate, whether the write arrives as a pushed
/// TRANSFER or as the result of a reconciliation pull.
///
/// Returns `true` if the file was written, `false` if rejected as a
/// stale conflict.
pub async fn write_with_lww(
	path: &Path,
	data: &[u8],
	timestamp: i64,
	file_name: &str,
	from: &str,
	oplog: &OperationLog,
	success_kind: OpKind,
) -> Result<bool, MeshError> {
	let effective_timestamp = if timestamp == 0 { now_secs() } else { timestamp };

	if let Ok(metadata) = tokio::fs::metadata(path).await {
		let local_mtime = mod_time_secs(&metadata);
		if local_mtime > effective_timestamp {
			oplog.append(&Operation::new(OpKind::TimestampConflict, file_name, from, now_secs()))?;
			tracing::info!(file = %file_name, "rejected stale write (timestamp conflict)");
			return Ok(false);
		}
	}

	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	tokio::fs::write(path, data).await?;
	oplog.append(&Operation::new(success_kind, file_name, from, now_secs()))?;
	Ok(true)
}

pub async fn handle(ctx: &Arc<NodeContext>, msg: &Message) {
	let file_name = match &msg.file_name {
		Some(f) => f.clone(),
		None => {
			tracing::warn!(peer = %msg.from, "TRANSFER missing fileName, dropping");
			return;
		}
	};
	let data = msg.data.clone().unwrap_or_default();
	let path = crate::validation::resolve_in_shared(&ctx.shared_dir, &file_name);

	match write_with_lww(&path, &data, msg.timestamp, &file_name, &msg.from, &ctx.oplog, OpKind::Transfer).await {
		Ok(_) => {}
		Err(e) => tracing::warn!(file = %file_name, error = %e, "failed to apply TRANSFER"),
	}
}
