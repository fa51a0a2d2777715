//! Reconciliation: pull unknown or newer files from a peer whenever
//! PeerMonitor detects a down-to-up transition. Never deletes; a file
//! present locally and absent remotely is left alone. DELETE only
//! ever propagates as an explicit broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MeshError;
use crate::handlers::transfer::write_with_lww;
use crate::node::NodeContext;
use crate::protocol::{dial_and_exchange, Message, MessageType};
use crate::time::now_secs;
use crate::tree::flatten_tree;
use crate::types::{FileEntry, OpKind, PeerEndpoint, SyncResult};
use crate::validation::base_name;

/// Run one reconciliation pass against `peer`. On failure to reach
/// the peer at all, logs and returns without mutating any state; the
/// next up-edge will retry.
pub async fn sync_with_peer(ctx: Arc<NodeContext>, peer: PeerEndpoint) -> Result<SyncResult, MeshError> {
	let addr = peer.address();
	tracing::info!(peer = %addr, "starting reconciliation");

	let reply = dial_and_exchange(&addr, &Message::list_request(ctx.self_addr.clone())).await.map_err(|e| {
		tracing::warn!(peer = %addr, error = %e, "could not fetch remote file tree");
		e
	})?;

	let tree = match reply.file_tree {
		Some(t) => t,
		None => {
			tracing::warn!(peer = %addr, "LIST reply carried no fileTree");
			return Ok(SyncResult::default());
		}
	};

	let remote_entries = flatten_tree(&tree);
	let mut cache: HashMap<String, i64> = ctx.state.file_cache(&peer.ip).into_iter().map(|e| (e.name, e.mod_time)).collect();

	let mut result = SyncResult::default();

	for entry in &remote_entries {
		let known_time = cache.get(&entry.name).copied();
		let should_pull = match known_time {
			None => true,
			Some(t) => entry.mod_time > t,
		};
		if !should_pull {
			continue;
		}

		match pull_one(&ctx, &addr, entry).await {
			Ok(true) => {
				cache.insert(entry.name.clone(), entry.mod_time);
				result.pulled.push(entry.name.clone());
			}
			Ok(false) => {
				// A conflict still advances the cache to the remote time,
				// otherwise we would re-request and re-lose this file on
				// every future reconnect.
				cache.insert(entry.name.clone(), entry.mod_time);
				result.skipped += 1;
			}
			Err(e) => {
				tracing::warn!(peer = %addr, file = %entry.name, error = %e, "failed to sync file");
				result.errors += 1;
			}
		}
	}

	let updated: Vec<FileEntry> = cache.into_iter().map(|(name, mod_time)| FileEntry { name, mod_time }).collect();
	ctx.state.update_file_cache(&peer.ip, updated, now_secs())?;

	tracing::info!(peer = %addr, pulled = result.pulled.len(), skipped = result.skipped, errors = result.errors, "reconciliation complete");
	Ok(result)
}

/// Fetch one file via REQUEST_FILE and write it under
/// `recibido-<name>`, applying the same last-writer-wins rule as the
/// inbound TRANSFER handler. Returns `Ok(true)` if written, `Ok(false)`
/// if rejected as a stale conflict.
async fn pull_one(ctx: &Arc<NodeContext>, addr: &str, entry: &FileEntry) -> Result<bool, MeshError> {
	let reply = dial_and_exchange(addr, &Message::request_file(ctx.self_addr.clone(), entry.name.clone())).await?;

	if reply.kind != MessageType::Transfer {
		let reason = reply.data.map(|d| String::from_utf8_lossy(&d).into_owned()).unwrap_or_default();
		return Err(MeshError::Protocol { message: format!("REQUEST_FILE({}) failed: {}", entry.name, reason) });
	}

	let data = reply.data.unwrap_or_default();
	let dest = ctx.shared_dir.join(format!("recibido-{}", base_name(&entry.name)));

	let written = write_with_lww(&dest, &data, reply.timestamp, &entry.name, addr, &ctx.oplog, OpKind::SyncFile).await?;
	Ok(written)
}
