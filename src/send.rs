//! SendFile: the outbound push path. Probes the peer, archives a
//! directory source into a zip, computes a SHA-256 of the payload for
//! the log only (neither sent nor verified), then attempts the push
//! up to three times with a linear backoff.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::MeshError;
use crate::node::NodeContext;
use crate::protocol::{dial_and_send, probe_peer, Message};
use crate::time::{mod_time_secs, now_secs};
use crate::types::{OpKind, Operation, PendingTask};

pub const MAX_ATTEMPTS: u32 = 3;

struct Payload {
	path: PathBuf,
	file_name: String,
	cleanup: Option<PathBuf>,
}

/// Build the payload to send: the file itself, or a zip of it if it's
/// a directory. Blocking filesystem work, so callers run it via
/// `spawn_blocking`.
fn prepare_payload(local_path: &Path) -> Result<Payload, MeshError> {
	let metadata = std::fs::metadata(local_path)?;

	if metadata.is_dir() {
		let dir_name = local_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "archive".to_string());
		let zip_name = format!("{}.zip", dir_name);
		let tmp = std::env::temp_dir().join(&zip_name);
		crate::tree::zip_folder(local_path, &tmp)?;
		Ok(Payload { path: tmp.clone(), file_name: zip_name, cleanup: Some(tmp) })
	} else {
		let file_name = local_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		Ok(Payload { path: local_path.to_path_buf(), file_name, cleanup: None })
	}
}

async fn build_payload(local_path: &Path) -> Result<Payload, MeshError> {
	let local_path = local_path.to_path_buf();
	tokio::task::spawn_blocking(move || prepare_payload(&local_path))
		.await
		.map_err(|e| MeshError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
}

/// Up to `MAX_ATTEMPTS` tries with a linear backoff of `attempt`
/// seconds between them. Reused by both the fresh-push path below and
/// by RetryWorker, which owns its own enqueue/drop decision and so
/// does not call `send_file` directly.
pub(crate) async fn attempt_transfer(ctx: &Arc<NodeContext>, payload: &Payload, peer_addr: &str, timestamp: i64) -> Result<(), MeshError> {
	for attempt in 1..=MAX_ATTEMPTS {
		let data = tokio::fs::read(&payload.path).await?;
		let msg = Message::transfer(ctx.self_addr.clone(), payload.file_name.clone(), data, timestamp);

		match dial_and_send(peer_addr, &msg).await {
			Ok(()) => {
				ctx.oplog.append(&Operation::new(OpKind::Transfer, payload.file_name.clone(), ctx.self_addr.clone(), now_secs()))?;
				tracing::info!(file = %payload.file_name, peer = %peer_addr, attempt, "sent");
				return Ok(());
			}
			Err(e) => {
				ctx.oplog.append(
					&Operation::new(OpKind::SendFail, payload.file_name.clone(), ctx.self_addr.clone(), now_secs())
						.with_message(format!("attempt {} failed: {}", attempt, e)),
				)?;
				tracing::warn!(file = %payload.file_name, peer = %peer_addr, attempt, error = %e, "send attempt failed");
				if attempt < MAX_ATTEMPTS {
					tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
				}
			}
		}
	}
	Err(MeshError::Exhausted { attempts: MAX_ATTEMPTS })
}

/// Push `local_path` to `peer_addr`. On exhaustion, enqueues a durable
/// `PendingTask` stamped with the source file's modification time at
/// the moment of failure, the value RetryWorker later compares
/// against to detect a superseding local write.
pub async fn send_file(ctx: &Arc<NodeContext>, local_path: &Path, peer_addr: &str) -> Result<(), MeshError> {
	if !probe_peer(peer_addr).await {
		ctx.oplog.append(&Operation::new(
			OpKind::PeerUnavailable,
			crate::validation::base_name(&local_path.to_string_lossy()),
			ctx.self_addr.clone(),
			now_secs(),
		))?;
		return Err(MeshError::PeerUnavailable { address: peer_addr.to_string() });
	}

	let payload = build_payload(local_path).await?;

	let source_metadata = tokio::fs::metadata(local_path).await.ok();
	let timestamp = source_metadata.map(|m| mod_time_secs(&m)).unwrap_or_else(now_secs);

	let digest_path = payload.path.clone();
	match tokio::task::spawn_blocking(move || crate::tree::sha256_file(&digest_path)).await {
		Ok(Ok(digest)) => {
			tracing::debug!(file = %payload.file_name, sha256 = %digest, "computed payload digest (informational only, not sent or verified)")
		}
		Ok(Err(e)) => tracing::debug!(file = %payload.file_name, error = %e, "could not compute payload digest"),
		Err(e) => tracing::debug!(file = %payload.file_name, error = %e, "digest task panicked"),
	}

	let result = attempt_transfer(ctx, &payload, peer_addr, timestamp).await;

	if let Some(tmp) = &payload.cleanup {
		let _ = tokio::fs::remove_file(tmp).await;
	}

	if result.is_err() {
		ctx.state.add_pending_task(PendingTask::transfer(
			local_path.to_string_lossy().into_owned(),
			ctx.self_addr.clone(),
			peer_addr.to_string(),
			timestamp,
			MAX_ATTEMPTS,
		))?;
	}

	result
}

/// RetryWorker's entry point: rebuild the payload and run the same
/// attempt loop, but leave the enqueue/drop decision to the caller,
/// which is already holding the `PendingTask` and wants to bump its
/// `retries` counter rather than create a new one.
pub(crate) async fn retry_attempt(ctx: &Arc<NodeContext>, local_path: &Path, peer_addr: &str, timestamp: i64) -> Result<(), MeshError> {
	let payload = build_payload(local_path).await?;
	let result = attempt_transfer(ctx, &payload, peer_addr, timestamp).await;
	if let Some(tmp) = &payload.cleanup {
		let _ = tokio::fs::remove_file(tmp).await;
	}
	result
}
