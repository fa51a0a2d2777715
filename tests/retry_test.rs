//! RetryWorker (§4.6): durable retry-queue draining, staleness gating,
//! and the interaction with SendFile's own probe-gated enqueue.

mod common;

use std::time::Duration;

use common::{reserve_addr, start_node};
use filetime::FileTime;
use meshsync::send;
use meshsync::types::{OpKind, PendingTask};

fn set_mtime(path: &std::path::Path, unix_secs: i64) {
	filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

#[tokio::test]
async fn send_to_an_unreachable_peer_fails_fast_without_enqueueing() {
	let shared = tempfile::tempdir().unwrap();
	let state_dir = tempfile::tempdir().unwrap();
	let local = tempfile::tempdir().unwrap();
	let file = local.path().join("push.txt");
	std::fs::write(&file, b"contents").unwrap();

	let node = start_node(1, shared.path().to_path_buf(), state_dir.path().to_path_buf(), vec![]).await;
	let down_addr = reserve_addr();

	let result = send::send_file(&node.ctx, &file, &down_addr).await;
	assert!(result.is_err());

	// the probe fails before any attempt is made, so SendFile's own
	// "do not enqueue, PeerMonitor will handle reconnection" rule (§4.7)
	// applies — nothing lands in the durable retry queue.
	assert!(node.ctx.state.retry_queue().is_empty());

	let ops = node.ctx.oplog.load_since(0).unwrap();
	assert!(ops.iter().any(|o| o.kind == OpKind::PeerUnavailable));
	assert!(!ops.iter().any(|o| o.kind == OpKind::SendFail));
}

#[tokio::test]
async fn retry_worker_increments_retries_while_peer_stays_down() {
	let shared_a = tempfile::tempdir().unwrap();
	let state_a = tempfile::tempdir().unwrap();
	let local = tempfile::tempdir().unwrap();

	let file = local.path().join("slow.txt");
	std::fs::write(&file, b"eventually delivered").unwrap();

	let node_a = start_node(1, shared_a.path().to_path_buf(), state_a.path().to_path_buf(), vec![]).await;
	let b_addr = reserve_addr();

	node_a
		.ctx
		.state
		.add_pending_task(PendingTask::transfer(file.to_string_lossy().into_owned(), node_a.addr.clone(), b_addr, 1_700_000_000, 0))
		.unwrap();

	// one full retry pass: three failed dial attempts with a 1s+2s
	// backoff between them, since nothing is listening at b_addr.
	tokio::time::sleep(Duration::from_millis(3_600)).await;

	let queued = node_a.ctx.state.retry_queue();
	assert_eq!(queued.len(), 1, "task must survive a failed retry pass");
	assert_eq!(queued[0].retries, 1);
}

#[tokio::test]
async fn retry_worker_delivers_a_queued_task_once_the_peer_is_reachable() {
	let shared_a = tempfile::tempdir().unwrap();
	let state_a = tempfile::tempdir().unwrap();
	let shared_b = tempfile::tempdir().unwrap();
	let state_b = tempfile::tempdir().unwrap();
	let local = tempfile::tempdir().unwrap();

	let file = local.path().join("queued.txt");
	std::fs::write(&file, b"delivered on the next pass").unwrap();

	let node_a = start_node(1, shared_a.path().to_path_buf(), state_a.path().to_path_buf(), vec![]).await;
	let node_b = start_node(2, shared_b.path().to_path_buf(), state_b.path().to_path_buf(), vec![]).await;

	node_a
		.ctx
		.state
		.add_pending_task(PendingTask::transfer(file.to_string_lossy().into_owned(), node_a.addr.clone(), node_b.addr.clone(), 1_700_000_000, 0))
		.unwrap();

	// B is already listening, so the very next retry tick succeeds on
	// its first dial attempt.
	tokio::time::sleep(Duration::from_millis(300)).await;

	assert!(node_a.ctx.state.retry_queue().is_empty());
	assert_eq!(std::fs::read(shared_b.path().join("queued.txt")).unwrap(), b"delivered on the next pass");
}

#[tokio::test]
async fn retry_skips_a_task_whose_file_was_modified_after_the_failure() {
	let shared = tempfile::tempdir().unwrap();
	let state_dir = tempfile::tempdir().unwrap();
	let local = tempfile::tempdir().unwrap();
	let file = local.path().join("superseded.txt");
	std::fs::write(&file, b"v2").unwrap();
	set_mtime(&file, 1_700_000_100);

	let node = start_node(1, shared.path().to_path_buf(), state_dir.path().to_path_buf(), vec![]).await;
	let down_addr = reserve_addr();

	node.ctx
		.state
		.add_pending_task(PendingTask::transfer(file.to_string_lossy().into_owned(), node.addr.clone(), down_addr, 1_700_000_000, 2))
		.unwrap();

	tokio::time::sleep(Duration::from_millis(250)).await;

	assert!(node.ctx.state.retry_queue().is_empty(), "a superseded task must be dropped, not retried");
	let ops = node.ctx.oplog.load_since(0).unwrap();
	assert!(ops.iter().any(|o| o.kind == OpKind::RetrySkipped));
}

#[tokio::test]
async fn retry_skips_a_task_whose_file_was_deleted() {
	let shared = tempfile::tempdir().unwrap();
	let state_dir = tempfile::tempdir().unwrap();
	let local = tempfile::tempdir().unwrap();
	let file = local.path().join("gone.txt");
	std::fs::write(&file, b"v1").unwrap();

	let node = start_node(1, shared.path().to_path_buf(), state_dir.path().to_path_buf(), vec![]).await;
	let down_addr = reserve_addr();

	node.ctx
		.state
		.add_pending_task(PendingTask::transfer(file.to_string_lossy().into_owned(), node.addr.clone(), down_addr, 1_700_000_000, 1))
		.unwrap();
	std::fs::remove_file(&file).unwrap();

	tokio::time::sleep(Duration::from_millis(250)).await;

	assert!(node.ctx.state.retry_queue().is_empty());
	let ops = node.ctx.oplog.load_since(0).unwrap();
	assert!(ops.iter().any(|o| o.kind == OpKind::RetrySkipped));
}
