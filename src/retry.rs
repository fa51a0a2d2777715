//! RetryWorker: on a fixed period, reload persistent state and drain
//! the retry queue, dropping tasks whose source vanished or was
//! superseded by a newer local write, and re-attempting the rest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::node::NodeContext;
use crate::send;
use crate::time::{mod_time_secs, now_secs};
use crate::types::{OpKind, Operation};
use crate::validation::base_name;

pub async fn run_retry_worker(ctx: Arc<NodeContext>, interval: Duration) {
	let mut ticker = tokio::time::interval(interval);
	loop {
		ticker.tick().await;

		if let Err(e) = ctx.state.reload() {
			tracing::warn!(error = %e, "failed to reload state before retry pass");
		}

		let tasks = ctx.state.retry_queue();
		if tasks.is_empty() {
			continue;
		}
		tracing::info!(count = tasks.len(), "retrying failed transfer(s)");

		let mut survivors = Vec::with_capacity(tasks.len());
		for mut task in tasks {
			if task.kind != "TRANSFER" {
				survivors.push(task);
				continue;
			}

			let path = PathBuf::from(&task.file_name);
			match tokio::fs::metadata(&path).await {
				Err(_) => {
					log_skipped(&ctx, &task.file_name, "file deleted");
				}
				Ok(meta) if mod_time_secs(&meta) > task.timestamp => {
					log_skipped(&ctx, &task.file_name, "file modified after failure, superseded by a fresh send");
				}
				Ok(_) => match send::retry_attempt(&ctx, &path, &task.to, task.timestamp).await {
					Ok(()) => {}
					Err(_) => {
						task.retries += 1;
						survivors.push(task);
					}
				},
			}
		}

		if let Err(e) = ctx.state.replace_retry_queue(survivors) {
			tracing::warn!(error = %e, "failed to persist retry queue");
		}
	}
}

fn log_skipped(ctx: &Arc<NodeContext>, file_name: &str, reason: &str) {
	let op = Operation::new(OpKind::RetrySkipped, base_name(file_name), ctx.self_addr.clone(), now_secs()).with_message(reason);
	if let Err(e) = ctx.oplog.append(&op) {
		tracing::warn!(error = %e, "failed to append RETRY_SKIPPED op");
	}
}
