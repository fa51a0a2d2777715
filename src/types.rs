//! Core data types shared across the node runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A leaf entry in a peer's shared directory, as seen on the wire.
///
/// `mod_time` is a Unix timestamp in seconds, matching the precision
/// the wire protocol uses for every other timestamp field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
	pub name: String,
	pub mod_time: i64,
}

/// A node in a recursive snapshot of a directory tree.
///
/// Leaves have `is_dir = false` and empty `children`; branches have
/// `is_dir = true`. Never persisted; this type exists only on the
/// wire and in memory during a LIST response or a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
	pub name: String,
	pub is_dir: bool,
	pub mod_time: i64,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<FileNode>,
}

impl FileNode {
	pub fn leaf(name: impl Into<String>, mod_time: i64) -> Self {
		FileNode { name: name.into(), is_dir: false, mod_time, children: Vec::new() }
	}

	pub fn empty_dir(name: impl Into<String>, mod_time: i64) -> Self {
		FileNode { name: name.into(), is_dir: true, mod_time, children: Vec::new() }
	}
}

/// A peer's address and assigned id. IDs are informational; routing
/// is always by `(ip, port)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEndpoint {
	pub id: u32,
	pub ip: String,
	pub port: String,
}

impl PeerEndpoint {
	pub fn address(&self) -> String {
		format!("{}:{}", self.ip, self.port)
	}
}

/// The kind of a journaled event. Matches the wire log exactly; there
/// is deliberately no "open failed" variant. Such failures surface
/// only as an ERROR response on the wire, not as a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
	#[serde(rename = "TRANSFER")]
	Transfer,
	#[serde(rename = "DELETE")]
	Delete,
	#[serde(rename = "REQUEST_TRANSFER")]
	RequestTransfer,
	#[serde(rename = "REQUEST_RECV")]
	RequestRecv,
	#[serde(rename = "SYNC_FILE")]
	SyncFile,
	#[serde(rename = "SEND_FAIL")]
	SendFail,
	#[serde(rename = "PEER_UNAVAILABLE")]
	PeerUnavailable,
	#[serde(rename = "TIMESTAMP_CONFLICT")]
	TimestampConflict,
	#[serde(rename = "RETRY_SKIPPED")]
	RetrySkipped,
}

/// One line of the append-only operation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
	#[serde(rename = "type")]
	pub kind: OpKind,
	pub file_name: String,
	pub from: String,
	pub timestamp: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl Operation {
	pub fn new(kind: OpKind, file_name: impl Into<String>, from: impl Into<String>, timestamp: i64) -> Self {
		Operation { kind, file_name: file_name.into(), from: from.into(), timestamp, message: None }
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}
}

/// A durable retry-queue entry: an outbound TRANSFER that failed and
/// is waiting for either RetryWorker or a reconnection sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
	#[serde(rename = "type")]
	pub kind: String,
	pub file_name: String,
	pub from: String,
	pub to: String,
	pub retries: u32,
	pub timestamp: i64,
}

impl PendingTask {
	pub fn transfer(file_name: impl Into<String>, from: impl Into<String>, to: impl Into<String>, timestamp: i64, retries: u32) -> Self {
		PendingTask {
			kind: "TRANSFER".to_string(),
			file_name: file_name.into(),
			from: from.into(),
			to: to.into(),
			retries,
			timestamp,
		}
	}
}

/// The sole durable record besides the operation log and the shared
/// directory itself. Every mutator flushes this whole structure to
/// disk before returning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistentState {
	#[serde(default)]
	pub last_sync: HashMap<String, i64>,
	#[serde(default)]
	pub file_cache: HashMap<String, Vec<FileEntry>>,
	#[serde(default)]
	pub online_status: HashMap<String, bool>,
	#[serde(default)]
	pub retry_queue: Vec<PendingTask>,
}

/// Summary of a completed reconciliation pass, used for logging and by
/// the CLI's `sync` subcommand. Not persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
	pub pulled: Vec<String>,
	pub skipped: usize,
	pub errors: usize,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn file_node_leaf_has_no_children() {
		let n = FileNode::leaf("a.txt", 100);
		assert!(!n.is_dir);
		assert!(n.children.is_empty());
	}

	#[test]
	fn peer_endpoint_address_format() {
		let p = PeerEndpoint { id: 1, ip: "10.0.0.1".to_string(), port: "9000".to_string() };
		assert_eq!(p.address(), "10.0.0.1:9000");
	}

	#[test]
	fn op_kind_serializes_to_wire_names() {
		let json = serde_json::to_string(&OpKind::TimestampConflict).unwrap();
		assert_eq!(json, "\"TIMESTAMP_CONFLICT\"");
	}

	#[test]
	fn operation_round_trips_through_json() {
		let op = Operation::new(OpKind::Transfer, "x.txt", "1.1.1.1:8001", 1000);
		let s = serde_json::to_string(&op).unwrap();
		let back: Operation = serde_json::from_str(&s).unwrap();
		assert_eq!(back.file_name, "x.txt");
		assert_eq!(back.kind, OpKind::Transfer);
	}

	#[test]
	fn pending_task_transfer_constructor() {
		let t = PendingTask::transfer("x.txt", "a", "b", 500, 0);
		assert_eq!(t.kind, "TRANSFER");
		assert_eq!(t.retries, 0);
	}

	#[test]
	fn persistent_state_default_is_empty() {
		let s = PersistentState::default();
		assert!(s.file_cache.is_empty());
		assert!(s.retry_queue.is_empty());
	}
}
