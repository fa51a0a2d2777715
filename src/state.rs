//! Thread-safe, flush-after-mutate persistent reconciliation state.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::MeshError;
use crate::types::{FileEntry, PendingTask, PersistentState};

fn read_state(path: &Path) -> Result<PersistentState, MeshError> {
	match std::fs::read_to_string(path) {
		Ok(text) => Ok(serde_json::from_str(&text)?),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistentState::default()),
		Err(e) => Err(MeshError::Io(e)),
	}
}

/// Owns the single mutex guarding `PersistentState` and the path it is
/// flushed to. Every public mutator acquires the lock, mutates, writes
/// the whole record to disk, then releases, so an observer opening
/// the state file at any quiescent moment sees one consistent
/// snapshot.
pub struct SharedState {
	path: PathBuf,
	inner: Mutex<PersistentState>,
}

impl SharedState {
	/// Load state from `path`, or start from an empty record if the
	/// file does not exist yet (first run).
	pub fn load(path: impl Into<PathBuf>) -> Result<Self, MeshError> {
		let path = path.into();
		let state = read_state(&path)?;
		Ok(SharedState { path, inner: Mutex::new(state) })
	}

	fn flush(&self, state: &PersistentState) -> Result<(), MeshError> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let text = serde_json::to_string_pretty(state)?;
		std::fs::write(&self.path, text)?;
		Ok(())
	}

	pub fn snapshot(&self) -> PersistentState {
		self.inner.lock().unwrap().clone()
	}

	pub fn set_online_status(&self, peer_ip: &str, online: bool) -> Result<(), MeshError> {
		let mut state = self.inner.lock().unwrap();
		state.online_status.insert(peer_ip.to_string(), online);
		self.flush(&state)
	}

	pub fn update_file_cache(&self, peer_ip: &str, files: Vec<FileEntry>, now: i64) -> Result<(), MeshError> {
		let mut state = self.inner.lock().unwrap();
		state.file_cache.insert(peer_ip.to_string(), files);
		state.last_sync.insert(peer_ip.to_string(), now);
		self.flush(&state)
	}

	pub fn file_cache(&self, peer_ip: &str) -> Vec<FileEntry> {
		self.inner.lock().unwrap().file_cache.get(peer_ip).cloned().unwrap_or_default()
	}

	pub fn add_pending_task(&self, task: PendingTask) -> Result<(), MeshError> {
		let mut state = self.inner.lock().unwrap();
		state.retry_queue.push(task);
		self.flush(&state)
	}

	pub fn replace_retry_queue(&self, queue: Vec<PendingTask>) -> Result<(), MeshError> {
		let mut state = self.inner.lock().unwrap();
		state.retry_queue = queue;
		self.flush(&state)
	}

	pub fn retry_queue(&self) -> Vec<PendingTask> {
		self.inner.lock().unwrap().retry_queue.clone()
	}

	/// Reload from disk, discarding any in-memory state not yet
	/// flushed. RetryWorker does this on every tick even though the
	/// state is process-local, so a concurrent mutation from another
	/// task is never clobbered by a stale in-memory copy.
	pub fn reload(&self) -> Result<(), MeshError> {
		let fresh = read_state(&self.path)?;
		*self.inner.lock().unwrap() = fresh;
		Ok(())
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
