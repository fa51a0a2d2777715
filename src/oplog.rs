//! Append-only, line-delimited JSON journal of semantic operations.
//!
//! A missing log file is not an error (no prior history); a corrupt
//! line is skipped rather than failing the whole read.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::MeshError;
use crate::types::Operation;

pub struct OperationLog {
	path: PathBuf,
	write_lock: Mutex<()>,
}

impl OperationLog {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		OperationLog { path: path.into(), write_lock: Mutex::new(()) }
	}

	/// Append one operation as a single JSON line.
	pub fn append(&self, op: &Operation) -> Result<(), MeshError> {
		let _guard = self.write_lock.lock().unwrap();
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
		let mut line = serde_json::to_vec(op)?;
		line.push(b'\n');
		file.write_all(&line)?;
		Ok(())
	}

	/// Load every operation with `timestamp >= since`, in append
	/// order. A missing file yields an empty list, not an error.
	pub fn load_since(&self, since: i64) -> Result<Vec<Operation>, MeshError> {
		load_since(&self.path, since)
	}
}

fn load_since(path: &Path, since: i64) -> Result<Vec<Operation>, MeshError> {
	let file = match std::fs::File::open(path) {
		Ok(f) => f,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(MeshError::Io(e)),
	};

	let mut ops = Vec::new();
	for line in BufReader::new(file).lines() {
		let line = line?;
		if line.trim().is_empty() {
			continue;
		}
		let op: Operation = match serde_json::from_str(&line) {
			Ok(op) => op,
			Err(_) => continue,
		};
		if op.timestamp >= since {
			ops.push(op);
		}
	}
	Ok(ops)
}
