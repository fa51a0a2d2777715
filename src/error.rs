//! Error types for mesh node operations

use std::error::Error;
use std::fmt;
use std::io;

/// Unified error type for every fallible operation in the node runtime.
///
/// Each variant corresponds to one of the error kinds the protocol and
/// background workers distinguish on: callers match on the kind rather
/// than inspecting message text.
#[derive(Debug)]
pub enum MeshError {
	/// A peer address string could not be parsed (`ip:port`).
	BadAddress { address: String },

	/// A peer did not respond to a liveness probe or dial attempt.
	PeerUnavailable { address: String },

	/// Local filesystem I/O failed.
	Io(io::Error),

	/// A wire message was malformed, of unexpected type, or undecodable.
	Protocol { message: String },

	/// A write was rejected because the local copy is not older than
	/// the incoming one (last-writer-wins).
	Conflict { file_name: String },

	/// A retried operation exhausted its attempt budget.
	Exhausted { attempts: u32 },
}

impl fmt::Display for MeshError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MeshError::BadAddress { address } => write!(f, "invalid peer address: {}", address),
			MeshError::PeerUnavailable { address } => write!(f, "peer unavailable: {}", address),
			MeshError::Io(e) => write!(f, "I/O error: {}", e),
			MeshError::Protocol { message } => write!(f, "protocol error: {}", message),
			MeshError::Conflict { file_name } => {
				write!(f, "timestamp conflict writing {}", file_name)
			}
			MeshError::Exhausted { attempts } => {
				write!(f, "exhausted after {} attempts", attempts)
			}
		}
	}
}

impl Error for MeshError {}

impl From<io::Error> for MeshError {
	fn from(e: io::Error) -> Self {
		MeshError::Io(e)
	}
}

impl From<serde_json::Error> for MeshError {
	fn from(e: serde_json::Error) -> Self {
		MeshError::Protocol { message: e.to_string() }
	}
}

pub type MeshResult<T> = Result<T, MeshError>;

// vim: ts=4
