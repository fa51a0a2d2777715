//! Configuration for the node runtime.
//!
//! Follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (`<syncrDir>/config.toml`), optional; missing is not an error
//! 3. Environment variables (`MESHSYNC_*` prefix)
//! 4. CLI flags (highest priority)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::types::PeerEndpoint;

fn default_shared_dir() -> PathBuf {
	PathBuf::from("shared")
}

fn default_state_file() -> PathBuf {
	PathBuf::from("state/state.json")
}

fn default_retry_interval() -> u64 {
	10
}

fn default_monitor_interval() -> u64 {
	5
}

fn default_log_level() -> String {
	"info".to_string()
}

/// Startup configuration for a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Local listen port.
	pub port: u16,

	/// Initial peer list, `(id, ip, port)` triples.
	pub peers: Vec<PeerEndpoint>,

	/// Directory whose contents are replicated to peers.
	pub shared_dir: PathBuf,

	/// Path to the persisted reconciliation state.
	pub state_file: PathBuf,

	/// Seconds between RetryWorker ticks.
	pub retry_interval_secs: u64,

	/// Seconds between PeerMonitor ticks.
	pub monitor_interval_secs: u64,

	/// `RUST_LOG`-compatible default filter directive.
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			port: 8000,
			peers: Vec::new(),
			shared_dir: default_shared_dir(),
			state_file: default_state_file(),
			retry_interval_secs: default_retry_interval(),
			monitor_interval_secs: default_monitor_interval(),
			log_level: default_log_level(),
		}
	}
}

impl Config {
	/// Load the config file at `path` (TOML) over the defaults. A
	/// missing file is not an error; the defaults pass through
	/// unchanged, matching how everything else under the state
	/// directory is created on first run.
	pub fn merge_file(mut self, path: &std::path::Path) -> Result<Self, MeshError> {
		let text = match std::fs::read_to_string(path) {
			Ok(t) => t,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self),
			Err(e) => return Err(MeshError::Io(e)),
		};
		let file_cfg: ConfigFile = toml::from_str(&text)
			.map_err(|e| MeshError::Protocol { message: format!("invalid config file: {}", e) })?;
		file_cfg.apply(&mut self);
		Ok(self)
	}

	/// Overlay `MESHSYNC_*` environment variables.
	pub fn merge_env(mut self) -> Self {
		if let Ok(v) = std::env::var("MESHSYNC_PORT") {
			if let Ok(p) = v.parse() {
				self.port = p;
			}
		}
		if let Ok(v) = std::env::var("MESHSYNC_SHARED_DIR") {
			self.shared_dir = PathBuf::from(v);
		}
		if let Ok(v) = std::env::var("MESHSYNC_STATE_FILE") {
			self.state_file = PathBuf::from(v);
		}
		if let Ok(v) = std::env::var("MESHSYNC_RETRY_INTERVAL_SECS") {
			if let Ok(n) = v.parse() {
				self.retry_interval_secs = n;
			}
		}
		if let Ok(v) = std::env::var("MESHSYNC_MONITOR_INTERVAL_SECS") {
			if let Ok(n) = v.parse() {
				self.monitor_interval_secs = n;
			}
		}
		if let Ok(v) = std::env::var("MESHSYNC_LOG_LEVEL") {
			self.log_level = v;
		}
		self
	}
}

/// Shape of the on-disk config file; every field optional since the
/// file itself is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
	port: Option<u16>,
	peers: Option<Vec<PeerEndpoint>>,
	shared_dir: Option<PathBuf>,
	state_file: Option<PathBuf>,
	retry_interval_secs: Option<u64>,
	monitor_interval_secs: Option<u64>,
	log_level: Option<String>,
}

impl ConfigFile {
	fn apply(self, cfg: &mut Config) {
		if let Some(v) = self.port {
			cfg.port = v;
		}
		if let Some(v) = self.peers {
			cfg.peers = v;
		}
		if let Some(v) = self.shared_dir {
			cfg.shared_dir = v;
		}
		if let Some(v) = self.state_file {
			cfg.state_file = v;
		}
		if let Some(v) = self.retry_interval_secs {
			cfg.retry_interval_secs = v;
		}
		if let Some(v) = self.monitor_interval_secs {
			cfg.monitor_interval_secs = v;
		}
		if let Some(v) = self.log_level {
			cfg.log_level = v;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_matches_spec_defaults() {
		let c = Config::default();
		assert_eq!(c.shared_dir, PathBuf::from("shared"));
		assert_eq!(c.state_file, PathBuf::from("state/state.json"));
		assert_eq!(c.retry_interval_secs, 10);
		assert_eq!(c.monitor_interval_secs, 5);
	}

	#[test]
	fn merge_file_missing_is_not_an_error() {
		let c = Config::default().merge_file(std::path::Path::new("/no/such/config.toml")).unwrap();
		assert_eq!(c.port, 8000);
	}

	#[test]
	fn config_serializes_camel_case() {
		let c = Config::default();
		let json = serde_json::to_string(&c).unwrap();
		assert!(json.contains("sharedDir"));
		assert!(json.contains("retryIntervalSecs"));
	}
}
