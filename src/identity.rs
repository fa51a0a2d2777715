//! Local identity: the on-disk `peer.id` marker and local address
//! discovery. Bootstrap/discovery of *other* peers is a collaborator
//! concern and is not implemented here.

use std::net::IpAddr;
use std::path::Path;

use crate::error::MeshError;

/// Read the local integer id from `path`, creating it with id `1` on
/// first run. Does not touch any peer list; assigning *this* node's
/// own id is in scope, registering it with others is not.
pub fn load_or_create_id(path: &Path) -> Result<u32, MeshError> {
	match std::fs::read_to_string(path) {
		Ok(text) => {
			let id = text.trim().parse::<u32>().map_err(|_| MeshError::Protocol {
				message: format!("invalid id in {}", path.display()),
			})?;
			Ok(id)
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			let id = 1;
			if let Some(parent) = path.parent() {
				std::fs::create_dir_all(parent)?;
			}
			std::fs::write(path, id.to_string())?;
			Ok(id)
		}
		Err(e) => Err(MeshError::Io(e)),
	}
}

/// Best-effort local IPv4 address, falling back to loopback.
pub fn local_ipv4() -> IpAddr {
	local_ip_address::local_ip().unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn creates_id_on_first_run() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("peer.id");
		let id = load_or_create_id(&path).unwrap();
		assert_eq!(id, 1);
		assert!(path.exists());
	}

	#[test]
	fn reads_existing_id() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("peer.id");
		std::fs::write(&path, "42\n").unwrap();
		assert_eq!(load_or_create_id(&path).unwrap(), 42);
	}

	#[test]
	fn rejects_non_numeric_id() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("peer.id");
		std::fs::write(&path, "not-a-number").unwrap();
		assert!(load_or_create_id(&path).is_err());
	}
}
