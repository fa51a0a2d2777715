//! Directory-scanning and archival collaborators consumed by the
//! core: `BuildFileTree`, `FlattenTree`, `ListFiles`, `ZipFolder`,
//! `CalculateSHA256`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::MeshError;
use crate::time::{mod_time_secs, now_secs};
use crate::types::{FileEntry, FileNode};

/// Recursively snapshot a directory. A missing root is not an error:
/// it yields an empty directory node so callers (LIST) never need a
/// special case.
pub fn build_file_tree(root: &Path) -> FileNode {
	let name = root
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| root.to_string_lossy().into_owned());

	let metadata = match std::fs::metadata(root) {
		Ok(m) => m,
		Err(_) => {
			tracing::warn!(path = %root.display(), "shared directory does not exist, returning empty tree");
			return FileNode::empty_dir(name, now_secs());
		}
	};

	let mod_time = mod_time_secs(&metadata);

	if !metadata.is_dir() {
		return FileNode::leaf(name, mod_time);
	}

	let mut node = FileNode::empty_dir(name, mod_time);
	let entries = match std::fs::read_dir(root) {
		Ok(e) => e,
		Err(e) => {
			tracing::warn!(path = %root.display(), error = %e, "failed to read directory");
			return node;
		}
	};

	for entry in entries {
		let entry = match entry {
			Ok(e) => e,
			Err(e) => {
				tracing::warn!(error = %e, "failed to read directory entry");
				continue;
			}
		};
		node.children.push(build_file_tree(&entry.path()));
	}

	node
}

/// Flatten a tree into its leaves only, in the order the tree is
/// walked (depth-first, children in read-dir order).
pub fn flatten_tree(root: &FileNode) -> Vec<FileEntry> {
	let mut out = Vec::new();
	flatten_into(root, &mut out);
	out
}

fn flatten_into(node: &FileNode, out: &mut Vec<FileEntry>) {
	if !node.is_dir {
		out.push(FileEntry { name: node.name.clone(), mod_time: node.mod_time });
	}
	for child in &node.children {
		flatten_into(child, out);
	}
}

/// Build the tree rooted at `root` and flatten it in one step: the
/// flat listing collaborator interface.
pub fn list_files(root: &Path) -> Vec<FileEntry> {
	flatten_tree(&build_file_tree(root))
}

/// Archive `src` (a directory) into a zip file at `out_path`.
pub fn zip_folder(src: &Path, out_path: &Path) -> Result<(), MeshError> {
	let file = File::create(out_path)?;
	let mut writer = zip::ZipWriter::new(file);
	let options: zip::write::FileOptions<'_, ()> =
		zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

	let base = src;
	for entry in walk(src)? {
		let rel = entry.strip_prefix(base).unwrap_or(&entry);
		let rel_str = rel.to_string_lossy().replace('\\', "/");
		if entry.is_dir() {
			if !rel_str.is_empty() {
				writer
					.add_directory(format!("{}/", rel_str), options)
					.map_err(|e| MeshError::Protocol { message: e.to_string() })?;
			}
			continue;
		}
		writer
			.start_file(rel_str, options)
			.map_err(|e| MeshError::Protocol { message: e.to_string() })?;
		let mut f = File::open(&entry)?;
		let mut buf = Vec::new();
		f.read_to_end(&mut buf)?;
		writer.write_all(&buf)?;
	}

	writer.finish().map_err(|e| MeshError::Protocol { message: e.to_string() })?;
	Ok(())
}

fn walk(root: &Path) -> Result<Vec<std::path::PathBuf>, MeshError> {
	let mut out = Vec::new();
	let mut stack = vec![root.to_path_buf()];
	while let Some(dir) = stack.pop() {
		for entry in std::fs::read_dir(&dir)? {
			let entry = entry?;
			let path = entry.path();
			if path.is_dir() {
				stack.push(path.clone());
			}
			out.push(path);
		}
	}
	Ok(out)
}

/// Compute the SHA-256 digest of a file, hex-encoded.
pub fn sha256_file(path: &Path) -> Result<String, MeshError> {
	let mut file = File::open(path)?;
	let mut hasher = Sha256::new();
	let mut buf = [0u8; 8192];
	loop {
		let n = file.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write as _;

	#[test]
	fn build_file_tree_missing_root_is_empty_dir() {
		let node = build_file_tree(Path::new("/no/such/directory/at/all"));
		assert!(node.is_dir);
		assert!(node.children.is_empty());
	}

	#[test]
	fn flatten_tree_collects_leaves_only() {
		let tree = FileNode {
			name: "root".to_string(),
			is_dir: true,
			mod_time: 0,
			children: vec![
				FileNode::leaf("a.txt", 10),
				FileNode {
					name: "sub".to_string(),
					is_dir: true,
					mod_time: 0,
					children: vec![FileNode::leaf("b.txt", 20)],
				},
			],
		};
		let flat = flatten_tree(&tree);
		assert_eq!(flat.len(), 2);
		assert_eq!(flat[0].name, "a.txt");
		assert_eq!(flat[1].name, "b.txt");
	}

	#[test]
	fn build_file_tree_reads_real_directory() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("x.txt"), b"hello").unwrap();
		let tree = build_file_tree(dir.path());
		assert!(tree.is_dir);
		assert_eq!(tree.children.len(), 1);
		assert_eq!(tree.children[0].name, "x.txt");
	}

	#[test]
	fn sha256_file_is_deterministic() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("f.bin");
		let mut f = File::create(&path).unwrap();
		f.write_all(b"some payload bytes").unwrap();
		let a = sha256_file(&path).unwrap();
		let b = sha256_file(&path).unwrap();
		assert_eq!(a, b);
		assert_eq!(a.len(), 64);
	}
}
