//! Path safety for handlers that resolve a peer-supplied file name
//! against the shared directory.

use std::path::{Component, Path, PathBuf};

/// Reduce a peer-supplied name to its final path component.
///
/// A request for `../../etc/passwd` or `a/b/c.txt` resolves to
/// `passwd` / `c.txt` respectively, so a malicious or buggy peer can
/// never name a file outside `sharedDir`.
pub fn base_name(requested: &str) -> String {
	Path::new(requested)
		.components()
		.filter(|c| matches!(c, Component::Normal(_)))
		.next_back()
		.map(|c| c.as_os_str().to_string_lossy().into_owned())
		.unwrap_or_default()
}

/// Join a peer-supplied file name onto the shared directory, always
/// via `base_name`, never the raw requested string.
pub fn resolve_in_shared(shared_dir: &Path, requested: &str) -> PathBuf {
	shared_dir.join(base_name(requested))
}
