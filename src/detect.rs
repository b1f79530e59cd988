//! Content fingerprints and the unchanged-tree short circuit

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::Config;

/// Hex-encoded BLAKE3 digest of a byte slice
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
	hex::encode(blake3::hash(bytes).as_bytes())
}

/// Fingerprint of a relative media path, used as the reconciliation key
pub fn path_fingerprint(rel_path: &str) -> String {
	fingerprint_bytes(rel_path.as_bytes())
}

/// Hex-encoded BLAKE3 digest of a file's contents
pub fn fingerprint_file(path: &Path) -> std::io::Result<String> {
	let mut hasher = blake3::Hasher::new();
	hasher.update_reader(BufReader::new(File::open(path)?))?;
	Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Outcome of comparing a tree fingerprint with the recorded one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
	/// Same document as last time; nothing to do
	Unchanged,
	/// Document must be processed; carries the new fingerprint
	Process(String),
}

/// Decide whether a run with tree fingerprint `fingerprint` can be skipped
pub fn detect_change(config: &Config, fingerprint: &str, force_full: bool) -> ChangeDecision {
	if config.check_hash && !force_full && config.last_hash == fingerprint {
		ChangeDecision::Unchanged
	} else {
		ChangeDecision::Process(fingerprint.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_fingerprint_file_matches_bytes() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("tree.txt");
		std::fs::write(&path, b"|Movies\n||a.mp4\n").unwrap();
		assert_eq!(fingerprint_file(&path).unwrap(), fingerprint_bytes(b"|Movies\n||a.mp4\n"));
		assert_eq!(fingerprint_bytes(b"x").len(), 64);
	}

	#[test]
	fn test_path_fingerprint_is_stable_and_distinct() {
		assert_eq!(path_fingerprint("Show/e1.mp4"), path_fingerprint("Show/e1.mp4"));
		assert_ne!(path_fingerprint("Show/e1.mp4"), path_fingerprint("Show/e2.mp4"));
	}

	#[test]
	fn test_detect_change_unchanged() {
		let mut config = Config::default();
		config.last_hash = "abc".to_string();
		assert_eq!(detect_change(&config, "abc", false), ChangeDecision::Unchanged);
	}

	#[test]
	fn test_detect_change_bypasses() {
		let mut config = Config::default();
		config.last_hash = "abc".to_string();
		assert_eq!(detect_change(&config, "abc", true), ChangeDecision::Process("abc".to_string()));
		assert_eq!(detect_change(&config, "def", false), ChangeDecision::Process("def".to_string()));

		config.check_hash = false;
		assert_eq!(detect_change(&config, "abc", false), ChangeDecision::Process("abc".to_string()));
	}
}

// vim: ts=4
