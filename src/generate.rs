//! Pointer (`.strm`) file generation

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{Config, SyncMode};
use crate::detect::path_fingerprint;
use crate::error::SyncError;
use crate::logging::*;
use crate::validation::validate_media_path;

/// Extension appended to every pointer file
pub const POINTER_EXTENSION: &str = ".strm";

/// Characters left unescaped in the playback path: alphanumerics, `/` and `-_.~`
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'/').remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Pointer file location for a relative media path
pub fn pointer_path(root: &Path, rel_path: &str) -> PathBuf {
	root.join(format!("{}{}", rel_path, POINTER_EXTENSION))
}

/// Playback URL stored in a pointer file
///
/// `<base>/d` followed by the percent-encoded `/<mount>/<rel_path>`.
pub fn playback_url(base_url: &str, mount_path: &str, rel_path: &str) -> String {
	let raw = format!("/{}/{}", mount_path.trim_matches('/'), rel_path);
	format!("{}/d{}", base_url.trim_end_matches('/'), utf8_percent_encode(&raw, PATH_ESCAPE))
}

/// Paths seen in the current scan, keyed by path fingerprint
#[derive(Debug, Default, Clone)]
pub struct CurrentScan {
	entries: BTreeMap<String, String>,
}

impl CurrentScan {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a path; returns false if it was already registered
	pub fn insert(&mut self, rel_path: &str) -> bool {
		let key = path_fingerprint(rel_path);
		if self.entries.contains_key(&key) {
			return false;
		}
		self.entries.insert(key, rel_path.to_string());
		true
	}

	pub fn contains_key(&self, fingerprint: &str) -> bool {
		self.entries.contains_key(fingerprint)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// `(fingerprint, relative path)` pairs in fingerprint order
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

/// What happened to one relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
	Written,
	SkippedExisting,
	Rejected,
}

/// Counters for one generation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
	pub processed: usize,
	pub written: usize,
	pub skipped: usize,
	pub rejected: usize,
}

impl GenerateSummary {
	pub fn record(&mut self, outcome: WriteOutcome) {
		self.processed += 1;
		match outcome {
			WriteOutcome::Written => self.written += 1,
			WriteOutcome::SkippedExisting => self.skipped += 1,
			WriteOutcome::Rejected => self.rejected += 1,
		}
	}
}

/// Writes pointer files under one root
pub struct PointerGenerator {
	root: PathBuf,
	base_url: String,
	mount_path: String,
	overwrite: bool,
	scan: CurrentScan,
}

impl PointerGenerator {
	/// Create a generator; existing files are rewritten in `full` mode or when `force_full`
	pub fn new(root: impl Into<PathBuf>, config: &Config, force_full: bool) -> Self {
		PointerGenerator {
			root: root.into(),
			base_url: config.alist_url.clone(),
			mount_path: config.mount_path.clone(),
			overwrite: force_full || config.sync_mode == SyncMode::Full,
			scan: CurrentScan::new(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Process one relative media path
	///
	/// Every accepted path lands in the current scan exactly once, whether or
	/// not its file had to be written.
	pub fn process(&mut self, rel_path: &str) -> Result<WriteOutcome, SyncError> {
		if let Err(e) = validate_media_path(Path::new(rel_path)) {
			warn!("Skipping {:?}: {}", rel_path, e);
			return Ok(WriteOutcome::Rejected);
		}

		let target = pointer_path(&self.root, rel_path);
		let outcome = if self.overwrite || !target.exists() {
			if let Some(parent) = target.parent() {
				std::fs::create_dir_all(parent).map_err(|e| {
					SyncError::storage(format!("cannot create {}: {}", parent.display(), e))
				})?;
			}
			let url = playback_url(&self.base_url, &self.mount_path, rel_path);
			std::fs::write(&target, url).map_err(|e| {
				SyncError::storage(format!("cannot write {}: {}", target.display(), e))
			})?;
			WriteOutcome::Written
		} else {
			WriteOutcome::SkippedExisting
		};

		self.scan.insert(rel_path);
		Ok(outcome)
	}

	/// Hand over the current scan for reconciliation
	pub fn into_scan(self) -> CurrentScan {
		self.scan
	}
}


// vim: ts=4
