//! Configuration for strmsync
//!
//! Settings live in a single JSON document (`settings.json`) inside the data
//! directory. The file is created with defaults on first load, re-read at the
//! start of every run and updated in place when the change detector records a
//! new fingerprint.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::SyncError;
use crate::logging::*;
use crate::tree::ExtensionSet;
use crate::validation::{self, ValidationError, Validator};

/// Default accepted extensions (video, audio and subtitle files)
pub const DEFAULT_EXTENSIONS: &str = "mp4,mkv,avi,mov,ts,iso,rmvb,wmv,m4v,mpg,flac,mp3,ass,srt";

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Operator-controlled settings for a sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	// ========================================================================
	// SOURCES
	// ========================================================================
	/// URL of the primary directory-tree dump
	pub tree_url: String,

	/// Optional URL of a second dump, appended after the primary one
	pub tree_url_secondary: String,

	/// Basic-auth user for downloading the dumps (empty = no auth)
	pub alist_user: String,

	/// Basic-auth password for downloading the dumps
	pub alist_pass: String,

	/// Download timeout in seconds
	pub fetch_timeout_secs: u64,

	// ========================================================================
	// POINTER FILES
	// ========================================================================
	/// Base URL of the playback gateway (pointer files point at `<alist_url>/d/...`)
	pub alist_url: String,

	/// Mount path prefix of the library on the gateway
	pub mount_path: String,

	/// Root directory receiving the `.strm` tree
	pub strm_dir: PathBuf,

	/// Number of leading ancestry segments dropped from every media path
	pub exclude_levels: usize,

	/// Accepted extensions, comma separated (ASCII or full-width commas)
	pub extensions: String,

	// ========================================================================
	// SYNC BEHAVIOR
	// ========================================================================
	/// Rewrite every pointer file (`full`) or only missing ones (`incremental`)
	pub sync_mode: SyncMode,

	/// Delete pointer files whose media path vanished from the tree
	pub sync_clean: bool,

	/// Skip the run when the tree fingerprint is unchanged
	pub check_hash: bool,

	/// Scheduler interval in minutes (None or 0 disables scheduling)
	pub sync_interval_minutes: Option<u64>,

	/// Fingerprint of the last processed tree document
	pub last_hash: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			// Sources
			tree_url: String::new(),
			tree_url_secondary: String::new(),
			alist_user: String::new(),
			alist_pass: String::new(),
			fetch_timeout_secs: 300,

			// Pointer files
			alist_url: String::new(),
			mount_path: "/115".to_string(),
			strm_dir: PathBuf::from("strm"),
			exclude_levels: 2,
			extensions: DEFAULT_EXTENSIONS.to_string(),

			// Sync behavior
			sync_mode: SyncMode::Incremental,
			sync_clean: true,
			check_hash: true,
			sync_interval_minutes: None,
			last_hash: String::new(),
		}
	}
}

impl Config {
	/// Basic-auth credentials, if both user and password are set
	pub fn credentials(&self) -> Option<Credentials> {
		if self.alist_user.is_empty() || self.alist_pass.is_empty() {
			return None;
		}
		Some(Credentials { username: self.alist_user.clone(), password: self.alist_pass.clone() })
	}

	/// Configured source URLs in merge order, `None` for an unset slot
	pub fn source_urls(&self) -> [Option<&str>; 2] {
		fn pick(s: &str) -> Option<&str> {
			let s = s.trim();
			if s.is_empty() {
				None
			} else {
				Some(s)
			}
		}
		[pick(&self.tree_url), pick(&self.tree_url_secondary)]
	}

	/// Parsed accepted-extension set
	pub fn extension_set(&self) -> ExtensionSet {
		ExtensionSet::parse(&self.extensions)
	}

	/// Scheduler interval, if scheduling is enabled
	pub fn schedule_interval(&self) -> Option<Duration> {
		match self.sync_interval_minutes {
			Some(minutes) if minutes > 0 => Some(Duration::from_secs(minutes.saturating_mul(60))),
			_ => None,
		}
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		validation::validate_http_url("alist_url", &self.alist_url)?;
		for (name, url) in [("tree_url", &self.tree_url), ("tree_url_secondary", &self.tree_url_secondary)]
		{
			if !url.trim().is_empty() {
				validation::validate_http_url(name, url)?;
			}
		}
		validation::validate_extension_count(self.extension_set().len())?;
		validation::validate_timeout_secs(self.fetch_timeout_secs)?;
		validation::validate_interval_minutes(self.sync_interval_minutes.unwrap_or(0))?;
		Ok(())
	}
}

/// Basic-auth credentials for the tree download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

/// Pointer-file write policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
	/// Write only pointer files that do not exist yet
	#[default]
	Incremental,
	/// Rewrite every pointer file on every run
	Full,
}

// ============================================================================
// DATA DIRECTORY LAYOUT
// ============================================================================

/// Files kept in the data directory
#[derive(Debug, Clone)]
pub struct DataDir {
	root: PathBuf,
}

impl DataDir {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		DataDir { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Settings document
	pub fn settings_path(&self) -> PathBuf {
		self.root.join("settings.json")
	}

	/// Reconciliation index database
	pub fn index_path(&self) -> PathBuf {
		self.root.join("index.redb")
	}

	/// Canonical UTF-8 tree document
	pub fn tree_path(&self) -> PathBuf {
		self.root.join("tree.txt")
	}

	/// Raw download target for source `slot` (0 = primary)
	pub fn raw_path(&self, slot: usize) -> PathBuf {
		if slot == 0 {
			self.root.join("tree.raw")
		} else {
			self.root.join(format!("tree{}.raw", slot + 1))
		}
	}

	/// Resolve the pointer root: relative `strm_dir` values live under the data directory
	pub fn strm_root(&self, config: &Config) -> PathBuf {
		if config.strm_dir.is_absolute() {
			config.strm_dir.clone()
		} else {
			self.root.join(&config.strm_dir)
		}
	}
}

// ============================================================================
// CONFIG STORES
// ============================================================================

/// Durable home of the configuration
pub trait ConfigStore: Send + Sync {
	/// Load the configuration, materializing defaults on first use
	fn load(&self) -> Result<Config, SyncError>;

	/// Persist the configuration
	fn save(&self, config: &Config) -> Result<(), SyncError>;
}

/// JSON file backed configuration store
pub struct JsonConfigStore {
	path: PathBuf,
}

impl JsonConfigStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		JsonConfigStore { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigStore for JsonConfigStore {
	fn load(&self) -> Result<Config, SyncError> {
		if !self.path.exists() {
			info!("Creating default settings at {}", self.path.display());
			let config = Config::default();
			self.save(&config)?;
			return Ok(config);
		}

		let contents = std::fs::read_to_string(&self.path)?;
		let config: Config = json5::from_str(&contents)?;
		Ok(config)
	}

	fn save(&self, config: &Config) -> Result<(), SyncError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}

		// Write then rename so a crash never leaves a truncated settings file
		let json = serde_json::to_string_pretty(config)?;
		let tmp = self.path.with_extension("json.tmp");
		std::fs::write(&tmp, json)?;
		std::fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}

/// In-memory configuration store
#[derive(Default)]
pub struct MemoryConfigStore {
	config: Mutex<Config>,
}

impl MemoryConfigStore {
	pub fn new(config: Config) -> Self {
		MemoryConfigStore { config: Mutex::new(config) }
	}
}

impl ConfigStore for MemoryConfigStore {
	fn load(&self) -> Result<Config, SyncError> {
		Ok(self.config.lock().unwrap_or_else(|e| e.into_inner()).clone())
	}

	fn save(&self, config: &Config) -> Result<(), SyncError> {
		*self.config.lock().unwrap_or_else(|e| e.into_inner()) = config.clone();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.mount_path, "/115");
		assert_eq!(config.exclude_levels, 2);
		assert_eq!(config.sync_mode, SyncMode::Incremental);
		assert!(config.sync_clean);
		assert!(config.check_hash);
		assert!(config.schedule_interval().is_none());
	}

	#[test]
	fn test_credentials_require_both_fields() {
		let mut config = Config::default();
		config.alist_user = "admin".to_string();
		assert!(config.credentials().is_none());
		config.alist_pass = "secret".to_string();
		let creds = config.credentials().unwrap();
		assert_eq!(creds.username, "admin");
		assert_eq!(creds.password, "secret");
	}

	#[test]
	fn test_source_urls_skip_blank() {
		let mut config = Config::default();
		config.tree_url = "http://a/tree.txt".to_string();
		config.tree_url_secondary = "   ".to_string();
		assert_eq!(config.source_urls(), [Some("http://a/tree.txt"), None]);
	}

	#[test]
	fn test_schedule_interval_zero_disables() {
		let mut config = Config::default();
		config.sync_interval_minutes = Some(0);
		assert!(config.schedule_interval().is_none());
		config.sync_interval_minutes = Some(30);
		assert_eq!(config.schedule_interval(), Some(Duration::from_secs(1800)));
	}

	#[test]
	fn test_validate_requires_playback_url() {
		let config = Config::default();
		assert!(config.validate().unwrap_err().to_string().contains("alist_url"));

		let mut config = Config::default();
		config.alist_url = "http://127.0.0.1:5244".to_string();
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_empty_extension_list() {
		let mut config = Config::default();
		config.alist_url = "http://127.0.0.1:5244".to_string();
		config.extensions = " , ，".to_string();
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_sync_mode_serialization() {
		let json = serde_json::to_string(&SyncMode::Full).unwrap();
		assert_eq!(json, "\"full\"");
		let mode: SyncMode = serde_json::from_str("\"incremental\"").unwrap();
		assert_eq!(mode, SyncMode::Incremental);
	}

	#[test]
	fn test_json_store_creates_defaults() {
		let tmp = TempDir::new().unwrap();
		let store = JsonConfigStore::new(tmp.path().join("nested/settings.json"));

		let config = store.load().unwrap();
		assert_eq!(config, Config::default());
		assert!(store.path().exists());
	}

	#[test]
	fn test_json_store_round_trip_and_partial_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		std::fs::write(&path, "{ alist_url: 'http://gw:5244', sync_mode: 'full', }").unwrap();

		let store = JsonConfigStore::new(&path);
		let mut config = store.load().unwrap();
		assert_eq!(config.alist_url, "http://gw:5244");
		assert_eq!(config.sync_mode, SyncMode::Full);
		assert_eq!(config.exclude_levels, 2);

		config.last_hash = "abc".to_string();
		store.save(&config).unwrap();
		assert_eq!(store.load().unwrap().last_hash, "abc");
	}

	#[test]
	fn test_data_dir_layout() {
		let data = DataDir::new("/srv/strmsync");
		assert_eq!(data.raw_path(0), PathBuf::from("/srv/strmsync/tree.raw"));
		assert_eq!(data.raw_path(1), PathBuf::from("/srv/strmsync/tree2.raw"));

		let mut config = Config::default();
		assert_eq!(data.strm_root(&config), PathBuf::from("/srv/strmsync/strm"));
		config.strm_dir = PathBuf::from("/media/strm");
		assert_eq!(data.strm_root(&config), PathBuf::from("/media/strm"));
	}
}

// vim: ts=4
