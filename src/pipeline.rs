//! Sync pipeline orchestration
//!
//! [`SyncService`] sequences one run: download the tree dumps, convert them to
//! a canonical UTF-8 document, short-circuit when nothing changed, then parse
//! the tree, write pointer files and reconcile the index. Only one run is
//! active at a time; a second start while busy is rejected without side
//! effects.
//!
//! Every failure is caught once here, logged, and turned into the terminal
//! `Failed` state. The status stays observable throughout.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::{Config, ConfigStore, DataDir};
use crate::detect::{detect_change, fingerprint_file, ChangeDecision};
use crate::encoding::normalize_files;
use crate::error::SyncError;
use crate::fetch::{fetch_sources, HttpTreeFetcher, SourceSpec, TreeFetcher, SOURCE_IDS};
use crate::generate::{GenerateSummary, PointerGenerator};
use crate::index::ReconciliationIndex;
use crate::logging::*;
use crate::progress::*;
use crate::status::{RunGuard, RunState, SyncStatus};
use crate::tree::{count_lines, MediaPathScanner, PROGRESS_LINES};
use crate::validation::Validator;

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
	/// Rewrite every pointer file and ignore the recorded fingerprint
	pub force_full: bool,
	/// Process the existing canonical document instead of downloading
	pub use_local: bool,
}

/// Counters reported at the end of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
	/// Accepted media paths in the document, duplicates included
	pub paths_found: usize,
	/// Distinct paths in the current scan
	pub unique_paths: usize,
	pub written: usize,
	pub skipped: usize,
	pub rejected: usize,
	/// Index records dropped as stale
	pub removed: usize,
	/// Index records after reconciliation
	pub index_size: usize,
	/// Fingerprint recorded for this run, if change detection ran
	pub fingerprint: Option<String>,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
	Completed(RunSummary),
	/// Tree unchanged since the last run
	Skipped,
	/// Run aborted; carries the error text
	Failed(String),
	/// Another run was active
	Busy,
}

/// Result of a non-blocking start
#[derive(Debug)]
pub enum StartOutcome {
	Started(JoinHandle<RunOutcome>),
	Busy,
}

enum Finish {
	Completed(RunSummary),
	Skipped,
}

/// Owns everything a run needs; cheap to clone
#[derive(Clone)]
pub struct SyncService {
	data_dir: DataDir,
	store: Arc<dyn ConfigStore>,
	status: Arc<SyncStatus>,
	fetcher: Option<Arc<dyn TreeFetcher>>,
}

impl SyncService {
	/// Create a service using the HTTP fetcher built from each run's config
	pub fn new(data_dir: DataDir, store: Arc<dyn ConfigStore>, status: Arc<SyncStatus>) -> Self {
		SyncService { data_dir, store, status, fetcher: None }
	}

	/// Use `fetcher` for every run instead of building an HTTP client
	pub fn with_fetcher(mut self, fetcher: Arc<dyn TreeFetcher>) -> Self {
		self.fetcher = Some(fetcher);
		self
	}

	pub fn status(&self) -> &Arc<SyncStatus> {
		&self.status
	}

	pub fn data_dir(&self) -> &DataDir {
		&self.data_dir
	}

	pub fn load_config(&self) -> Result<Config, SyncError> {
		self.store.load()
	}

	/// Start a run in the background
	///
	/// Returns immediately. `Busy` means a run is active and nothing changed.
	pub fn start(&self, options: RunOptions) -> StartOutcome {
		let Some(guard) = self.status.try_begin() else {
			debug!("Sync already running, start rejected");
			return StartOutcome::Busy;
		};
		let service = self.clone();
		StartOutcome::Started(tokio::spawn(async move { service.execute(guard, options).await }))
	}

	/// Run to completion
	pub async fn run(&self, options: RunOptions) -> RunOutcome {
		match self.start(options) {
			StartOutcome::Started(handle) => match handle.await {
				Ok(outcome) => outcome,
				Err(e) => RunOutcome::Failed(e.to_string()),
			},
			StartOutcome::Busy => RunOutcome::Busy,
		}
	}

	async fn execute(self, _guard: RunGuard, options: RunOptions) -> RunOutcome {
		let status = Arc::clone(&self.status);
		match self.run_stages(options).await {
			Ok(Finish::Completed(summary)) => {
				let detail = format!(
					"{} paths, {} written, {} removed",
					summary.unique_paths, summary.written, summary.removed
				);
				info!(
					paths = summary.paths_found,
					written = summary.written,
					skipped = summary.skipped,
					removed = summary.removed,
					index = summary.index_size,
					"Sync completed"
				);
				status.log(&format!("✅ Sync completed: {}", detail));
				status.progress(Stage::Completed, DONE_PERCENT, &detail);
				status.finish(RunState::Completed);
				RunOutcome::Completed(summary)
			}
			Ok(Finish::Skipped) => {
				info!("Tree unchanged, nothing to do");
				status.log("Tree unchanged since last run, skipping");
				status.progress(Stage::Skipped, DONE_PERCENT, "No changes");
				status.finish(RunState::Skipped);
				RunOutcome::Skipped
			}
			Err(e) => {
				error!("Sync failed: {}", e);
				status.log(&format!("❌ {}: {}", e.kind(), e));
				status.progress(Stage::Aborted, 0.0, &e.to_string());
				status.finish(RunState::Failed);
				RunOutcome::Failed(e.to_string())
			}
		}
	}

	async fn run_stages(&self, options: RunOptions) -> Result<Finish, SyncError> {
		let mut config = self.store.load()?;
		config.validate()?;
		std::fs::create_dir_all(self.data_dir.root())?;
		let tree_path = self.data_dir.tree_path();

		let fingerprint = if options.use_local {
			if !tree_path.exists() {
				return Err(SyncError::config(format!(
					"no local tree document at {}",
					tree_path.display()
				)));
			}
			self.status.log("Using local tree document");
			None
		} else {
			let sources = self.sources(&config);
			if sources.iter().all(|s| s.url.is_none()) {
				return Err(SyncError::config("no tree source URL configured"));
			}
			self.status.log("Sync started");

			let fetcher = self.fetcher_for(&config)?;
			let credentials = config.credentials();
			let raw_files =
				fetch_sources(fetcher.as_ref(), &sources, credentials.as_ref(), self.status.as_ref())
					.await?;

			self.status.progress(Stage::Converting, CONVERT_PERCENT, "Converting UTF-16LE to UTF-8");
			let output = tree_path.clone();
			let bytes = tokio::task::spawn_blocking(move || {
				let inputs: Vec<&Path> = raw_files.iter().map(PathBuf::as_path).collect();
				normalize_files(&inputs, &output)
			})
			.await??;
			self.status.log(&format!("Converted tree document ({:.1} MB)", bytes as f64 / BYTES_PER_MB));

			self.status.progress(Stage::Detecting, DETECT_START_PERCENT, "Fingerprinting tree");
			let hashed = tree_path.clone();
			let fingerprint = tokio::task::spawn_blocking(move || fingerprint_file(&hashed)).await??;
			match detect_change(&config, &fingerprint, options.force_full) {
				ChangeDecision::Unchanged => return Ok(Finish::Skipped),
				ChangeDecision::Process(fingerprint) => {
					config.last_hash = fingerprint.clone();
					self.store.save(&config)?;
					Some(fingerprint)
				}
			}
		};

		let root = self.data_dir.strm_root(&config);
		let index_path = self.data_dir.index_path();
		let status = Arc::clone(&self.status);
		let mut summary = tokio::task::spawn_blocking(move || {
			build_pointers(&config, &tree_path, &root, &index_path, options.force_full, status.as_ref())
		})
		.await??;
		summary.fingerprint = fingerprint;
		Ok(Finish::Completed(summary))
	}

	fn sources(&self, config: &Config) -> Vec<SourceSpec> {
		config
			.source_urls()
			.into_iter()
			.enumerate()
			.map(|(slot, url)| SourceSpec {
				id: SOURCE_IDS[slot],
				url: url.map(str::to_string),
				dest: self.data_dir.raw_path(slot),
			})
			.collect()
	}

	fn fetcher_for(&self, config: &Config) -> Result<Arc<dyn TreeFetcher>, SyncError> {
		match &self.fetcher {
			Some(fetcher) => Ok(Arc::clone(fetcher)),
			None => Ok(Arc::new(HttpTreeFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?)),
		}
	}
}

/// Parse the canonical document, write pointer files and reconcile the index
fn build_pointers(
	config: &Config,
	tree_path: &Path,
	root: &Path,
	index_path: &Path,
	force_full: bool,
	sink: &dyn ProgressSink,
) -> Result<RunSummary, SyncError> {
	sink.progress(Stage::Preparing, PREPARE_PERCENT, "Preparing pointer directory");
	std::fs::create_dir_all(root)
		.map_err(|e| SyncError::storage(format!("cannot create {}: {}", root.display(), e)))?;
	let index = ReconciliationIndex::open(index_path)?;

	let total_lines = count_lines(BufReader::new(File::open(tree_path)?))?;
	sink.progress(Stage::Parsing, PARSE_START_PERCENT, &format!("0/{} lines", total_lines));

	let extensions = config.extension_set();
	let mut scanner =
		MediaPathScanner::new(BufReader::new(File::open(tree_path)?), &extensions, config.exclude_levels)
			.on_lines(PROGRESS_LINES, |lines| {
				sink.progress(
					Stage::Parsing,
					scaled(PARSE_START_PERCENT, GENERATE_START_PERCENT, lines as u64, total_lines as u64),
					&format!("{}/{} lines", lines, total_lines),
				);
			});
	let mut paths = Vec::new();
	for path in scanner.by_ref() {
		paths.push(path?);
	}
	sink.log(&format!("Parsed {} lines, {} media paths", scanner.lines_read(), paths.len()));

	let total = paths.len();
	sink.progress(Stage::Generating, GENERATE_START_PERCENT, &format!("0/{}", total));
	let mut generator = PointerGenerator::new(root, config, force_full);
	let mut generated = GenerateSummary::default();
	for (i, path) in paths.iter().enumerate() {
		generated.record(generator.process(path)?);
		let done = i + 1;
		if done % GENERATE_PROGRESS_EVERY == 0 || done == total {
			sink.progress(
				Stage::Generating,
				scaled(GENERATE_START_PERCENT, GENERATE_END_PERCENT, done as u64, total as u64),
				&format!("{}/{}", done, total),
			);
		}
	}
	if generated.rejected > 0 {
		sink.log(&format!("Skipped {} unsafe paths", generated.rejected));
	}

	sink.progress(Stage::Cleaning, CLEAN_PERCENT, "Reconciling index");
	let scan = generator.into_scan();
	let report = index.reconcile(&scan, root, config.sync_clean)?;
	if report.removed > 0 {
		sink.log(&format!(
			"Removed {} stale entries ({} pointer files deleted)",
			report.removed, report.files_deleted
		));
	}

	Ok(RunSummary {
		paths_found: total,
		unique_paths: scan.len(),
		written: generated.written,
		skipped: generated.skipped,
		rejected: generated.rejected,
		removed: report.removed,
		index_size: report.total,
		fingerprint: None,
	})
}


// vim: ts=4
