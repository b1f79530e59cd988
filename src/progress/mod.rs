//! Progress events and the terminal progress display
//!
//! Pipeline components report `(stage, percent, detail)` triples and log lines
//! through a [`ProgressSink`]. The shared [`crate::status::SyncStatus`] is the
//! main sink; [`CliProgressCallback`] renders the same events on stderr.

pub mod constants;

use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

/// Progress display constants
pub use constants::*;

/// Pipeline stage shown to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
	Idle,
	Downloading,
	Converting,
	Detecting,
	Preparing,
	Parsing,
	Generating,
	Cleaning,
	Completed,
	Skipped,
	Aborted,
}

impl Stage {
	/// Human-readable stage name
	pub fn label(self) -> &'static str {
		match self {
			Stage::Idle => "Idle",
			Stage::Downloading => "Downloading",
			Stage::Converting => "Converting",
			Stage::Detecting => "Checking for changes",
			Stage::Preparing => "Preparing",
			Stage::Parsing => "Parsing",
			Stage::Generating => "Generating",
			Stage::Cleaning => "Cleaning",
			Stage::Completed => "Completed",
			Stage::Skipped => "Unchanged",
			Stage::Aborted => "Aborted",
		}
	}
}

/// One progress report
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
	pub stage: Stage,
	pub percent: u8,
	pub detail: String,
}

/// Event emitted by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
	/// Stage/percent/detail update
	Progress(ProgressUpdate),

	/// Line for the operator log
	Log(String),
}

/// Receiver of pipeline events
pub trait ProgressSink: Send + Sync {
	/// Called for all pipeline events
	fn on_event(&self, _event: SyncEvent) {}

	/// Report a stage update; `percent` is clamped to 0..=100
	fn progress(&self, stage: Stage, percent: f64, detail: &str) {
		self.on_event(SyncEvent::Progress(ProgressUpdate {
			stage,
			percent: percent.clamp(0.0, 100.0) as u8,
			detail: detail.to_string(),
		}));
	}

	/// Append a line to the operator log
	fn log(&self, message: &str) {
		self.on_event(SyncEvent::Log(message.to_string()));
	}
}

impl<T: Fn(SyncEvent) + Send + Sync> ProgressSink for T {
	fn on_event(&self, event: SyncEvent) {
		self(event);
	}
}

/// Sink that drops every event
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Map `done` of `total` onto the percent range `start..end`
pub fn scaled(start: f64, end: f64, done: u64, total: u64) -> f64 {
	if total == 0 {
		return start;
	}
	let ratio = (done as f64 / total as f64).clamp(0.0, 1.0);
	start + ratio * (end - start)
}

/// CLI progress callback - draws a single updating progress line on stderr
pub struct CliProgressCallback {
	last_update: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
	pub fn new() -> Self {
		Self { last_update: Mutex::new(None) }
	}

	fn render(update: &ProgressUpdate) -> String {
		let filled = (update.percent as usize * PROGRESS_BAR_WIDTH) / 100;
		format!(
			"\r  {:<20} [{}{}] {:>3}% {}",
			update.stage.label(),
			"=".repeat(filled),
			" ".repeat(PROGRESS_BAR_WIDTH - filled),
			update.percent,
			update.detail
		)
	}
}

impl Default for CliProgressCallback {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressSink for CliProgressCallback {
	fn on_event(&self, event: SyncEvent) {
		match event {
			SyncEvent::Progress(update) => {
				let terminal = matches!(
					update.stage,
					Stage::Completed | Stage::Skipped | Stage::Aborted
				);

				// Throttle updates to avoid spamming, but always draw the final line
				let mut last = self.last_update.lock().unwrap_or_else(|e| e.into_inner());
				if let Some(at) = *last {
					if !terminal && at.elapsed().as_millis() < UPDATE_THROTTLE_MS {
						return;
					}
				}
				*last = Some(Instant::now());
				drop(last);

				let mut stderr = std::io::stderr();
				let _ = write!(stderr, "{}", Self::render(&update));
				if terminal {
					let _ = writeln!(stderr);
				}
				let _ = stderr.flush();
			}
			SyncEvent::Log(_) => {}
		}
	}
}


// vim: ts=4
