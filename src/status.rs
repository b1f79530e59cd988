//! Shared run status: single-flight guard, progress and the bounded operator log
//!
//! One [`SyncStatus`] lives for the whole process. The pipeline writes to it
//! while a run is active; any number of observers may call
//! [`SyncStatus::snapshot`] at any time, including mid-run and after a failure.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::progress::{ProgressSink, ProgressUpdate, Stage, SyncEvent};

/// Number of log lines retained
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Lifecycle of the most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
	Idle,
	Running,
	Completed,
	Skipped,
	Failed,
}

/// Point-in-time copy of the status, safe to hand to a presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
	pub state: RunState,
	pub running: bool,
	pub stage: Stage,
	pub step: String,
	pub percent: u8,
	pub detail: String,
	pub next_run: Option<String>,
	pub logs: Vec<String>,
}

#[derive(Debug)]
struct StatusInner {
	state: RunState,
	progress: ProgressUpdate,
	next_run: Option<String>,
	logs: VecDeque<String>,
}

/// Process-wide sync status
pub struct SyncStatus {
	running: AtomicBool,
	inner: Mutex<StatusInner>,
	log_capacity: usize,
	observer: Option<Arc<dyn ProgressSink>>,
}

impl SyncStatus {
	pub fn new() -> Self {
		Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
	}

	pub fn with_log_capacity(log_capacity: usize) -> Self {
		let status = SyncStatus {
			running: AtomicBool::new(false),
			inner: Mutex::new(StatusInner {
				state: RunState::Idle,
				progress: idle_progress(),
				next_run: None,
				logs: VecDeque::new(),
			}),
			log_capacity: log_capacity.max(1),
			observer: None,
		};
		status.push_log("System ready");
		status
	}

	/// Forward every event to `observer` as well
	pub fn with_observer(mut self, observer: Arc<dyn ProgressSink>) -> Self {
		self.observer = Some(observer);
		self
	}

	/// Is a run active right now?
	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	/// Claim the single run slot
	///
	/// Returns `None` when a run is already active. On success the per-run
	/// progress is reset and the state becomes `Running` until the guard is
	/// dropped.
	pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
		if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
			return None;
		}
		{
			let mut inner = self.lock();
			inner.state = RunState::Running;
			inner.progress = ProgressUpdate {
				stage: Stage::Preparing,
				percent: 0,
				detail: "Starting".to_string(),
			};
		}
		Some(RunGuard { status: Arc::clone(self) })
	}

	/// Record the terminal state of the active run
	pub fn finish(&self, state: RunState) {
		self.lock().state = state;
	}

	/// Update the scheduler's next-run indicator
	pub fn set_next_run(&self, next_run: Option<String>) {
		self.lock().next_run = next_run;
	}

	pub fn snapshot(&self) -> StatusSnapshot {
		let inner = self.lock();
		StatusSnapshot {
			state: inner.state,
			running: self.is_running(),
			stage: inner.progress.stage,
			step: inner.progress.stage.label().to_string(),
			percent: inner.progress.percent,
			detail: inner.progress.detail.clone(),
			next_run: inner.next_run.clone(),
			logs: inner.logs.iter().cloned().collect(),
		}
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
		self.inner.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn push_log(&self, message: &str) {
		let line = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), message);
		let mut inner = self.lock();
		inner.logs.push_back(line);
		while inner.logs.len() > self.log_capacity {
			inner.logs.pop_front();
		}
	}
}

impl Default for SyncStatus {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressSink for SyncStatus {
	fn on_event(&self, event: SyncEvent) {
		match &event {
			SyncEvent::Progress(update) => self.lock().progress = update.clone(),
			SyncEvent::Log(message) => self.push_log(message),
		}
		if let Some(observer) = &self.observer {
			observer.on_event(event);
		}
	}
}

fn idle_progress() -> ProgressUpdate {
	ProgressUpdate { stage: Stage::Idle, percent: 0, detail: "Waiting for a run".to_string() }
}

/// Guard that releases the run slot when dropped
///
/// Dropping the guard while the state is still `Running` (the run unwound
/// without reaching a terminal state) marks the run as failed.
pub struct RunGuard {
	status: Arc<SyncStatus>,
}

impl Drop for RunGuard {
	fn drop(&mut self) {
		{
			let mut inner = self.status.lock();
			if inner.state == RunState::Running {
				inner.state = RunState::Failed;
			}
		}
		self.status.running.store(false, Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_single_flight_guard() {
		let status = Arc::new(SyncStatus::new());
		let guard = status.try_begin().expect("first run should start");
		assert!(status.is_running());
		assert!(status.try_begin().is_none());

		status.finish(RunState::Completed);
		drop(guard);
		assert!(!status.is_running());
		assert_eq!(status.snapshot().state, RunState::Completed);
		assert!(status.try_begin().is_some());
	}

	#[test]
	fn test_guard_drop_without_finish_marks_failed() {
		let status = Arc::new(SyncStatus::new());
		drop(status.try_begin().unwrap());
		assert_eq!(status.snapshot().state, RunState::Failed);
		assert!(!status.snapshot().running);
	}

	#[test]
	fn test_begin_resets_progress() {
		let status = Arc::new(SyncStatus::new());
		status.progress(Stage::Aborted, 0.0, "see log");
		let _guard = status.try_begin().unwrap();
		let snap = status.snapshot();
		assert_eq!(snap.state, RunState::Running);
		assert_eq!(snap.stage, Stage::Preparing);
	}

	#[test]
	fn test_log_is_bounded() {
		let status = SyncStatus::with_log_capacity(3);
		for i in 0..10 {
			status.log(&format!("line {}", i));
		}
		let logs = status.snapshot().logs;
		assert_eq!(logs.len(), 3);
		assert!(logs[0].ends_with("line 7"));
		assert!(logs[2].ends_with("line 9"));
		assert!(logs[2].starts_with('['));
	}

	#[test]
	fn test_progress_forwarded_to_observer() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);
		let status = SyncStatus::new().with_observer(Arc::new(move |event: SyncEvent| {
			seen_clone.lock().unwrap().push(event);
		}));

		status.progress(Stage::Parsing, 25.0, "3000 lines");
		let snap = status.snapshot();
		assert_eq!(snap.stage, Stage::Parsing);
		assert_eq!(snap.percent, 25);
		assert_eq!(snap.detail, "3000 lines");
		assert_eq!(seen.lock().unwrap().len(), 1);
	}

	#[test]
	fn test_next_run_indicator() {
		let status = SyncStatus::new();
		status.set_next_run(Some("12:30:00".to_string()));
		assert_eq!(status.snapshot().next_run.as_deref(), Some("12:30:00"));
		status.set_next_run(None);
		assert!(status.snapshot().next_run.is_none());
	}
}

// vim: ts=4
