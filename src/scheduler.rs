//! Periodic sync trigger
//!
//! The scheduler wakes up every few seconds, re-reads the configuration and
//! starts a run once the configured interval has elapsed since the previous
//! scheduled start. It never queues: a tick that finds a run in progress just
//! waits for the next one.

use chrono::{DateTime, Local};
use std::future::Future;
use std::time::Duration;

use crate::logging::*;
use crate::pipeline::{RunOptions, StartOutcome, SyncService};

/// Delay between scheduler checks
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Delay before the first check after startup
pub const WARMUP: Duration = Duration::from_secs(5);

/// When the next run is due, `None` if the interval does not fit a timestamp
pub fn next_due(last_run: DateTime<Local>, interval: Duration) -> Option<DateTime<Local>> {
	let interval = chrono::Duration::from_std(interval).ok()?;
	last_run.checked_add_signed(interval)
}

/// Local wall-clock rendering of the next-run indicator
pub fn format_next_run(at: DateTime<Local>) -> String {
	at.format("%H:%M:%S").to_string()
}

/// Background task driving scheduled runs
pub struct Scheduler {
	service: SyncService,
	warmup: Duration,
	tick: Duration,
}

impl Scheduler {
	pub fn new(service: SyncService) -> Self {
		Scheduler { service, warmup: WARMUP, tick: TICK_INTERVAL }
	}

	/// Override the warm-up delay and tick period
	pub fn with_timing(mut self, warmup: Duration, tick: Duration) -> Self {
		self.warmup = warmup;
		self.tick = tick;
		self
	}

	/// Tick until `shutdown` resolves
	///
	/// The interval is measured from the end of the warm-up, then from each
	/// scheduled start. A run already in flight when shutdown fires is not
	/// cancelled.
	pub async fn run_until<F>(self, shutdown: F)
	where
		F: Future<Output = ()>,
	{
		tokio::pin!(shutdown);

		tokio::select! {
			_ = &mut shutdown => return,
			_ = tokio::time::sleep(self.warmup) => {}
		}

		info!("Scheduler started");
		let mut last_run = Local::now();
		let mut ticker = tokio::time::interval(self.tick);
		loop {
			tokio::select! {
				_ = &mut shutdown => break,
				_ = ticker.tick() => {
					self.tick_at(&mut last_run, Local::now());
				}
			}
		}
		self.service.status().set_next_run(None);
		info!("Scheduler stopped");
	}

	/// One scheduler check at time `now`; returns whether a run was started
	pub fn tick_at(&self, last_run: &mut DateTime<Local>, now: DateTime<Local>) -> bool {
		let status = self.service.status();
		let config = match self.service.load_config() {
			Ok(config) => config,
			Err(e) => {
				warn!("Scheduler could not load settings: {}", e);
				return false;
			}
		};

		let Some(due) = config.schedule_interval().and_then(|interval| next_due(*last_run, interval))
		else {
			status.set_next_run(None);
			return false;
		};
		status.set_next_run(Some(format_next_run(due)));

		if now < due || status.is_running() {
			return false;
		}
		match self.service.start(RunOptions::default()) {
			StartOutcome::Started(_) => {
				info!("Scheduled sync started");
				*last_run = now;
				true
			}
			StartOutcome::Busy => false,
		}
	}
}


// vim: ts=4
