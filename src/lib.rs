//! # strmsync - Pointer file mirror for remote media libraries
//!
//! strmsync turns a textual directory dump of a remote media library into a
//! local tree of `.strm` pointer files. Each pointer file holds a playback URL
//! on the media gateway instead of the media bytes.
//!
//! A run downloads one or two UTF-16LE tree dumps, converts them into a single
//! UTF-8 document, skips the rest when the document did not change, then
//! parses the indented tree, writes missing pointer files and deletes the ones
//! whose media vanished.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strmsync::{DataDir, JsonConfigStore, RunOptions, SyncService, SyncStatus};
//!
//! #[tokio::main]
//! async fn main() {
//!     let data_dir = DataDir::new("./data");
//!     let store = Arc::new(JsonConfigStore::new(data_dir.settings_path()));
//!     let service = SyncService::new(data_dir, store, Arc::new(SyncStatus::new()));
//!     let outcome = service.run(RunOptions::default()).await;
//!     println!("{:?}", outcome);
//! }
//! ```

pub mod config;
pub mod detect;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod generate;
pub mod index;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod status;
pub mod tree;
pub mod utils;
pub mod validation;

// Re-export commonly used types and functions
pub use config::{Config, ConfigStore, DataDir, JsonConfigStore, MemoryConfigStore, SyncMode};
pub use error::SyncError;
pub use fetch::{HttpTreeFetcher, TreeFetcher};
pub use index::ReconciliationIndex;
pub use pipeline::{RunOptions, RunOutcome, RunSummary, StartOutcome, SyncService};
pub use progress::{ProgressSink, Stage, SyncEvent};
pub use scheduler::Scheduler;
pub use status::{RunState, StatusSnapshot, SyncStatus};

// vim: ts=4
