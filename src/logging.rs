//! Tracing setup and the macro prelude used across strmsync
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Downloaded primary tree");
//! ```
//!
//! Operator-facing run logs go through [`crate::status::SyncStatus`]; these
//! macros carry the diagnostic stream.

pub use tracing::{debug, error, info, warn};

/// Install the stderr subscriber
///
/// The filter comes from `RUST_LOG` and falls back to `info`, e.g.
/// `RUST_LOG=strmsync::fetch=debug strmsync daemon`.
pub fn init_tracing() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

// vim: ts=4
