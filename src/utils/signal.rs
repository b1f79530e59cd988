//! Shutdown signal for long-running commands

use tokio::signal;

use crate::logging::*;

/// Resolve once SIGTERM or SIGINT arrives
///
/// Falls back to Ctrl-C alone when the SIGTERM handler cannot be installed.
#[cfg(unix)]
pub async fn shutdown_signal() {
	use signal::unix::{signal as unix_signal, SignalKind};

	let mut sigterm = match unix_signal(SignalKind::terminate()) {
		Ok(stream) => stream,
		Err(e) => {
			warn!("Failed to setup SIGTERM handler: {}. Only Ctrl-C will stop the daemon.", e);
			ctrl_c().await;
			return;
		}
	};

	tokio::select! {
		_ = sigterm.recv() => debug!("Received SIGTERM, shutting down"),
		_ = ctrl_c() => {}
	}
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
	ctrl_c().await;
}

async fn ctrl_c() {
	match signal::ctrl_c().await {
		Ok(()) => debug!("Received SIGINT, shutting down"),
		Err(e) => {
			// Without a handler there is nothing to wait for
			warn!("Failed to setup SIGINT handler: {}", e);
			std::future::pending::<()>().await;
		}
	}
}

// vim: ts=4
