//! Utility modules for common functionality

pub mod signal;

pub use signal::shutdown_signal;

// vim: ts=4
