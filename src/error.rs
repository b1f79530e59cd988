//! Error types for strmsync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::validation::ValidationError;

/// Main error type for a sync run
///
/// Every variant is fatal for the current run. Malformed tree lines are never
/// reported here; the parser tolerates them.
#[derive(Debug)]
pub enum SyncError {
	/// A required setting is missing or invalid
	Config { message: String },

	/// Network or HTTP failure while downloading a tree dump
	Fetch { source_id: String, message: String },

	/// Conversion produced no usable canonical document
	Encoding { message: String },

	/// Durable record or pointer-file storage failure
	Storage { message: String },

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	pub fn config(message: impl Into<String>) -> Self {
		SyncError::Config { message: message.into() }
	}

	pub fn fetch(source_id: impl Into<String>, message: impl Into<String>) -> Self {
		SyncError::Fetch { source_id: source_id.into(), message: message.into() }
	}

	pub fn encoding(message: impl Into<String>) -> Self {
		SyncError::Encoding { message: message.into() }
	}

	pub fn storage(message: impl Into<String>) -> Self {
		SyncError::Storage { message: message.into() }
	}

	/// Short kind label used in log lines
	pub fn kind(&self) -> &'static str {
		match self {
			SyncError::Config { .. } => "ConfigError",
			SyncError::Fetch { .. } => "FetchError",
			SyncError::Encoding { .. } => "EncodingError",
			SyncError::Storage { .. } | SyncError::Io(_) => "StorageError",
			SyncError::Other { .. } => "Error",
		}
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Config { message } => write!(f, "Invalid configuration: {}", message),
			SyncError::Fetch { source_id, message } => {
				write!(f, "Failed to download tree from {} source: {}", source_id, message)
			}
			SyncError::Encoding { message } => write!(f, "Encoding failed: {}", message),
			SyncError::Storage { message } => write!(f, "Storage error: {}", message),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<ValidationError> for SyncError {
	fn from(e: ValidationError) -> Self {
		SyncError::Config { message: e.to_string() }
	}
}

impl From<serde_json::Error> for SyncError {
	fn from(e: serde_json::Error) -> Self {
		SyncError::Config { message: format!("Failed to serialize settings: {}", e) }
	}
}

impl From<json5::Error> for SyncError {
	fn from(e: json5::Error) -> Self {
		SyncError::Config { message: format!("Failed to parse settings: {}", e) }
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::Other { message: format!("Worker task failed: {}", e) }
	}
}

macro_rules! storage_from {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for SyncError {
				fn from(e: $ty) -> Self {
					SyncError::Storage { message: e.to_string() }
				}
			}
		)*
	};
}

storage_from!(
	redb::Error,
	redb::DatabaseError,
	redb::TransactionError,
	redb::TableError,
	redb::StorageError,
	redb::CommitError,
);


// vim: ts=4
