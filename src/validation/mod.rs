//! Input checks shared by the config loader and the pointer generator
//!
//! - [`config`]: settings that must hold before a run starts
//! - [`path`]: relative media paths must stay below the pointer root

use std::error::Error;
use std::fmt;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Rejected input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// A setting is missing or out of range
	InvalidSetting(String),
	/// A media path would escape the pointer root
	UnsafePath(String),
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::InvalidSetting(msg) => write!(f, "invalid setting: {}", msg),
			ValidationError::UnsafePath(msg) => write!(f, "unsafe media path: {}", msg),
		}
	}
}

impl Error for ValidationError {}

/// Types that can check themselves before use
pub trait Validator {
	fn validate(&self) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validation_error_display() {
		let err = ValidationError::InvalidSetting("alist_url must not be empty".to_string());
		assert_eq!(err.to_string(), "invalid setting: alist_url must not be empty");

		let err = ValidationError::UnsafePath("../x.mp4".to_string());
		assert!(err.to_string().starts_with("unsafe media path"));
	}
}

// vim: ts=4
