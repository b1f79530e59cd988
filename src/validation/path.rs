//! Path validation functions

use std::path::{Component, Path};

use super::ValidationError;

/// Check if a path is safe (no parent directory references)
///
/// Tree dumps are external input; a name like `..` must not let a pointer
/// file escape the pointer root.
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Check if path has no absolute components
pub fn is_path_relative(path: &Path) -> bool {
	!path.is_absolute() && !path.has_root()
}

/// Validate that a relative media path can be placed under the pointer root
///
/// # Returns
/// `Ok(())` if valid, `Err(ValidationError)` if the path is absolute or
/// contains parent directory references
pub fn validate_media_path(path: &Path) -> Result<(), ValidationError> {
	if !is_path_relative(path) {
		return Err(ValidationError::UnsafePath(format!(
			"Path must be relative, got absolute path: {:?}",
			path
		)));
	}
	if !is_path_safe(path) {
		return Err(ValidationError::UnsafePath(format!(
			"Path contains parent directory reference (..): {:?}",
			path
		)));
	}
	Ok(())
}


// vim: ts=4
