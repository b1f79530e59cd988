//! Configuration validation functions

use super::ValidationError;

/// Longest accepted schedule interval (one week)
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validate an HTTP(S) URL setting
///
/// # Arguments
/// * `name` - Setting name used in the error message
/// * `url` - Value to check (must start with `http://` or `https://`)
pub fn validate_http_url(name: &str, url: &str) -> Result<(), ValidationError> {
	let url = url.trim();
	if url.is_empty() {
		return Err(ValidationError::InvalidSetting(format!("{} must not be empty", name)));
	}
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		return Err(ValidationError::InvalidSetting(format!(
			"{} must start with http:// or https://, got {:?}",
			name, url
		)));
	}
	Ok(())
}

/// Validate that an extension list yields at least one extension
pub fn validate_extension_count(count: usize) -> Result<(), ValidationError> {
	if count == 0 {
		return Err(ValidationError::InvalidSetting(
			"extensions must list at least one file extension".to_string(),
		));
	}
	Ok(())
}

/// Validate fetch timeout in seconds
pub fn validate_timeout_secs(timeout_secs: u64) -> Result<(), ValidationError> {
	if timeout_secs == 0 {
		return Err(ValidationError::InvalidSetting("Timeout must be greater than 0".to_string()));
	}
	if timeout_secs > 3600 {
		return Err(ValidationError::InvalidSetting(format!(
			"Timeout too large: {} seconds (max 3600)",
			timeout_secs
		)));
	}
	Ok(())
}

/// Validate the schedule interval (0 disables scheduling)
pub fn validate_interval_minutes(minutes: u64) -> Result<(), ValidationError> {
	if minutes > MAX_INTERVAL_MINUTES {
		return Err(ValidationError::InvalidSetting(format!(
			"Schedule interval too large: {} minutes (max {})",
			minutes, MAX_INTERVAL_MINUTES
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validate_http_url_valid() {
		assert!(validate_http_url("alist_url", "http://127.0.0.1:5244").is_ok());
		assert!(validate_http_url("alist_url", "https://media.example.com/").is_ok());
	}

	#[test]
	fn test_validate_http_url_empty() {
		let result = validate_http_url("alist_url", "  ");
		assert!(result.unwrap_err().to_string().contains("must not be empty"));
	}

	#[test]
	fn test_validate_http_url_bad_scheme() {
		let result = validate_http_url("tree_url", "ftp://example.com/tree.txt");
		assert!(result.unwrap_err().to_string().contains("http://"));
	}

	#[test]
	fn test_validate_extension_count() {
		assert!(validate_extension_count(1).is_ok());
		assert!(validate_extension_count(0).is_err());
	}

	#[test]
	fn test_validate_timeout_secs() {
		assert!(validate_timeout_secs(1).is_ok());
		assert!(validate_timeout_secs(3600).is_ok());
		assert!(validate_timeout_secs(0).is_err());
		assert!(validate_timeout_secs(3601).unwrap_err().to_string().contains("too large"));
	}

	#[test]
	fn test_validate_interval_minutes() {
		assert!(validate_interval_minutes(0).is_ok());
		assert!(validate_interval_minutes(60).is_ok());
		assert!(validate_interval_minutes(MAX_INTERVAL_MINUTES + 1).is_err());
	}
}

// vim: ts=4
