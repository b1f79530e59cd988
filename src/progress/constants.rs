//! Progress constants

/// Width of the progress bar display
pub const PROGRESS_BAR_WIDTH: usize = 30;

/// Bytes per megabyte for display conversions
pub const BYTES_PER_MB: f64 = 1_000_000.0;

/// Throttle terminal updates to this many milliseconds
pub const UPDATE_THROTTLE_MS: u128 = 100;

/// Percent at which each stage starts
pub const FETCH_START_PERCENT: f64 = 2.0;
pub const FETCH_END_PERCENT: f64 = 9.0;
pub const CONVERT_PERCENT: f64 = 10.0;
pub const DETECT_START_PERCENT: f64 = 12.0;
pub const PREPARE_PERCENT: f64 = 15.0;
pub const PARSE_START_PERCENT: f64 = 20.0;
pub const GENERATE_START_PERCENT: f64 = 40.0;
pub const GENERATE_END_PERCENT: f64 = 90.0;
pub const CLEAN_PERCENT: f64 = 95.0;
pub const DONE_PERCENT: f64 = 100.0;

/// Paths between two progress reports while generating pointer files
pub const GENERATE_PROGRESS_EVERY: usize = 500;

// vim: ts=4
