//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - chart generated without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - manifests missing, unreadable or malformed
pub const INPUT_ERROR: i32 = 2;

/// Conversion error - an object could not be turned into a template
pub const CONVERSION_ERROR: i32 = 3;

/// Partial output - the chart was written but some objects failed
pub const PARTIAL_ERROR: i32 = 4;

/// IO error - output not writable, chart path is a file, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
