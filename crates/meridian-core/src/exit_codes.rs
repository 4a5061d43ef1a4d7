//! Process exit codes
//!
//! External tooling depends on these values; they must not change.

/// Success
pub const SUCCESS: i32 = 0;

/// Bad or illegal flags, flag combinations or environment variables.
/// The user must modify their command line.
pub const BAD_ARGV: i32 = 2;

/// Local environmental error
pub const LOCAL_ENVIRONMENTAL_ERROR: i32 = 36;

/// Unexpected termination. Last resort.
pub const INTERNAL_ERROR: i32 = 37;
