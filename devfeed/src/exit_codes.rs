//! Stable exit codes for `devfeed` commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, unreachable backend or any other error.
pub const INVALID: i32 = 1;
/// `devfeed peek` found no developers left to show.
pub const EXHAUSTED: i32 = 2;
