//! Numeric limits and defaults for the failure core.
//!
//! Single source of truth; imported by the library and the diagnostic
//! binary alike.

use static_assertions::const_assert;

/// Maximum number of stack frames captured for one failure.
pub const MAX_TRACE_DEPTH: usize = 1024;

/// Default number of stack frames printed by the tracing hook.
pub const DEFAULT_TRACE_DEPTH: usize = 64;

/// Process exit code used when a failure reaches the top-level handler.
pub const UNCAUGHT_FAILURE_EXIT_CODE: u8 = 101;

/// Default configuration file path for the diagnostic runner.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/quark/diagnostic.toml";

/// Placeholder file name for frames without a known origin.
pub const UNKNOWN_FILE: &str = "<unknown>";

const_assert!(DEFAULT_TRACE_DEPTH > 0 && DEFAULT_TRACE_DEPTH <= MAX_TRACE_DEPTH);
const_assert!(UNCAUGHT_FAILURE_EXIT_CODE != 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_TRACE_DEPTH > 0);
        assert!(DEFAULT_TRACE_DEPTH <= MAX_TRACE_DEPTH);
        assert!(DEFAULT_CONFIG_PATH.ends_with(".toml"));
    }
}
