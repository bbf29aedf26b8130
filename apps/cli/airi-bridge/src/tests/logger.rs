// Unit tests for logger setup
// Tests focus on level selection, error handling and idempotent initialization

use crate::logger::{LOG_FILE_NAME, build_dispatch, initialize, level_for};

use std::path::PathBuf;

use log::LevelFilter;

/// **VALUE**: Verifies `--verbose` turns on trace logging.
///
/// **WHY THIS MATTERS**: Frame-level traces are the only way to debug a peer that
/// ignores our events. Without them users cannot send a useful report.
///
/// **BUG THIS CATCHES**: Would catch `verbose` being ignored.
#[test]
fn given_verbose_flag_when_choosing_level_then_trace() {
    assert_eq!(level_for(true), LevelFilter::Trace);
    assert!(level_for(false) <= LevelFilter::Debug);
    assert!(level_for(false) >= LevelFilter::Info);
}

/// **VALUE**: Verifies an unusable log directory is an error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch `fern::log_file()` being unwrapped.
#[test]
fn given_invalid_log_dir_when_building_dispatch_then_returns_error() {
    // GIVEN: A path under a file, which cannot be a directory
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir, LevelFilter::Info);

    // THEN: Logger error naming the file
    let err = result.err().expect("Should return error for invalid log directory");
    let message = err.to_string();
    assert!(message.starts_with("Logger Error"), "{message}");
    assert!(message.contains(LOG_FILE_NAME));
}

/// **VALUE**: Verifies calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: fern panics if a global logger is installed twice. A second
/// call from any code path must be a logged no-op.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = tempfile::tempdir().expect("tempdir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path(), false);
    let result2 = initialize(temp_dir.path(), true);

    // THEN: Both return Ok and the log file exists
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(result2.is_ok(), "Second initialization should be a no-op");
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}
