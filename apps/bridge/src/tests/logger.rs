use crate::logger::{LOG_FILE_NAME, build_dispatch, initialize};

use std::path::PathBuf;

use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() more than once is harmless.
///
/// **WHY THIS MATTERS**: Initialization may be reached from several code paths;
/// a second call must not panic trying to install a second global logger.
///
/// **BUG THIS CATCHES**: Would catch the Once or AtomicBool guards being removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A writable temporary directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let first = initialize(dir.path());
    let second = initialize(dir.path());

    // THEN: Both return Ok
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(second.is_ok(), "Second initialization should be a no-op");
}

/// **VALUE**: Verifies an unusable log directory is an error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch `fern::log_file()` being unwrapped.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_bridge_error() {
    // GIVEN: A directory under a file, which cannot exist
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir);

    // THEN: A Bridge error naming the log file is returned
    let err = result.err().expect("should fail for an invalid directory");
    let err_string = err.to_string();
    assert!(err_string.contains("Bridge Error"));
    assert!(err_string.contains(LOG_FILE_NAME));
}

#[test]
fn given_writable_dir_when_dispatch_built_then_log_file_created() {
    let dir = TempDir::new().expect("temp dir");

    let result = build_dispatch(dir.path());

    assert!(result.is_ok());
    assert!(dir.path().join(LOG_FILE_NAME).exists());
}
