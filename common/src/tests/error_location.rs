use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every transport error carries a location. If capture breaks,
/// a dropped envelope or failed send can no longer be traced back to its origin.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: Current caller location
    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, 12, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` follows `#[track_caller]` frames.
///
/// **BUG THIS CATCHES**: Would catch if the helper lost its `#[track_caller]`
/// attribute, which would make every error point at `error_location.rs` itself.
#[test]
fn given_track_caller_helper_when_called_then_reports_call_site() {
    // GIVEN: A helper that builds a location on behalf of its caller
    #[track_caller]
    fn build() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Calling the helper
    let location = build();

    // THEN: The location is the test body, not the helper
    assert!(location.file.contains("tests"), "Should point at the test file");
    assert_eq!(location.line, 36, "Should capture the call-site line");
}

/// **VALUE**: Verifies the Display format is `[file:line:column]`.
///
/// **WHY THIS MATTERS**: Error messages append the location; log scraping relies on
/// the bracketed format.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::caller();

    // WHEN: Formatting as string
    let formatted = format!("{location}");

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert_eq!(
        formatted.matches(':').count(),
        2,
        "Should separate file, line and column with colons"
    );
}
