use crate::MethodPath;

#[test]
fn given_qualified_name_when_parsed_then_splits_service_and_method() {
    // GIVEN: A qualified method name
    // WHEN: Parsing it
    let path = MethodPath::parse("Echo/run").expect("valid path");

    // THEN: Both halves are recovered and Display round-trips
    assert_eq!(path.service, "Echo");
    assert_eq!(path.method, "run");
    assert_eq!(path.to_string(), "Echo/run");
}

/// **VALUE**: Verifies malformed method names are rejected instead of misrouted.
///
/// **BUG THIS CATCHES**: Would catch if `"Echo"` or `"/run"` resolved to a handler,
/// or if `"a/b/c"` silently dispatched to service `a` method `b/c`.
#[test]
fn given_malformed_names_when_parsed_then_rejected() {
    for name in ["Echo", "/run", "Echo/", "", "a/b/c"] {
        assert!(
            MethodPath::parse(name).is_err(),
            "'{name}' should not parse as a method path"
        );
    }
}
