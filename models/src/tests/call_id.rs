use crate::CallId;
use crate::call_id::MAX_CALL_ID_LEN;

use std::collections::HashSet;

/// **VALUE**: Verifies generated call ids do not repeat.
///
/// **WHY THIS MATTERS**: Two live calls sharing an id would cross-deliver their
/// envelopes. Generation must have negligible collision probability.
#[test]
fn given_many_generated_ids_when_collected_then_all_unique() {
    // GIVEN/WHEN: Ten thousand generated ids
    let ids: HashSet<CallId> = (0..10_000).map(|_| CallId::generate()).collect();

    // THEN: None collide
    assert_eq!(ids.len(), 10_000, "Generated call ids must be unique");
}

/// **VALUE**: Verifies that empty and oversized ids from the wire are rejected.
///
/// **BUG THIS CATCHES**: Would catch if a peer could register a call under an empty
/// id or force unbounded allocations in the registry key.
#[test]
fn given_invalid_ids_when_parsed_then_rejected() {
    // GIVEN: An empty id and an id one byte over the limit
    let empty = "";
    let oversized = "x".repeat(MAX_CALL_ID_LEN + 1);

    // WHEN/THEN: Both fail validation, a normal id passes
    assert!(CallId::parse(empty).is_err(), "Empty id should be rejected");
    assert!(CallId::parse(oversized).is_err(), "Oversized id should be rejected");
    assert_eq!(CallId::parse("abc").expect("valid id").as_str(), "abc");
}
