use crate::error::registry::RegistryError;
use crate::registry::CallRegistry;

use models::CallId;

/// **VALUE**: Verifies a live call id cannot be registered twice.
///
/// **WHY THIS MATTERS**: Two entries for one id would cross-deliver responses
/// between unrelated calls.
///
/// **BUG THIS CATCHES**: Would catch `open` overwriting the existing entry.
#[test]
fn given_open_call_when_opened_again_then_duplicate_error_and_original_kept() {
    // GIVEN: A registry with one live call
    let mut registry = CallRegistry::new();
    let call_id = CallId::generate();
    registry.open(call_id.clone(), "first").expect("first open succeeds");

    // WHEN: Opening the same id again
    let result = registry.open(call_id.clone(), "second");

    // THEN: The duplicate is reported and the original entry survives
    match result {
        Err(RegistryError::DuplicateCall { call_id: reported, .. }) => {
            assert_eq!(reported, call_id)
        }
        other => panic!("expected DuplicateCall, got {other:?}"),
    }
    assert_eq!(registry.lookup(&call_id), Some(&"first"));
    assert_eq!(registry.len(), 1);
}

/// **VALUE**: Verifies close is idempotent.
///
/// **WHY THIS MATTERS**: Terminal envelopes can arrive twice (peer retries,
/// races with local cancellation); the second must be a no-op.
#[test]
fn given_closed_call_when_closed_again_then_noop() {
    // GIVEN: A call that has been closed
    let mut registry = CallRegistry::new();
    let call_id = CallId::generate();
    registry.open(call_id.clone(), 7_u32).expect("open succeeds");
    assert_eq!(registry.close(&call_id), Some(7));

    // WHEN: Closing it again
    let second = registry.close(&call_id);

    // THEN: Nothing happens
    assert_eq!(second, None);
    assert!(registry.is_empty());
}

#[test]
fn given_unknown_id_when_looked_up_then_none() {
    let mut registry: CallRegistry<u32> = CallRegistry::default();
    let unknown = CallId::generate();

    assert!(registry.lookup(&unknown).is_none());
    assert!(registry.lookup_mut(&unknown).is_none());
    assert!(!registry.contains(&unknown));
}

/// **VALUE**: Verifies drain empties the registry and hands back every entry.
///
/// **BUG THIS CATCHES**: Would catch channel-close cleanup leaving stale
/// entries behind.
#[test]
fn given_several_calls_when_drained_then_all_returned_and_registry_empty() {
    // GIVEN: Three live calls
    let mut registry = CallRegistry::new();
    let ids: Vec<CallId> = (0..3).map(|_| CallId::generate()).collect();
    for (index, call_id) in ids.iter().enumerate() {
        registry.open(call_id.clone(), index).expect("open succeeds");
    }

    // WHEN: Draining
    let mut drained = registry.drain();
    drained.sort_by_key(|(_, index)| *index);

    // THEN: Every entry is returned once
    let drained_ids: Vec<CallId> = drained.into_iter().map(|(call_id, _)| call_id).collect();
    assert_eq!(drained_ids, ids);
    assert!(registry.is_empty());
}
