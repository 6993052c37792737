use crate::error::registration::RegistrationError;
use crate::service::{Handler, ServiceDescriptor, ServiceTable};

use models::{CallShape, ErrorCode};

use serde_json::Value;

fn echo_service() -> ServiceDescriptor {
    ServiceDescriptor::new("Echo")
        .and_then(|service| service.unary("run", |request| async move { Ok(request.payload) }))
        .expect("valid service")
}

/// **VALUE**: Verifies a handler whose shape contradicts the declared shape is
/// refused at registration time.
///
/// **WHY THIS MATTERS**: A unary handler registered as server-stream would
/// otherwise only fail when a call arrives, far from the mistake.
#[test]
fn given_unary_handler_when_declared_server_stream_then_shape_mismatch() {
    // GIVEN: A unary handler
    let handler = Handler::unary(|_request| async { Ok(Value::Null) });

    // WHEN: Declaring it as a server-stream method
    let result = ServiceDescriptor::new("Echo")
        .expect("valid name")
        .method("count", CallShape::ServerStream, handler);

    // THEN: Registration fails with the two shapes named
    match result {
        Err(RegistrationError::ShapeMismatch {
            declared, handler, ..
        }) => {
            assert_eq!(declared, CallShape::ServerStream);
            assert_eq!(handler, CallShape::Unary);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn given_declared_method_when_declared_again_then_duplicate_method() {
    let result = echo_service().unary("run", |_request| async { Ok(Value::Null) });

    assert!(matches!(
        result,
        Err(RegistrationError::DuplicateMethod { .. })
    ));
}

#[test]
fn given_names_with_slash_or_blank_when_declared_then_invalid_name() {
    assert!(matches!(
        ServiceDescriptor::new("Echo/run"),
        Err(RegistrationError::InvalidName { .. })
    ));
    assert!(matches!(
        ServiceDescriptor::new(""),
        Err(RegistrationError::InvalidName { .. })
    ));
    assert!(matches!(
        ServiceDescriptor::new("Echo")
            .expect("valid name")
            .unary("a/b", |_request| async { Ok(Value::Null) }),
        Err(RegistrationError::InvalidName { .. })
    ));
}

#[test]
fn given_registered_service_when_registered_again_then_duplicate_service() {
    let mut table = ServiceTable::new();
    table.register_service(echo_service()).expect("first registration");

    let result = table.register_service(echo_service());

    assert!(matches!(
        result,
        Err(RegistrationError::DuplicateService { .. })
    ));
    assert_eq!(table.len(), 1);
}

#[test]
fn given_service_without_methods_when_registered_then_empty_service() {
    let mut table = ServiceTable::new();

    let result = table.register_service(ServiceDescriptor::new("Nothing").expect("valid name"));

    assert!(matches!(result, Err(RegistrationError::EmptyService { .. })));
    assert!(table.is_empty());
}

/// **VALUE**: Verifies resolution classifies every miss as NOT_FOUND.
///
/// **BUG THIS CATCHES**: Would catch a malformed name being reported as a
/// protocol error, which callers would treat as a broken peer.
#[test]
fn given_table_when_resolving_unknown_names_then_not_found() {
    // GIVEN: A table with Echo/run
    let table = ServiceTable::new()
        .with_service(echo_service())
        .expect("registration");

    // WHEN: Resolving known and unknown names
    let known = table.resolve("Echo/run").expect("Echo/run resolves");
    let unknown_service = table.resolve("Foo/bar").expect_err("unknown service");
    let unknown_method = table.resolve("Echo/missing").expect_err("unknown method");
    let malformed = table.resolve("no-slash").expect_err("malformed");

    // THEN: Only the registered method resolves
    assert_eq!(known.shape, CallShape::Unary);
    assert_eq!(unknown_service.code, ErrorCode::NotFound);
    assert_eq!(unknown_method.code, ErrorCode::NotFound);
    assert_eq!(malformed.code, ErrorCode::NotFound);
}
