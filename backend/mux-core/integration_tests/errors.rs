use crate::helpers::{echo_service, echo_table, endpoint_pair, wait_idle, within};

use mux_core::{ServiceDescriptor, ServiceTable, SinkError};

use models::{CallShape, ErrorCode, RpcError};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

/// **VALUE**: Verifies unknown services and methods fail with NOT_FOUND and no
/// handler runs.
///
/// **WHY THIS MATTERS**: Misrouted calls must never execute unrelated code.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Dispatch falls back to some other handler of the same service
/// - A missing method is reported as a protocol or handler error
/// - The rejected call leaves a registry entry behind
#[tokio::test]
async fn given_unknown_method_when_called_then_not_found_and_no_handler_invoked() {
    // GIVEN: A service whose only handler records that it ran
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let service = ServiceDescriptor::new("Echo")
        .and_then(|service| {
            service.unary("run", move |request| {
                flag.store(true, Ordering::SeqCst);
                async move { Ok(request.payload) }
            })
        })
        .expect("valid service");
    let table = ServiceTable::new()
        .with_service(service)
        .expect("registration");
    let (server, client) = endpoint_pair(table);

    // WHEN: Calling an unknown service and an unknown method
    let unknown_service = within(client.unary("Foo/bar", json!({}), None)).await;
    let unknown_method = within(client.unary("Echo/missing", json!({}), None)).await;
    let mut unknown_stream = client.server_stream("Foo/bar", json!({}), None);
    let streamed = within(unknown_stream.message()).await;

    // THEN: All fail with NOT_FOUND and the handler never ran
    assert_eq!(unknown_service.expect_err("unknown service").code, ErrorCode::NotFound);
    assert_eq!(unknown_method.expect_err("unknown method").code, ErrorCode::NotFound);
    let stream_error = streamed.expect("an item").expect_err("an error");
    assert_eq!(stream_error.code, ErrorCode::NotFound);
    assert!(!invoked.load(Ordering::SeqCst));
    wait_idle(&client).await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies a duplex handler failure reaches the caller after the
/// items written before it.
///
/// **WHY THIS MATTERS**: Data written before a failure is valid output; the
/// caller must see it, then the error, and nothing after.
#[tokio::test]
async fn given_duplex_handler_that_writes_then_fails_when_called_then_item_then_handler_error() {
    // GIVEN: A duplex handler that writes one item then returns an error
    let service = ServiceDescriptor::new("Flaky")
        .and_then(|service| {
            service.duplex("once", |_requests, mut sink| async move {
                sink.write(json!("first"))
                    .map_err(|e| RpcError::handler(e.to_string()))?;
                Err(RpcError::handler("second item failed"))
            })
        })
        .expect("valid service");
    let (server, client) =
        endpoint_pair(ServiceTable::new().with_service(service).expect("registration"));

    // WHEN: Opening the call
    let mut call = client.duplex("Flaky/once", None);

    // THEN: One item, then HANDLER_ERROR with the handler's message, then the end
    assert_eq!(within(call.stream.message()).await, Some(Ok(json!("first"))));
    let error = within(call.stream.message())
        .await
        .expect("an item")
        .expect_err("an error");
    assert_eq!(error.code, ErrorCode::HandlerError);
    assert_eq!(error.message, "second item failed");
    assert_eq!(within(call.stream.message()).await, None);
    wait_idle(&client).await;
    wait_idle(&server).await;
}

/// **VALUE**: Verifies a panicking handler is contained.
///
/// **BUG THIS CATCHES**: Would catch a handler panic killing the endpoint loop
/// and every other call with it.
#[tokio::test]
async fn given_duplex_handler_that_panics_when_called_then_item_then_handler_error() {
    // GIVEN: A duplex handler that writes one item then panics
    let service = ServiceDescriptor::new("Flaky")
        .and_then(|service| {
            service.duplex("boom", |_requests, mut sink| async move {
                sink.write(json!("first"))
                    .map_err(|e| RpcError::handler(e.to_string()))?;
                if !sink.is_terminated() {
                    panic!("handler exploded");
                }
                Ok(())
            })
        })
        .and_then(|service| service.unary("run", |request| async move { Ok(request.payload) }))
        .expect("valid service");
    let (_server, client) =
        endpoint_pair(ServiceTable::new().with_service(service).expect("registration"));

    // WHEN: Opening the call
    let mut call = client.duplex("Flaky/boom", None);

    // THEN: One item, then HANDLER_ERROR carrying the panic message
    assert_eq!(within(call.stream.message()).await, Some(Ok(json!("first"))));
    let error = within(call.stream.message())
        .await
        .expect("an item")
        .expect_err("an error");
    assert_eq!(error.code, ErrorCode::HandlerError);
    assert_eq!(error.detail.as_deref(), Some("handler exploded"));

    // THEN: The endpoint keeps serving
    let reply = within(client.unary("Flaky/run", json!(1), None)).await;
    assert_eq!(reply, Ok(json!(1)));
}

#[tokio::test]
async fn given_unary_handler_error_when_called_then_error_forwarded_unchanged() {
    let service = ServiceDescriptor::new("Flaky")
        .and_then(|service| {
            service.unary("deny", |_request| async {
                Err(RpcError::handler("denied").with_detail("quota exceeded"))
            })
        })
        .expect("valid service");
    let (_server, client) =
        endpoint_pair(ServiceTable::new().with_service(service).expect("registration"));

    let error = within(client.unary("Flaky/deny", json!(null), None))
        .await
        .expect_err("handler error");

    assert_eq!(
        error,
        RpcError::handler("denied").with_detail("quota exceeded")
    );
}

/// **VALUE**: Verifies a call whose shape contradicts the registration is
/// rejected with PROTOCOL_ERROR without running the handler.
#[tokio::test]
async fn given_unary_method_when_opened_as_server_stream_then_protocol_error() {
    // GIVEN: Echo/run registered as unary
    let (server, client) = endpoint_pair(echo_table());

    // WHEN: Opening it as a server stream
    let primitive = client.open_call("Echo/run", CallShape::ServerStream, json!({}), None);
    let mux_core::CallPrimitive::ServerStream(mut stream) = primitive else {
        panic!("expected a server stream");
    };

    // THEN: The stream fails with PROTOCOL_ERROR
    let error = within(stream.message())
        .await
        .expect("an item")
        .expect_err("an error");
    assert_eq!(error.code, ErrorCode::ProtocolError);
    wait_idle(&server).await;
}

/// **VALUE**: Verifies the caller-side sink rejects writes after `end()`.
#[tokio::test]
async fn given_ended_client_stream_when_written_again_then_sink_closed_error() {
    // GIVEN: A client stream that has been ended
    let (_server, client) = endpoint_pair(echo_table());
    let mut call = client.client_stream("Echo/sum", None);
    call.sink.write(json!(2)).expect("write");
    call.sink.end().expect("end");

    // WHEN: Writing again
    let late = call.sink.write(json!(3));

    // THEN: The write is rejected and the response ignores it
    assert!(matches!(late, Err(SinkError::Closed { .. })));
    assert_eq!(within(call.response).await, Ok(json!(2)));
}

/// **VALUE**: Verifies a caller-side sink refuses writes once the peer has
/// finished the call, the same way it refuses writes after its own `end()`.
///
/// **WHY THIS MATTERS**: A producer that keeps writing into a call the peer
/// already rejected would otherwise see every write succeed while the
/// endpoint throws the data away.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A remotely terminated call leaves its sink writable
/// - `is_terminated()` only reflects local `end()`/`error()`
#[tokio::test]
async fn given_client_stream_rejected_by_peer_when_written_then_sink_closed_error() {
    // GIVEN: A client stream to a method the peer does not serve
    let (_server, client) = endpoint_pair(echo_table());
    let mut call = client.client_stream("Foo/bar", None);
    let error = within(&mut call.response).await.expect_err("unknown method");
    assert_eq!(error.code, ErrorCode::NotFound);

    // WHEN: Writing after the rejection arrived
    let late = call.sink.write(json!(1));

    // THEN: The write is rejected and the sink reports itself terminated
    assert!(matches!(late, Err(SinkError::Closed { .. })));
    assert!(call.sink.is_terminated());
    assert!(matches!(call.sink.end(), Err(SinkError::Closed { .. })));
    assert!(client.active_calls().await.is_idle());
}

/// **VALUE**: Verifies a callee-side sink that outlives its handler is
/// closed once the call has finished.
///
/// **BUG THIS CATCHES**: Would catch writes from a leaked sink being accepted
/// after the endpoint has already sent the call's terminal envelope.
#[tokio::test]
async fn given_sink_kept_past_handler_when_written_then_sink_closed_error() {
    // GIVEN: A server stream whose handler hands its sink out and returns
    let (sinks_tx, mut sinks_rx) = tokio::sync::mpsc::unbounded_channel();
    let service = ServiceDescriptor::new("Leak")
        .and_then(|service| {
            service.server_stream("keep", move |_request, sink| {
                let sinks = sinks_tx.clone();
                async move {
                    let _ = sinks.send(sink);
                    Ok(())
                }
            })
        })
        .expect("valid service");
    let (server, client) =
        endpoint_pair(ServiceTable::new().with_service(service).expect("registration"));

    // WHEN: The call completes and the kept sink is written afterwards
    let items = within(client.server_stream("Leak/keep", json!(null), None).collect_all()).await;
    assert_eq!(items, Ok(vec![]));
    let mut sink = within(sinks_rx.recv()).await.expect("handler ran");
    wait_idle(&server).await;

    // THEN: The endpoint refuses the write
    assert!(sink.is_terminated());
    assert!(matches!(sink.write(json!(1)), Err(SinkError::Closed { .. })));
}

/// **VALUE**: Verifies a caller can abort its own client stream with an error.
#[tokio::test]
async fn given_client_stream_when_caller_errors_then_response_fails_and_callee_cleaned_up() {
    // GIVEN: An open client stream to Echo/sum
    let (server, client) = endpoint_pair(echo_table());
    let mut call = client.client_stream("Echo/sum", None);
    call.sink.write(json!(1)).expect("write");

    // WHEN: The caller terminates it with an error
    call.sink
        .error(RpcError::handler("caller gave up"))
        .expect("error");

    // THEN: The local response resolves with that error and the callee drops the call
    let error = within(call.response).await.expect_err("caller error");
    assert_eq!(error.message, "caller gave up");
    wait_idle(&client).await;
    wait_idle(&server).await;
}

#[test]
fn given_echo_descriptor_when_inspected_then_all_shapes_declared() {
    let service = echo_service();

    let mut shapes: Vec<(String, CallShape)> = service
        .methods()
        .map(|(name, entry)| (name.to_string(), entry.shape))
        .collect();
    shapes.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        shapes,
        vec![
            (String::from("chat"), CallShape::Duplex),
            (String::from("count"), CallShape::ServerStream),
            (String::from("meta"), CallShape::Unary),
            (String::from("run"), CallShape::Unary),
            (String::from("sum"), CallShape::ClientStream),
        ]
    );
}
