use crate::helpers::{echo_service, echo_table, endpoint_pair, wait_idle, within};

use mux_core::{ActiveCalls, RegistrationError, ServiceDescriptor, ServiceTable};

use models::ErrorCode;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

/// Service whose handlers announce that they started and then never finish.
fn stalling_service(started: mpsc::UnboundedSender<&'static str>) -> ServiceDescriptor {
    let unary_started = started.clone();
    ServiceDescriptor::new("Stall")
        .and_then(|service| {
            service.unary("unary", move |_request| {
                let started = unary_started.clone();
                async move {
                    let _ = started.send("unary");
                    std::future::pending::<()>().await;
                    Ok(json!(null))
                }
            })
        })
        .and_then(|service| {
            service.duplex("duplex", move |_requests, _sink| {
                let started = started.clone();
                async move {
                    let _ = started.send("duplex");
                    std::future::pending::<()>().await;
                    Ok(())
                }
            })
        })
        .expect("valid service")
}

/// **VALUE**: Verifies channel closure terminates every outstanding call with
/// CHANNEL_CLOSED and empties the registries on both endpoints.
///
/// **WHY THIS MATTERS**: Without this, callers would wait forever on calls
/// whose peer is gone, and handlers would keep running for nobody.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Only one of the two outstanding calls is failed
/// - Calls are failed with a code other than CHANNEL_CLOSED
/// - Either endpoint keeps registry entries after closing
#[tokio::test]
async fn given_unary_and_duplex_outstanding_when_channel_closes_then_both_channel_closed() {
    // GIVEN: One unary and one duplex call whose handlers are running and stalled
    let (started_tx, mut started_rx) = mpsc::unbounded_channel();
    let table = ServiceTable::new()
        .with_service(stalling_service(started_tx))
        .expect("registration");
    let (server, client) = endpoint_pair(table);
    let response = client.unary("Stall/unary", json!(null), None);
    let mut duplex = client.duplex("Stall/duplex", None);
    within(started_rx.recv()).await.expect("first handler started");
    within(started_rx.recv()).await.expect("second handler started");
    assert_eq!(
        client.active_calls().await,
        ActiveCalls {
            caller: 2,
            callee: 0
        }
    );
    assert_eq!(server.active_calls().await.callee, 2);

    // WHEN: The server side closes the channel
    within(server.close()).await;

    // THEN: Both calls fail with CHANNEL_CLOSED
    let unary_error = within(response).await.expect_err("unary should fail");
    assert_eq!(unary_error.code, ErrorCode::ChannelClosed);
    let duplex_error = within(duplex.stream.message())
        .await
        .expect("an item")
        .expect_err("duplex should fail");
    assert_eq!(duplex_error.code, ErrorCode::ChannelClosed);
    assert_eq!(within(duplex.stream.message()).await, None);

    // THEN: Each endpoint terminated its side of both calls and kept nothing
    within(client.closed()).await;
    let client_summary = client.close_summary().expect("client closed");
    let server_summary = server.close_summary().expect("server closed");
    assert_eq!(
        client_summary.terminated,
        ActiveCalls {
            caller: 2,
            callee: 0
        }
    );
    assert_eq!(
        server_summary.terminated,
        ActiveCalls {
            caller: 0,
            callee: 2
        }
    );
    assert!(client_summary.remaining.is_idle());
    assert!(server_summary.remaining.is_idle());
    assert_eq!(client.active_calls().await, client_summary.remaining);
}

#[tokio::test]
async fn given_closed_endpoint_when_new_calls_made_then_channel_closed_immediately() {
    let (_server, client) = endpoint_pair(echo_table());
    within(client.close()).await;

    let unary = within(client.unary("Echo/run", json!(1), None)).await;
    let mut stream = client.server_stream("Echo/count", json!({"n": 3}), None);
    let mut call = client.client_stream("Echo/sum", None);

    assert_eq!(unary.expect_err("closed").code, ErrorCode::ChannelClosed);
    let stream_error = within(stream.message()).await.expect("an item").expect_err("closed");
    assert_eq!(stream_error.code, ErrorCode::ChannelClosed);
    assert!(call.sink.write(json!(1)).is_err());
    assert_eq!(within(call.response).await.expect_err("closed").code, ErrorCode::ChannelClosed);
}

/// **VALUE**: Verifies dropping a response stream cancels the call on the callee.
///
/// **WHY THIS MATTERS**: An infinite server stream nobody reads would otherwise
/// run forever.
///
/// **BUG THIS CATCHES**: Would catch cancellation that only stops local
/// delivery while the callee's handler keeps producing.
#[tokio::test]
async fn given_endless_stream_when_caller_drops_it_then_callee_handler_stops() {
    // GIVEN: A server stream that writes until told to stop
    let written = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&written);
    let service = ServiceDescriptor::new("Ticker")
        .and_then(|service| {
            service.server_stream("ticks", move |_request, mut sink| {
                let counter = Arc::clone(&counter);
                async move {
                    loop {
                        let n = counter.fetch_add(1, Ordering::SeqCst);
                        if sink.write(json!(n)).is_err() {
                            return Ok(());
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                    }
                }
            })
        })
        .expect("valid service");
    let (server, client) =
        endpoint_pair(ServiceTable::new().with_service(service).expect("registration"));
    let mut stream = client.server_stream("Ticker/ticks", json!(null), None);

    // WHEN: Reading two items and dropping the stream
    assert!(within(stream.message()).await.is_some());
    assert!(within(stream.message()).await.is_some());
    drop(stream);

    // THEN: Both registries drain and the handler stops writing
    wait_idle(&client).await;
    wait_idle(&server).await;
    let after_cancel = written.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(written.load(Ordering::SeqCst) <= after_cancel + 1);
}

#[tokio::test]
async fn given_explicit_cancel_when_stream_open_then_callee_cleaned_up() {
    let (server, client) = endpoint_pair(echo_table());
    let mut call = client.duplex("Echo/chat", None);
    call.sink.write(json!("hello")).expect("write");
    assert_eq!(within(call.stream.message()).await, Some(Ok(json!("hello"))));

    call.stream.cancel();

    wait_idle(&server).await;
    // The request direction is gone with the call.
    wait_idle(&client).await;
}

/// **VALUE**: Verifies services can be added to a live endpoint.
#[tokio::test]
async fn given_live_endpoint_when_service_registered_then_callable() {
    // GIVEN: A server with no services
    let (server, client) = endpoint_pair(ServiceTable::new());
    let before = within(client.unary("Echo/run", json!(1), None)).await;
    assert_eq!(before.expect_err("not registered yet").code, ErrorCode::NotFound);

    // WHEN: Registering Echo at runtime
    server
        .register_service(echo_service())
        .await
        .expect("registration should succeed");

    // THEN: Calls reach it, and a second registration is refused
    assert_eq!(within(client.unary("Echo/run", json!(1), None)).await, Ok(json!(1)));
    assert!(matches!(
        server.register_service(echo_service()).await,
        Err(RegistrationError::DuplicateService { .. })
    ));
}

#[tokio::test]
async fn given_closed_endpoint_when_service_registered_then_endpoint_closed_error() {
    let (server, _client) = endpoint_pair(ServiceTable::new());
    within(server.close()).await;

    let result = server.register_service(echo_service()).await;

    assert!(matches!(
        result,
        Err(RegistrationError::EndpointClosed { .. })
    ));
}

#[tokio::test]
async fn given_client_stream_handler_when_caller_never_ends_then_call_stays_active() {
    let (server, client) = endpoint_pair(echo_table());
    let mut call = client.client_stream("Echo/sum", None);
    call.sink.write(json!(1)).expect("write");

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(server.active_calls().await.callee, 1);
    assert_eq!(client.active_calls().await.caller, 1);

    call.sink.end().expect("end");
    assert_eq!(within(call.response).await, Ok(json!(1)));
}
