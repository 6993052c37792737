use crate::services::{MAX_COUNT, bridge_services};

use models::ErrorCode;
use mux_core::{Endpoint, ServiceTable, memory_channel};

use std::time::Duration;

use serde_json::json;

fn connect_to_bridge_services() -> (Endpoint, Endpoint) {
    let (server_end, client_end) = memory_channel();
    let services = bridge_services().expect("bridge services should register");
    (
        Endpoint::spawn(server_end, services),
        Endpoint::spawn(client_end, ServiceTable::new()),
    )
}

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("Timed out")
}

#[test]
fn given_bridge_services_when_built_then_echo_registered() {
    let table = bridge_services().expect("bridge services should register");

    assert!(table.contains("Echo"));
    assert!(table.resolve("Echo/run").is_ok());
    assert!(table.resolve("Echo/count").is_ok());
    assert!(table.resolve("Echo/sum").is_ok());
    assert!(table.resolve("Echo/chat").is_ok());
}

/// **VALUE**: Verifies each Echo method behaves as documented.
///
/// **WHY THIS MATTERS**: Clients use Echo to check a connection; a broken
/// method looks like a broken transport.
#[tokio::test]
async fn given_echo_methods_when_called_then_documented_results() {
    // GIVEN: A client connected to the bridge services
    let (_server, client) = connect_to_bridge_services();

    // WHEN: Calling every method
    let run = within(client.unary("Echo/run", json!({"x": 1}), None)).await;
    let count = within(client.server_stream("Echo/count", json!({"n": 3}), None).collect_all()).await;
    let mut sum = client.client_stream("Echo/sum", None);
    sum.sink.write(json!(1.5)).expect("write");
    sum.sink.write(json!(2)).expect("write");
    sum.sink.end().expect("end");
    let sum = within(sum.response).await;
    let mut chat = client.duplex("Echo/chat", None);
    chat.sink.write(json!("hi")).expect("write");
    chat.sink.end().expect("end");
    let chat = within(chat.stream.collect_all()).await;

    // THEN: Each result matches the table in the module docs
    assert_eq!(run, Ok(json!({"x": 1})));
    assert_eq!(count, Ok(vec![json!(1), json!(2), json!(3)]));
    assert_eq!(sum, Ok(json!(3.5)));
    assert_eq!(chat, Ok(vec![json!("hi")]));
}

#[tokio::test]
async fn given_bad_count_requests_when_streamed_then_handler_error() {
    let (_server, client) = connect_to_bridge_services();

    let missing = within(client.server_stream("Echo/count", json!({}), None).collect_all()).await;
    let too_many = within(
        client
            .server_stream("Echo/count", json!({"n": MAX_COUNT + 1}), None)
            .collect_all(),
    )
    .await;

    assert_eq!(missing.expect_err("missing n").code, ErrorCode::HandlerError);
    assert_eq!(too_many.expect_err("n too large").code, ErrorCode::HandlerError);
}

#[tokio::test]
async fn given_non_number_when_summed_then_handler_error() {
    let (_server, client) = connect_to_bridge_services();
    let mut call = client.client_stream("Echo/sum", None);

    call.sink.write(json!("three")).expect("write");
    call.sink.end().expect("end");

    let error = within(call.response).await.expect_err("not a number");
    assert_eq!(error.code, ErrorCode::HandlerError);
}
