//! Inbound request and notification integration tests
//!
//! Server-initiated traffic reaches the request handler in transport order,
//! classified by structure rather than by the text it happens to contain.

mod common;

use common::{eventually, memory_client};
use jrpc_client::{memory, ClientBuilder, Id, Request, Response};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn recording_handler(client: &jrpc_client::Client) -> Arc<Mutex<Vec<Request>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.set_request_handler(move |request| sink.lock().unwrap().push(request));
    seen
}

#[tokio::test]
async fn test_notifications_arrive_in_order() {
    let (client, peer) = memory_client().await;
    let seen = recording_handler(&client);

    for i in 0..100 {
        peer.send_request(&Request::new("tick").with_params(json!(i)))
            .unwrap();
    }

    assert!(eventually(|| seen.lock().unwrap().len() == 100).await);
    let params: Vec<i64> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.params_as().unwrap())
        .collect();
    assert_eq!(params, (0..100).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_params_mentioning_method_and_id_stay_a_notification() {
    let (client, peer) = memory_client().await;
    let seen = recording_handler(&client);

    peer.send(r#"{"method":"chat","params":{"text":"the \"method\" field and \"id\":1 are reserved","result":null},"jsonrpc":"2.0"}"#)
        .unwrap();
    peer.send(r#"{"method":"ping","params":"foo","jsonrpc":"2.0"}"#)
        .unwrap();

    assert!(eventually(|| seen.lock().unwrap().len() == 2).await);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method(), "chat");
    assert!(seen[0].is_notification());
    assert_eq!(seen[1].method(), "ping");
    assert_eq!(seen[1].params(), Some(&json!("foo")));
}

#[tokio::test]
async fn test_server_request_can_be_answered() {
    let (client, peer) = memory_client().await;
    let responder = client.clone();
    client.set_request_handler(move |request| {
        let client = responder.clone();
        tokio::spawn(async move {
            let response = Response::success(json!("pong")).with_id(request.id().unwrap().clone());
            client.respond(response).await.unwrap();
        });
    });

    peer.send(r#"{"id":"req-1","method":"ping","jsonrpc":"2.0"}"#)
        .unwrap();

    assert_eq!(
        peer.recv().await.unwrap(),
        r#"{"id":"req-1","result":"pong","jsonrpc":"2.0"}"#
    );
}

#[tokio::test]
async fn test_requests_without_handler_are_dropped() {
    let (client, peer) = memory_client().await;

    peer.send(r#"{"id":1456,"method":"pong","params":"bar","jsonrpc":"2.0"}"#)
        .unwrap();
    let future = client.send_async(Request::new("a").with_numeric_id(1)).await;
    peer.send_response(&Response::success(json!(true)).with_numeric_id(1))
        .unwrap();

    assert!(future.await.unwrap().is_success());
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_read_errors_and_garbage_do_not_stop_the_loop() {
    let (client, peer) = memory_client().await;
    let seen = recording_handler(&client);

    peer.inject_error("frame too large").unwrap();
    peer.send("this is not json").unwrap();
    peer.send("[]").unwrap();
    peer.send(r#"{"id":{"nested":true},"method":"x","jsonrpc":"2.0"}"#)
        .unwrap();
    peer.send(r#"{"id":1,"jsonrpc":"2.0"}"#).unwrap();
    peer.send_request(&Request::new("still-alive")).unwrap();

    assert!(eventually(|| seen.lock().unwrap().len() == 1).await);
    assert_eq!(seen.lock().unwrap()[0].method(), "still-alive");
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_the_loop() {
    let (client, peer) = memory_client().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    client.set_request_handler(move |request| {
        counter.fetch_add(1, Ordering::SeqCst);
        if request.method() == "explode" {
            panic!("handler failure");
        }
    });

    peer.send_request(&Request::new("explode")).unwrap();
    peer.send_request(&Request::new("after")).unwrap();

    assert!(eventually(|| calls.load(Ordering::SeqCst) == 2).await);
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_batch_is_dispatched_element_wise() {
    let (dialer, peer) = memory::pair();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let client = ClientBuilder::new(dialer)
        .on_request(move |request| sink.lock().unwrap().push(request.method().to_string()))
        .connect()
        .await
        .unwrap();

    let first = client.send_async(Request::new("a").with_numeric_id(1)).await;
    let second = client.send_async(Request::new("b").with_string_id("two")).await;

    peer.send(
        r#"[
            {"id":1,"result":"one","jsonrpc":"2.0"},
            {"method":"event","params":[1],"jsonrpc":"2.0"},
            {"bogus":true},
            {"id":"two","error":{"code":-32000,"message":"busy"},"jsonrpc":"2.0"}
        ]"#,
    )
    .unwrap();

    assert_eq!(first.await.unwrap().result(), Some(&json!("one")));
    let second = second.await.unwrap();
    assert_eq!(second.id(), Some(&Id::String("two".into())));
    assert_eq!(second.error().unwrap().message, "busy");
    assert_eq!(*seen.lock().unwrap(), vec!["event"]);
}
