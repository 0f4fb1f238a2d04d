//! WebSocket transport integration tests

mod common;

use common::{eventually, refusing_listener, success_for, MockWsServer, Reply};
use jrpc_client::{Client, Dialer, Error, Request, WebSocketDialer};
use jrpc_core::codec;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_round_trip_over_websocket() {
    let mut server = MockWsServer::echo().await;
    let client = Client::new(WebSocketDialer::new(server.url()));
    client.connect().await.unwrap();

    let response = client
        .send(Request::new("echo").with_params(json!(["hello", "world"])).with_numeric_id(554))
        .await
        .unwrap();
    assert_eq!(response.result(), Some(&json!(["hello", "world"])));

    assert_eq!(
        server.wait_for_message().await.unwrap(),
        r#"{"id":554,"method":"echo","params":["hello","world"],"jsonrpc":"2.0"}"#
    );

    client.close().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_server_push_reaches_handler() {
    let server = MockWsServer::with_handler(|text| {
        let request = codec::decode_request(&text).unwrap();
        vec![
            Reply::Text(r#"{"method":"progress","params":50,"jsonrpc":"2.0"}"#.to_string()),
            Reply::Text(success_for(&request, json!("done"))),
        ]
    })
    .await;

    let client = Client::new(WebSocketDialer::new(server.url()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.set_request_handler(move |request| sink.lock().unwrap().push(request));
    client.connect().await.unwrap();

    let response = client.send(Request::new("work")).await.unwrap();
    assert_eq!(response.result(), Some(&json!("done")));

    // The notification was read before the response on the same task
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].params(), Some(&json!(50)));
}

#[tokio::test]
async fn test_server_close_fails_pending_calls() {
    let server = MockWsServer::with_handler(|text| {
        if text.contains("\"method\":\"quit\"") {
            vec![Reply::Close]
        } else {
            Vec::new()
        }
    })
    .await;

    let client = Client::new(WebSocketDialer::new(server.url()));
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    client.set_close_handler(move |cause| {
        if cause == Some(Error::Closed) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    client.connect().await.unwrap();

    let hanging = client.send_async(Request::new("hang")).await;
    let result = client.send(Request::new("quit")).await;

    assert_eq!(result, Err(Error::Closed));
    assert_eq!(hanging.await, Err(Error::Closed));
    assert!(eventually(|| fired.load(Ordering::SeqCst) == 1).await);
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_failed_handshake_is_a_transport_error() {
    let url = refusing_listener().await;
    let client = Client::new(WebSocketDialer::new(url));

    assert!(matches!(client.connect().await, Err(Error::Transport(_))));
    assert!(!client.is_connected());
    assert!(!client.is_closed());
}

#[tokio::test]
async fn test_dial_sends_custom_headers() {
    let server = MockWsServer::echo().await;
    let dialer = WebSocketDialer::new(server.url()).with_header("X-Client", "jrpc-test");

    let connection = dialer.dial().await.unwrap();
    connection
        .write(r#"{"id":1,"method":"echo","params":1,"jsonrpc":"2.0"}"#.to_string())
        .await
        .unwrap();
    assert_eq!(
        connection.read().await.unwrap(),
        r#"{"id":1,"result":1,"jsonrpc":"2.0"}"#
    );
    connection.close().await.unwrap();
}
