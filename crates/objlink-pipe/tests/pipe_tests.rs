//! Transport-contract tests for the in-process pipe: correlation, error
//! propagation, nested calls, and disconnect behavior.

use std::sync::Arc;
use std::time::Duration;

use objlink::{Payload, RpcError, Transport, Verb, VerbHandler};
use objlink_pipe::pair;
use serde_json::json;

fn echo_handler() -> VerbHandler {
    Box::new(|payload: Payload| Box::pin(async move { Ok(payload) }))
}

#[tokio::test]
async fn request_reply_round_trip() {
    let (a, b) = pair();
    b.register_incoming_call(Verb::Func, echo_handler());

    let reply = a
        .call_remote(Verb::Func, json!({"hello": "world"}))
        .await
        .unwrap();
    assert_eq!(reply, json!({"hello": "world"}));
}

#[tokio::test]
async fn replies_correlate_out_of_order() {
    let (a, b) = pair();
    // Delay replies by the requested number of milliseconds, so the first
    // request finishes last.
    b.register_incoming_call(
        Verb::Func,
        Box::new(|payload: Payload| {
            Box::pin(async move {
                let ms = payload["delay_ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(payload)
            })
        }),
    );

    let slow = a.call_remote(Verb::Func, json!({"delay_ms": 80, "tag": "slow"}));
    let fast = a.call_remote(Verb::Func, json!({"delay_ms": 0, "tag": "fast"}));
    let (slow, fast) = tokio::join!(slow, fast);
    assert_eq!(slow.unwrap()["tag"], "slow");
    assert_eq!(fast.unwrap()["tag"], "fast");
}

#[tokio::test]
async fn handler_errors_reject_the_call() {
    let (a, b) = pair();
    b.register_incoming_call(
        Verb::Get,
        Box::new(|_payload| Box::pin(async { Err(RpcError::user("no such owner")) })),
    );

    let err = a.call_remote(Verb::Get, Payload::Null).await.unwrap_err();
    assert_eq!(err, RpcError::User("no such owner".into()));
}

#[tokio::test]
async fn missing_handler_is_a_protocol_error() {
    let (a, _b) = pair();
    let err = a.call_remote(Verb::Iter, Payload::Null).await.unwrap_err();
    assert!(matches!(err, RpcError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn nested_calls_do_not_wedge_the_pump() {
    let (a, b) = pair();
    let b2 = Arc::clone(&b);

    // A answers `get`; B's `func` handler calls back into A before replying.
    a.register_incoming_call(
        Verb::Get,
        Box::new(|_payload| Box::pin(async { Ok(json!("from-a")) })),
    );
    b.register_incoming_call(
        Verb::Func,
        Box::new(move |_payload| {
            let b = Arc::clone(&b2);
            Box::pin(async move {
                let nested = b.call_remote(Verb::Get, Payload::Null).await?;
                Ok(json!({"nested": nested}))
            })
        }),
    );

    let reply = a.call_remote(Verb::Func, Payload::Null).await.unwrap();
    assert_eq!(reply, json!({"nested": "from-a"}));
}

#[tokio::test]
async fn del_is_delivered_without_a_reply_round_trip() {
    let (a, b) = pair();
    let received = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    b.register_incoming_call(
        Verb::Del,
        Box::new(move |payload: Payload| {
            sink.lock().unwrap().push(payload);
            Box::pin(async { Ok(Payload::Null) })
        }),
    );

    let reply = a
        .call_remote(Verb::Del, json!({"idRemote": "9"}))
        .await
        .unwrap();
    assert_eq!(reply, Payload::Null, "one-way calls resolve with null");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*received.lock().unwrap(), vec![json!({"idRemote": "9"})]);
}

#[tokio::test]
async fn del_resolves_even_when_the_handler_stalls() {
    let (a, b) = pair();
    b.register_incoming_call(
        Verb::Del,
        Box::new(|_payload| Box::pin(futures::future::pending())),
    );

    // No reply is awaited, so a stalled handler cannot block the sender.
    let reply = tokio::time::timeout(
        Duration::from_millis(100),
        a.call_remote(Verb::Del, Payload::Null),
    )
    .await
    .expect("one-way call must not wait for the handler")
    .unwrap();
    assert_eq!(reply, Payload::Null);
}

#[tokio::test]
async fn peer_drop_rejects_outstanding_and_later_calls() {
    let (a, b) = pair();
    // A handler that never completes keeps the call outstanding.
    b.register_incoming_call(
        Verb::Func,
        Box::new(|_payload| Box::pin(futures::future::pending())),
    );

    let a2 = Arc::clone(&a);
    let outstanding =
        tokio::spawn(async move { a2.call_remote(Verb::Func, Payload::Null).await });

    // Let the request reach the peer, then tear the peer down.
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(b);

    let err = outstanding.await.unwrap().unwrap_err();
    assert_eq!(err, RpcError::ConnectionLost);

    // The endpoint is now closed: later calls reject without waiting.
    let err = a.call_remote(Verb::Get, Payload::Null).await.unwrap_err();
    assert_eq!(err, RpcError::ConnectionLost);
}
