//! Tests for the per-connection read loop in `MessageRouter`.
//!
//! Frames are fed through an in-memory channel and connections are mocks,
//! so these run without sockets.

mod common;

use std::convert::Infallible;
use std::sync::Arc;

use common::{as_handle, wait_for_history, wait_for_sent, MockConnection};
use futures::channel::mpsc;
use polychat_api::presence::PresenceRegistry;
use polychat_api::ws::{Frame, MessageRouter, SessionEnd};
use polychat_core::history::HistoryStore;
use polychat_core::memory::MemoryHistoryStore;
use polychat_core::message::MessageType;
use polychat_core::types::unix_now;
use tokio::task::JoinHandle;

type FrameSender = mpsc::UnboundedSender<Result<Frame, Infallible>>;

struct Harness {
    presence: Arc<PresenceRegistry>,
    history: Arc<MemoryHistoryStore>,
    router: MessageRouter,
}

fn harness() -> Harness {
    let presence = Arc::new(PresenceRegistry::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let router = MessageRouter::new(Arc::clone(&presence), history.clone());
    Harness {
        presence,
        history,
        router,
    }
}

impl Harness {
    /// Register `conn` for `user_id` and start its read loop.
    async fn connect(
        &self,
        user_id: i64,
        conn: &Arc<MockConnection>,
    ) -> (FrameSender, JoinHandle<SessionEnd>) {
        let handle = as_handle(conn);
        self.presence.register(user_id, Arc::clone(&handle)).await;

        let (tx, rx) = mpsc::unbounded();
        let router = self.router.clone();
        let cancel = conn.cancellation();
        let task = tokio::spawn(async move { router.run(user_id, handle, cancel, rx).await });
        (tx, task)
    }
}

fn text(json: &str) -> Result<Frame, Infallible> {
    Ok(Frame::Text(json.to_string()))
}

// ---------------------------------------------------------------------------
// Test: end-to-end chat between two users, persisted and delivered
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_is_delivered_and_persisted() {
    let h = harness();
    let alice = MockConnection::new();
    let bob = MockConnection::new();
    let (alice_tx, _alice_task) = h.connect(1, &alice).await;
    let (_bob_tx, _bob_task) = h.connect(2, &bob).await;

    let before = unix_now();
    alice_tx
        .unbounded_send(text(r#"{"type":"chat","receiver_id":2,"content":"hello"}"#))
        .unwrap();

    wait_for_sent(&bob, 1).await;
    let received = &bob.sent()[0];
    assert_eq!(received.kind, MessageType::Chat);
    assert_eq!(received.sender_id, 1);
    assert_eq!(received.receiver_id, 2);
    assert_eq!(received.content, "hello");
    assert!(received.timestamp >= before);

    wait_for_history(&h.history, 1).await;
    let page = h.history.find_between(1, 2, 1, 50).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.messages[0].content, "hello");
    assert_eq!(page.messages[0].sender_id, 1);
}

// ---------------------------------------------------------------------------
// Test: client-supplied sender_id and timestamp are ignored
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sender_and_timestamp_are_overwritten() {
    let h = harness();
    let alice = MockConnection::new();
    let bob = MockConnection::new();
    let (alice_tx, _a) = h.connect(1, &alice).await;
    let (_bob_tx, _b) = h.connect(2, &bob).await;

    alice_tx
        .unbounded_send(text(
            r#"{"type":"chat","sender_id":999,"timestamp":5,"receiver_id":2,"content":"x"}"#,
        ))
        .unwrap();

    wait_for_sent(&bob, 1).await;
    let received = &bob.sent()[0];
    assert_eq!(received.sender_id, 1);
    assert_ne!(received.timestamp, 5);
}

// ---------------------------------------------------------------------------
// Test: missing or empty type defaults to chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_type_defaults_to_chat() {
    let h = harness();
    let alice = MockConnection::new();
    let bob = MockConnection::new();
    let (alice_tx, _a) = h.connect(1, &alice).await;
    let (_bob_tx, _b) = h.connect(2, &bob).await;

    alice_tx
        .unbounded_send(text(r#"{"receiver_id":2,"content":"no type"}"#))
        .unwrap();
    alice_tx
        .unbounded_send(text(r#"{"type":"","receiver_id":2,"content":"empty type"}"#))
        .unwrap();

    wait_for_sent(&bob, 2).await;
    assert!(bob.sent().iter().all(|m| m.kind == MessageType::Chat));
    wait_for_history(&h.history, 2).await;
}

// ---------------------------------------------------------------------------
// Test: non-chat messages are delivered but not persisted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heartbeat_is_not_persisted() {
    let h = harness();
    let alice = MockConnection::new();
    let bob = MockConnection::new();
    let (alice_tx, _a) = h.connect(1, &alice).await;
    let (_bob_tx, _b) = h.connect(2, &bob).await;

    alice_tx
        .unbounded_send(text(r#"{"type":"heartbeat","receiver_id":2,"content":""}"#))
        .unwrap();
    // A chat afterwards proves the loop moved past the heartbeat.
    alice_tx
        .unbounded_send(text(r#"{"type":"chat","receiver_id":2,"content":"after"}"#))
        .unwrap();

    wait_for_sent(&bob, 2).await;
    assert_eq!(bob.sent()[0].kind, MessageType::Heartbeat);
    wait_for_history(&h.history, 1).await;
}

// ---------------------------------------------------------------------------
// Test: offline receiver, message persisted but dropped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_receiver_still_persists() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, _a) = h.connect(1, &alice).await;

    alice_tx
        .unbounded_send(text(r#"{"receiver_id":3,"content":"you there?"}"#))
        .unwrap();

    wait_for_history(&h.history, 1).await;
    assert!(h.presence.is_online(1).await);
}

// ---------------------------------------------------------------------------
// Test: malformed frame ends the loop and unregisters once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_frame_terminates_loop() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, task) = h.connect(1, &alice).await;

    alice_tx.unbounded_send(text("{not json")).unwrap();

    assert_eq!(task.await.unwrap(), SessionEnd::MalformedFrame);
    assert!(!h.presence.is_online(1).await);
    assert_eq!(alice.close_count(), 1);
    assert_eq!(h.history.len().await, 0);
}

// ---------------------------------------------------------------------------
// Test: an unknown type string is a decode failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_type_terminates_loop() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, task) = h.connect(1, &alice).await;

    alice_tx
        .unbounded_send(text(r#"{"type":"video_call","receiver_id":2,"content":""}"#))
        .unwrap();

    assert_eq!(task.await.unwrap(), SessionEnd::MalformedFrame);
    assert!(!h.presence.is_online(1).await);
}

// ---------------------------------------------------------------------------
// Test: close frame, binary frame, and end of stream all clean up
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_frame_terminates_loop() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, task) = h.connect(1, &alice).await;

    alice_tx.unbounded_send(Ok(Frame::Ping)).unwrap();
    alice_tx.unbounded_send(Ok(Frame::Close)).unwrap();

    assert_eq!(task.await.unwrap(), SessionEnd::ClientClosed);
    assert!(!h.presence.is_online(1).await);
}

#[tokio::test]
async fn binary_frame_terminates_loop() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, task) = h.connect(1, &alice).await;

    alice_tx.unbounded_send(Ok(Frame::Binary)).unwrap();

    assert_eq!(task.await.unwrap(), SessionEnd::UnsupportedFrame);
    assert!(!h.presence.is_online(1).await);
}

#[tokio::test]
async fn end_of_stream_terminates_loop() {
    let h = harness();
    let alice = MockConnection::new();
    let (alice_tx, task) = h.connect(1, &alice).await;

    drop(alice_tx);

    assert_eq!(task.await.unwrap(), SessionEnd::StreamEnded);
    assert!(!h.presence.is_online(1).await);
    assert_eq!(alice.close_count(), 1);
}

// ---------------------------------------------------------------------------
// Test: a superseded loop exits without evicting its replacement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_closes_old_loop_and_keeps_new_connection() {
    let h = harness();
    let first = MockConnection::new();
    let second = MockConnection::new();
    let sender = MockConnection::new();

    let (_first_tx, first_task) = h.connect(2, &first).await;
    let (_second_tx, _second_task) = h.connect(2, &second).await;

    // Replacement closed the old handle, which ends the old loop.
    assert_eq!(first_task.await.unwrap(), SessionEnd::Closed);
    assert_eq!(first.close_count(), 1);
    assert!(h.presence.is_online(2).await);

    let (sender_tx, _s) = h.connect(1, &sender).await;
    sender_tx
        .unbounded_send(text(r#"{"receiver_id":2,"content":"new socket"}"#))
        .unwrap();

    wait_for_sent(&second, 1).await;
    assert!(first.sent().is_empty());
}

// ---------------------------------------------------------------------------
// Test: a failed delivery evicts the receiver but the sender keeps going
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_delivery_evicts_receiver_only() {
    let h = harness();
    let alice = MockConnection::new();
    let bob = MockConnection::failing();
    let (alice_tx, alice_task) = h.connect(1, &alice).await;
    let (_bob_tx, bob_task) = h.connect(2, &bob).await;

    alice_tx
        .unbounded_send(text(r#"{"receiver_id":2,"content":"x"}"#))
        .unwrap();

    // Eviction closes bob's handle, which ends bob's loop.
    assert_eq!(bob_task.await.unwrap(), SessionEnd::Closed);
    assert!(!h.presence.is_online(2).await);
    assert!(h.presence.is_online(1).await);
    assert!(!alice_task.is_finished());
}
