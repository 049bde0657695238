//! Gateway Integration Tests
//!
//! Each test spins up its own server on an ephemeral port; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::{config_with_typing_timeout, participant_ids, TestServer};
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_hello_is_first_frame() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect_raw().await.unwrap();

    let hello = client.recv().await.unwrap();
    assert_eq!(hello["op"], 10);
    assert_eq!(hello["d"]["heartbeat_interval"], 1_000);
    assert_eq!(hello["d"]["typing_timeout"], 300);
    assert!(hello.get("s").is_none());
}

#[tokio::test]
async fn test_identify_returns_ready() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.identify(42, Some("alice")).await.unwrap();
    let frame = client.recv().await.unwrap();

    assert_eq!(frame["op"], 0);
    assert_eq!(frame["t"], "READY");
    assert_eq!(frame["s"], 1);
    assert_eq!(frame["d"]["participant_id"], "42");
    assert!(frame["d"]["session_id"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn test_heartbeat_is_acked() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.heartbeat(None).await.unwrap();
    let ack = client.recv().await.unwrap();
    assert_eq!(ack["op"], 11);
}

// ============================================================================
// Protocol Violation Tests
// ============================================================================

#[tokio::test]
async fn test_typing_before_identify_closes_4003() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.typing_start("c1").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4003));
}

#[tokio::test]
async fn test_second_identify_closes_4005() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect_identified(1, None).await.unwrap();

    client.identify(1, None).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4005));
}

#[tokio::test]
async fn test_malformed_frame_closes_4002() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send_text("{not json").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_invalid_payload_closes_4002() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect_identified(1, None).await.unwrap();

    client
        .send(json!({ "op": 3, "d": { "conversation_id": "" } }))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_unknown_opcode_closes_4001() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send(json!({ "op": 99 })).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_out_of_range_opcode_closes_4001() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send(json!({ "op": 300 })).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_server_only_opcode_closes_4001() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect().await.unwrap();

    client.send(json!({ "op": 11 })).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4001));
}

#[tokio::test]
async fn test_silent_client_times_out_4009() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = server.connect_identified(1, None).await.unwrap();

    // Heartbeat interval is 1s, so the session expires after 2s of silence
    assert_eq!(client.expect_close().await.unwrap(), Some(4009));
}

// ============================================================================
// Typing Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_receives_current_list() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();

    watcher.subscribe("c1").await.unwrap();
    let update = watcher.recv_event("TYPING_UPDATE").await.unwrap();

    assert_eq!(update["conversation_id"], "c1");
    assert_eq!(update["typing"], json!([]));
}

#[tokio::test]
async fn test_typing_is_broadcast_then_expires() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();

    let mut typist = server.connect_identified(7, Some("bob")).await.unwrap();
    typist.typing_start("c1").await.unwrap();

    let typing = watcher
        .recv_typing_update_where(|typing| !typing.is_empty())
        .await
        .unwrap();
    assert_eq!(participant_ids(&typing), vec!["7"]);
    assert_eq!(typing[0]["display_name"], "bob");
    assert_eq!(typing[0]["is_typing"], true);

    // Nothing refreshes the indicator, so the typing timeout clears it
    let typing = watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();
    assert!(typing.is_empty());
}

#[tokio::test]
async fn test_typing_stop_is_broadcast() {
    let server = TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();

    let mut typist = server.connect_identified(7, None).await.unwrap();
    typist.typing_start("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.len() == 1)
        .await
        .unwrap();

    typist.typing_stop("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_updates_only_for_subscribed_conversation() {
    let server = TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();

    let mut typist = server.connect_identified(7, None).await.unwrap();
    typist.typing_start("c2").await.unwrap();
    typist.typing_start("c1").await.unwrap();

    // The first update the watcher sees is the c1 change, never c2
    let update = watcher.recv_event("TYPING_UPDATE").await.unwrap();
    assert_eq!(update["conversation_id"], "c1");
    assert_eq!(participant_ids(update["typing"].as_array().unwrap()), vec!["7"]);
}

#[tokio::test]
async fn test_unsubscribe_stops_updates() {
    let server = TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();
    watcher.unsubscribe("c1").await.unwrap();

    // The ack proves the unsubscribe was processed
    watcher.heartbeat(None).await.unwrap();
    assert_eq!(watcher.recv().await.unwrap()["op"], 11);

    let mut typist = server.connect_identified(7, None).await.unwrap();
    typist.typing_start("c1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // No update may arrive ahead of the second ack
    watcher.heartbeat(None).await.unwrap();
    let frame = watcher.recv().await.unwrap();
    assert_eq!(frame["op"], 11);
}

#[tokio::test]
async fn test_disconnect_stops_typing() {
    let server = TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server");
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();

    let mut typist = server.connect_identified(7, None).await.unwrap();
    typist.typing_start("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.len() == 1)
        .await
        .unwrap();

    typist.close().await.unwrap();

    // Long typing timeout: only disconnect cleanup can clear this in time
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dispatch_sequence_increases() {
    let server = TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server");
    let mut client = server.connect_identified(1, None).await.unwrap();

    client.subscribe("c1").await.unwrap();
    let first = client.recv().await.unwrap();
    client.typing_start("c1").await.unwrap();
    let second = client.recv().await.unwrap();

    // READY took sequence 1
    assert_eq!(first["s"], 2);
    assert_eq!(second["s"], 3);
    assert_eq!(participant_ids(second["d"]["typing"].as_array().unwrap()), vec!["1"]);
}
