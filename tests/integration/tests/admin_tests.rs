//! Admin Route Integration Tests
//!
//! Run with: cargo test -p integration-tests --test admin_tests

use integration_tests::{
    assert_json, assert_status, config_with_typing_timeout, participant_ids, TestServer,
};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Poll the list route until `predicate` holds
async fn wait_for_list(
    server: &TestServer,
    conversation_id: &str,
    predicate: impl Fn(&[Value]) -> bool,
) -> Vec<Value> {
    let path = format!("/conversations/{conversation_id}/typing");
    for _ in 0..50 {
        let response = server.get(&path).await.unwrap();
        let typing: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();
        if predicate(&typing) {
            return typing;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("typing list for {conversation_id} never matched");
}

async fn long_timeout_server() -> TestServer {
    TestServer::start_with_config(config_with_typing_timeout(60_000).unwrap())
        .await
        .expect("Failed to start server")
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Typing List Tests
// ============================================================================

#[tokio::test]
async fn test_list_empty_conversation() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/conversations/nobody-here/typing").await.unwrap();
    let typing: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(typing.is_empty());
}

#[tokio::test]
async fn test_list_reflects_gateway_typing() {
    let server = long_timeout_server().await;
    let mut alice = server.connect_identified(1, Some("alice")).await.unwrap();
    let mut bob = server.connect_identified(2, None).await.unwrap();

    alice.typing_start("c1").await.unwrap();
    wait_for_list(&server, "c1", |typing| typing.len() == 1).await;
    bob.typing_start("c1").await.unwrap();

    let typing = wait_for_list(&server, "c1", |typing| typing.len() == 2).await;
    assert_eq!(participant_ids(&typing), vec!["1", "2"]);
    assert_eq!(typing[0]["display_name"], "alice");
    assert!(typing[1].get("display_name").is_none());
}

// ============================================================================
// Clear Tests
// ============================================================================

#[tokio::test]
async fn test_clear_conversation() {
    let server = long_timeout_server().await;
    let mut alice = server.connect_identified(1, None).await.unwrap();

    alice.typing_start("c1").await.unwrap();
    alice.typing_start("c2").await.unwrap();
    wait_for_list(&server, "c2", |typing| typing.len() == 1).await;

    let response = server.delete("/conversations/c1/typing").await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    wait_for_list(&server, "c1", |typing| typing.is_empty()).await;
    wait_for_list(&server, "c2", |typing| typing.len() == 1).await;
}

#[tokio::test]
async fn test_clear_conversation_is_idempotent() {
    let server = TestServer::start().await.expect("Failed to start server");
    for _ in 0..2 {
        let response = server.delete("/conversations/c1/typing").await.unwrap();
        assert_status(response, StatusCode::NO_CONTENT).await.unwrap();
    }
}

#[tokio::test]
async fn test_clear_all_notifies_subscribers() {
    let server = long_timeout_server().await;
    let mut watcher = server.connect().await.unwrap();
    watcher.subscribe("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();

    let mut alice = server.connect_identified(1, None).await.unwrap();
    alice.typing_start("c1").await.unwrap();
    watcher
        .recv_typing_update_where(|typing| typing.len() == 1)
        .await
        .unwrap();

    let response = server.delete("/typing").await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    watcher
        .recv_typing_update_where(|typing| typing.is_empty())
        .await
        .unwrap();
}

// ============================================================================
// Stats Tests
// ============================================================================

#[tokio::test]
async fn test_stats_counts_connections_and_conversations() {
    let server = long_timeout_server().await;

    let response = server.get("/stats").await.unwrap();
    let stats: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(stats["connections"], 0);
    assert_eq!(stats["conversations"], 0);

    let mut alice = server.connect_identified(1, None).await.unwrap();
    alice.typing_start("c1").await.unwrap();
    wait_for_list(&server, "c1", |typing| typing.len() == 1).await;

    let response = server.get("/stats").await.unwrap();
    let stats: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(stats["connections"], 1);
    assert_eq!(stats["conversations"], 1);
}
