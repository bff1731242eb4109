//! Gateway end-to-end tests
//!
//! Each test runs its own gateway on memory storage and the local bus.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{TestServer, ALICE, BOB, CAROL};
use reqwest::StatusCode;
use roomcast_core::{RoomName, RoomRepository};
use serde_json::json;

async fn add_member(server: &TestServer, room: &str, user: roomcast_core::UserId) {
    let repo = server.state.service_context().room_repo();
    let room = repo
        .find_by_name(&RoomName::parse(room).unwrap())
        .await
        .unwrap()
        .expect("room exists");
    repo.add_members(room.id, &[user]).await.unwrap();
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = TestServer::start().await.unwrap();
    let status = server.refused_status("/chat/general", None).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let server = TestServer::start().await.unwrap();
    let status = server
        .refused_status("/chat/general", Some("not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let status = server.refused_status("/status", Some("not-a-jwt")).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_is_unauthorized() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(roomcast_core::UserId::new(999));
    let status = server
        .refused_status("/chat/general", Some(&token))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_room_name_is_bad_request() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(ALICE);
    let status = server
        .refused_status("/chat/%20%20", Some(&token))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_member_is_forbidden() {
    let server = TestServer::start().await.unwrap();
    let _alice = server.connect("/chat/private", ALICE).await.unwrap();

    let token = server.token(BOB);
    let status = server
        .refused_status("/chat/private", Some(&token))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Room delivery
// ============================================================================

#[tokio::test]
async fn test_message_reaches_every_member() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();
    add_member(&server, "general", BOB).await;
    let mut bob = server.connect_with_query("/chat/general", BOB).await.unwrap();

    alice.send_chat("hello bob").await.unwrap();

    let expected = json!({ "message": "hello bob", "username": "alice", "user_id": 1 });
    assert_eq!(alice.next_message().await.unwrap(), expected);
    assert_eq!(bob.next_message().await.unwrap(), expected);
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();
    let mut bob = server.connect("/chat/random", BOB).await.unwrap();

    alice.send_chat("only general").await.unwrap();
    assert_eq!(alice.next_message().await.unwrap()["message"], "only general");
    bob.expect_no_message(Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();
    add_member(&server, "general", BOB).await;
    let mut bob = server.connect("/chat/general", BOB).await.unwrap();

    for i in 0..20 {
        alice.send_chat(&format!("m{i}")).await.unwrap();
    }

    for i in 0..20 {
        assert_eq!(bob.next_message().await.unwrap()["message"], format!("m{i}"));
    }
}

#[tokio::test]
async fn test_invalid_frames_are_dropped_silently() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();

    alice.send_raw("not json").await.unwrap();
    alice.send_raw(r#"{"text":"wrong key"}"#).await.unwrap();
    alice.send_chat("   ").await.unwrap();
    alice.send_chat(&"x".repeat(4001)).await.unwrap();
    alice.send_chat("still here").await.unwrap();

    assert_eq!(alice.next_message().await.unwrap()["message"], "still here");
}

#[tokio::test]
async fn test_rejection_notice_when_enabled() {
    let server = TestServer::start_with(&[("GATEWAY_NOTIFY_REJECTIONS", "true")])
        .await
        .unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();

    alice.send_chat(&"x".repeat(4001)).await.unwrap();

    let notice = alice.next_message().await.unwrap();
    assert_eq!(notice["type"], "error");
    assert_eq!(notice["code"], "CONTENT_TOO_LONG");
}

#[tokio::test]
async fn test_oversized_frame_ends_session() {
    let server = TestServer::start_with(&[("GATEWAY_MAX_FRAME_BYTES", "1024")])
        .await
        .unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();
    assert_eq!(server.state.connection_manager().session_count(), 1);

    alice.send_raw("x".repeat(4096)).await.unwrap();

    let mut waited = Duration::ZERO;
    while server.state.connection_manager().session_count() > 0 {
        assert!(waited < Duration::from_secs(2), "session outlived an oversized frame");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
}

#[tokio::test]
async fn test_history_replayed_on_join() {
    let server = TestServer::start_with(&[("GATEWAY_HISTORY_ON_JOIN", "10")])
        .await
        .unwrap();
    let mut alice = server.connect("/chat/general", ALICE).await.unwrap();
    alice.send_chat("first").await.unwrap();
    alice.send_chat("second").await.unwrap();
    assert_eq!(alice.next_message().await.unwrap()["message"], "first");
    assert_eq!(alice.next_message().await.unwrap()["message"], "second");

    add_member(&server, "general", BOB).await;
    let mut bob = server.connect("/chat/general", BOB).await.unwrap();
    assert_eq!(bob.next_message().await.unwrap()["message"], "first");
    assert_eq!(bob.next_message().await.unwrap()["message"], "second");
    bob.expect_no_message(Duration::from_millis(200)).await.unwrap();
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_status_feed_sees_connect_and_disconnect() {
    let server = TestServer::start().await.unwrap();
    let mut carol = server.connect("/status", CAROL).await.unwrap();

    let alice = server.connect("/chat/general", ALICE).await.unwrap();
    assert_eq!(
        carol.next_presence_for(ALICE).await.unwrap(),
        json!({ "type": "user_status", "user_id": 1, "status": "online" })
    );

    alice.close().await.unwrap();
    assert_eq!(
        carol.next_presence_for(ALICE).await.unwrap(),
        json!({ "type": "user_status", "user_id": 1, "status": false })
    );
}

#[tokio::test]
async fn test_second_session_does_not_reannounce() {
    let server = TestServer::start().await.unwrap();
    let mut carol = server.connect("/status", CAROL).await.unwrap();

    let first = server.connect("/chat/general", ALICE).await.unwrap();
    assert_eq!(carol.next_presence_for(ALICE).await.unwrap()["status"], "online");

    let second = server.connect("/chat/general", ALICE).await.unwrap();
    first.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.state.connection_manager().user_session_count(ALICE), 1);

    second.close().await.unwrap();
    let notice = carol.next_presence_for(ALICE).await.unwrap();
    assert_eq!(notice["user_id"], 1);
    assert_eq!(notice["status"], false);
}
