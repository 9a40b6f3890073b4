//! Integration tests for the location sync loop.
//!
//! These tests verify the write path (device fix to remote store), the read
//! path (remote snapshot to mirrored table) and how the two behave when the
//! store or the identity is missing.

mod common;

use std::sync::Arc;

use common::{ScriptedStore, WAIT, harness, position_doc, wait_for_state};
use serde_json::json;
use survale_sync::{
    Authorization, LocationSync, Position, SharedSession, SimulatedLocator, Snapshot, StoreError,
    UserId,
};

#[tokio::test]
async fn test_fix_is_published_with_server_timestamp() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::signed_in("u1"));
    h.sync.start();
    h.sync.handle().on_position_update(Position::new(37.0, -122.0));
    h.sync.flush().await.unwrap();

    assert_eq!(h.store.len(), 1);
    let stored = h.store.get("u1").unwrap();
    assert_eq!(stored["latitude"], json!(37.0));
    assert_eq!(stored["longitude"], json!(-122.0));
    assert!(stored["timestamp"].is_string());
}

#[tokio::test]
async fn test_malformed_remote_entries_dropped() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::new());
    h.store.put_document("u1", json!({"latitude": 1.0, "longitude": 2.0}));
    h.store.put_document("u2", json!({"latitude": 3.0, "longitude": "bad"}));

    h.sync.subscribe_to_remote_positions();
    let state = wait_for_state(&h.sync, |s| !s.positions.is_empty()).await;

    assert_eq!(state.positions.len(), 1);
    let u1 = state.positions.get(&UserId::new("u1")).unwrap();
    assert!(u1.same_coordinate(&Position::new(1.0, 2.0)));
    assert!(!state.positions.contains(&UserId::new("u2")));
}

#[tokio::test]
async fn test_no_user_means_no_write() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::new());
    h.sync.start();
    h.sync.handle().on_position_update(Position::new(37.0, -122.0));
    h.sync.flush().await.unwrap();

    assert!(h.store.is_empty());
    let state = h.sync.state();
    assert_eq!(state.current_position, Some(Position::new(37.0, -122.0)));
    assert!(!state.permission_denied);
}

#[tokio::test]
async fn test_consecutive_fixes_overwrite() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::signed_in("u1"));
    let handle = h.sync.handle();
    handle.on_position_update(Position::new(1.0, 1.0));
    handle.on_position_update(Position::new(2.0, 2.0));
    h.sync.flush().await.unwrap();

    assert_eq!(h.store.len(), 1);
    let stored = h.store.get("u1").unwrap();
    assert_eq!(stored["latitude"], json!(2.0));
    assert_eq!(stored["longitude"], json!(2.0));
}

#[tokio::test]
async fn test_subscription_failure_keeps_previous_mirror() {
    let before = Snapshot::new(vec![position_doc("u1", 1.0, 2.0)]);
    let store = Arc::new(ScriptedStore::new(vec![
        Ok(before),
        Err(StoreError::SubscriptionFailed("backend unavailable".into())),
    ]));
    let sync = LocationSync::new(
        Arc::new(SimulatedLocator::new(Authorization::AuthorizedAlways)),
        store.clone(),
        Arc::new(SharedSession::new()),
    );

    sync.subscribe_to_remote_positions();

    // Both scripted items have been forwarded once the stream parks
    tokio::time::timeout(WAIT, store.parked.notified())
        .await
        .expect("subscription never drained its script");
    sync.flush().await.unwrap();

    let state = sync.state();
    assert_eq!(state.positions.len(), 1);
    assert_eq!(
        state.positions.get(&UserId::new("u1")),
        Some(&Position::new(1.0, 2.0))
    );
}

#[tokio::test]
async fn test_own_and_remote_positions_round_trip() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::signed_in("me"));
    h.store.put_document("friend", json!({"latitude": 37.78, "longitude": -122.41}));

    h.sync.start();
    h.sync.subscribe_to_remote_positions();
    h.sync.handle().on_position_update(Position::new(37.77, -122.42));

    let state = wait_for_state(&h.sync, |s| s.positions.len() == 2).await;
    let others: Vec<_> = state
        .other_users()
        .into_iter()
        .map(|(user, _)| user.to_string())
        .collect();
    assert_eq!(others, vec!["friend"]);

    let bounds = state.positions.bounds().unwrap();
    for (_, position) in state.positions.iter() {
        assert!(bounds.contains(position));
    }
}

#[tokio::test]
async fn test_removed_documents_leave_the_mirror() {
    let h = harness(Authorization::AuthorizedWhenInUse, SharedSession::new());
    h.store.put_document("u1", json!({"latitude": 1.0, "longitude": 1.0}));
    h.store.put_document("u2", json!({"latitude": 2.0, "longitude": 2.0}));

    h.sync.subscribe_to_remote_positions();
    wait_for_state(&h.sync, |s| s.positions.len() == 2).await;

    h.store.remove("u2");
    let state = wait_for_state(&h.sync, |s| s.positions.len() == 1).await;
    assert!(state.positions.contains(&UserId::new("u1")));
}
