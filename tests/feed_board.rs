use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use livefoot::board::{Applied, FeedUpdate, LiveBoard};
use livefoot::error::FeedError;
use livefoot::feed::{load_snapshot, run_board};
use livefoot::health::HealthCounters;
use livefoot::shutdown;
use livefoot::types::{ConnectionState, MatchState};

fn push(ids: &[&str]) -> FeedUpdate {
    let items: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "competition": {"id": 1, "name": "Ligue 1"}}))
        .collect();
    FeedUpdate::Message(serde_json::Value::Array(items).to_string())
}

fn snapshot(ids: &[&str]) -> FeedUpdate {
    FeedUpdate::Snapshot(
        ids.iter()
            .map(|id| MatchState {
                id: Some(id.to_string()),
                ..MatchState::default()
            })
            .collect(),
    )
}

fn ids(matches: &[MatchState]) -> Vec<String> {
    matches.iter().filter_map(|m| m.id.clone()).collect()
}

#[tokio::test]
async fn updates_apply_in_arrival_order() {
    let board = LiveBoard::new();
    let mut views = board.subscribe();
    let health = Arc::new(HealthCounters::default());
    let (tx, rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = shutdown::channel();
    let task = tokio::spawn(run_board(board, rx, health.clone(), shutdown_rx));

    tx.send(snapshot(&["s1", "s2"])).await.expect("send");
    tx.send(FeedUpdate::Connected).await.expect("send");
    tx.send(push(&["p1"])).await.expect("send");
    tx.send(FeedUpdate::Message("not json".to_string()))
        .await
        .expect("send");

    let view = views
        .wait_for(|v| v.matches.len() == 1)
        .await
        .expect("board alive")
        .clone();
    assert_eq!(ids(&view.matches), vec!["p1"]);
    assert_eq!(view.connection, ConnectionState::Connected);
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].name, "Ligue 1");

    drop(tx);
    let board = task.await.expect("join");
    assert!(board.is_torn_down());
    assert_eq!(ids(board.matches()), vec!["p1"]);

    let s = health.snapshot();
    assert_eq!(s.snapshots_applied, 1);
    assert_eq!(s.push_applied, 1);
    assert_eq!(s.push_dropped, 1);
    assert!(s.last_update_ms > 0);
    shutdown::request(&shutdown_tx);
}

#[tokio::test]
async fn nothing_mutates_after_teardown() {
    let board = LiveBoard::new();
    let views = board.subscribe();
    let health = Arc::new(HealthCounters::default());
    let (tx, rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = shutdown::channel();
    let task = tokio::spawn(run_board(board, rx, health, shutdown_rx));

    tx.send(push(&["before"])).await.expect("send");
    let mut waiter = views.clone();
    waiter
        .wait_for(|v| !v.matches.is_empty())
        .await
        .expect("board alive");

    shutdown::request(&shutdown_tx);
    let mut board = task.await.expect("join");

    assert!(tx.send(push(&["late"])).await.is_err());
    assert_eq!(board.apply(push(&["late"])), Applied::Ignored);
    assert_eq!(
        board.apply(FeedUpdate::ChannelError("reset".to_string())),
        Applied::Ignored
    );

    let view = views.borrow().clone();
    assert_eq!(ids(&view.matches), vec!["before"]);
    assert_eq!(view.connection, ConnectionState::Connected);
}

#[tokio::test]
async fn queued_update_is_not_applied_once_shutdown_is_requested() {
    for _ in 0..50 {
        let board = LiveBoard::new();
        let views = board.subscribe();
        let health = Arc::new(HealthCounters::default());
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = shutdown::channel();

        tx.send(push(&["late"])).await.expect("send");
        tx.send(FeedUpdate::Connected).await.expect("send");
        shutdown::request(&shutdown_tx);
        let board = tokio::spawn(run_board(board, rx, health.clone(), shutdown_rx))
            .await
            .expect("join");

        assert!(board.is_torn_down());
        assert!(board.matches().is_empty());
        let view = views.borrow().clone();
        assert!(view.matches.is_empty());
        assert_eq!(view.connection, ConnectionState::default());
        assert_eq!(health.snapshot().push_applied, 0);
    }
}

#[tokio::test]
async fn channel_error_marks_disconnected_and_keeps_matches() {
    let board = LiveBoard::new();
    let mut views = board.subscribe();
    let health = Arc::new(HealthCounters::default());
    let (tx, rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = shutdown::channel();
    let task = tokio::spawn(run_board(board, rx, health, shutdown_rx));

    tx.send(push(&["a", "b"])).await.expect("send");
    tx.send(FeedUpdate::ChannelError("eof".to_string()))
        .await
        .expect("send");

    let view = views
        .wait_for(|v| v.connection == ConnectionState::Disconnected && v.matches.len() == 2)
        .await
        .expect("board alive")
        .clone();
    assert_eq!(ids(&view.matches), vec!["a", "b"]);

    drop(tx);
    task.await.expect("join");
}

#[tokio::test]
async fn snapshot_failure_is_absorbed() {
    let health = Arc::new(HealthCounters::default());
    let (tx, mut rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = shutdown::channel();

    load_snapshot(
        async { Err(FeedError::Transport("refused".to_string())) },
        tx,
        health.clone(),
        shutdown_rx,
    )
    .await;

    assert!(rx.recv().await.is_none());
    assert_eq!(health.snapshot().snapshot_failures, 1);
}

#[tokio::test]
async fn snapshot_is_forwarded() {
    let health = Arc::new(HealthCounters::default());
    let (tx, mut rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = shutdown::channel();

    load_snapshot(
        async {
            Ok(vec![MatchState {
                id: Some("m1".to_string()),
                ..MatchState::default()
            }])
        },
        tx,
        health,
        shutdown_rx,
    )
    .await;

    match rx.recv().await {
        Some(FeedUpdate::Snapshot(matches)) => assert_eq!(ids(&matches), vec!["m1"]),
        other => panic!("unexpected update: {other:?}"),
    }
}

#[tokio::test]
async fn snapshot_after_shutdown_is_not_delivered() {
    let health = Arc::new(HealthCounters::default());
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = shutdown::channel();

    let slow = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(Vec::new())
    };
    let handle = tokio::spawn(load_snapshot(slow, tx, health, shutdown_rx));
    shutdown::request(&shutdown_tx);
    handle.await.expect("join");

    assert!(rx.recv().await.is_none());
}
