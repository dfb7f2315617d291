//! Integration tests for the interactive session driver

mod helpers;

use helpers::identity_sets;
use rankview_common::config::Precision;
use rankview_engine::{Orchestrator, RankThrottle, Session, SessionUpdate};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Wait until the published update satisfies `done`
async fn wait_for(
    updates: &mut watch::Receiver<Option<SessionUpdate>>,
    done: impl Fn(&SessionUpdate) -> bool,
) -> SessionUpdate {
    timeout(WAIT, async {
        loop {
            {
                let current = updates.borrow_and_update();
                if let Some(update) = &*current {
                    if done(update) {
                        return update.clone();
                    }
                }
            }
            updates.changed().await.unwrap();
        }
    })
    .await
    .expect("session update did not arrive in time")
}

async fn loaded_orchestrator() -> Orchestrator {
    let mut orch = Orchestrator::spawn(Precision::Single).unwrap();
    orch.upload_factors(identity_sets(8, 8, &[80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0]))
        .await
        .unwrap();
    orch
}

#[tokio::test]
async fn test_rapid_rank_changes_settle_on_last() {
    let session = Session::spawn(loaded_orchestrator().await, RankThrottle::new(Duration::from_millis(20)));
    let mut updates = session.subscribe();

    for rank in [3, 5, 7] {
        session.set_rank(rank).unwrap();
    }

    let update = wait_for(&mut updates, |u| u.frame().map(|f| f.rank == 7).unwrap_or(false)).await;
    let frame = update.frame().unwrap();
    assert_eq!(frame.image.pixel(0, 6), Some([20, 20, 20, 255]));
    assert_eq!(frame.image.pixel(0, 7), Some([0, 0, 0, 255]));

    let orch = session.close().await.unwrap();
    orch.shutdown();
}

#[tokio::test]
async fn test_unthrottled_session_renders_each_rank() {
    let session = Session::spawn(loaded_orchestrator().await, RankThrottle::new(Duration::ZERO));
    let mut updates = session.subscribe();

    session.set_rank(2).unwrap();
    wait_for(&mut updates, |u| u.frame().map(|f| f.rank == 2).unwrap_or(false)).await;

    session.set_rank(8).unwrap();
    let update = wait_for(&mut updates, |u| u.frame().map(|f| f.rank == 8).unwrap_or(false)).await;
    assert_eq!(update.frame().unwrap().metrics.frobenius_error, 0.0);

    let orch = session.close().await.unwrap();
    assert!(orch.has_reference());
    orch.shutdown();
}

#[tokio::test]
async fn test_failure_is_published() {
    let orch = Orchestrator::spawn(Precision::Single).unwrap();
    let session = Session::spawn(orch, RankThrottle::new(Duration::ZERO));
    let mut updates = session.subscribe();

    session.set_rank(4).unwrap();
    let update = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Failed { .. })).await;
    match update {
        SessionUpdate::Failed { rank, message } => {
            assert_eq!(rank, 4);
            assert!(message.contains("no factor set loaded"), "{}", message);
        }
        SessionUpdate::Frame(_) => unreachable!(),
    }

    let orch = session.close().await.unwrap();
    orch.shutdown();
}
