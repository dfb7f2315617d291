//! Interactive session driver
//!
//! Connects a presentation layer to an [`Orchestrator`]: rank changes go in
//! through [`Session::set_rank`], pass the [`RankThrottle`], and rendered
//! frames (or consolidated failures) come out on a watch channel. The
//! presentation layer only ever sees the newest update.

use crate::reconstruct::{Generation, Orchestrator, Rendered};
use crate::throttle::{RankThrottle, ThrottleDecision};
use rankview_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Latest outcome published to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// New frame; replaces the displayed image
    Frame(Arc<Rendered>),
    /// The request for `rank` failed; the displayed image stays as it was
    Failed { rank: usize, message: String },
}

impl SessionUpdate {
    pub fn frame(&self) -> Option<&Rendered> {
        match self {
            SessionUpdate::Frame(frame) => Some(frame),
            SessionUpdate::Failed { .. } => None,
        }
    }
}

/// Handle to a running session task
pub struct Session {
    ranks: mpsc::UnboundedSender<usize>,
    updates: watch::Receiver<Option<SessionUpdate>>,
    task: JoinHandle<Orchestrator>,
}

impl Session {
    /// Start driving `orchestrator` on a tokio task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(orchestrator: Orchestrator, throttle: RankThrottle) -> Self {
        let (ranks, rank_rx) = mpsc::unbounded_channel();
        let (update_tx, updates) = watch::channel(None);

        info!(
            min_interval_ms = throttle.min_interval().as_millis() as u64,
            "Session started"
        );
        let task = tokio::spawn(run_session(orchestrator, throttle, rank_rx, update_tx));

        Self {
            ranks,
            updates,
            task,
        }
    }

    /// Ask for a new rank; never blocks
    pub fn set_rank(&self, rank: usize) -> Result<()> {
        self.ranks.send(rank).map_err(|_| Error::SessionClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUpdate>> {
        self.updates.clone()
    }

    /// Stop the session and take the orchestrator back
    pub async fn close(self) -> Result<Orchestrator> {
        let Self { ranks, task, .. } = self;
        drop(ranks);
        task.await.map_err(|_| Error::SessionClosed)
    }
}

async fn run_session(
    mut orchestrator: Orchestrator,
    mut throttle: RankThrottle,
    mut ranks: mpsc::UnboundedReceiver<usize>,
    updates: watch::Sender<Option<SessionUpdate>>,
) -> Orchestrator {
    // Generation and requested rank of the outstanding request
    let mut in_flight: Option<(Generation, usize)> = None;

    loop {
        let deadline = throttle.next_deadline();
        let awaiting = in_flight.is_some();

        tokio::select! {
            received = ranks.recv() => {
                let Some(rank) = received else {
                    break;
                };
                match throttle.offer(rank, Instant::now()) {
                    ThrottleDecision::Accept(rank) => {
                        in_flight = issue(&mut orchestrator, rank, &updates);
                    }
                    ThrottleDecision::Deferred { .. } => {
                        debug!(rank, "Rank change deferred");
                    }
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(rank) = throttle.poll(Instant::now()) {
                    in_flight = issue(&mut orchestrator, rank, &updates);
                }
            }

            result = orchestrator.next_frame(), if awaiting => {
                let (generation, rank) = in_flight.take().unwrap_or_default();
                match result {
                    Ok(frame) => {
                        debug!(%generation, rank = frame.rank, "Frame published");
                        updates.send_replace(Some(SessionUpdate::Frame(Arc::new(frame))));
                    }
                    Err(e) => {
                        warn!(%generation, rank, error = %e, "Frame failed, keeping previous image");
                        updates.send_replace(Some(SessionUpdate::Failed {
                            rank,
                            message: e.to_string(),
                        }));
                    }
                }
            }
        }
    }

    info!("Session closed");
    orchestrator
}

fn issue(
    orchestrator: &mut Orchestrator,
    rank: usize,
    updates: &watch::Sender<Option<SessionUpdate>>,
) -> Option<(Generation, usize)> {
    match orchestrator.request(rank) {
        Ok(generation) => Some((generation, rank)),
        Err(e) => {
            warn!(rank, error = %e, "Could not issue reconstruct request");
            updates.send_replace(Some(SessionUpdate::Failed {
                rank,
                message: e.to_string(),
            }));
            None
        }
    }
}
