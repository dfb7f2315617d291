//! Rank-change throttling
//!
//! A rank slider can emit changes far faster than reconstructions complete.
//! The throttle accepts at most one rank per `min_interval` and parks the
//! newest rejected rank, releasing it when the window reopens, so the last
//! position the user settled on is always rendered.

use rankview_common::config::ThrottleConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Outcome of offering a rank to the throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Forward this rank now
    Accept(usize),
    /// Parked; [`RankThrottle::poll`] releases it at `ready_at`
    Deferred { ready_at: Instant },
}

#[derive(Debug)]
pub struct RankThrottle {
    min_interval: Duration,
    last_accepted: Option<Instant>,
    pending: Option<usize>,
}

impl RankThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
            pending: None,
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.min_interval())
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Offer a new rank observed at `now`
    ///
    /// A deferred rank replaces whatever was parked before it.
    pub fn offer(&mut self, rank: usize, now: Instant) -> ThrottleDecision {
        match self.window_opens_at() {
            Some(ready_at) if now < ready_at => {
                if let Some(replaced) = self.pending.replace(rank) {
                    trace!(replaced, rank, "Parked rank superseded");
                }
                ThrottleDecision::Deferred { ready_at }
            }
            _ => {
                self.pending = None;
                self.last_accepted = Some(now);
                ThrottleDecision::Accept(rank)
            }
        }
    }

    /// Release the parked rank if its window has opened
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let ready_at = self.window_opens_at();
        if ready_at.map(|at| now < at).unwrap_or(false) {
            return None;
        }

        let rank = self.pending.take()?;
        self.last_accepted = Some(now);
        Some(rank)
    }

    /// When a parked rank becomes releasable, `None` if nothing is parked
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending?;
        Some(self.window_opens_at().unwrap_or_else(Instant::now))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn window_opens_at(&self) -> Option<Instant> {
        self.last_accepted.map(|at| at + self.min_interval)
    }
}

impl Default for RankThrottle {
    fn default() -> Self {
        Self::from_config(&ThrottleConfig::default())
    }
}
