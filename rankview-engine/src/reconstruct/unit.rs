//! Channel execution units
//!
//! One dedicated OS thread per color channel. A unit owns exactly one factor
//! set and shares no memory with anything else: requests arrive on its own
//! unbounded channel and responses go out on the orchestrator's reply channel.
//! Requests are handled strictly in arrival order.
//!
//! Dropping the request sender (or calling [`ExecutionUnit::shutdown`]) lets
//! the thread drain its queue and exit.

use super::kernel::PreparedFactors;
use super::protocol::{UnitRequest, UnitResponse};
use rankview_common::config::Precision;
use rankview_common::{Channel, Error, Result, UnitFault};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-unit lifecycle state
#[derive(Debug, Default)]
pub enum UnitState {
    /// No factor set uploaded (or the last upload was rejected)
    #[default]
    Empty,
    /// Factor set uploaded and `US` precomputed
    Ready(PreparedFactors),
}

impl UnitState {
    pub fn is_ready(&self) -> bool {
        matches!(self, UnitState::Ready(_))
    }

    /// Apply one request and produce its response
    ///
    /// An upload always replaces the previous state in full, so a rejected
    /// upload leaves the unit `Empty`.
    pub fn handle(&mut self, channel: Channel, precision: Precision, request: UnitRequest) -> UnitResponse {
        match request {
            UnitRequest::Upload { factors, generation } => {
                *self = UnitState::Empty;
                let dims = factors.dims();

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| PreparedFactors::prepare(factors)));
                let fault = match outcome {
                    Ok(Ok(prepared)) => {
                        *self = UnitState::Ready(prepared);
                        debug!(
                            %channel,
                            %generation,
                            width = dims.width,
                            height = dims.height,
                            "Factor set uploaded"
                        );
                        return UnitResponse::Uploaded { channel, generation };
                    }
                    Ok(Err(fault)) => fault,
                    Err(payload) => UnitFault::DimensionMismatch(panic_message("upload", payload)),
                };

                warn!(%channel, %generation, %fault, "Rejected factor set upload");
                UnitResponse::Failed {
                    channel,
                    generation,
                    fault,
                }
            }

            UnitRequest::Reconstruct { rank, generation } => {
                let prepared = match self {
                    UnitState::Empty => {
                        return UnitResponse::Failed {
                            channel,
                            generation,
                            fault: UnitFault::NoFactorSetLoaded,
                        };
                    }
                    UnitState::Ready(prepared) => prepared,
                };

                let rank = prepared.dims().clamp_rank(rank);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    prepared.reconstruct(rank, precision)
                }));

                match outcome {
                    Ok(Ok(data)) => UnitResponse::Reconstructed {
                        channel,
                        generation,
                        rank,
                        data,
                    },
                    Ok(Err(fault)) => UnitResponse::Failed {
                        channel,
                        generation,
                        fault,
                    },
                    Err(payload) => UnitResponse::Failed {
                        channel,
                        generation,
                        fault: UnitFault::ComputeFailure(panic_message("kernel", payload)),
                    },
                }
            }
        }
    }
}

fn panic_message(stage: &str, payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("{} panicked: {}", stage, msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("{} panicked: {}", stage, msg)
    } else {
        format!("{} panicked", stage)
    }
}

/// Handle to one channel's worker thread
pub struct ExecutionUnit {
    channel: Channel,
    requests: mpsc::UnboundedSender<UnitRequest>,
    thread: JoinHandle<()>,
}

impl ExecutionUnit {
    /// Start the worker thread for `channel`
    ///
    /// Every response is sent on `replies`; the thread exits when its request
    /// channel closes or when `replies` has no receiver left.
    pub fn spawn(
        channel: Channel,
        precision: Precision,
        replies: mpsc::UnboundedSender<UnitResponse>,
    ) -> Result<Self> {
        let (requests, inbox) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name(format!("rankview-{}", channel))
            .spawn(move || worker_loop(channel, precision, inbox, replies))?;

        info!(%channel, %precision, "Execution unit started");

        Ok(Self {
            channel,
            requests,
            thread,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Queue a request; ownership of any buffers inside moves to the unit
    pub fn send(&self, request: UnitRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| Error::UnitUnavailable(self.channel))
    }

    /// Close the request channel and wait for the thread to finish
    pub fn shutdown(self) {
        let Self {
            channel,
            requests,
            thread,
        } = self;
        drop(requests);

        if thread.join().is_err() {
            warn!(%channel, "Execution unit thread panicked during shutdown");
        } else {
            debug!(%channel, "Execution unit stopped");
        }
    }
}

fn worker_loop(
    channel: Channel,
    precision: Precision,
    mut inbox: mpsc::UnboundedReceiver<UnitRequest>,
    replies: mpsc::UnboundedSender<UnitResponse>,
) {
    let mut state = UnitState::Empty;

    while let Some(request) = inbox.blocking_recv() {
        let response = state.handle(channel, precision, request);
        if replies.send(response).is_err() {
            debug!(%channel, "Reply channel closed, execution unit exiting");
            break;
        }
    }
}
