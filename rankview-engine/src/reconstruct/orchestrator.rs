//! Reconstruction orchestrator
//!
//! Owns the three execution units, the generation counter and everything the
//! presentation layer sees: the current image id, the singular values used
//! for metrics and the cached full-rank reference.
//!
//! **Fan-out:** every logical request gets a fresh generation and is sent to
//! all three units. **Fan-in:** replies are admitted only if they carry the
//! current generation; older ones are counted and dropped. A frame is composed
//! only once all three channels of the current generation are in.

use super::image::{ChannelReconstruction, CompositeImage};
use super::protocol::{Generation, UnitRequest, UnitResponse};
use super::unit::ExecutionUnit;
use crate::metrics::Metrics;
use rankview_common::config::Precision;
use rankview_common::wire::decode_payload_sized;
use rankview_common::{Channel, Dimensions, Error, FactorSet, PerChannel, Result, UnitFault};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// A composed frame ready for display
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Upload this frame was reconstructed from
    pub image_id: Uuid,
    pub generation: Generation,
    /// Effective rank after clamping
    pub rank: usize,
    pub image: CompositeImage,
    pub metrics: Metrics,
}

/// Fan-in counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanInStats {
    /// Replies dropped because a newer generation had been issued
    pub stale_discarded: u64,
    pub frames_composed: u64,
    pub requests_failed: u64,
}

/// State of the most recent successful upload
#[derive(Debug)]
struct LoadedImage {
    image_id: Uuid,
    dims: Dimensions,
    singular: PerChannel<Vec<f32>>,
    reference: Option<PerChannel<ChannelReconstruction>>,
}

/// Reconstruct request awaiting its three replies
#[derive(Debug)]
struct PendingRequest {
    generation: Generation,
    rank: usize,
    slots: PerChannel<Option<ChannelReconstruction>>,
}

pub struct Orchestrator {
    units: PerChannel<ExecutionUnit>,
    replies: mpsc::UnboundedReceiver<UnitResponse>,
    generation: Generation,
    image: Option<LoadedImage>,
    pending: Option<PendingRequest>,
    stats: FanInStats,
}

impl Orchestrator {
    /// Start one execution unit per channel
    pub fn spawn(precision: Precision) -> Result<Self> {
        let (reply_tx, replies) = mpsc::unbounded_channel();

        let red = ExecutionUnit::spawn(Channel::Red, precision, reply_tx.clone())?;
        let green = ExecutionUnit::spawn(Channel::Green, precision, reply_tx.clone())?;
        let blue = ExecutionUnit::spawn(Channel::Blue, precision, reply_tx)?;

        info!(%precision, "Orchestrator started with 3 execution units");

        Ok(Self {
            units: PerChannel::new(red, green, blue),
            replies,
            generation: Generation::default(),
            image: None,
            pending: None,
            stats: FanInStats::default(),
        })
    }

    /// Most recently issued generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn image_id(&self) -> Option<Uuid> {
        self.image.as_ref().map(|image| image.image_id)
    }

    pub fn dims(&self) -> Option<Dimensions> {
        self.image.as_ref().map(|image| image.dims)
    }

    pub fn full_rank(&self) -> Option<usize> {
        self.dims().map(|dims| dims.full_rank())
    }

    /// Whether the full-rank reference for the current upload is cached
    pub fn has_reference(&self) -> bool {
        self.image
            .as_ref()
            .map(|image| image.reference.is_some())
            .unwrap_or(false)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn stats(&self) -> FanInStats {
        self.stats
    }

    /// Decode a service payload and hand each channel to its unit
    ///
    /// Decoding happens before anything else, so a malformed payload leaves
    /// the current image, generation and units untouched.
    pub async fn upload(&mut self, payload: &[u8], width: usize, height: usize) -> Result<Uuid> {
        let sets = decode_payload_sized(payload, width, height)?;
        self.upload_factors(sets).await
    }

    /// Hand already-decoded factor sets to the units
    ///
    /// Any in-flight reconstruct becomes stale. On any unit failure the
    /// orchestrator is left with no image loaded.
    pub async fn upload_factors(&mut self, sets: PerChannel<FactorSet>) -> Result<Uuid> {
        let dims = sets[Channel::Red].dims();
        for (channel, set) in sets.iter() {
            if set.dims() != dims {
                return Err(Error::InvalidDimensions(format!(
                    "{} factor set is {}x{}, red is {}x{}",
                    channel,
                    set.width(),
                    set.height(),
                    dims.width,
                    dims.height
                )));
            }
        }

        let singular = sets.each_ref().map(|_, set| set.singular_values().to_vec());

        self.generation = self.generation.next();
        let generation = self.generation;
        self.pending = None;
        self.image = None;

        for (channel, factors) in sets {
            self.units[channel].send(UnitRequest::Upload { factors, generation })?;
        }

        let mut acked = PerChannel::new(false, false, false);
        let mut failure = None;
        while acked.iter().any(|(_, done)| !done) {
            let response = self.recv_reply().await?;
            if response.generation() != generation {
                self.discard_stale(&response);
                continue;
            }

            match response {
                UnitResponse::Uploaded { channel, .. } => acked[channel] = true,
                UnitResponse::Failed { channel, fault, .. } => {
                    acked[channel] = true;
                    failure.get_or_insert(Error::Channel { channel, fault });
                }
                UnitResponse::Reconstructed { channel, .. } => {
                    warn!(%channel, %generation, "Unexpected reconstruction reply during upload");
                }
            }
        }

        if let Some(err) = failure {
            error!(%generation, error = %err, "Upload failed, no image loaded");
            return Err(err);
        }

        let image_id = Uuid::new_v4();
        self.image = Some(LoadedImage {
            image_id,
            dims,
            singular,
            reference: None,
        });

        info!(
            %image_id,
            %generation,
            width = dims.width,
            height = dims.height,
            rank = dims.full_rank(),
            "Factor sets uploaded"
        );
        Ok(image_id)
    }

    /// Fan a reconstruct request out to all units without waiting
    ///
    /// Any request still outstanding is superseded. The rank is clamped to
    /// the loaded image; with nothing loaded the units answer
    /// `NoFactorSetLoaded`.
    pub fn request(&mut self, rank: usize) -> Result<Generation> {
        let rank = match &self.image {
            Some(image) => image.dims.clamp_rank(rank),
            None => rank.max(1),
        };

        self.generation = self.generation.next();
        let generation = self.generation;
        self.pending = Some(PendingRequest {
            generation,
            rank,
            slots: PerChannel::default(),
        });

        for (_, unit) in self.units.iter() {
            unit.send(UnitRequest::Reconstruct { rank, generation })?;
        }

        debug!(%generation, rank, "Reconstruct request issued");
        Ok(generation)
    }

    /// Await the frame for the outstanding request
    ///
    /// Cancel-safe: replies already admitted stay in the pending slots, so
    /// dropping this future and calling it again loses nothing.
    pub async fn next_frame(&mut self) -> Result<Rendered> {
        loop {
            let generation = match &self.pending {
                Some(pending) => pending.generation,
                None => return Err(Error::NoPendingRequest),
            };

            let response = self.recv_reply().await?;
            if response.generation() != generation {
                self.discard_stale(&response);
                continue;
            }

            match response {
                UnitResponse::Reconstructed { channel, data, .. } => {
                    if let Some(pending) = self.pending.as_mut() {
                        pending.slots[channel] = Some(data);
                    }
                }
                UnitResponse::Failed { channel, fault, .. } => {
                    self.pending = None;
                    self.stats.requests_failed += 1;
                    warn!(%channel, %generation, %fault, "Reconstruct request failed");
                    return Err(Error::Channel { channel, fault });
                }
                UnitResponse::Uploaded { channel, .. } => {
                    warn!(%channel, %generation, "Unexpected upload acknowledgement");
                }
            }

            let complete = self
                .pending
                .as_ref()
                .map(|pending| pending.slots.iter().all(|(_, slot)| slot.is_some()))
                .unwrap_or(false);
            if complete {
                if let Some(pending) = self.pending.take() {
                    return self.compose(pending);
                }
            }
        }
    }

    /// Issue a request and wait for its frame
    pub async fn reconstruct(&mut self, rank: usize) -> Result<Rendered> {
        self.request(rank)?;
        self.next_frame().await
    }

    /// Metrics for planes reconstructed at `rank` from the current upload
    ///
    /// `None` with no image loaded.
    pub fn metrics_for(&self, rank: usize, planes: &PerChannel<ChannelReconstruction>) -> Option<Metrics> {
        self.image.as_ref().map(|image| {
            Metrics::compute(
                &image.singular,
                image.dims,
                image.dims.clamp_rank(rank),
                image.reference.as_ref(),
                planes,
            )
        })
    }

    /// Close every unit's request channel and join the threads
    pub fn shutdown(self) {
        let Self { units, stats, .. } = self;
        for (_, unit) in units {
            unit.shutdown();
        }
        info!(
            stale_discarded = stats.stale_discarded,
            frames_composed = stats.frames_composed,
            "Orchestrator stopped"
        );
    }

    fn compose(&mut self, pending: PendingRequest) -> Result<Rendered> {
        let PendingRequest {
            generation,
            rank,
            slots,
        } = pending;

        let Some(image) = self.image.as_mut() else {
            // Units only answer Reconstructed when they hold a factor set
            return Err(Error::Channel {
                channel: Channel::Red,
                fault: UnitFault::NoFactorSetLoaded,
            });
        };
        let Some(planes) = slots.transpose() else {
            return Err(Error::NoPendingRequest);
        };

        let composite = CompositeImage::compose(image.dims, &planes)?;

        if rank == image.dims.full_rank() && image.reference.is_none() {
            debug!(image_id = %image.image_id, "Cached full-rank reference");
            image.reference = Some(planes.clone());
        }

        let metrics = Metrics::compute(
            &image.singular,
            image.dims,
            rank,
            image.reference.as_ref(),
            &planes,
        );

        self.stats.frames_composed += 1;
        debug!(
            image_id = %image.image_id,
            %generation,
            rank,
            frobenius_error = metrics.frobenius_error,
            "Frame composed"
        );

        Ok(Rendered {
            image_id: image.image_id,
            generation,
            rank,
            image: composite,
            metrics,
        })
    }

    async fn recv_reply(&mut self) -> Result<UnitResponse> {
        match self.replies.recv().await {
            Some(response) => Ok(response),
            // Every unit holds a sender, so this only happens if all threads died
            None => Err(Error::UnitsStopped),
        }
    }

    fn discard_stale(&mut self, response: &UnitResponse) {
        self.stats.stale_discarded += 1;
        trace!(
            channel = %response.channel(),
            generation = %response.generation(),
            current = %self.generation,
            "Discarded stale reply"
        );
    }
}
