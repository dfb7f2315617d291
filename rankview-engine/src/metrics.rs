//! Fidelity metrics for truncated reconstructions
//!
//! Energy-based figures come straight from the singular values and need no
//! pixels. Pixel-based figures (MSE, PSNR) compare the composite at rank `k`
//! against the full-rank reconstruction of the same upload.

use crate::reconstruct::ChannelReconstruction;
use rankview_common::{Channel, Dimensions, PerChannel};
use serde::{Serialize, Serializer};

/// Peak intensity used by PSNR
pub const MAX_INTENSITY: f64 = 255.0;

/// Sum of squared singular values from index `k` to the end
///
/// `k` past the end yields 0.
pub fn tail_energy(singular: &[f32], k: usize) -> f64 {
    singular
        .iter()
        .skip(k)
        .map(|&s| f64::from(s) * f64::from(s))
        .sum()
}

/// Total squared singular-value energy
pub fn total_energy(singular: &[f32]) -> f64 {
    tail_energy(singular, 0)
}

/// Frobenius norm of the rank-`k` truncation error across all three channels
pub fn frobenius_error(red: &[f32], green: &[f32], blue: &[f32], k: usize) -> f64 {
    (tail_energy(red, k) + tail_energy(green, k) + tail_energy(blue, k)).sqrt()
}

/// Fraction of total energy kept at rank `k`, 1.0 when there is no energy
pub fn energy_retained(singular: &PerChannel<Vec<f32>>, k: usize) -> f64 {
    let total: f64 = singular.iter().map(|(_, s)| total_energy(s)).sum();
    if total == 0.0 {
        return 1.0;
    }
    let tail: f64 = singular.iter().map(|(_, s)| tail_energy(s, k)).sum();
    ((total - tail) / total).clamp(0.0, 1.0)
}

/// How many times smaller rank-`k` factors are than the raw channel
pub fn compression_ratio(dims: Dimensions, k: usize) -> f64 {
    let k = k.max(1) as f64;
    let raw = dims.pixel_count() as f64;
    raw / (k * (dims.width + dims.height + 1) as f64)
}

/// Mean squared error between two sets of channel planes
///
/// Alpha is not part of the planes, so it never contributes. `None` when the
/// planes differ in length or are empty.
pub fn mse(a: &PerChannel<ChannelReconstruction>, b: &PerChannel<ChannelReconstruction>) -> Option<f64> {
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for ((_, pa), (_, pb)) in a.iter().zip(b.iter()) {
        if pa.len() != pb.len() {
            return None;
        }
        for (&x, &y) in pa.as_slice().iter().zip(pb.as_slice()) {
            let d = f64::from(x) - f64::from(y);
            sum += d * d;
        }
        count += pa.len();
    }

    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

/// PSNR in dB from a mean squared error, `+inf` for identical images
pub fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * MAX_INTENSITY.log10() - 10.0 * mse.log10()
}

pub fn psnr(a: &PerChannel<ChannelReconstruction>, b: &PerChannel<ChannelReconstruction>) -> Option<f64> {
    mse(a, b).map(psnr_from_mse)
}

/// Metrics reported alongside every rendered frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub rank: usize,
    pub full_rank: usize,
    pub frobenius_error: f64,
    pub energy_retained: f64,
    pub compression_ratio: f64,
    /// `None` until the full-rank reference is cached
    pub mse: Option<f64>,
    #[serde(serialize_with = "serialize_psnr")]
    pub psnr: Option<f64>,
}

impl Metrics {
    /// Compute metrics for planes reconstructed at `rank`
    ///
    /// `reference` is the full-rank reconstruction of the same upload, if it
    /// has been produced yet.
    pub fn compute(
        singular: &PerChannel<Vec<f32>>,
        dims: Dimensions,
        rank: usize,
        reference: Option<&PerChannel<ChannelReconstruction>>,
        planes: &PerChannel<ChannelReconstruction>,
    ) -> Self {
        let mse = reference.and_then(|reference| mse(reference, planes));

        Self {
            rank,
            full_rank: dims.full_rank(),
            frobenius_error: frobenius_error(
                &singular[Channel::Red],
                &singular[Channel::Green],
                &singular[Channel::Blue],
                rank,
            ),
            energy_retained: energy_retained(singular, rank),
            compression_ratio: compression_ratio(dims, rank),
            mse,
            psnr: mse.map(psnr_from_mse),
        }
    }
}

// JSON has no infinity; identical images serialize as the string "inf"
fn serialize_psnr<S: Serializer>(psnr: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match psnr {
        Some(value) if value.is_infinite() => serializer.serialize_str("inf"),
        Some(value) => serializer.serialize_some(value),
        None => serializer.serialize_none(),
    }
}
