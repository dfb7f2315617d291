//! Factor sets and image dimensions
//!
//! A factor set approximates one color channel's `height x width` pixel matrix
//! as `U * diag(S) * Vt`, with `r = min(width, height)` components.

use crate::error::{Error, Result, UnitFault};
use serde::{Deserialize, Serialize};

/// Image dimensions as chosen by the caller when requesting a factorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    /// Validate and build dimensions
    ///
    /// Rejects zero sizes and sizes whose payload length would overflow `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(format!(
                "{}x{} has an empty axis",
                width, height
            )));
        }

        let dims = Self { width, height };
        if dims.checked_payload_len().is_none() {
            return Err(Error::InvalidDimensions(format!(
                "{}x{} is too large to address",
                width, height
            )));
        }

        Ok(dims)
    }

    /// Number of factor components, `min(width, height)`
    pub fn full_rank(&self) -> usize {
        self.width.min(self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Length of `U` (height x r)
    ///
    /// Length helpers saturate; use [`Dimensions::checked_payload_len`] to
    /// detect sizes that cannot be addressed.
    pub fn u_len(&self) -> usize {
        self.height.saturating_mul(self.full_rank())
    }

    /// Length of `S` (r)
    pub fn s_len(&self) -> usize {
        self.full_rank()
    }

    /// Length of `Vt` (r x width)
    pub fn vt_len(&self) -> usize {
        self.full_rank().saturating_mul(self.width)
    }

    /// Number of f32 values one channel occupies on the wire
    pub fn values_per_channel(&self) -> usize {
        self.u_len().saturating_add(self.s_len()).saturating_add(self.vt_len())
    }

    /// Exact byte length of a three-channel wire payload
    pub fn payload_len(&self) -> usize {
        self.values_per_channel().saturating_mul(12)
    }

    /// Payload length, `None` if any derived size overflows `usize`
    ///
    /// Also covers the RGBA buffer of a composed frame.
    pub fn checked_payload_len(&self) -> Option<usize> {
        let r = self.full_rank();
        let u = self.height.checked_mul(r)?;
        let vt = r.checked_mul(self.width)?;
        let payload = u.checked_add(r)?.checked_add(vt)?.checked_mul(12)?;
        self.width.checked_mul(self.height)?.checked_mul(4)?;
        Some(payload)
    }

    /// Clamp a requested rank into `[1, full_rank]`
    pub fn clamp_rank(&self, rank: usize) -> usize {
        rank.clamp(1, self.full_rank())
    }
}

/// One channel's truncatable factorization
///
/// Immutable once built. Buffers are owned, so handing a factor set to an
/// execution unit moves them and leaves nothing usable behind.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSet {
    u: Vec<f32>,
    s: Vec<f32>,
    vt: Vec<f32>,
    dims: Dimensions,
}

impl FactorSet {
    /// Assemble a factor set from raw row-major arrays
    ///
    /// Array lengths are not checked here; see [`FactorSet::check_dimensions`].
    pub fn from_parts(u: Vec<f32>, s: Vec<f32>, vt: Vec<f32>, dims: Dimensions) -> Self {
        Self { u, s, vt, dims }
    }

    pub fn u(&self) -> &[f32] {
        &self.u
    }

    pub fn singular_values(&self) -> &[f32] {
        &self.s
    }

    pub fn vt(&self) -> &[f32] {
        &self.vt
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> usize {
        self.dims.width
    }

    pub fn height(&self) -> usize {
        self.dims.height
    }

    pub fn full_rank(&self) -> usize {
        self.dims.full_rank()
    }

    /// Verify every array length agrees with the declared dimensions
    pub fn check_dimensions(&self) -> std::result::Result<(), UnitFault> {
        let d = &self.dims;
        if d.width == 0 || d.height == 0 {
            return Err(UnitFault::DimensionMismatch(format!(
                "declared size {}x{} has an empty axis",
                d.width, d.height
            )));
        }
        if d.checked_payload_len().is_none() {
            return Err(UnitFault::DimensionMismatch(format!(
                "declared size {}x{} is too large to address",
                d.width, d.height
            )));
        }

        let checks = [
            ("U", self.u.len(), d.u_len()),
            ("S", self.s.len(), d.s_len()),
            ("Vt", self.vt.len(), d.vt_len()),
        ];
        for (name, actual, expected) in checks {
            if actual != expected {
                return Err(UnitFault::DimensionMismatch(format!(
                    "{} has {} values, expected {} for {}x{}",
                    name, actual, expected, d.width, d.height
                )));
            }
        }

        Ok(())
    }

    /// Consume into `(U, S, Vt, dims)`
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>, Vec<f32>, Dimensions) {
        (self.u, self.s, self.vt, self.dims)
    }
}
