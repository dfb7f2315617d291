//! Binary wire codec for decomposition service payloads
//!
//! The payload has no header and no length fields. For each channel in wire
//! order it holds three little-endian `f32` arrays back to back:
//!
//! ```text
//! U  (height * r)   row-major
//! S  (r)
//! Vt (r * width)    row-major
//! ```
//!
//! where `r = min(width, height)`. The caller must already know `width` and
//! `height` to find the slice boundaries.

use crate::channel::PerChannel;
use crate::error::{Error, Result};
use crate::factor::{Dimensions, FactorSet};
use tracing::debug;

const F32_BYTES: usize = 4;

/// Decode a three-channel payload into owned factor sets
///
/// The buffer length must match `dims.payload_len()` exactly. Every array is
/// copied out, so the returned sets never borrow from `payload`.
pub fn decode_payload(payload: &[u8], dims: Dimensions) -> Result<PerChannel<FactorSet>> {
    let expected = dims.checked_payload_len().ok_or_else(|| {
        Error::InvalidDimensions(format!(
            "{}x{} is too large to address",
            dims.width, dims.height
        ))
    })?;
    if payload.len() != expected {
        return Err(Error::InvalidPayloadLength {
            expected,
            actual: payload.len(),
        });
    }

    let mut offset = 0usize;
    let mut read_array = |len: usize| -> Vec<f32> {
        let end = offset + len * F32_BYTES;
        let values = payload[offset..end]
            .chunks_exact(F32_BYTES)
            .map(|chunk| {
                let mut raw = [0u8; F32_BYTES];
                raw.copy_from_slice(chunk);
                f32::from_le_bytes(raw)
            })
            .collect();
        offset = end;
        values
    };

    let sets = PerChannel::from_fn(|_| {
        let u = read_array(dims.u_len());
        let s = read_array(dims.s_len());
        let vt = read_array(dims.vt_len());
        FactorSet::from_parts(u, s, vt, dims)
    });

    debug!(
        width = dims.width,
        height = dims.height,
        rank = dims.full_rank(),
        bytes = payload.len(),
        "Decoded factor payload"
    );

    Ok(sets)
}

/// Decode with raw width/height, validating them first
pub fn decode_payload_sized(payload: &[u8], width: usize, height: usize) -> Result<PerChannel<FactorSet>> {
    decode_payload(payload, Dimensions::new(width, height)?)
}

/// Encode three factor sets into the wire layout
///
/// Arrays are written as they are; no dimension check is made.
pub fn encode_payload(sets: &PerChannel<FactorSet>) -> Vec<u8> {
    let total: usize = sets
        .iter()
        .map(|(_, set)| set.u().len() + set.singular_values().len() + set.vt().len())
        .sum();

    let mut out = Vec::with_capacity(total * F32_BYTES);
    for (_, set) in sets.iter() {
        for array in [set.u(), set.singular_values(), set.vt()] {
            for value in array {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    out
}
