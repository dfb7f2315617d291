//! Low-rank reconstruction kernel
//!
//! Rebuilds one channel as `sum_{t<k} US[i,t] * Vt[t,j]`, clamped to
//! `[0, 255]`, where `US = U * diag(S)` is computed once per upload.
//!
//! Loop order is `i, t, j`: for every output row the kernel adds `k` scaled
//! `Vt` rows into a row accumulator. Both inner operands are contiguous, and
//! the per-element summation order over `t` is the same as the textbook
//! `i, j, t` form.
//!
//! Cost is `O(m * n * k)` per call, the dominant cost of the whole engine.

use super::image::ChannelReconstruction;
use rankview_common::config::Precision;
use rankview_common::{Dimensions, FactorSet, UnitFault};

/// Factor set with `U * diag(S)` folded in, ready for any rank
#[derive(Debug)]
pub struct PreparedFactors {
    /// `U * diag(S)`, height x r, row-major
    us: Vec<f32>,
    /// r x width, row-major
    vt: Vec<f32>,
    dims: Dimensions,
}

impl PreparedFactors {
    /// Validate a factor set and fold `S` into `U`
    ///
    /// `U`'s buffer is scaled in place and kept as `US`, so no new matrix is
    /// allocated. Cost is `O(m * r)`.
    pub fn prepare(factors: FactorSet) -> Result<Self, UnitFault> {
        factors.check_dimensions()?;

        let (mut us, s, vt, dims) = factors.into_parts();
        let r = dims.full_rank();
        for row in us.chunks_exact_mut(r) {
            for (value, sigma) in row.iter_mut().zip(&s) {
                *value *= sigma;
            }
        }

        Ok(Self { us, vt, dims })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn full_rank(&self) -> usize {
        self.dims.full_rank()
    }

    /// Reconstruct at `rank`, clamped into `[1, r]`
    ///
    /// Fails with `ComputeFailure` if any intensity comes out NaN (non-finite
    /// factor data); infinities clamp like any other out-of-range value.
    pub fn reconstruct(
        &self,
        rank: usize,
        precision: Precision,
    ) -> Result<ChannelReconstruction, UnitFault> {
        let k = self.dims.clamp_rank(rank);
        let mut out = match precision {
            Precision::Single => self.accumulate_f32(k),
            Precision::Double => self.accumulate_f64(k),
        };

        let n = self.dims.width;
        for (idx, value) in out.iter_mut().enumerate() {
            if value.is_nan() {
                return Err(UnitFault::ComputeFailure(format!(
                    "non-finite intensity at row {}, column {} (rank {})",
                    idx / n,
                    idx % n,
                    k
                )));
            }
            *value = value.clamp(0.0, 255.0);
        }

        Ok(ChannelReconstruction::from_clamped(out))
    }

    fn accumulate_f32(&self, k: usize) -> Vec<f32> {
        let (n, r) = (self.dims.width, self.dims.full_rank());
        let mut out = vec![0.0f32; self.dims.pixel_count()];

        for (i, out_row) in out.chunks_exact_mut(n).enumerate() {
            let us_row = &self.us[i * r..i * r + k];
            for (t, &coef) in us_row.iter().enumerate() {
                let vt_row = &self.vt[t * n..(t + 1) * n];
                for (acc, &v) in out_row.iter_mut().zip(vt_row) {
                    *acc += coef * v;
                }
            }
        }

        out
    }

    fn accumulate_f64(&self, k: usize) -> Vec<f32> {
        let (n, r) = (self.dims.width, self.dims.full_rank());
        let mut out = vec![0.0f32; self.dims.pixel_count()];
        let mut acc_row = vec![0.0f64; n];

        for (i, out_row) in out.chunks_exact_mut(n).enumerate() {
            acc_row.iter_mut().for_each(|a| *a = 0.0);

            let us_row = &self.us[i * r..i * r + k];
            for (t, &coef) in us_row.iter().enumerate() {
                let coef = f64::from(coef);
                let vt_row = &self.vt[t * n..(t + 1) * n];
                for (acc, &v) in acc_row.iter_mut().zip(vt_row) {
                    *acc += coef * f64::from(v);
                }
            }

            for (dst, &src) in out_row.iter_mut().zip(&acc_row) {
                *dst = src as f32;
            }
        }

        out
    }
}
