// SPDX-License-Identifier: MIT OR Apache-2.0

//! Softmax restricted to valid positions.
//!
//! Masked logits are pushed to a large finite negative value (`ninf`)
//! before the softmax, never to `-inf`, so a fully masked slice produces a
//! uniform distribution instead of `NaN`.  After the softmax the
//! probabilities are re-masked, floored by `eps` and renormalized.

use candle_core::shape::Dim;
use candle_core::{DType, Tensor};

use crate::config::{DEFAULT_SOFTMAX_EPS, check_eps, check_ninf};
use crate::error::{MaskError, Result};
use crate::mask::length::lengths_as_i64;
use crate::shape::{add_dim_as_except, broadcast_mask_as, resolve_dim};

/// Softmax along `dim`, restricted to positions where `mask` is non-zero.
///
/// With a mask:
/// 1. `x = logits * mask + ninf * (1 - mask)`
/// 2. `p = softmax(x, dim)`
/// 3. `p = p * mask + eps` (every position, valid ones included)
/// 4. `p = p / sum(p, dim)`
///
/// Masked positions end up at a small positive value rather than exactly
/// zero.  Without a mask this is a plain softmax.
///
/// # Shapes
/// - `logits`: any shape
/// - `mask`: broadcastable to `logits`
/// - returns: same shape, dtype and device as `logits`
///
/// # Example
///
/// ```
/// use candle_core::{D, Device, Tensor};
/// use candle_seqmask::masked_softmax;
///
/// let logits = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu).unwrap();
/// let mask = Tensor::new(&[1f32, 1.0, 0.0], &Device::Cpu).unwrap();
/// let probs: Vec<f32> = masked_softmax(&logits, Some(&mask), D::Minus1, 1e-20, -1e4)
///     .unwrap()
///     .to_vec1()
///     .unwrap();
/// assert!(probs[2] < 1e-6);
/// assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::DType`] if `logits` is not floating point,
/// [`MaskError::Config`] if `eps` or `ninf` are out of range,
/// [`MaskError::Shape`] if `mask` does not broadcast to the shape of
/// `logits`, and [`MaskError::Tensor`] if `dim` is invalid.
pub fn masked_softmax<D: Dim>(
    logits: &Tensor,
    mask: Option<&Tensor>,
    dim: D,
    eps: f64,
    ninf: f64,
) -> Result<Tensor> {
    check_eps("eps", eps)?;
    check_ninf(ninf)?;
    let dim = resolve_dim(logits.shape(), dim, "masked_softmax")?;
    let original_dtype = logits.dtype();
    if !original_dtype.is_float() {
        return Err(MaskError::DType(format!(
            "masked_softmax expects floating-point logits, got {original_dtype:?}"
        )));
    }
    let mask = mask
        .map(|mask| broadcast_mask_as(mask, logits, "masked_softmax"))
        .transpose()?;
    tracing::trace!(shape = ?logits.dims(), dim, masked = mask.is_some(), "masked_softmax");

    // PROMOTE: softmax over F16/BF16 can produce NaN; compute in F32
    let compute_dtype = match original_dtype {
        DType::F16 | DType::BF16 => DType::F32,
        other => other,
    };
    let logits = logits.to_dtype(compute_dtype)?;

    let probs = match mask {
        None => candle_nn::ops::softmax(&logits, dim)?,
        Some(mask) => {
            let mask = mask.to_dtype(compute_dtype)?;
            // ninf * (1 - mask)
            let penalty = mask.affine(-ninf, ninf)?;
            let blended = ((&logits * &mask)? + penalty)?;
            let probs = candle_nn::ops::softmax(&blended, dim)?;
            let probs = ((probs * &mask)? + eps)?;
            probs.broadcast_div(&probs.sum_keepdim(dim)?)?
        }
    };

    if original_dtype == compute_dtype {
        Ok(probs)
    } else {
        Ok(probs.to_dtype(original_dtype)?)
    }
}

/// Softmax along `dim`, restricted to the first `lengths[...]` positions.
///
/// Builds the mask `position < lengths` aligned with `dim` and delegates to
/// [`masked_softmax`] with the default `eps`.  `lengths` has the shape of
/// `logits` with `dim` removed; size-1 axes broadcast.
///
/// # Shapes
/// - `logits`: `[d_0, ..., d_dim, ..., d_{r-1}]`
/// - `lengths`: `[d_0, ..., d_{r-1}]` without `d_dim` (rank `r - 1`)
/// - returns: same as `logits`
///
/// # Example
///
/// ```
/// use candle_core::{D, Device, Tensor};
/// use candle_seqmask::length_masked_softmax;
///
/// let logits = Tensor::zeros((2, 4), candle_core::DType::F32, &Device::Cpu).unwrap();
/// let lengths = Tensor::new(&[2u32, 4], &Device::Cpu).unwrap();
/// let probs: Vec<Vec<f32>> = length_masked_softmax(&logits, &lengths, D::Minus1, -1e4)
///     .unwrap()
///     .to_vec2()
///     .unwrap();
/// assert!((probs[0][0] - 0.5).abs() < 1e-5);
/// assert!((probs[1][3] - 0.25).abs() < 1e-5);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::Shape`] if `lengths` has the wrong rank,
/// [`MaskError::DType`] if `lengths` is not an integer tensor, plus every
/// error of [`masked_softmax`].
pub fn length_masked_softmax<D: Dim>(
    logits: &Tensor,
    lengths: &Tensor,
    dim: D,
    ninf: f64,
) -> Result<Tensor> {
    length_masked_softmax_with_eps(logits, lengths, dim, DEFAULT_SOFTMAX_EPS, ninf)
}

/// [`length_masked_softmax`] with an explicit probability floor.
pub(crate) fn length_masked_softmax_with_eps<D: Dim>(
    logits: &Tensor,
    lengths: &Tensor,
    dim: D,
    eps: f64,
    ninf: f64,
) -> Result<Tensor> {
    let dim = resolve_dim(logits.shape(), dim, "length_masked_softmax")?;
    if lengths.rank() + 1 != logits.rank() {
        return Err(MaskError::Shape(format!(
            "lengths shape {:?} must have rank {} to mask logits shape {:?} along dim {dim}",
            lengths.dims(),
            logits.rank().saturating_sub(1),
            logits.dims()
        )));
    }
    let lengths = lengths_as_i64(lengths, "length_masked_softmax")?.to_device(logits.device())?;

    let size = logits.dim(dim)?;
    let end = i64::try_from(size)
        .map_err(|_| MaskError::Shape(format!("axis size {size} overflows i64")))?;
    let positions = Tensor::arange(0i64, end, logits.device())?;
    // [1, ..., size, ..., 1] against lengths with a singleton at `dim`
    let positions = add_dim_as_except(&positions, logits, dim)?;
    let lengths = lengths.unsqueeze(dim)?;
    let mask = positions.broadcast_lt(&lengths)?;

    masked_softmax(logits, Some(&mask), dim, eps, ninf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
