// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations driven by per-example sequence lengths.
//!
//! Lengths arrive as an integer tensor (`U8`, `U32`, `I64`, ...) and are
//! cast to `I64` at the boundary so they can be compared against an `I64`
//! position range.

use candle_core::{D, DType, Tensor};

use crate::error::{MaskError, Result};
use crate::shape::add_dim_as_except;

/// Build a floating mask from sequence lengths.
///
/// Position `j` along the new trailing axis is `1.0` if
/// `j < lengths[...]` and `0.0` otherwise.  The output is `F32` so it can
/// be fed straight into [`masked_average`](crate::masked_average) or
/// [`masked_softmax`](crate::masked_softmax).
///
/// # Shapes
/// - `lengths`: `S` (any shape, usually `[batch]`)
/// - returns: `S + [max_length]`
///
/// # Example
///
/// ```
/// use candle_core::{Device, Tensor};
/// use candle_seqmask::length2mask;
///
/// let lengths = Tensor::new(&[2u32, 0, 3], &Device::Cpu).unwrap();
/// let mask: Vec<Vec<f32>> = length2mask(&lengths, 3).unwrap().to_vec2().unwrap();
/// assert_eq!(mask, vec![vec![1.0, 1.0, 0.0], vec![0.0; 3], vec![1.0; 3]]);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::DType`] if `lengths` is not an integer tensor,
/// [`MaskError::Shape`] if `max_length` does not fit in `i64`, and
/// [`MaskError::Tensor`] on tensor operation failures.
pub fn length2mask(lengths: &Tensor, max_length: usize) -> Result<Tensor> {
    let lengths = lengths_as_i64(lengths, "length2mask")?;
    tracing::trace!(shape = ?lengths.dims(), max_length, "length2mask");

    let end = i64::try_from(max_length)
        .map_err(|_| MaskError::Shape(format!("max_length {max_length} overflows i64")))?;
    let positions = Tensor::arange(0i64, end, lengths.device())?;
    // [..., 1] against [1, ..., 1, max_length]
    let lengths = lengths.unsqueeze(D::Minus1)?;
    let positions = add_dim_as_except(&positions, &lengths, D::Minus1)?;
    Ok(positions.broadcast_lt(&lengths)?.to_dtype(DType::F32)?)
}

/// Reverse each sequence of a padded batch within its own length.
///
/// For batch element `i` with `len = lengths[i]` (clamped to `[0, seq]`),
/// positions `0..len` along axis 1 are reversed and positions `len..seq`
/// are copied through untouched.  Implemented as a single gather, so
/// trailing feature axes move with their position.
///
/// # Shapes
/// - `tensor`: `[batch, seq, ...]`
/// - `lengths`: `[batch]`
/// - returns: `[batch, seq, ...]`
///
/// # Errors
///
/// Returns [`MaskError::Shape`] if `dim != 1`, `tensor` has fewer than two
/// axes, `lengths` is not 1-D, or the batch sizes disagree;
/// [`MaskError::DType`] if `lengths` is not an integer tensor.
pub fn length_masked_reversed(tensor: &Tensor, lengths: &Tensor, dim: usize) -> Result<Tensor> {
    if dim != 1 {
        return Err(MaskError::Shape(format!(
            "length_masked_reversed only supports dim=1 (the sequence axis), got {dim}"
        )));
    }
    if tensor.rank() < 2 {
        return Err(MaskError::Shape(format!(
            "length_masked_reversed expects [batch, seq, ...], got shape {:?}",
            tensor.dims()
        )));
    }
    let lengths = lengths_as_i64(lengths, "length_masked_reversed")?;
    if lengths.rank() != 1 {
        return Err(MaskError::Shape(format!(
            "lengths must be 1-D, got shape {:?}",
            lengths.dims()
        )));
    }

    let batch = tensor.dim(0)?;
    let n_lengths = lengths.dim(0)?;
    if batch != n_lengths {
        return Err(MaskError::Shape(format!(
            "tensor incompatible with lengths: batch size {batch} vs {n_lengths} lengths"
        )));
    }
    let seq = tensor.dim(1)?;
    let seq_u32 = u32::try_from(seq)
        .map_err(|_| MaskError::Shape(format!("sequence length {seq} overflows u32")))?;
    tracing::trace!(shape = ?tensor.dims(), "length_masked_reversed");

    let lengths: Vec<i64> = lengths.to_vec1()?;
    let mut indices: Vec<u32> = Vec::with_capacity(batch * seq);
    for length in lengths {
        let valid = u32::try_from(length.clamp(0, i64::from(seq_u32))).unwrap_or(seq_u32);
        indices.extend((0..valid).rev().chain(valid..seq_u32));
    }

    // [batch, seq] -> [batch, seq, 1, ...] -> full input shape
    let mut index_dims = vec![batch, seq];
    index_dims.resize(tensor.rank(), 1);
    // CONTIGUOUS: gather requires contiguous source and index layouts
    let index = Tensor::from_vec(indices, (batch, seq), tensor.device())?
        .reshape(index_dims)?
        .broadcast_as(tensor.dims())?
        .contiguous()?;
    Ok(tensor.contiguous()?.gather(&index, dim)?)
}

/// Check that `lengths` is an integer tensor and cast it to `I64`.
pub(crate) fn lengths_as_i64(lengths: &Tensor, op: &str) -> Result<Tensor> {
    let dtype = lengths.dtype();
    if !dtype.is_int() {
        return Err(MaskError::DType(format!("{op} expects integer lengths, got {dtype:?}")));
    }
    Ok(lengths.to_dtype(DType::I64)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
