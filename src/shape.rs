// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axis resolution and rank alignment helpers.
//!
//! [`add_dim_as_except`] lines a 1-D tensor up against a higher-rank
//! reference tensor by inserting size-1 axes everywhere except one axis.
//! It is the broadcast primitive behind both
//! [`length2mask`](crate::length2mask) and
//! [`length_masked_softmax`](crate::length_masked_softmax).

use candle_core::shape::Dim;
use candle_core::{Shape, Tensor};

use crate::error::{MaskError, Result};

/// Resolve a (possibly end-relative) axis against `shape`.
///
/// # Errors
///
/// Returns [`MaskError::Tensor`] if `dim` is out of range for `shape`.
pub fn resolve_dim<D: Dim>(shape: &Shape, dim: D, op: &'static str) -> Result<usize> {
    Ok(dim.to_index(shape, op)?)
}

/// Reshape a 1-D `tensor` so that it broadcasts against `reference` along
/// axis `except` only.
///
/// The result has the rank of `reference`; every axis has size 1 except
/// `except`, which keeps the length of `tensor`.
///
/// # Shapes
/// - `tensor`: `[n]`
/// - `reference`: `[d_0, ..., d_{r-1}]`
/// - returns: `[1, ..., n, ..., 1]` (rank `r`, `n` at position `except`)
///
/// # Example
///
/// ```
/// use candle_core::{D, Device, Tensor};
/// use candle_seqmask::add_dim_as_except;
///
/// let rng = Tensor::arange(0u32, 5, &Device::Cpu).unwrap();
/// let reference = Tensor::zeros((2, 3, 5), candle_core::DType::F32, &Device::Cpu).unwrap();
/// let aligned = add_dim_as_except(&rng, &reference, D::Minus1).unwrap();
/// assert_eq!(aligned.dims(), &[1, 1, 5]);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::Shape`] if `tensor` is not 1-D, and
/// [`MaskError::Tensor`] if `except` is out of range for `reference`.
pub fn add_dim_as_except<D: Dim>(tensor: &Tensor, reference: &Tensor, except: D) -> Result<Tensor> {
    if tensor.rank() != 1 {
        return Err(MaskError::Shape(format!(
            "add_dim_as_except expects a 1-D tensor, got shape {:?}",
            tensor.dims()
        )));
    }
    let except = resolve_dim(reference.shape(), except, "add_dim_as_except")?;

    let mut dims = vec![1usize; reference.rank()];
    if let Some(slot) = dims.get_mut(except) {
        *slot = tensor.elem_count();
    }
    Ok(tensor.reshape(dims)?)
}

/// Expand `mask` to exactly the shape of `reference`.
///
/// A mask may have fewer axes than `reference` or size-1 axes, but never
/// more axes or a mismatched size; otherwise broadcasting would grow the
/// result past `reference` and mix unrelated rows.
///
/// # Errors
///
/// Returns [`MaskError::Shape`] if `mask` does not broadcast to `reference`.
pub(crate) fn broadcast_mask_as(mask: &Tensor, reference: &Tensor, op: &str) -> Result<Tensor> {
    mask.broadcast_as(reference.dims()).map_err(|_| {
        MaskError::Shape(format!(
            "{op}: mask shape {:?} does not broadcast to {:?}",
            mask.dims(),
            reference.dims()
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::{D, DType, Device};

    #[test]
    fn aligns_to_middle_axis() {
        let device = Device::Cpu;
        let rng = Tensor::arange(0u32, 4, &device).unwrap();
        let reference = Tensor::zeros((2, 4, 3), DType::F32, &device).unwrap();

        let aligned = add_dim_as_except(&rng, &reference, 1).unwrap();
        assert_eq!(aligned.dims(), &[1, 4, 1]);
        let values: Vec<u32> = aligned.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[test]
    fn aligns_to_last_axis_from_end() {
        let device = Device::Cpu;
        let rng = Tensor::arange(0u32, 3, &device).unwrap();
        let reference = Tensor::zeros((2, 4, 3), DType::F32, &device).unwrap();

        let aligned = add_dim_as_except(&rng, &reference, D::Minus1).unwrap();
        assert_eq!(aligned.dims(), &[1, 1, 3]);
    }

    #[test]
    fn rejects_non_vector_source() {
        let device = Device::Cpu;
        let source = Tensor::zeros((2, 2), DType::F32, &device).unwrap();
        let reference = Tensor::zeros((2, 2, 2), DType::F32, &device).unwrap();

        let err = add_dim_as_except(&source, &reference, 0).unwrap_err();
        assert!(matches!(err, MaskError::Shape(_)));
    }

    #[test]
    fn rejects_out_of_range_axis() {
        let device = Device::Cpu;
        let rng = Tensor::arange(0u32, 3, &device).unwrap();
        let reference = Tensor::zeros((3, 3), DType::F32, &device).unwrap();

        assert!(add_dim_as_except(&rng, &reference, 5).is_err());
    }

    #[test]
    fn mask_broadcasts_up_to_reference() {
        let device = Device::Cpu;
        let mask = Tensor::new(&[1f32, 0.0, 1.0], &device).unwrap();
        let reference = Tensor::zeros((2, 3), DType::F32, &device).unwrap();

        let expanded = broadcast_mask_as(&mask, &reference, "test").unwrap();
        assert_eq!(expanded.dims(), &[2, 3]);
    }

    #[test]
    fn higher_rank_mask_rejected() {
        let device = Device::Cpu;
        let mask = Tensor::zeros((2, 3), DType::F32, &device).unwrap();
        let reference = Tensor::zeros(3, DType::F32, &device).unwrap();

        let err = broadcast_mask_as(&mask, &reference, "test").unwrap_err();
        assert!(matches!(err, MaskError::Shape(_)));
    }

    #[test]
    fn resolve_negative_axis() {
        let shape = Shape::from((2, 3, 4));
        assert_eq!(resolve_dim(&shape, D::Minus1, "test").unwrap(), 2);
        assert_eq!(resolve_dim(&shape, D::Minus(3), "test").unwrap(), 0);
        assert_eq!(resolve_dim(&shape, 1, "test").unwrap(), 1);
    }
}
