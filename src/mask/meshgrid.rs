// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outer-product expansion of a per-position mask.

use candle_core::{D, Tensor};

use crate::error::{MaskError, Result};

/// Expand a per-position mask into a per-k-tuple mask.
///
/// Entry `(..., i1, ..., ik)` of the result is
/// `mask[..., i1] * ... * mask[..., ik]`.  With `target_dims = 2` this turns
/// a token validity mask into an attention-matrix mask where both the query
/// and the key position must be valid.  `target_dims = 1` returns the input.
///
/// Leading axes are batch axes and are never mixed.
///
/// # Shapes
/// - `mask`: `[..., seq]`
/// - returns: `[..., seq, ..., seq]` (`target_dims` trailing copies of `seq`)
///
/// # Example
///
/// ```
/// use candle_core::{Device, Tensor};
/// use candle_seqmask::mask_meshgrid;
///
/// let mask = Tensor::new(&[1f32, 1.0, 0.0], &Device::Cpu).unwrap();
/// let pairs = mask_meshgrid(&mask, 2).unwrap();
/// assert_eq!(pairs.dims(), &[3, 3]);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::Config`] if `target_dims` is 0,
/// [`MaskError::Shape`] if `mask` is a scalar, and [`MaskError::Tensor`] on
/// tensor operation failures.
pub fn mask_meshgrid(mask: &Tensor, target_dims: usize) -> Result<Tensor> {
    if target_dims == 0 {
        return Err(MaskError::Config("mask_meshgrid target_dims must be >= 1".into()));
    }
    if mask.rank() == 0 {
        return Err(MaskError::Shape("mask_meshgrid expects a mask with at least one axis".into()));
    }
    tracing::trace!(shape = ?mask.dims(), target_dims, "mask_meshgrid");

    let mut grid = mask.clone();
    // factor: [..., 1 x j, seq], lined up against the j-th new axis of grid
    let mut factor = mask.clone();
    for _ in 1..target_dims {
        factor = factor.unsqueeze(D::Minus2)?;
        grid = grid.unsqueeze(D::Minus1)?.broadcast_mul(&factor)?;
    }
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn single_dim_is_identity() {
        let mask = Tensor::new(&[1f32, 0.0, 1.0], &Device::Cpu).unwrap();
        let out = mask_meshgrid(&mask, 1).unwrap();
        assert_eq!(out.to_vec1::<f32>().unwrap(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn pairwise_products() {
        let m = [1f32, 0.5, 0.0];
        let mask = Tensor::new(&m, &Device::Cpu).unwrap();
        let grid: Vec<Vec<f32>> = mask_meshgrid(&mask, 2).unwrap().to_vec2().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(grid[i][j], m[i] * m[j]);
            }
        }
    }

    #[test]
    fn triple_products() {
        let m = [1f32, 0.5, 0.25];
        let mask = Tensor::new(&m, &Device::Cpu).unwrap();
        let grid: Vec<Vec<Vec<f32>>> = mask_meshgrid(&mask, 3).unwrap().to_vec3().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    assert!((grid[i][j][k] - m[i] * m[j] * m[k]).abs() < 1e-7);
                }
            }
        }
    }

    #[test]
    fn batch_rows_stay_separate() {
        // Row 0 fully valid, row 1 only first position valid.
        let mask = Tensor::new(&[[1f32, 1.0], [1.0, 0.0]], &Device::Cpu).unwrap();
        let grid: Vec<Vec<Vec<f32>>> = mask_meshgrid(&mask, 2).unwrap().to_vec3().unwrap();
        assert_eq!(grid[0], vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(grid[1], vec![vec![1.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn zero_target_dims_errors() {
        let mask = Tensor::new(&[1f32], &Device::Cpu).unwrap();
        assert!(matches!(mask_meshgrid(&mask, 0), Err(MaskError::Config(_))));
    }
}
