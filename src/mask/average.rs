// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mask-weighted mean.

use candle_core::{DType, Tensor};

use crate::config::check_eps;
use crate::error::Result;
use crate::shape::broadcast_mask_as;

/// Average `tensor` using `mask` as per-element weights.
///
/// Computes `sum(tensor * mask) / max(sum(mask), eps)` over every axis,
/// with `mask` first expanded to the shape of `tensor`.
/// Because the denominator is clamped, an all-zero mask yields `0.0`
/// instead of `NaN`.
///
/// # Shapes
/// - `tensor`: any shape
/// - `mask`: broadcastable to `tensor`
/// - returns: `[]` (rank-0 `F32` scalar)
///
/// # Example
///
/// ```
/// use candle_core::{Device, Tensor};
/// use candle_seqmask::masked_average;
///
/// let values = Tensor::new(&[1f32, 2.0, 3.0, 100.0], &Device::Cpu).unwrap();
/// let mask = Tensor::new(&[1f32, 1.0, 1.0, 0.0], &Device::Cpu).unwrap();
/// let avg: f32 = masked_average(&values, &mask, 1e-8).unwrap().to_scalar().unwrap();
/// assert!((avg - 2.0).abs() < 1e-6);
/// ```
///
/// # Errors
///
/// Returns [`MaskError::Config`](crate::MaskError::Config) if `eps` is not a
/// finite positive number and [`MaskError::Shape`](crate::MaskError::Shape)
/// if `mask` does not broadcast to the shape of `tensor`.
pub fn masked_average(tensor: &Tensor, mask: &Tensor, eps: f64) -> Result<Tensor> {
    check_eps("eps", eps)?;
    let mask = broadcast_mask_as(mask, tensor, "masked_average")?;
    tracing::trace!(shape = ?tensor.dims(), "masked_average");

    // PROMOTE: reductions over integer or half-precision inputs run in F32
    let tensor = tensor.to_dtype(DType::F32)?;
    let mask = mask.to_dtype(DType::F32)?;

    let numerator = (tensor * &mask)?.sum_all()?;
    let denominator = mask.sum_all()?.clamp(eps, f64::INFINITY)?;
    Ok((numerator / denominator)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::MaskError;
    use candle_core::Device;

    #[test]
    fn full_mask_is_plain_mean() {
        let device = Device::Cpu;
        let values = Tensor::new(&[[1f32, 2.0, 3.0], [4.0, 5.0, 6.0]], &device).unwrap();
        let ones = values.ones_like().unwrap();

        let avg: f32 = masked_average(&values, &ones, 1e-8)
            .unwrap()
            .to_scalar()
            .unwrap();
        let mean: f32 = values.mean_all().unwrap().to_scalar().unwrap();
        assert!((avg - mean).abs() < 1e-6);
    }

    #[test]
    fn zero_mask_gives_zero() {
        let device = Device::Cpu;
        let values = Tensor::new(&[7f32, -3.0, 1e6], &device).unwrap();
        let zeros = values.zeros_like().unwrap();

        let avg: f32 = masked_average(&values, &zeros, 1e-8)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!(avg.is_finite());
        assert!(avg.abs() < f32::EPSILON);
    }

    #[test]
    fn soft_weights() {
        let device = Device::Cpu;
        let values = Tensor::new(&[2f32, 4.0], &device).unwrap();
        let weights = Tensor::new(&[0.5f32, 1.5], &device).unwrap();

        // (1 + 6) / 2 = 3.5
        let avg: f32 = masked_average(&values, &weights, 1e-8)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!((avg - 3.5).abs() < 1e-6);
    }

    #[test]
    fn integer_inputs_are_promoted() {
        let device = Device::Cpu;
        let values = Tensor::new(&[3u32, 5, 9], &device).unwrap();
        let mask = Tensor::new(&[1u8, 1, 0], &device).unwrap();

        let avg = masked_average(&values, &mask, 1e-8).unwrap();
        assert_eq!(avg.dtype(), DType::F32);
        let avg: f32 = avg.to_scalar().unwrap();
        assert!((avg - 4.0).abs() < 1e-6);
    }

    #[test]
    fn lower_rank_mask_weights_every_row() {
        let device = Device::Cpu;
        let values = Tensor::new(&[[1f32, 2.0, 50.0], [3.0, 4.0, 70.0]], &device).unwrap();
        let mask = Tensor::new(&[1f32, 1.0, 0.0], &device).unwrap();

        // (1 + 2 + 3 + 4) / 4
        let avg: f32 = masked_average(&values, &mask, 1e-8)
            .unwrap()
            .to_scalar()
            .unwrap();
        assert!((avg - 2.5).abs() < 1e-6);
    }

    #[test]
    fn higher_rank_mask_errors() {
        let device = Device::Cpu;
        let values = Tensor::new(&[1f32, 2.0, 3.0], &device).unwrap();
        let mask = Tensor::new(&[[1f32, 1.0, 0.0], [1.0, 0.0, 1.0]], &device).unwrap();
        assert!(matches!(masked_average(&values, &mask, 1e-8), Err(MaskError::Shape(_))));
    }

    #[test]
    fn non_positive_eps_errors() {
        let device = Device::Cpu;
        let values = Tensor::new(&[1f32], &device).unwrap();
        assert!(matches!(masked_average(&values, &values, 0.0), Err(MaskError::Config(_))));
    }
}
