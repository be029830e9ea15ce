// SPDX-License-Identifier: MIT OR Apache-2.0

//! # candle-seqmask
//!
//! Masking and padded-sequence utilities for
//! [candle](https://github.com/huggingface/candle) tensors.
//!
//! Model code that batches variable-length sequences keeps reaching for the
//! same handful of operations: turn lengths into a mask, expand a token mask
//! into an attention mask, average only over valid positions, run a softmax
//! that ignores padding, or reverse each sequence within its own length (for
//! backward RNN passes).  This crate provides them as small pure functions
//! over [`candle_core::Tensor`].
//!
//! ## Operations
//!
//! - [`mask_meshgrid`] — per-position mask to per-pair (per-k-tuple) mask.
//! - [`masked_average`] — weighted mean with a clamped denominator.
//! - [`length2mask`] — integer lengths to an `F32` `0.0`/`1.0` mask.
//! - [`length_masked_reversed`] — per-length reversal along the sequence axis.
//! - [`masked_softmax`] — softmax restricted to unmasked positions.
//! - [`length_masked_softmax`] — the same, with the mask derived from lengths.
//!
//! Outputs live on the device of their primary input.  Numeric constants
//! can be bundled in a [`MaskConfig`].
//!
//! ## Example
//!
//! ```
//! use candle_core::{D, Device, Tensor};
//! use candle_seqmask::{length2mask, MaskConfig};
//!
//! let device = Device::Cpu;
//! let logits = Tensor::new(&[[0.3f32, 1.2, -0.4], [2.0, 0.1, 0.7]], &device).unwrap();
//! let lengths = Tensor::new(&[2u32, 3], &device).unwrap();
//!
//! let mask = length2mask(&lengths, 3).unwrap();
//! let config = MaskConfig::default();
//! let probs = config.masked_softmax(&logits, Some(&mask), D::Minus1).unwrap();
//! assert_eq!(probs.dims(), &[2, 3]);
//! ```

#![deny(warnings)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod mask;
pub mod shape;

pub use config::{DEFAULT_AVERAGE_EPS, DEFAULT_NINF, DEFAULT_SOFTMAX_EPS, MaskConfig};
pub use error::{MaskError, Result};
pub use mask::{
    length_masked_reversed, length_masked_softmax, length2mask, mask_meshgrid, masked_average,
    masked_softmax,
};
pub use shape::{add_dim_as_except, resolve_dim};
