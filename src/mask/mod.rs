// SPDX-License-Identifier: MIT OR Apache-2.0

//! Masking and padded-sequence operations.
//!
//! - [`mask_meshgrid`] — per-position mask to per-pair (per-k-tuple) mask.
//! - [`masked_average`] — weighted mean with a clamped denominator.
//! - [`length2mask`] — sequence lengths to a floating `0.0`/`1.0` mask.
//! - [`length_masked_reversed`] — reverse each sequence within its length.
//! - [`masked_softmax`] — softmax restricted to unmasked positions.
//! - [`length_masked_softmax`] — [`masked_softmax`] with a mask derived
//!   from lengths.
//!
//! Every function is pure: inputs are borrowed, outputs are new tensors on
//! the device of the primary input.

pub mod average;
pub mod length;
pub mod meshgrid;
pub mod softmax;

pub use average::masked_average;
pub use length::{length_masked_reversed, length2mask};
pub use meshgrid::mask_meshgrid;
pub use softmax::{length_masked_softmax, masked_softmax};
