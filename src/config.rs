// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numeric constants for masked reductions and masked softmax.
//!
//! [`MaskConfig`] bundles the three constants the masking functions take
//! (`average_eps`, `softmax_eps`, `ninf`) so model code can carry one value
//! around instead of threading literals through every call site.  It can be
//! built from defaults or parsed from a JSON object.
//!
//! # Usage
//!
//! ```
//! use candle_seqmask::MaskConfig;
//!
//! let json: serde_json::Value =
//!     serde_json::from_str(r#"{"ninf": -1e9, "softmax_eps": 1e-12}"#).unwrap();
//! let config = MaskConfig::from_json(&json).unwrap();
//! assert!((config.ninf + 1e9).abs() < f64::EPSILON);
//! assert!((config.average_eps - 1e-8).abs() < f64::EPSILON);
//! ```

use std::fmt;

use candle_core::Tensor;
use candle_core::shape::Dim;
use serde_json::Value;

use crate::error::{MaskError, Result};

/// Default denominator floor for [`masked_average`](crate::masked_average).
pub const DEFAULT_AVERAGE_EPS: f64 = 1e-8;

/// Default probability floor for [`masked_softmax`](crate::masked_softmax).
pub const DEFAULT_SOFTMAX_EPS: f64 = 1e-20;

/// Default finite stand-in for negative infinity on masked logits.
pub const DEFAULT_NINF: f64 = -1e4;

// ---------------------------------------------------------------------------
// MaskConfig
// ---------------------------------------------------------------------------

/// Numeric constants used by the masking functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskConfig {
    /// Lower clamp on the mask sum in [`masked_average`](crate::masked_average).
    pub average_eps: f64,
    /// Floor added to every probability before renormalizing in
    /// [`masked_softmax`](crate::masked_softmax).
    pub softmax_eps: f64,
    /// Sentinel written into masked logits before the softmax.
    pub ninf: f64,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            average_eps: DEFAULT_AVERAGE_EPS,
            softmax_eps: DEFAULT_SOFTMAX_EPS,
            ninf: DEFAULT_NINF,
        }
    }
}

impl fmt::Display for MaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MaskConfig(average_eps={:e}, softmax_eps={:e}, ninf={})",
            self.average_eps, self.softmax_eps, self.ninf
        )
    }
}

impl MaskConfig {
    /// Parse a config from a JSON object.
    ///
    /// Recognised keys are `average_eps`, `softmax_eps` and `ninf`; missing
    /// keys fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::Config`] if the value is not an object, a key
    /// holds a non-numeric value, or the resulting constants fail
    /// [`validate`](Self::validate).
    pub fn from_json(config: &Value) -> Result<Self> {
        if !config.is_object() {
            return Err(MaskError::Config("mask config must be a JSON object".into()));
        }
        let parsed = Self {
            average_eps: get_f64_or(config, "average_eps", DEFAULT_AVERAGE_EPS)?,
            softmax_eps: get_f64_or(config, "softmax_eps", DEFAULT_SOFTMAX_EPS)?,
            ninf: get_f64_or(config, "ninf", DEFAULT_NINF)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check that both eps values are finite and positive and that `ninf`
    /// is finite and negative.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        check_eps("average_eps", self.average_eps)?;
        check_eps("softmax_eps", self.softmax_eps)?;
        check_ninf(self.ninf)
    }

    /// [`masked_average`](crate::masked_average) with this config's `average_eps`.
    ///
    /// # Errors
    ///
    /// Same as [`masked_average`](crate::masked_average).
    pub fn masked_average(&self, tensor: &Tensor, mask: &Tensor) -> Result<Tensor> {
        crate::mask::masked_average(tensor, mask, self.average_eps)
    }

    /// [`masked_softmax`](crate::masked_softmax) with this config's
    /// `softmax_eps` and `ninf`.
    ///
    /// # Errors
    ///
    /// Same as [`masked_softmax`](crate::masked_softmax).
    pub fn masked_softmax<D: Dim>(
        &self,
        logits: &Tensor,
        mask: Option<&Tensor>,
        dim: D,
    ) -> Result<Tensor> {
        crate::mask::masked_softmax(logits, mask, dim, self.softmax_eps, self.ninf)
    }

    /// [`length_masked_softmax`](crate::length_masked_softmax) with this
    /// config's `softmax_eps` and `ninf`.
    ///
    /// # Errors
    ///
    /// Same as [`length_masked_softmax`](crate::length_masked_softmax).
    pub fn length_masked_softmax<D: Dim>(
        &self,
        logits: &Tensor,
        lengths: &Tensor,
        dim: D,
    ) -> Result<Tensor> {
        crate::mask::softmax::length_masked_softmax_with_eps(
            logits,
            lengths,
            dim,
            self.softmax_eps,
            self.ninf,
        )
    }
}

// ---------------------------------------------------------------------------
// Validation and JSON helpers
// ---------------------------------------------------------------------------

/// Reject non-finite or non-positive eps values.
pub(crate) fn check_eps(name: &str, eps: f64) -> Result<()> {
    if eps.is_finite() && eps > 0.0 {
        Ok(())
    } else {
        Err(MaskError::Config(format!("{name} must be finite and > 0, got {eps}")))
    }
}

/// Reject a sentinel that is not a finite negative number.
pub(crate) fn check_ninf(ninf: f64) -> Result<()> {
    if ninf.is_finite() && ninf < 0.0 {
        Ok(())
    } else {
        Err(MaskError::Config(format!("ninf must be finite and < 0, got {ninf}")))
    }
}

/// Read an optional numeric field, erroring on a present non-numeric value.
fn get_f64_or(config: &Value, key: &str, default: f64) -> Result<f64> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| MaskError::Config(format!("field '{key}' must be a number"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
