// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use serde::{Deserialize, Serialize};

use crate::error::{EikonalError, Result};

/// Which local update formula the driver applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// `|grad T| = 1/v`. On a VTI grid the symmetry-axis velocity is used.
    #[default]
    Isotropic,
    /// Acoustic VTI relation. Requires Thomsen parameters on the grid.
    Vti,
}

/// Per-solve options.
///
/// Every field has a default, so a JSON config may name only what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Update formula.
    pub scheme: Scheme,
    /// Upwind stencil order. Only 1 is implemented.
    pub order: u8,
    /// Radius, in grid cells, of the ball seeded analytically around each
    /// source. 0 seeds only the source node (or its enclosing cell corners).
    pub source_radius: f64,
    /// Stop accepting nodes past this travel time; later nodes stay +inf.
    pub max_time: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            scheme: Scheme::Isotropic,
            order: 1,
            source_radius: 0.0,
            max_time: None,
        }
    }
}

impl SolverOptions {
    /// Check that every option is usable.
    ///
    /// # Errors
    /// Returns `UnsupportedOrder` for an order other than 1 and `InvalidOption`
    /// for a negative or non-finite radius or a negative or NaN horizon.
    pub fn validate(&self) -> Result<()> {
        if self.order != 1 {
            return Err(EikonalError::UnsupportedOrder(self.order));
        }
        if !self.source_radius.is_finite() || self.source_radius < 0.0 {
            return Err(EikonalError::InvalidOption {
                name: "source_radius",
                reason: format!("{} (must be finite and >= 0)", self.source_radius),
            });
        }
        if let Some(t) = self.max_time {
            if t.is_nan() || t < 0.0 {
                return Err(EikonalError::InvalidOption {
                    name: "max_time",
                    reason: format!("{} (must be >= 0)", t),
                });
            }
        }
        Ok(())
    }
}
