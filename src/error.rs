// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors that can occur during grid construction, source seeding, solving, or I/O.
#[derive(Debug, Error)]
pub enum EikonalError {
    /// Dimensionality is not 2 or 3.
    #[error("invalid dimensionality: {0} (must be 2 or 3)")]
    InvalidDimension(usize),
    /// Grid shape is invalid (dimension too small).
    #[error("invalid grid shape: axis {axis} has size {size} (must be >= 2)")]
    InvalidGridShape {
        /// The axis index.
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// The node count of the shape does not fit in `usize`.
    #[error("grid shape {shape:?} has too many nodes")]
    GridTooLarge {
        /// The shape provided.
        shape: Vec<usize>,
    },
    /// Grid spacing is not positive and finite.
    #[error("invalid grid spacing on axis {axis}: {value} (must be positive and finite)")]
    InvalidGridSpacing {
        /// The axis index.
        axis: usize,
        /// The spacing provided.
        value: f64,
    },
    /// Grid origin is not finite.
    #[error("invalid grid origin on axis {axis}: {value} (must be finite)")]
    InvalidOrigin {
        /// The axis index.
        axis: usize,
        /// The origin provided.
        value: f64,
    },
    /// Velocity value is not positive and finite.
    #[error("invalid velocity at index {index}: {value} (must be positive and finite)")]
    InvalidVelocity {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Thomsen parameters at a node are unusable.
    #[error("invalid anisotropy at index {index}: {reason}")]
    InvalidAnisotropy {
        /// The flat index of the invalid node.
        index: usize,
        /// Explanation of why it's invalid.
        reason: String,
    },
    /// VTI symmetry axis does not exist on the grid.
    #[error("invalid symmetry axis {axis} for a {dims}-dimensional grid")]
    InvalidSymmetryAxis {
        /// The requested axis.
        axis: usize,
        /// Grid dimensionality.
        dims: usize,
    },
    /// Array shape does not match expected shape.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// The VTI scheme was requested on a grid without anisotropy parameters.
    #[error("the VTI scheme requires epsilon and delta fields on the grid")]
    MissingAnisotropy,
    /// Source location or seed time is invalid.
    #[error("invalid source at {coord:?}: {reason}")]
    InvalidSource {
        /// The source coordinates.
        coord: Vec<f64>,
        /// Explanation of why it's invalid.
        reason: String,
    },
    /// A solve was requested without any source.
    #[error("no sources were added before solving")]
    NoSources,
    /// Only first-order upwind stencils are implemented.
    #[error("unsupported upwind order {0} (only order 1 is implemented)")]
    UnsupportedOrder(u8),
    /// A solver option is out of range.
    #[error("invalid option {name}: {reason}")]
    InvalidOption {
        /// The option name.
        name: &'static str,
        /// Explanation of why it's invalid.
        reason: String,
    },
    /// An internal solver invariant was broken. Indicates a logic defect, not bad input.
    #[error("internal invariant violated at node {node}: {reason}")]
    InvariantViolation {
        /// Flat index of the offending node.
        node: usize,
        /// Description of the broken invariant.
        reason: String,
    },
    /// Maximum heap pop limit exceeded (likely indicates a logic defect).
    #[error("max heap pops exceeded: limit was {limit}")]
    MaxPopsExceeded {
        /// The limit that was set.
        limit: u64,
    },
    /// Unsupported data type in file.
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    #[error("MAT variable '{expected}' not found; available variables: {available:?}")]
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Other error with a descriptive message.
    #[error("{0}")]
    Other(String),
}

impl EikonalError {
    /// True for malformed grid geometry or medium, reported before any computation.
    pub fn is_invalid_grid(&self) -> bool {
        matches!(
            self,
            EikonalError::InvalidDimension(_)
                | EikonalError::InvalidGridShape { .. }
                | EikonalError::GridTooLarge { .. }
                | EikonalError::InvalidGridSpacing { .. }
                | EikonalError::InvalidOrigin { .. }
                | EikonalError::InvalidVelocity { .. }
                | EikonalError::InvalidAnisotropy { .. }
                | EikonalError::InvalidSymmetryAxis { .. }
                | EikonalError::ShapeMismatch { .. }
                | EikonalError::MissingAnisotropy
        )
    }

    /// True for rejected or missing sources.
    pub fn is_invalid_source(&self) -> bool {
        matches!(
            self,
            EikonalError::InvalidSource { .. } | EikonalError::NoSources
        )
    }

    /// True for defects inside the marching loop itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EikonalError::InvariantViolation { .. } | EikonalError::MaxPopsExceeded { .. }
        )
    }
}

/// Convenience type alias for Results with EikonalError.
pub type Result<T> = std::result::Result<T, EikonalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_grid_shape() {
        let e = EikonalError::InvalidGridShape { axis: 0, size: 1 };
        assert_eq!(
            e.to_string(),
            "invalid grid shape: axis 0 has size 1 (must be >= 2)"
        );
        assert!(e.is_invalid_grid());
    }

    #[test]
    fn display_invalid_grid_spacing() {
        let e = EikonalError::InvalidGridSpacing {
            axis: 1,
            value: -1.0,
        };
        assert_eq!(
            e.to_string(),
            "invalid grid spacing on axis 1: -1 (must be positive and finite)"
        );
    }

    #[test]
    fn display_invalid_velocity() {
        let e = EikonalError::InvalidVelocity {
            index: 5,
            value: -0.5,
        };
        assert_eq!(
            e.to_string(),
            "invalid velocity at index 5: -0.5 (must be positive and finite)"
        );
    }

    #[test]
    fn source_errors_are_classified() {
        let e = EikonalError::InvalidSource {
            coord: vec![-1.0, 0.0],
            reason: "outside".to_string(),
        };
        assert!(e.is_invalid_source());
        assert!(!e.is_invalid_grid());
        assert!(EikonalError::NoSources.is_invalid_source());
    }

    #[test]
    fn internal_errors_are_classified() {
        let e = EikonalError::InvariantViolation {
            node: 3,
            reason: "accepted twice".to_string(),
        };
        assert!(e.is_internal());
        assert_eq!(
            e.to_string(),
            "internal invariant violated at node 3: accepted twice"
        );
        assert!(EikonalError::MaxPopsExceeded { limit: 10 }.is_internal());
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = EikonalError::Io(io_err);
        assert!(e.to_string().contains("file not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e: EikonalError = io_err.into();
        assert!(matches!(e, EikonalError::Io(_)));
    }

    #[test]
    fn display_mat_variable_not_found() {
        let e = EikonalError::MatVariableNotFound {
            expected: "velocity".to_string(),
            available: vec!["epsilon".to_string(), "grid".to_string()],
        };
        assert!(e.to_string().contains("velocity"));
        assert!(e.to_string().contains("epsilon"));
    }
}
