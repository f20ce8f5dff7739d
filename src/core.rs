// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{EikonalError, Result};
use crate::medium::{Medium, VtiModel, VtiParams};

/// Grid geometry. Provides shape, spacing, origin, and index conversion utilities.
pub trait GridGeometry<const N: usize> {
    /// Get the grid shape (number of nodes along each axis).
    fn shape(&self) -> [usize; N];

    /// Get the row-major strides for index computation.
    fn strides(&self) -> [usize; N];

    /// Get the node spacing along each axis.
    fn spacing(&self) -> [f64; N];

    /// Get the physical coordinate of node `[0; N]`.
    fn origin(&self) -> [f64; N];

    /// Get the total number of nodes in the grid.
    fn num_nodes(&self) -> usize;

    /// Convert a flat index to an N-dimensional index.
    fn flat_to_nd(&self, flat: usize) -> [usize; N];

    /// Convert an N-dimensional index to a flat index.
    fn nd_to_flat(&self, idx: [usize; N]) -> usize;
}

/// A Cartesian grid carrying the medium the wave travels through.
///
/// Immutable once built; solvers borrow it, so one grid can serve several
/// independent solves at the same time. The generic parameter `N` is the
/// number of spatial dimensions (2 or 3).
#[derive(Debug, Clone)]
pub struct CartesianGrid<const N: usize> {
    shape: [usize; N],
    strides: [usize; N],
    spacing: [f64; N],
    origin: [f64; N],
    num_nodes: usize,
    medium: Medium,
}

impl<const N: usize> CartesianGrid<N> {
    /// Create an isotropic grid with the given shape, spacing, and velocity field.
    ///
    /// # Parameters
    /// - `shape`: Number of nodes along each axis (each must be >= 2)
    /// - `spacing`: Node spacing per axis (each must be positive and finite)
    /// - `velocity`: Velocities in row-major order (must all be positive and finite)
    ///
    /// # Errors
    /// Returns an error if any parameter is invalid or if the velocity vector length
    /// does not match the product of the shape dimensions.
    pub fn new(shape: [usize; N], spacing: [f64; N], velocity: Vec<f64>) -> Result<Self> {
        let num_nodes = validate_geometry(shape, spacing)?;
        let medium = Medium::isotropic(velocity, num_nodes)?;
        Ok(Self::from_parts(shape, spacing, num_nodes, medium))
    }

    /// Create a VTI grid from per-node Thomsen parameters.
    ///
    /// # Errors
    /// Returns an error for invalid geometry, mismatched array lengths,
    /// non-positive velocities, unusable epsilon/delta, or a symmetry axis >= N.
    pub fn new_vti(shape: [usize; N], spacing: [f64; N], model: VtiModel) -> Result<Self> {
        let num_nodes = validate_geometry(shape, spacing)?;
        let medium = Medium::vti(model, num_nodes, N)?;
        Ok(Self::from_parts(shape, spacing, num_nodes, medium))
    }

    /// Shift the grid so node `[0; N]` sits at `origin` (builder method).
    ///
    /// # Errors
    /// Returns an error if any origin component is not finite.
    pub fn with_origin(mut self, origin: [f64; N]) -> Result<Self> {
        for (axis, &value) in origin.iter().enumerate() {
            if !value.is_finite() {
                return Err(EikonalError::InvalidOrigin { axis, value });
            }
        }
        self.origin = origin;
        Ok(self)
    }

    fn from_parts(shape: [usize; N], spacing: [f64; N], num_nodes: usize, medium: Medium) -> Self {
        let mut strides = [0usize; N];
        strides[N - 1] = 1;
        for d in (0..N - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }
        CartesianGrid {
            shape,
            strides,
            spacing,
            origin: [0.0; N],
            num_nodes,
            medium,
        }
    }

    /// Get a reference to the medium.
    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    /// True when the grid carries Thomsen parameters.
    pub fn is_vti(&self) -> bool {
        matches!(self.medium, Medium::Vti { .. })
    }

    /// Velocity at a node (symmetry-axis velocity for VTI grids).
    #[inline]
    pub fn velocity_at(&self, idx: [usize; N]) -> f64 {
        self.medium.velocity_at(self.nd_to_flat(idx))
    }

    /// Thomsen parameters at a node, `None` on isotropic grids.
    #[inline]
    pub fn anisotropy_at(&self, idx: [usize; N]) -> Option<VtiParams> {
        self.medium.anisotropy_at(self.nd_to_flat(idx))
    }

    /// Physical coordinate of a node.
    pub fn index_to_coordinate(&self, idx: [usize; N]) -> [f64; N] {
        let mut coord = [0.0; N];
        for d in 0..N {
            coord[d] = self.origin[d] + idx[d] as f64 * self.spacing[d];
        }
        coord
    }

    /// Continuous (fractional) index of a physical coordinate. No bounds check.
    pub fn fractional_index(&self, coord: [f64; N]) -> [f64; N] {
        let mut g = [0.0; N];
        for d in 0..N {
            g[d] = (coord[d] - self.origin[d]) / self.spacing[d];
        }
        g
    }

    /// Nearest node to a physical coordinate, `None` outside the domain.
    pub fn coordinate_to_index(&self, coord: [f64; N]) -> Option<[usize; N]> {
        if !self.contains(coord) {
            return None;
        }
        let g = self.fractional_index(coord);
        let mut idx = [0usize; N];
        for d in 0..N {
            idx[d] = (g[d].round().max(0.0) as usize).min(self.shape[d] - 1);
        }
        Some(idx)
    }

    /// True when `coord` lies inside the closed box spanned by the nodes.
    pub fn contains(&self, coord: [f64; N]) -> bool {
        let g = self.fractional_index(coord);
        (0..N).all(|d| {
            g[d].is_finite()
                && g[d] >= -BOUNDS_TOLERANCE
                && g[d] <= (self.shape[d] - 1) as f64 + BOUNDS_TOLERANCE
        })
    }

    /// In-bounds axis-aligned neighbors of a node: low side then high side, axis by axis.
    pub fn neighbors_of(&self, idx: [usize; N]) -> impl Iterator<Item = [usize; N]> + '_ {
        (0..2 * N).filter_map(move |k| {
            let axis = k / 2;
            let mut nb = idx;
            if k % 2 == 0 {
                if idx[axis] == 0 {
                    return None;
                }
                nb[axis] -= 1;
            } else {
                if idx[axis] + 1 >= self.shape[axis] {
                    return None;
                }
                nb[axis] += 1;
            }
            Some(nb)
        })
    }
}

/// Tolerance, in grid cells, for coordinates sitting on the domain boundary.
pub(crate) const BOUNDS_TOLERANCE: f64 = 1e-9;

fn validate_geometry<const N: usize>(shape: [usize; N], spacing: [f64; N]) -> Result<usize> {
    if N != 2 && N != 3 {
        return Err(EikonalError::InvalidDimension(N));
    }
    for (axis, &size) in shape.iter().enumerate() {
        if size < 2 {
            return Err(EikonalError::InvalidGridShape { axis, size });
        }
    }
    for (axis, &value) in spacing.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(EikonalError::InvalidGridSpacing { axis, value });
        }
    }
    node_count(&shape).ok_or_else(|| EikonalError::GridTooLarge {
        shape: shape.to_vec(),
    })
}

/// Product of the axis sizes, `None` if it overflows `usize`.
pub fn node_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

#[allow(clippy::needless_range_loop)]
impl<const N: usize> GridGeometry<N> for CartesianGrid<N> {
    fn shape(&self) -> [usize; N] {
        self.shape
    }

    fn strides(&self) -> [usize; N] {
        self.strides
    }

    fn spacing(&self) -> [f64; N] {
        self.spacing
    }

    fn origin(&self) -> [f64; N] {
        self.origin
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn flat_to_nd(&self, flat: usize) -> [usize; N] {
        let mut idx = [0usize; N];
        let mut remainder = flat;
        for d in 0..N {
            idx[d] = remainder / self.strides[d];
            remainder %= self.strides[d];
        }
        idx
    }

    fn nd_to_flat(&self, idx: [usize; N]) -> usize {
        let mut flat = 0;
        for d in 0..N {
            flat += idx[d] * self.strides[d];
        }
        flat
    }
}
