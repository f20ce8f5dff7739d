// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Dimension-erased entry points.
//!
//! Callers that only know the dimensionality at run time (the CLI, bindings,
//! config-driven tools) describe the problem with plain vectors here; the
//! functions check the lengths, build a typed `CartesianGrid<N>` for N = 2 or
//! 3 and run the solver.

use serde::{Deserialize, Serialize};

use crate::batch::solve_shots;
use crate::core::CartesianGrid;
use crate::error::{EikonalError, Result};
use crate::medium::VtiModel;
use crate::options::SolverOptions;
use crate::solver::{FmmSolver, PointSource, SolveStats, TravelTimeField};

/// Thomsen parameter fields that turn a grid into a VTI grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnisotropySpec {
    /// Thomsen epsilon per node, row-major.
    pub epsilon: Vec<f64>,
    /// Thomsen delta per node, row-major.
    pub delta: Vec<f64>,
    /// Axis aligned with the symmetry axis; defaults to the last (depth) axis.
    #[serde(default)]
    pub symmetry_axis: Option<usize>,
}

/// Grid geometry and medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Nodes per axis.
    pub shape: Vec<usize>,
    /// Node spacing per axis.
    pub spacing: Vec<f64>,
    /// Coordinate of the first node; zeros when absent.
    #[serde(default)]
    pub origin: Option<Vec<f64>>,
    /// Velocity per node, row-major (symmetry-axis velocity for VTI).
    pub velocity: Vec<f64>,
    /// Present for VTI media.
    #[serde(default)]
    pub anisotropy: Option<AnisotropySpec>,
}

impl GridSpec {
    /// Build the typed grid for dimensionality `N`.
    ///
    /// # Errors
    /// Returns an InvalidGrid-class error when the vector lengths do not match
    /// `N` or the node count, or when any value is out of range.
    pub fn build<const N: usize>(&self) -> Result<CartesianGrid<N>> {
        let shape: [usize; N] = to_array(&self.shape)?;
        let spacing: [f64; N] = to_array(&self.spacing)?;
        let grid = match &self.anisotropy {
            None => CartesianGrid::new(shape, spacing, self.velocity.clone())?,
            Some(aniso) => {
                let model = VtiModel {
                    vertical_velocity: self.velocity.clone(),
                    epsilon: aniso.epsilon.clone(),
                    delta: aniso.delta.clone(),
                    symmetry_axis: aniso.symmetry_axis.unwrap_or(N - 1),
                };
                CartesianGrid::new_vti(shape, spacing, model)?
            }
        };
        match &self.origin {
            Some(origin) => grid.with_origin(to_array(origin)?),
            None => Ok(grid),
        }
    }
}

/// A source location with its seed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    /// Physical coordinate, one entry per grid axis.
    pub coord: Vec<f64>,
    /// Seed time.
    #[serde(default)]
    pub time: f64,
}

impl SourcePoint {
    /// Source at `coord` firing at time zero.
    pub fn new(coord: Vec<f64>) -> Self {
        SourcePoint { coord, time: 0.0 }
    }

    /// Typed copy of this source for an `N`-dimensional grid.
    ///
    /// # Errors
    /// Returns `InvalidSource` when the coordinate count is not `N`.
    pub fn to_point_source<const N: usize>(&self) -> Result<PointSource<N>> {
        let coord: [f64; N] = self.coord.as_slice().try_into().map_err(|_| {
            EikonalError::InvalidSource {
                coord: self.coord.clone(),
                reason: format!("expected {} coordinates, got {}", N, self.coord.len()),
            }
        })?;
        Ok(PointSource {
            coord,
            time: self.time,
        })
    }
}

/// Solved travel times with the grid shape and solve counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelTimes {
    /// Nodes per axis.
    pub shape: Vec<usize>,
    /// Row-major travel times; +inf where the front never arrived.
    pub times: Vec<f64>,
    /// Solve counters.
    pub stats: SolveStats,
}

impl<const N: usize> From<TravelTimeField<N>> for TravelTimes {
    fn from(field: TravelTimeField<N>) -> Self {
        let shape = field.shape().to_vec();
        let (times, stats) = field.into_parts();
        TravelTimes {
            shape,
            times,
            stats,
        }
    }
}

/// Compute travel times from all `sources` together (first arrival of any).
///
/// # Errors
/// Returns an InvalidGrid-class error for malformed geometry or medium, an
/// InvalidSource-class error for bad or missing sources, and an options error
/// for unsupported options.
pub fn solve_travel_times(
    grid: &GridSpec,
    sources: &[SourcePoint],
    options: &SolverOptions,
) -> Result<TravelTimes> {
    match grid.shape.len() {
        2 => solve_typed::<2>(grid, sources, options),
        3 => solve_typed::<3>(grid, sources, options),
        n => Err(EikonalError::InvalidDimension(n)),
    }
}

/// Compute one independent travel-time field per source, in parallel.
///
/// `threads` of `None` uses every available core.
///
/// # Errors
/// Same as [`solve_travel_times`].
pub fn solve_travel_times_per_shot(
    grid: &GridSpec,
    sources: &[SourcePoint],
    options: &SolverOptions,
    threads: Option<usize>,
) -> Result<Vec<TravelTimes>> {
    match grid.shape.len() {
        2 => solve_shots_typed::<2>(grid, sources, options, threads),
        3 => solve_shots_typed::<3>(grid, sources, options, threads),
        n => Err(EikonalError::InvalidDimension(n)),
    }
}

fn solve_typed<const N: usize>(
    spec: &GridSpec,
    sources: &[SourcePoint],
    options: &SolverOptions,
) -> Result<TravelTimes> {
    let grid = spec.build::<N>()?;
    let mut solver = FmmSolver::new(&grid, options.clone())?;
    for source in sources {
        let shot = source.to_point_source::<N>()?;
        solver.add_source(shot.coord, shot.time)?;
    }
    Ok(solver.solve()?.into())
}

fn solve_shots_typed<const N: usize>(
    spec: &GridSpec,
    sources: &[SourcePoint],
    options: &SolverOptions,
    threads: Option<usize>,
) -> Result<Vec<TravelTimes>> {
    let grid = spec.build::<N>()?;
    let shots = sources
        .iter()
        .map(SourcePoint::to_point_source::<N>)
        .collect::<Result<Vec<_>>>()?;
    let fields = solve_shots(&grid, &shots, options, threads)?;
    Ok(fields.into_iter().map(TravelTimes::from).collect())
}

fn to_array<T: Copy, const N: usize>(values: &[T]) -> Result<[T; N]> {
    values.try_into().map_err(|_| EikonalError::ShapeMismatch {
        expected: vec![N],
        got: vec![values.len()],
    })
}
