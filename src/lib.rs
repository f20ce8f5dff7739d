// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! A Fast Marching Method (FMM) eikonal equation solver.
//!
//! This library computes first-arrival travel times on 2D and 3D Cartesian
//! grids by solving the eikonal equation |∇T| = 1/v, for isotropic velocity
//! fields and for acoustic VTI media described by Thomsen parameters. Nodes
//! are finalized in increasing time order from a binary-heap narrow band, so
//! a solve is single pass and deterministic; independent shots can be solved
//! in parallel against one shared grid.

#![warn(missing_docs)]

/// Dimension-erased entry points.
pub mod api;
/// Parallel per-shot solves.
pub mod batch;
/// Core grid data structures and traits.
pub mod core;
/// Error types for the library.
pub mod error;
/// File I/O for loading model fields and saving travel times.
pub mod io;
/// Isotropic and VTI material models.
pub mod medium;
/// Narrow band priority queue.
pub mod narrow_band;
/// Solver options.
pub mod options;
/// FMM driver.
pub mod solver;
/// Per-node march state.
pub mod state;
/// Local eikonal update formulas.
pub mod update_kernels;

pub use crate::api::{solve_travel_times, GridSpec, SourcePoint, TravelTimes};
pub use crate::core::CartesianGrid;
pub use crate::error::{EikonalError, Result};
pub use crate::options::{Scheme, SolverOptions};
pub use crate::solver::{FmmSolver, PointSource, ProgressInfo, SolveStats, TravelTimeField};
