// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use rayon::prelude::*;

use crate::core::CartesianGrid;
use crate::error::{EikonalError, Result};
use crate::options::SolverOptions;
use crate::solver::{FmmSolver, PointSource, TravelTimeField};

/// Solve one independent travel-time field per shot.
///
/// Shots run in parallel on a dedicated thread pool; each owns its own march
/// state and shares only the grid. Results come back in shot order and match
/// sequential solves bit for bit.
///
/// # Parameters
/// - `grid`: Shared, read-only grid
/// - `shots`: One source per output field
/// - `options`: Options applied to every shot
/// - `threads`: Worker count; `None` uses the number of available CPU cores
///
/// # Errors
/// Returns `NoSources` for an empty shot list and the error of the first
/// invalid shot, before any shot is solved. Solve failures are reported
/// after the batch runs.
pub fn solve_shots<const N: usize>(
    grid: &CartesianGrid<N>,
    shots: &[PointSource<N>],
    options: &SolverOptions,
    threads: Option<usize>,
) -> Result<Vec<TravelTimeField<N>>> {
    if shots.is_empty() {
        return Err(EikonalError::NoSources);
    }
    // Every shot is checked before any march starts.
    let solvers = shots
        .iter()
        .map(|shot| {
            let mut solver = FmmSolver::new(grid, options.clone())?;
            solver.add_source(shot.coord, shot.time)?;
            Ok(solver)
        })
        .collect::<Result<Vec<_>>>()?;

    let num_threads = threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| EikonalError::Other(e.to_string()))?;

    log::debug!("solving {} shots on {} threads", shots.len(), num_threads);
    pool.install(|| solvers.par_iter().map(|solver| solver.solve()).collect())
}
