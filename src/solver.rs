// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serde::Serialize;

use crate::core::{CartesianGrid, GridGeometry, BOUNDS_TOLERANCE};
use crate::error::{EikonalError, Result};
use crate::narrow_band::NarrowBand;
use crate::options::{Scheme, SolverOptions};
use crate::state::{NodeStateTable, NodeStatus};
use crate::update_kernels::{solve_local_eikonal, upwind_stencil, LocalMedium};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Accepted nodes between clock reads while a progress callback is installed.
const PROGRESS_CHECK_EVERY: u64 = 1024;

/// Progress information passed to the optional callback.
pub struct ProgressInfo {
    /// Number of nodes accepted so far.
    pub accepted: usize,
    /// Current number of narrow band entries, stale ones included.
    pub band_size: usize,
    /// Travel time of the most recently accepted node.
    pub front_time: f64,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

/// A point source: physical coordinate and seed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource<const N: usize> {
    /// Physical coordinate; need not sit on a node.
    pub coord: [f64; N],
    /// Travel time at the source itself.
    pub time: f64,
}

impl<const N: usize> PointSource<N> {
    /// Source at `coord` firing at time zero.
    pub fn at(coord: [f64; N]) -> Self {
        PointSource { coord, time: 0.0 }
    }
}

/// Counters collected during one solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    /// Nodes in the grid.
    pub nodes: usize,
    /// Nodes that reached Accepted.
    pub accepted: usize,
    /// Nodes left at +inf.
    pub unreached: usize,
    /// Nodes given an analytic time by source seeding.
    pub seeded: usize,
    /// Narrow band insertions.
    pub heap_pushes: u64,
    /// Narrow band removals, stale ones included.
    pub heap_pops: u64,
    /// Removals discarded as stale.
    pub stale_pops: u64,
    /// Local updates that fell back to fewer axes.
    pub degenerate_updates: u64,
    /// Candidates raised to the front time.
    pub non_causal_clamps: u64,
}

/// Travel times produced by one solve.
#[derive(Debug, Clone)]
pub struct TravelTimeField<const N: usize> {
    shape: [usize; N],
    times: Vec<f64>,
    stats: SolveStats,
    acceptance_order: Option<Vec<usize>>,
}

impl<const N: usize> TravelTimeField<N> {
    /// Travel time at a node; +inf if it was never reached.
    pub fn get(&self, idx: [usize; N]) -> f64 {
        let mut flat = 0;
        for d in 0..N {
            flat = flat * self.shape[d] + idx[d];
        }
        self.times[flat]
    }

    /// Row-major travel times.
    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }

    /// Consume the field and return the row-major travel times.
    pub fn into_vec(self) -> Vec<f64> {
        self.times
    }

    /// Grid shape.
    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    /// Counters collected during the solve.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Flat node ids in acceptance order, if recording was requested.
    pub fn acceptance_order(&self) -> Option<&[usize]> {
        self.acceptance_order.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Vec<f64>, SolveStats) {
        (self.times, self.stats)
    }
}

/// A Fast Marching Method solver for the eikonal equation.
///
/// Borrows an immutable grid, so several solvers (one per shot, say) can share
/// it across threads. Each call to [`FmmSolver::solve`] runs a fresh,
/// single-threaded march; identical inputs give bit-identical output.
pub struct FmmSolver<'g, const N: usize> {
    grid: &'g CartesianGrid<N>,
    options: SolverOptions,
    sources: Vec<PointSource<N>>,
    max_pops: Option<u64>,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
    record_order: bool,
}

impl<'g, const N: usize> FmmSolver<'g, N> {
    /// Create a solver over `grid`.
    ///
    /// # Parameters
    /// - `grid`: The grid carrying the velocity (and optionally VTI) model
    /// - `options`: Scheme, stencil order, seeding radius and time horizon
    ///
    /// # Errors
    /// Returns an error if the options are invalid or the VTI scheme is
    /// requested on an isotropic grid.
    pub fn new(grid: &'g CartesianGrid<N>, options: SolverOptions) -> Result<Self> {
        options.validate()?;
        if options.scheme == Scheme::Vti && !grid.is_vti() {
            return Err(EikonalError::MissingAnisotropy);
        }
        Ok(FmmSolver {
            grid,
            options,
            sources: Vec::new(),
            max_pops: None,
            progress_callback: None,
            record_order: false,
        })
    }

    /// Set the maximum number of heap pops before aborting (builder method).
    /// Default is `num_nodes * (2N + 1)` plus the number of seeded nodes.
    pub fn with_max_pops(mut self, max_pops: u64) -> Self {
        self.max_pops = Some(max_pops);
        self
    }

    /// Set a progress callback that will be invoked periodically during solving (builder method).
    /// The callback receives progress information approximately every 500ms.
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Record the flat ids of nodes in the order they are accepted (builder method).
    pub fn with_acceptance_order(mut self, record: bool) -> Self {
        self.record_order = record;
        self
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &CartesianGrid<N> {
        self.grid
    }

    /// Get the solver options.
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Add a point source.
    ///
    /// # Parameters
    /// - `coord`: Physical coordinates of the source (may be off-grid)
    /// - `time`: Seed time at the source
    ///
    /// # Errors
    /// Returns an error if a coordinate is not finite, the source lies outside
    /// the grid, or the seed time is negative or not finite.
    pub fn add_source(&mut self, coord: [f64; N], time: f64) -> Result<()> {
        let invalid = |reason: String| EikonalError::InvalidSource {
            coord: coord.to_vec(),
            reason,
        };
        if let Some(d) = coord.iter().position(|c| !c.is_finite()) {
            return Err(invalid(format!("coordinate on axis {} is not finite", d)));
        }
        if !self.grid.contains(coord) {
            let shape = self.grid.shape();
            let origin = self.grid.origin();
            let spacing = self.grid.spacing();
            let extent: Vec<(f64, f64)> = (0..N)
                .map(|d| (origin[d], origin[d] + (shape[d] - 1) as f64 * spacing[d]))
                .collect();
            return Err(invalid(format!("outside domain {:?}", extent)));
        }
        if !time.is_finite() || time < 0.0 {
            return Err(invalid(format!(
                "seed time {} (must be finite and >= 0)",
                time
            )));
        }
        self.sources.push(PointSource { coord, time });
        Ok(())
    }

    /// Sources added so far.
    pub fn sources(&self) -> &[PointSource<N>] {
        &self.sources
    }

    /// Run the march from all added sources.
    ///
    /// # Errors
    /// Returns `NoSources` if no source was added, and an internal error
    /// (`InvariantViolation`, `MaxPopsExceeded`) if the march breaks an invariant.
    pub fn solve(&self) -> Result<TravelTimeField<N>> {
        if self.sources.is_empty() {
            return Err(EikonalError::NoSources);
        }
        let start = Instant::now();
        let mut ctx = MarchContext::new(self.grid, &self.options, self.record_order);
        for source in &self.sources {
            ctx.seed(source);
        }
        let max_pops = self.max_pops.unwrap_or_else(|| {
            (self.grid.num_nodes() as u64) * (2 * N as u64 + 1) + ctx.stats.seeded as u64
        });
        ctx.run(max_pops, self.progress_callback.as_deref())?;
        let field = ctx.finish();

        let stats = field.stats();
        debug!(
            "fmm: accepted {}/{} nodes ({} unreached) in {:?}; \
             {} pushes, {} stale pops, {} degenerate, {} clamped",
            stats.accepted,
            stats.nodes,
            stats.unreached,
            start.elapsed(),
            stats.heap_pushes,
            stats.stale_pops,
            stats.degenerate_updates,
            stats.non_causal_clamps
        );
        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initialized,
    Running,
    Done,
}

/// Private per-call state of one march.
struct MarchContext<'a, const N: usize> {
    grid: &'a CartesianGrid<N>,
    options: &'a SolverOptions,
    vti_axis: Option<usize>,
    state: NodeStateTable,
    band: NarrowBand,
    stats: SolveStats,
    order: Option<Vec<usize>>,
    phase: Phase,
}

impl<'a, const N: usize> MarchContext<'a, N> {
    fn new(grid: &'a CartesianGrid<N>, options: &'a SolverOptions, record_order: bool) -> Self {
        let num_nodes = grid.num_nodes();
        let vti_axis = match options.scheme {
            Scheme::Vti => grid.medium().symmetry_axis(),
            Scheme::Isotropic => None,
        };
        MarchContext {
            grid,
            options,
            vti_axis,
            state: NodeStateTable::new(num_nodes),
            band: NarrowBand::with_capacity(num_nodes.min(1 << 16)),
            stats: SolveStats {
                nodes: num_nodes,
                ..Default::default()
            },
            order: record_order.then(|| Vec::with_capacity(num_nodes)),
            phase: Phase::Initialized,
        }
    }

    fn local_medium(&self, flat: usize) -> LocalMedium {
        let medium = self.grid.medium();
        match (self.vti_axis, medium.anisotropy_at(flat)) {
            (Some(symmetry_axis), Some(params)) => LocalMedium::Vti {
                params,
                symmetry_axis,
            },
            _ => LocalMedium::Isotropic {
                slowness: 1.0 / medium.velocity_at(flat),
            },
        }
    }

    /// Analytic travel time over `offset` (physical units) in the medium of node `flat`.
    fn analytic_time(&self, flat: usize, offset: [f64; N]) -> f64 {
        match self.local_medium(flat) {
            LocalMedium::Isotropic { slowness } => {
                offset.iter().map(|x| x * x).sum::<f64>().sqrt() * slowness
            }
            LocalMedium::Vti {
                params,
                symmetry_axis,
            } => {
                let vh = params.horizontal_velocity();
                let mut sum = 0.0;
                for (d, x) in offset.iter().enumerate() {
                    let v = if d == symmetry_axis { params.vp0 } else { vh };
                    sum += (x / v) * (x / v);
                }
                sum.sqrt()
            }
        }
    }

    /// Give analytic times to the nodes around a source and put them in the band.
    ///
    /// A source on a node seeds that node; otherwise every corner of the
    /// enclosing cell is seeded. A positive `source_radius` also seeds every
    /// node within that many grid cells.
    fn seed(&mut self, source: &PointSource<N>) {
        debug_assert_eq!(self.phase, Phase::Initialized);
        let grid = self.grid;
        let shape = grid.shape();
        let g = grid.fractional_index(source.coord);
        let Some(nearest) = grid.coordinate_to_index(source.coord) else {
            return;
        };
        let medium_node = grid.nd_to_flat(nearest);

        let mut lo = [0usize; N];
        let mut hi = [0usize; N];
        for d in 0..N {
            let max = (shape[d] - 1) as f64;
            let r = g[d].round();
            if (g[d] - r).abs() <= BOUNDS_TOLERANCE {
                lo[d] = r.clamp(0.0, max) as usize;
                hi[d] = lo[d];
            } else {
                lo[d] = g[d].floor().clamp(0.0, max) as usize;
                hi[d] = (lo[d] + 1).min(shape[d] - 1);
            }
        }
        for corner in 0..(1usize << N) {
            let mut idx = lo;
            let mut duplicate = false;
            for d in 0..N {
                if corner & (1 << d) != 0 {
                    duplicate |= hi[d] == lo[d];
                    idx[d] = hi[d];
                }
            }
            if !duplicate {
                self.seed_node(source, medium_node, idx);
            }
        }

        let radius = self.options.source_radius;
        if radius > 0.0 {
            for d in 0..N {
                let max = (shape[d] - 1) as f64;
                lo[d] = (g[d] - radius).ceil().clamp(0.0, max) as usize;
                hi[d] = (g[d] + radius).floor().clamp(0.0, max) as usize;
            }
            let mut idx = lo;
            'ball: loop {
                let dist2: f64 = (0..N).map(|d| (idx[d] as f64 - g[d]).powi(2)).sum();
                if dist2 <= radius * radius {
                    self.seed_node(source, medium_node, idx);
                }
                // Odometer over [lo, hi] with the last axis fastest.
                let mut d = N;
                loop {
                    if d == 0 {
                        break 'ball;
                    }
                    d -= 1;
                    if idx[d] < hi[d] {
                        idx[d] += 1;
                        break;
                    }
                    idx[d] = lo[d];
                }
            }
        }
    }

    fn seed_node(&mut self, source: &PointSource<N>, medium_node: usize, idx: [usize; N]) {
        let coord = self.grid.index_to_coordinate(idx);
        let mut offset = [0.0; N];
        for d in 0..N {
            offset[d] = coord[d] - source.coord[d];
        }
        let time = source.time + self.analytic_time(medium_node, offset);
        let flat = self.grid.nd_to_flat(idx);
        let was_far = self.state.status(flat) == NodeStatus::Far;
        if self.state.try_decrease(flat, time) {
            if was_far {
                self.stats.seeded += 1;
            }
            self.band.push(flat, time);
            trace!("seeded node {:?} at t={}", idx, time);
        }
    }

    fn run(
        &mut self,
        max_pops: u64,
        progress: Option<&(dyn Fn(ProgressInfo) + Send + Sync)>,
    ) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::Initialized);
        self.phase = Phase::Running;

        let start = Instant::now();
        let mut last_report = Duration::ZERO;
        let mut valid_pops: u64 = 0;
        let mut front = f64::NEG_INFINITY;

        while let Some((node, time)) = self.band.pop_min(&self.state) {
            valid_pops += 1;
            if valid_pops + self.band.stale_pops() > max_pops {
                return Err(EikonalError::MaxPopsExceeded { limit: max_pops });
            }
            if self.options.max_time.is_some_and(|horizon| time > horizon) {
                break;
            }
            if time < front {
                return Err(EikonalError::InvariantViolation {
                    node,
                    reason: format!("popped time {} below front {}", time, front),
                });
            }
            self.state.set_accepted(node, time)?;
            front = time;
            if let Some(order) = self.order.as_mut() {
                order.push(node);
            }
            self.relax(node, time);

            if let Some(cb) = progress {
                if valid_pops % PROGRESS_CHECK_EVERY == 0 {
                    let elapsed = start.elapsed();
                    if elapsed >= last_report + PROGRESS_INTERVAL {
                        last_report = elapsed;
                        cb(ProgressInfo {
                            accepted: self.state.accepted_count(),
                            band_size: self.band.len(),
                            front_time: front,
                            elapsed,
                        });
                    }
                }
            }
        }

        self.stats.heap_pops = valid_pops + self.band.stale_pops();
        self.phase = Phase::Done;
        Ok(())
    }

    /// Recompute every non-Accepted neighbor of a freshly accepted node.
    fn relax(&mut self, node: usize, front: f64) {
        let grid = self.grid;
        let idx = grid.flat_to_nd(node);
        for nb in grid.neighbors_of(idx) {
            let flat = grid.nd_to_flat(nb);
            if self.state.is_accepted(flat) {
                continue;
            }
            let stencil = upwind_stencil(grid, &self.state, nb);
            let solution = solve_local_eikonal(stencil.as_slice(), &self.local_medium(flat));
            if solution.degenerate {
                self.stats.degenerate_updates += 1;
                debug!(
                    "degenerate update at {:?}: kept {}-axis estimate {}",
                    nb, solution.axes_used, solution.time
                );
            }
            let mut candidate = solution.time;
            if candidate < front {
                warn!(
                    "non-causal candidate {} at {:?} below front {}; clamped",
                    candidate, nb, front
                );
                self.stats.non_causal_clamps += 1;
                candidate = front;
            }
            if self.state.try_decrease(flat, candidate) {
                self.band.push(flat, candidate);
            }
        }
    }

    fn finish(mut self) -> TravelTimeField<N> {
        debug_assert_eq!(self.phase, Phase::Done);
        self.stats.heap_pushes = self.band.pushes();
        self.stats.stale_pops = self.band.stale_pops();
        self.stats.accepted = self.state.accepted_count();
        self.stats.unreached = self.state.discard_unaccepted();
        TravelTimeField {
            shape: self.grid.shape(),
            times: self.state.into_times(),
            stats: self.stats,
            acceptance_order: self.order,
        }
    }
}
