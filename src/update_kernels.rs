// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! First-order upwind local updates.
//!
//! Both media share one incremental scheme. Upwind samples are sorted by time;
//! the estimate starts from the single-axis update along the earliest axis and
//! axes are added one at a time while the current estimate exceeds the next
//! axis's upwind time. A stage that cannot produce a causal root keeps the
//! previous, lower-degree estimate and flags the update as degenerate.
//!
//! Isotropic stages solve the quadratic `sum_d ((T - T_d)/h_d)^2 = s^2` in
//! closed form. VTI stages use the acoustic VTI relation
//! `vh^2 P_h + vz^2 p_z^2 - 2 eta vn^2 vz^2 P_h p_z^2 = 1`, with
//! `p_d = (T - T_d)/h_d`, `P_h` summing horizontal components and `p_z` the
//! symmetry-axis component. It is quartic in `T` and is solved by bisection
//! on the causal bracket `[T_k, T_prev]`.

use crate::core::{CartesianGrid, GridGeometry};
use crate::medium::VtiParams;
use crate::state::NodeStateTable;

/// Largest supported dimensionality.
pub const MAX_DIMS: usize = 3;

const BISECTION_MAX_ITERS: usize = 200;

/// Relative slack for quadratic roots that miss the causal bracket by rounding only.
const ROOT_TOLERANCE: f64 = 1e-12;

/// Same, for the dimensionless VTI residual.
const RESIDUAL_TOLERANCE: f64 = 1e-10;

/// One upwind contribution: the smaller Accepted neighbor time along an axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSample {
    /// Grid axis.
    pub axis: usize,
    /// Upwind travel time along this axis.
    pub time: f64,
    /// Node spacing along this axis.
    pub spacing: f64,
}

/// Fixed-capacity set of upwind samples for one node.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpwindStencil {
    samples: [AxisSample; MAX_DIMS],
    len: usize,
}

impl UpwindStencil {
    /// Empty stencil.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample. Panics beyond `MAX_DIMS` samples.
    pub fn push(&mut self, sample: AxisSample) {
        self.samples[self.len] = sample;
        self.len += 1;
    }

    /// Samples added so far.
    pub fn as_slice(&self) -> &[AxisSample] {
        &self.samples[..self.len]
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no axis has an Accepted neighbor.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Material seen by a local update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalMedium {
    /// Isotropic slowness at the node.
    Isotropic {
        /// 1 / velocity.
        slowness: f64,
    },
    /// VTI parameters at the node.
    Vti {
        /// Thomsen parameters.
        params: VtiParams,
        /// Grid axis aligned with the symmetry axis.
        symmetry_axis: usize,
    },
}

/// Result of a local update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSolution {
    /// Candidate travel time (+inf when no upwind sample exists).
    pub time: f64,
    /// Number of axes that contributed.
    pub axes_used: usize,
    /// True when a higher-degree stage failed and a fallback was kept.
    pub degenerate: bool,
}

/// Solve the discretized eikonal equation at one node from its upwind samples.
///
/// Samples may come in any order and must have finite times; at most
/// `MAX_DIMS` are read.
pub fn solve_local_eikonal(samples: &[AxisSample], medium: &LocalMedium) -> LocalSolution {
    let mut sorted = [AxisSample::default(); MAX_DIMS];
    let n = samples.len().min(MAX_DIMS);
    sorted[..n].copy_from_slice(&samples[..n]);
    let sorted = &mut sorted[..n];
    sorted.sort_unstable_by(|a, b| a.time.total_cmp(&b.time).then(a.axis.cmp(&b.axis)));

    if n == 0 {
        return LocalSolution {
            time: f64::INFINITY,
            axes_used: 0,
            degenerate: false,
        };
    }

    let mut time = single_axis(&sorted[0], medium);
    let mut axes_used = 1;
    let mut degenerate = false;

    for k in 1..n {
        if time <= sorted[k].time {
            break;
        }
        let stage = match medium {
            LocalMedium::Isotropic { slowness } => solve_isotropic(&sorted[..=k], *slowness),
            LocalMedium::Vti {
                params,
                symmetry_axis,
            } => solve_vti(&sorted[..=k], params, *symmetry_axis, time),
        };
        match stage {
            Some(t) => {
                time = t;
                axes_used = k + 1;
            }
            None => {
                degenerate = true;
                break;
            }
        }
    }

    LocalSolution {
        time,
        axes_used,
        degenerate,
    }
}

fn single_axis(sample: &AxisSample, medium: &LocalMedium) -> f64 {
    match medium {
        LocalMedium::Isotropic { slowness } => sample.time + sample.spacing * slowness,
        LocalMedium::Vti {
            params,
            symmetry_axis,
        } => {
            let v = if sample.axis == *symmetry_axis {
                params.vp0
            } else {
                params.horizontal_velocity()
            };
            sample.time + sample.spacing / v
        }
    }
}

/// Larger root of `sum ((T - T_d)/h_d)^2 = s^2`; `None` unless it is real and
/// no smaller than every included upwind time.
fn solve_isotropic(samples: &[AxisSample], slowness: f64) -> Option<f64> {
    let mut a = 0.0;
    let mut b = 0.0;
    let mut c = -slowness * slowness;
    for s in samples {
        let w = 1.0 / (s.spacing * s.spacing);
        a += w;
        b -= 2.0 * s.time * w;
        c += s.time * s.time * w;
    }
    let mut disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        if disc < -ROOT_TOLERANCE * b * b {
            return None;
        }
        disc = 0.0;
    }
    let root = (-b + disc.sqrt()) / (2.0 * a);
    let latest = samples[samples.len() - 1].time;
    if !root.is_finite() {
        return None;
    }
    if root >= latest {
        Some(root)
    } else if latest - root <= ROOT_TOLERANCE * latest.abs().max(1.0) {
        Some(latest)
    } else {
        None
    }
}

fn vti_residual(t: f64, samples: &[AxisSample], params: &VtiParams, symmetry_axis: usize) -> f64 {
    let vz2 = params.vp0 * params.vp0;
    let vh = params.horizontal_velocity();
    let vn = params.nmo_velocity();
    let mut horizontal = 0.0;
    let mut vertical = 0.0;
    for s in samples {
        let p = (t - s.time) / s.spacing;
        if s.axis == symmetry_axis {
            vertical += p * p;
        } else {
            horizontal += p * p;
        }
    }
    vh * vh * horizontal + vz2 * vertical
        - 2.0 * params.eta() * vn * vn * vz2 * horizontal * vertical
        - 1.0
}

/// Root of the acoustic VTI relation in `[latest upwind time, upper]`.
///
/// The residual is negative at the lower end and non-negative at `upper` (the
/// previous stage's estimate) on the physical branch; anything else is a
/// degeneracy.
fn solve_vti(
    samples: &[AxisSample],
    params: &VtiParams,
    symmetry_axis: usize,
    upper: f64,
) -> Option<f64> {
    let mut lo = samples[samples.len() - 1].time;
    let mut hi = upper;
    let f_lo = vti_residual(lo, samples, params, symmetry_axis);
    let f_hi = vti_residual(hi, samples, params, symmetry_axis);
    if f_lo.is_nan() || f_hi.is_nan() {
        return None;
    }
    if f_lo >= 0.0 {
        return (f_lo <= RESIDUAL_TOLERANCE).then_some(lo);
    }
    if f_hi < 0.0 {
        return (f_hi >= -RESIDUAL_TOLERANCE).then_some(hi);
    }
    for _ in 0..BISECTION_MAX_ITERS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if vti_residual(mid, samples, params, symmetry_axis) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(hi)
}

/// Collect the upwind samples of a node from its Accepted neighbors.
///
/// Per axis the smaller of the two Accepted neighbor times is used; axes whose
/// neighbors are missing or not yet Accepted contribute nothing.
pub fn upwind_stencil<const N: usize>(
    grid: &CartesianGrid<N>,
    state: &NodeStateTable,
    idx: [usize; N],
) -> UpwindStencil {
    let shape = grid.shape();
    let spacing = grid.spacing();
    let mut stencil = UpwindStencil::new();

    for axis in 0..N {
        let mut best = f64::INFINITY;
        if idx[axis] > 0 {
            let mut nb = idx;
            nb[axis] -= 1;
            let flat = grid.nd_to_flat(nb);
            if state.is_accepted(flat) {
                best = best.min(state.time(flat));
            }
        }
        if idx[axis] + 1 < shape[axis] {
            let mut nb = idx;
            nb[axis] += 1;
            let flat = grid.nd_to_flat(nb);
            if state.is_accepted(flat) {
                best = best.min(state.time(flat));
            }
        }
        if best.is_finite() {
            stencil.push(AxisSample {
                axis,
                time: best,
                spacing: spacing[axis],
            });
        }
    }
    stencil
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::VtiModel;

    fn iso(slowness: f64) -> LocalMedium {
        LocalMedium::Isotropic { slowness }
    }

    fn vti(vp0: f64, epsilon: f64, delta: f64, symmetry_axis: usize) -> LocalMedium {
        LocalMedium::Vti {
            params: VtiParams {
                vp0,
                epsilon,
                delta,
            },
            symmetry_axis,
        }
    }

    fn sample(axis: usize, time: f64, spacing: f64) -> AxisSample {
        AxisSample {
            axis,
            time,
            spacing,
        }
    }

    #[test]
    fn empty_stencil_is_unreachable() {
        let sol = solve_local_eikonal(&[], &iso(1.0));
        assert!(sol.time.is_infinite());
        assert_eq!(sol.axes_used, 0);
        assert!(!sol.degenerate);
    }

    #[test]
    fn single_axis_update() {
        // a=inf (missing), b=5, s=1, h=1 -> 5 + 1 = 6
        let sol = solve_local_eikonal(&[sample(1, 5.0, 1.0)], &iso(1.0));
        assert!((sol.time - 6.0).abs() < 1e-12);
        assert_eq!(sol.axes_used, 1);
    }

    #[test]
    fn two_axis_known_case() {
        // Both neighbors at 0, s=1, h=1: u = sqrt(2)/2
        let sol = solve_local_eikonal(&[sample(0, 0.0, 1.0), sample(1, 0.0, 1.0)], &iso(1.0));
        assert!((sol.time - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(sol.axes_used, 2);
    }

    #[test]
    fn far_axis_is_excluded_by_causality() {
        // a=0, b=100: the single-axis estimate 1 is below 100, so axis 1 never enters.
        let sol = solve_local_eikonal(&[sample(0, 0.0, 1.0), sample(1, 100.0, 1.0)], &iso(1.0));
        assert!((sol.time - 1.0).abs() < 1e-12);
        assert_eq!(sol.axes_used, 1);
        assert!(!sol.degenerate);
    }

    #[test]
    fn three_axis_known_case() {
        // 3u^2 = 1 -> u = 1/sqrt(3)
        let samples = [
            sample(0, 0.0, 1.0),
            sample(1, 0.0, 1.0),
            sample(2, 0.0, 1.0),
        ];
        let sol = solve_local_eikonal(&samples, &iso(1.0));
        assert!((sol.time - 1.0 / 3.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(sol.axes_used, 3);
    }

    #[test]
    fn three_axis_falls_back_to_two() {
        let samples = [
            sample(2, 100.0, 1.0),
            sample(0, 0.0, 1.0),
            sample(1, 0.0, 1.0),
        ];
        let sol = solve_local_eikonal(&samples, &iso(1.0));
        assert!((sol.time - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(sol.axes_used, 2);
    }

    #[test]
    fn overflowing_stage_keeps_single_axis_estimate() {
        // b^2 overflows, so the two-axis discriminant is NaN and the stage fails.
        let t = 1e160;
        let slowness = 1e150;
        let sol = solve_local_eikonal(&[sample(0, t, 1.0), sample(1, t, 1.0)], &iso(slowness));
        assert!(sol.degenerate);
        assert_eq!(sol.axes_used, 1);
        assert_eq!(sol.time, t + slowness);
    }

    #[test]
    fn vti_overflowing_stage_is_degenerate() {
        // The tiny spacing on axis 1 overflows p_z^2 at the upper bracket end.
        let m = vti(1.0, 0.2, 0.1, 1);
        let samples = [sample(0, 0.0, 1.0), sample(1, 0.5, 1e-300)];
        let sol = solve_local_eikonal(&samples, &m);
        assert!(sol.degenerate);
        assert_eq!(sol.axes_used, 1);
        assert_eq!(sol.time, single_axis(&samples[0], &m));
        assert!(sol.time > 0.5);
    }

    #[test]
    fn anisotropic_spacing_quadratic() {
        // hx=1, hy=2, both neighbors at 0, s=1: T^2 (1 + 1/4) = 1
        let sol = solve_local_eikonal(&[sample(0, 0.0, 1.0), sample(1, 0.0, 2.0)], &iso(1.0));
        assert!((sol.time - (1.0_f64 / 1.25).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn root_is_causal() {
        let samples = [sample(0, 0.3, 1.0), sample(1, 0.9, 1.0)];
        let sol = solve_local_eikonal(&samples, &iso(1.0));
        assert!(sol.time >= 0.9);
        assert!(sol.time <= 1.3);
    }

    #[test]
    fn no_nan_produced() {
        let cases: [(f64, f64, f64, f64); 6] = [
            (0.0, 0.0, 1.0, 1.0),
            (1.0, 1.0, 1.0, 1.0),
            (0.0, 1e-300, 1.0, 1.0),
            (0.0, 0.0, 0.001, 0.001),
            (0.0, 0.0, 1000.0, 1.0),
            (1e12, 1e12 + 1.0, 1.0, 1.0),
        ];
        for (a, b, s, h) in cases {
            let sol = solve_local_eikonal(&[sample(0, a, h), sample(1, b, h)], &iso(s));
            assert!(!sol.time.is_nan(), "NaN for ({}, {}, {}, {})", a, b, s, h);
            let sol = solve_local_eikonal(
                &[sample(0, a, h), sample(1, b, h)],
                &vti(1.0 / s, 0.2, 0.1, 1),
            );
            assert!(!sol.time.is_nan(), "VTI NaN for ({}, {}, {}, {})", a, b, s, h);
        }
    }

    #[test]
    fn vti_with_zero_anisotropy_matches_isotropic() {
        let cases = [
            vec![sample(0, 0.0, 1.0), sample(1, 0.0, 1.0)],
            vec![sample(0, 0.2, 1.0), sample(1, 0.5, 1.0)],
            vec![sample(0, 1.0, 0.5), sample(1, 1.1, 2.0), sample(2, 1.2, 1.0)],
            vec![sample(2, 3.0, 1.0)],
        ];
        for samples in &cases {
            let a = solve_local_eikonal(samples, &iso(0.5));
            let b = solve_local_eikonal(samples, &vti(2.0, 0.0, 0.0, 1));
            assert!(
                (a.time - b.time).abs() < 1e-12,
                "iso {} vs vti {}",
                a.time,
                b.time
            );
            assert_eq!(a.axes_used, b.axes_used);
        }
    }

    #[test]
    fn vti_single_axis_velocities() {
        let m = vti(2.0, 0.125, 0.05, 1);
        // Along the symmetry axis the wave travels at vp0.
        let along = solve_local_eikonal(&[sample(1, 0.0, 1.0)], &m);
        assert!((along.time - 0.5).abs() < 1e-12);
        // Across it at vp0 * sqrt(1 + 2 epsilon) = 2.5.
        let across = solve_local_eikonal(&[sample(0, 0.0, 1.0)], &m);
        assert!((across.time - 0.4).abs() < 1e-12);
    }

    #[test]
    fn vti_elliptical_two_axis() {
        // eta = 0: vh^2 px^2 + vz^2 pz^2 = 1 with both upwind times 0
        // -> T = 1 / sqrt(vh^2 + vz^2)
        let m = vti(1.0, 0.5, 0.5, 1);
        let sol = solve_local_eikonal(&[sample(0, 0.0, 1.0), sample(1, 0.0, 1.0)], &m);
        let vh2 = 2.0;
        let expected = 1.0 / (vh2 + 1.0_f64).sqrt();
        assert!((sol.time - expected).abs() < 1e-12);
        assert_eq!(sol.axes_used, 2);
    }

    #[test]
    fn vti_anelliptic_residual_vanishes_at_root() {
        let params = VtiParams {
            vp0: 1.5,
            epsilon: 0.25,
            delta: 0.05,
        };
        let samples = [sample(0, 0.1, 1.0), sample(1, 0.3, 1.0), sample(2, 0.2, 1.0)];
        let sol = solve_local_eikonal(
            &samples,
            &LocalMedium::Vti {
                params,
                symmetry_axis: 2,
            },
        );
        assert!(!sol.degenerate);
        assert_eq!(sol.axes_used, 3);
        let r = vti_residual(sol.time, &samples, &params, 2);
        assert!(r.abs() < 1e-9, "residual {}", r);
        assert!(sol.time >= 0.3);
    }

    #[test]
    fn upwind_stencil_uses_accepted_neighbors_only() {
        let grid = CartesianGrid::<2>::new([5, 5], [1.0, 2.0], vec![1.0; 25]).unwrap();
        let mut state = NodeStateTable::new(25);
        // [2,2] accepted at 0; [1,2] only considered; [2,3] accepted at 4.
        state.set_accepted(grid.nd_to_flat([2, 2]), 0.0).unwrap();
        state.try_decrease(grid.nd_to_flat([1, 1]), 0.5);
        state.set_accepted(grid.nd_to_flat([3, 1]), 4.0).unwrap();
        state.set_accepted(grid.nd_to_flat([2, 0]), 7.0).unwrap();

        let stencil = upwind_stencil(&grid, &state, [2, 1]);
        assert_eq!(
            stencil.as_slice(),
            &[sample(0, 4.0, 1.0), sample(1, 0.0, 2.0)]
        );

        let lonely = upwind_stencil(&grid, &state, [0, 4]);
        assert!(lonely.is_empty());
    }

    #[test]
    fn upwind_stencil_on_vti_grid() {
        let model = VtiModel::uniform(27, VtiParams::isotropic(1.0), 2);
        let grid = CartesianGrid::<3>::new_vti([3, 3, 3], [1.0; 3], model).unwrap();
        let mut state = NodeStateTable::new(27);
        state.set_accepted(grid.nd_to_flat([1, 1, 2]), 0.0).unwrap();
        let stencil = upwind_stencil(&grid, &state, [1, 1, 1]);
        assert_eq!(stencil.len(), 1);
        assert_eq!(stencil.as_slice()[0].axis, 2);
    }
}
