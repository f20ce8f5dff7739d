// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{EikonalError, Result};

/// Thomsen parameters of a vertically transverse isotropic (VTI) node.
///
/// Derived velocities follow the acoustic VTI convention:
/// `vh = vp0 * sqrt(1 + 2 epsilon)`, `vn = vp0 * sqrt(1 + 2 delta)` and
/// `eta = (epsilon - delta) / (1 + 2 delta)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtiParams {
    /// P-wave velocity along the symmetry axis.
    pub vp0: f64,
    /// Thomsen epsilon.
    pub epsilon: f64,
    /// Thomsen delta.
    pub delta: f64,
}

impl VtiParams {
    /// Parameters describing an isotropic node with velocity `v`.
    pub fn isotropic(v: f64) -> Self {
        VtiParams {
            vp0: v,
            epsilon: 0.0,
            delta: 0.0,
        }
    }

    /// Velocity perpendicular to the symmetry axis.
    #[inline]
    pub fn horizontal_velocity(&self) -> f64 {
        self.vp0 * (1.0 + 2.0 * self.epsilon).sqrt()
    }

    /// Normal-moveout velocity.
    #[inline]
    pub fn nmo_velocity(&self) -> f64 {
        self.vp0 * (1.0 + 2.0 * self.delta).sqrt()
    }

    /// Anellipticity parameter. Zero for elliptical media.
    #[inline]
    pub fn eta(&self) -> f64 {
        (self.epsilon - self.delta) / (1.0 + 2.0 * self.delta)
    }

    /// Check the parameters of the node at flat index `index`.
    pub fn validate(&self, index: usize) -> Result<()> {
        if !self.vp0.is_finite() || self.vp0 <= 0.0 {
            return Err(EikonalError::InvalidVelocity {
                index,
                value: self.vp0,
            });
        }
        if !self.epsilon.is_finite() || 1.0 + 2.0 * self.epsilon <= 0.0 {
            return Err(EikonalError::InvalidAnisotropy {
                index,
                reason: format!("epsilon = {} (need finite and 1 + 2*epsilon > 0)", self.epsilon),
            });
        }
        if !self.delta.is_finite() || 1.0 + 2.0 * self.delta <= 0.0 {
            return Err(EikonalError::InvalidAnisotropy {
                index,
                reason: format!("delta = {} (need finite and 1 + 2*delta > 0)", self.delta),
            });
        }
        Ok(())
    }
}

/// Per-node VTI input arrays, flattened row-major like the velocity field.
#[derive(Debug, Clone)]
pub struct VtiModel {
    /// Velocity along the symmetry axis at every node.
    pub vertical_velocity: Vec<f64>,
    /// Thomsen epsilon at every node.
    pub epsilon: Vec<f64>,
    /// Thomsen delta at every node.
    pub delta: Vec<f64>,
    /// Grid axis aligned with the symmetry axis.
    pub symmetry_axis: usize,
}

impl VtiModel {
    /// Homogeneous model of `num_nodes` nodes.
    pub fn uniform(num_nodes: usize, params: VtiParams, symmetry_axis: usize) -> Self {
        VtiModel {
            vertical_velocity: vec![params.vp0; num_nodes],
            epsilon: vec![params.epsilon; num_nodes],
            delta: vec![params.delta; num_nodes],
            symmetry_axis,
        }
    }
}

/// The material a grid carries.
#[derive(Debug, Clone)]
pub enum Medium {
    /// One velocity per node.
    Isotropic {
        /// Node velocities.
        velocity: Box<[f64]>,
    },
    /// Per-node Thomsen parameters with a grid-wide symmetry axis.
    Vti {
        /// Velocity along the symmetry axis.
        vertical_velocity: Box<[f64]>,
        /// Thomsen epsilon.
        epsilon: Box<[f64]>,
        /// Thomsen delta.
        delta: Box<[f64]>,
        /// Grid axis aligned with the symmetry axis.
        symmetry_axis: usize,
    },
}

impl Medium {
    pub(crate) fn isotropic(velocity: Vec<f64>, num_nodes: usize) -> Result<Self> {
        check_len(velocity.len(), num_nodes)?;
        for (index, &value) in velocity.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(EikonalError::InvalidVelocity { index, value });
            }
        }
        Ok(Medium::Isotropic {
            velocity: velocity.into_boxed_slice(),
        })
    }

    pub(crate) fn vti(model: VtiModel, num_nodes: usize, dims: usize) -> Result<Self> {
        if model.symmetry_axis >= dims {
            return Err(EikonalError::InvalidSymmetryAxis {
                axis: model.symmetry_axis,
                dims,
            });
        }
        check_len(model.vertical_velocity.len(), num_nodes)?;
        check_len(model.epsilon.len(), num_nodes)?;
        check_len(model.delta.len(), num_nodes)?;
        for index in 0..num_nodes {
            VtiParams {
                vp0: model.vertical_velocity[index],
                epsilon: model.epsilon[index],
                delta: model.delta[index],
            }
            .validate(index)?;
        }
        Ok(Medium::Vti {
            vertical_velocity: model.vertical_velocity.into_boxed_slice(),
            epsilon: model.epsilon.into_boxed_slice(),
            delta: model.delta.into_boxed_slice(),
            symmetry_axis: model.symmetry_axis,
        })
    }

    /// Isotropic velocity, or the symmetry-axis velocity for VTI.
    #[inline]
    pub fn velocity_at(&self, flat: usize) -> f64 {
        match self {
            Medium::Isotropic { velocity } => velocity[flat],
            Medium::Vti {
                vertical_velocity, ..
            } => vertical_velocity[flat],
        }
    }

    /// Thomsen parameters at a node, `None` for isotropic media.
    #[inline]
    pub fn anisotropy_at(&self, flat: usize) -> Option<VtiParams> {
        match self {
            Medium::Isotropic { .. } => None,
            Medium::Vti {
                vertical_velocity,
                epsilon,
                delta,
                ..
            } => Some(VtiParams {
                vp0: vertical_velocity[flat],
                epsilon: epsilon[flat],
                delta: delta[flat],
            }),
        }
    }

    /// Symmetry axis of a VTI medium.
    pub fn symmetry_axis(&self) -> Option<usize> {
        match self {
            Medium::Isotropic { .. } => None,
            Medium::Vti { symmetry_axis, .. } => Some(*symmetry_axis),
        }
    }

    /// Velocity array (symmetry-axis velocity for VTI).
    pub fn velocity(&self) -> &[f64] {
        match self {
            Medium::Isotropic { velocity } => velocity,
            Medium::Vti {
                vertical_velocity, ..
            } => vertical_velocity,
        }
    }
}

fn check_len(len: usize, num_nodes: usize) -> Result<()> {
    if len != num_nodes {
        return Err(EikonalError::ShapeMismatch {
            expected: vec![num_nodes],
            got: vec![len],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_velocities() {
        let p = VtiParams {
            vp0: 2.0,
            epsilon: 0.2,
            delta: 0.1,
        };
        assert!((p.horizontal_velocity() - 2.0 * 1.4_f64.sqrt()).abs() < 1e-12);
        assert!((p.nmo_velocity() - 2.0 * 1.2_f64.sqrt()).abs() < 1e-12);
        assert!((p.eta() - 0.1 / 1.2).abs() < 1e-12);
        // vh^2 = vn^2 (1 + 2 eta)
        let lhs = p.horizontal_velocity().powi(2);
        let rhs = p.nmo_velocity().powi(2) * (1.0 + 2.0 * p.eta());
        assert!((lhs - rhs).abs() < 1e-12);
    }

    #[test]
    fn isotropic_params_have_no_anisotropy() {
        let p = VtiParams::isotropic(3.0);
        assert_eq!(p.horizontal_velocity(), 3.0);
        assert_eq!(p.nmo_velocity(), 3.0);
        assert_eq!(p.eta(), 0.0);
    }

    #[test]
    fn validate_rejects_bad_params() {
        let bad_eps = VtiParams {
            vp0: 1.0,
            epsilon: -0.5,
            delta: 0.0,
        };
        assert!(matches!(
            bad_eps.validate(7),
            Err(EikonalError::InvalidAnisotropy { index: 7, .. })
        ));
        let bad_delta = VtiParams {
            vp0: 1.0,
            epsilon: 0.0,
            delta: f64::NAN,
        };
        assert!(bad_delta.validate(0).is_err());
        let bad_v = VtiParams::isotropic(0.0);
        assert!(matches!(
            bad_v.validate(2),
            Err(EikonalError::InvalidVelocity { index: 2, .. })
        ));
    }

    #[test]
    fn vti_medium_checks_axis_and_lengths() {
        let model = VtiModel::uniform(4, VtiParams::isotropic(1.0), 2);
        assert!(matches!(
            Medium::vti(model, 4, 2),
            Err(EikonalError::InvalidSymmetryAxis { axis: 2, dims: 2 })
        ));

        let mut model = VtiModel::uniform(4, VtiParams::isotropic(1.0), 1);
        model.delta.pop();
        assert!(matches!(
            Medium::vti(model, 4, 2),
            Err(EikonalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn medium_accessors() {
        let model = VtiModel::uniform(
            4,
            VtiParams {
                vp0: 1.5,
                epsilon: 0.1,
                delta: 0.05,
            },
            1,
        );
        let m = Medium::vti(model, 4, 2).unwrap();
        assert_eq!(m.velocity_at(3), 1.5);
        assert_eq!(m.symmetry_axis(), Some(1));
        assert_eq!(m.anisotropy_at(0).unwrap().epsilon, 0.1);

        let iso = Medium::isotropic(vec![2.0; 4], 4).unwrap();
        assert!(iso.anisotropy_at(0).is_none());
        assert_eq!(iso.symmetry_axis(), None);
        assert_eq!(iso.velocity(), &[2.0; 4]);
    }
}
