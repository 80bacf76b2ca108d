//! 2-D affine tile transform.
//!
//! ```text
//! x' = a·x + b·y + tx
//! y' = c·x + d·y + ty
//! ```
//!
//! Stored as a homogeneous 3×3 matrix so that affine models compose by
//! matrix product.

use crate::{Matrix3, Point2};

#[derive(Debug, Clone, PartialEq)]
pub struct AffineModel {
    pub matrix: Matrix3,
}

impl AffineModel {
    /// Build from row-major coefficients `[a, b, tx; c, d, ty]`.
    pub fn new(a: f64, b: f64, tx: f64, c: f64, d: f64, ty: f64) -> Self {
        Self {
            matrix: Matrix3::new(a, b, tx, c, d, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Rotation by `theta_rad` about the origin followed by a shift.
    pub fn rigid(theta_rad: f64, tx: f64, ty: f64) -> Self {
        let (s, c) = theta_rad.sin_cos();
        Self::new(c, -s, tx, s, c, ty)
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &AffineModel) -> AffineModel {
        AffineModel {
            matrix: self.matrix * first.matrix,
        }
    }

    pub fn apply_point(&self, p: &Point2) -> Point2 {
        self.matrix.transform_point(p)
    }
}

impl Default for AffineModel {
    fn default() -> Self {
        Self::identity()
    }
}
