//! Tile transforms: local tile pixels → shared montage coordinates.
//!
//! The analysis treats a transform as an opaque capability behind the
//! [`Transform`] trait; it only ever calls [`Transform::apply`]. Collaborators
//! may implement the trait for their own representation, or use the
//! [`TileTransform`] models shipped here.
//!
//! # Supported models
//!
//! - [`TileTransform::Identity`]
//! - [`TileTransform::Translation`]: rigid shift by `(dx, dy)`
//! - [`TileTransform::Affine`]: full 2-D affine ([`AffineModel`])
//! - [`TileTransform::Polynomial`]: 2-D polynomial of any order ([`PolynomialModel`])
//! - [`TileTransform::Chain`]: a tile's transform list, applied first to last

pub mod affine;
pub mod polynomial;

use std::collections::HashMap;
use std::sync::Arc;

pub use affine::AffineModel;
pub use polynomial::PolynomialModel;

use crate::{Point2, Vector2};

/// Maps points from a tile's local pixel space into shared coordinates.
pub trait Transform: Send + Sync {
    fn apply(&self, points: &[Point2]) -> Vec<Point2>;
}

/// Resolved transforms for one section, keyed by tile id.
pub type TransformMap = HashMap<String, Arc<dyn Transform>>;

/// Concrete transform models.
#[derive(Debug, Clone, PartialEq)]
pub enum TileTransform {
    Identity,
    Translation(Vector2),
    Affine(AffineModel),
    Polynomial(PolynomialModel),
    Chain(Vec<TileTransform>),
}

impl TileTransform {
    pub fn translation(dx: f64, dy: f64) -> Self {
        TileTransform::Translation(Vector2::new(dx, dy))
    }

    /// Map a single point.
    pub fn apply_point(&self, p: &Point2) -> Point2 {
        match self {
            TileTransform::Identity => *p,
            TileTransform::Translation(t) => *p + *t,
            TileTransform::Affine(a) => a.apply_point(p),
            TileTransform::Polynomial(m) => m.apply_point(p),
            TileTransform::Chain(list) => list.iter().fold(*p, |acc, t| t.apply_point(&acc)),
        }
    }

    /// Returns `true` if this is `TileTransform::Identity`.
    pub fn is_identity(&self) -> bool {
        matches!(self, TileTransform::Identity)
    }
}

impl Default for TileTransform {
    fn default() -> Self {
        TileTransform::Identity
    }
}

impl Transform for TileTransform {
    fn apply(&self, points: &[Point2]) -> Vec<Point2> {
        points.iter().map(|p| self.apply_point(p)).collect()
    }
}
