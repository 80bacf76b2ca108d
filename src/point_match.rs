//! Point correspondences between two tiles.
//!
//! Each match holds paired pixel locations in the local (untransformed)
//! coordinate systems of tile `p` and tile `q`, believed to depict the same
//! physical point.

use crate::error::IntegrityWarning;
use crate::Point2;

/// Correspondences between tile `p_id` and tile `q_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMatch {
    /// Tile whose points are in `p`.
    pub p_id: String,
    /// Tile whose points are in `q`.
    pub q_id: String,
    /// Local pixel coordinates in tile `p`.
    pub p: Vec<Point2>,
    /// Local pixel coordinates in tile `q`, paired index-for-index with `p`.
    pub q: Vec<Point2>,
}

impl PointMatch {
    /// Create a match. Point counts are not checked here; see
    /// [`check`](Self::check).
    pub fn new(
        p_id: impl Into<String>,
        q_id: impl Into<String>,
        p: Vec<Point2>,
        q: Vec<Point2>,
    ) -> Self {
        Self {
            p_id: p_id.into(),
            q_id: q_id.into(),
            p,
            q,
        }
    }

    /// Number of correspondence pairs. Only meaningful after [`check`](Self::check).
    pub fn len(&self) -> usize {
        self.p.len()
    }

    /// Returns `true` when the match has no pairs.
    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }

    /// Verify that both sides carry the same number of points.
    pub fn check(&self) -> Result<(), IntegrityWarning> {
        if self.p.len() != self.q.len() {
            return Err(IntegrityWarning::MismatchedPointCounts {
                p_id: self.p_id.clone(),
                q_id: self.q_id.clone(),
                p_len: self.p.len(),
                q_len: self.q.len(),
            });
        }
        Ok(())
    }
}
