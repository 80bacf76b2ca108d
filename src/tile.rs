//! Tile geometry records.
//!
//! A [`TileRecord`] is an immutable snapshot of one tile's placement in a
//! given stitch state: its id, its axis-aligned bounding box in that state's
//! shared coordinate space, and the group (section) id used to look up its
//! point matches.

use crate::Point2;

/// Axis-aligned bounding box `[min_x, min_y, max_x, max_y]`.
///
/// Boxes are closed: two boxes that share only an edge or a corner overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Box from its corner coordinates. No ordering check; see
    /// [`is_degenerate`](Self::is_degenerate).
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Zero-area box at a single point.
    pub fn from_point(p: &Point2) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Square box of half-width `radius` centred on `p`.
    pub fn around(p: &Point2, radius: f64) -> Self {
        Self::new(p.x - radius, p.y - radius, p.x + radius, p.y + radius)
    }

    /// Extent along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along y.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// `true` when the box is inverted or has a non-finite coordinate.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite();
        !finite || self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Closed-interval overlap test on both axes.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Midpoint of the box.
    pub fn center(&self) -> Point2 {
        Point2::new(
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// One tile's placement in a single stitch state.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    /// Unique within a section.
    pub tile_id: String,
    pub bbox: BoundingBox,
    /// Section / group id under which the tile's point matches are stored.
    pub group_id: String,
}

impl TileRecord {
    /// Create a record; `bbox` accepts a `[min_x, min_y, max_x, max_y]` array.
    pub fn new(
        tile_id: impl Into<String>,
        bbox: impl Into<BoundingBox>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            tile_id: tile_id.into(),
            bbox: bbox.into(),
            group_id: group_id.into(),
        }
    }
}
