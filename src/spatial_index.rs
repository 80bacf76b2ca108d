//! Planar grid index for fast box-overlap and radius searches.
//!
//! `GridIndex` bins axis-aligned boxes into a uniform grid over their joint
//! extent. Every cell maps to a compact slice of entry indices (CSR layout:
//! `cell_offsets` + `entry_indices`); a box is listed in every cell it
//! touches.
//!
//! Query flow:
//! 1. Compute the block of cells covered by the query box.
//! 2. Scan only entries listed in those cells.
//! 3. Apply the exact overlap (or distance) test, then sort and dedup.
//!
//! This keeps search time close to local tile/point density instead of the
//! full section size. Points are indexed as zero-area boxes.

use crate::tile::BoundingBox;
use crate::Point2;

/// Upper bound on cells along either axis; guards against tiny cell sizes
/// over montage-scale extents.
const MAX_CELLS_PER_AXIS: u32 = 1024;

/// Upper bound on total cells per indexed entry.
const CELLS_PER_ENTRY: usize = 4;

#[derive(Debug, Clone)]
pub struct GridIndex {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size: f64,
    pub n_x: u32,
    pub n_y: u32,
    pub boxes: Vec<BoundingBox>,
    pub cell_offsets: Vec<u32>,
    pub entry_indices: Vec<u32>,
}

impl GridIndex {
    /// Build an index over owned boxes.
    ///
    /// `cell_size_hint` is the preferred cell edge length; it is enlarged
    /// when needed to keep the grid within `MAX_CELLS_PER_AXIS` per axis and
    /// within `CELLS_PER_ENTRY` cells per entry.
    /// Boxes must not be degenerate (see [`BoundingBox::is_degenerate`]).
    pub fn new(boxes: Vec<BoundingBox>, cell_size_hint: f64) -> Self {
        let extent = boxes
            .iter()
            .copied()
            .reduce(|a, b| a.union(&b))
            .unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0));

        let max_axis = MAX_CELLS_PER_AXIS as f64;
        let mut cell_size = if cell_size_hint.is_finite() && cell_size_hint > 0.0 {
            cell_size_hint
        } else {
            1.0
        };
        cell_size = cell_size
            .max(extent.width() / max_axis)
            .max(extent.height() / max_axis);

        if !extent.width().is_finite() || !extent.height().is_finite() {
            cell_size = f64::INFINITY;
        }

        // Sparse entries over a wide extent: grow cells until the grid is
        // proportional to the entry count.
        let max_cells = (CELLS_PER_ENTRY * boxes.len().max(1))
            .min((MAX_CELLS_PER_AXIS * MAX_CELLS_PER_AXIS) as usize);
        let (mut n_x, mut n_y) = grid_dims(&extent, cell_size);
        while (n_x as usize) * (n_y as usize) > max_cells {
            cell_size *= 2.0;
            (n_x, n_y) = grid_dims(&extent, cell_size);
        }
        let n_cells = (n_x * n_y) as usize;

        let mut index = Self {
            origin_x: extent.min_x,
            origin_y: extent.min_y,
            cell_size,
            n_x,
            n_y,
            boxes: Vec::new(),
            cell_offsets: Vec::new(),
            entry_indices: Vec::new(),
        };

        let mut bins: Vec<Vec<u32>> = vec![Vec::new(); n_cells];
        for (entry_idx, b) in boxes.iter().enumerate() {
            let (x0, y0, x1, y1) = index.cell_range(b);
            for cy in y0..=y1 {
                for cx in x0..=x1 {
                    bins[(cy * n_x + cx) as usize].push(entry_idx as u32);
                }
            }
        }

        let mut cell_offsets = Vec::with_capacity(n_cells + 1);
        let mut entry_indices = Vec::with_capacity(boxes.len());
        cell_offsets.push(0);
        for cell_bin in bins {
            entry_indices.extend(cell_bin);
            cell_offsets.push(entry_indices.len() as u32);
        }

        index.boxes = boxes;
        index.cell_offsets = cell_offsets;
        index.entry_indices = entry_indices;
        index
    }

    /// Build an index over points, with cells sized for `radius` queries.
    pub fn from_points(points: &[Point2], radius: f64) -> Self {
        Self::new(points.iter().map(BoundingBox::from_point).collect(), radius)
    }

    /// Return the total number of indexed entries.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Return `true` when the index contains no entries.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Indices of all entries whose box overlaps `query` (closed boxes).
    pub fn query_intersecting(&self, query: &BoundingBox) -> Vec<usize> {
        let mut out = Vec::new();
        if self.is_empty() {
            return out;
        }
        self.for_each_candidate(query, |idx| {
            if self.boxes[idx].intersects(query) {
                out.push(idx);
            }
        });
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Indices of all entries within Euclidean distance `radius` of `p`
    /// (distance to the nearest point of each entry's box).
    pub fn query_within_radius(&self, p: &Point2, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        if self.is_empty() || !(radius >= 0.0) {
            return out;
        }
        let r2 = radius * radius;
        let query = BoundingBox::around(p, radius);
        self.for_each_candidate(&query, |idx| {
            if box_distance_sq(&self.boxes[idx], p) <= r2 {
                out.push(idx);
            }
        });
        out.sort_unstable();
        out.dedup();
        out
    }

    /// All unordered pairs `(i, j)`, `i < j`, of point entries no farther
    /// apart than `radius`. Intended for indices built with
    /// [`from_points`](Self::from_points).
    pub fn query_pairs(&self, radius: f64) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, b) in self.boxes.iter().enumerate() {
            let p = b.center();
            for j in self.query_within_radius(&p, radius) {
                if j > i {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    fn for_each_candidate<F>(&self, query: &BoundingBox, mut f: F)
    where
        F: FnMut(usize),
    {
        let (x0, y0, x1, y1) = self.cell_range(query);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let cell = (cy * self.n_x + cx) as usize;
                let start = self.cell_offsets[cell] as usize;
                let end = self.cell_offsets[cell + 1] as usize;
                for flat_idx in start..end {
                    f(self.entry_indices[flat_idx] as usize);
                }
            }
        }
    }

    /// Inclusive cell block `(x0, y0, x1, y1)` covered by `b`, clamped to the grid.
    fn cell_range(&self, b: &BoundingBox) -> (u32, u32, u32, u32) {
        let x0 = Self::to_bin(self.n_x, (b.min_x - self.origin_x) / self.cell_size);
        let x1 = Self::to_bin(self.n_x, (b.max_x - self.origin_x) / self.cell_size);
        let y0 = Self::to_bin(self.n_y, (b.min_y - self.origin_y) / self.cell_size);
        let y1 = Self::to_bin(self.n_y, (b.max_y - self.origin_y) / self.cell_size);
        (x0, y0, x1, y1)
    }

    fn to_bin(n: u32, u: f64) -> u32 {
        if !(u > 0.0) {
            return 0;
        }
        let idx = u.floor();
        if idx >= n as f64 {
            n - 1
        } else {
            idx as u32
        }
    }
}

/// Cells along each axis for `extent` at the given cell size.
fn grid_dims(extent: &BoundingBox, cell_size: f64) -> (u32, u32) {
    let axis = |len: f64| {
        let cells = (len / cell_size).floor();
        if cells.is_finite() && cells >= 0.0 {
            (cells as u32).saturating_add(1).min(MAX_CELLS_PER_AXIS)
        } else {
            1
        }
    };
    (axis(extent.width()), axis(extent.height()))
}

fn box_distance_sq(b: &BoundingBox, p: &Point2) -> f64 {
    let dx = (b.min_x - p.x).max(0.0).max(p.x - b.max_x);
    let dy = (b.min_y - p.y).max(0.0).max(p.y - b.max_y);
    dx * dx + dy * dy
}
