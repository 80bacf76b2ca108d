//! Seam detection: spatial clusters of high point-match residuals.
//!
//! 1. Keep finite positions whose residual is at least `residual_threshold`.
//! 2. Link every pair of kept positions no farther apart than
//!    `proximity_radius` (radius join through a [`GridIndex`]).
//! 3. Label connected components with union-find; drop components with
//!    `min_cluster_size` members or fewer.
//! 4. Reduce each surviving component to its arithmetic-mean centroid,
//!    largest component first.
//!
//! Isolated high residuals are treated as noise; only spatially clustered
//! outliers mark a seam.

use tracing::{debug, warn};

use crate::graph::UnionFind;
use crate::spatial_index::GridIndex;
use crate::Point2;

use super::SeamConfig;

/// One connected cluster of high-residual positions.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamCluster {
    /// Arithmetic mean of the member positions.
    pub centroid: Point2,
    /// Indices into the input `positions` slice, ascending.
    pub member_indices: Vec<usize>,
}

impl SeamCluster {
    pub fn size(&self) -> usize {
        self.member_indices.len()
    }
}

/// Seam centroids, largest cluster first.
///
/// `positions` and `residuals` are index-aligned, typically the flattened
/// output of [`ResidualStatistics::flatten`](crate::ResidualStatistics::flatten).
pub fn detect_seams(positions: &[Point2], residuals: &[f64], config: &SeamConfig) -> Vec<Point2> {
    cluster_seams(positions, residuals, config)
        .into_iter()
        .map(|c| c.centroid)
        .collect()
}

/// Full seam clusters, largest first. Equal-sized clusters keep the order
/// of their smallest member index.
pub fn cluster_seams(positions: &[Point2], residuals: &[f64], config: &SeamConfig) -> Vec<SeamCluster> {
    if positions.len() != residuals.len() {
        warn!(
            "seam input length mismatch: {} positions, {} residuals; extra entries ignored",
            positions.len(),
            residuals.len()
        );
    }

    // ── Step 1: threshold ──
    let kept: Vec<usize> = positions
        .iter()
        .zip(residuals)
        .enumerate()
        .filter(|(_, (p, &r))| {
            r >= config.residual_threshold && p.x.is_finite() && p.y.is_finite()
        })
        .map(|(i, _)| i)
        .collect();
    let kept_points: Vec<Point2> = kept.iter().map(|&i| positions[i]).collect();

    // ── Step 2: proximity graph via radius join ──
    let index = GridIndex::from_points(&kept_points, config.proximity_radius);
    let pairs = index.query_pairs(config.proximity_radius);

    // ── Step 3: connected components ──
    let mut uf = UnionFind::new(kept_points.len());
    for &(a, b) in &pairs {
        uf.union(a as u32, b as u32);
    }
    let mut components: Vec<Vec<usize>> = uf
        .components()
        .into_iter()
        .filter(|c| c.len() > config.min_cluster_size)
        .collect();
    components.sort_by(|a, b| b.len().cmp(&a.len()));

    // ── Step 4: centroids ──
    let clusters: Vec<SeamCluster> = components
        .into_iter()
        .map(|members| {
            let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &m| {
                (sx + kept_points[m].x, sy + kept_points[m].y)
            });
            let n = members.len() as f64;
            SeamCluster {
                centroid: Point2::new(sx / n, sy / n),
                member_indices: members.into_iter().map(|m| kept[m]).collect(),
            }
        })
        .collect();

    debug!(
        "Seams: {} of {} positions above threshold, {} links, {} clusters",
        kept_points.len(),
        positions.len(),
        pairs.len(),
        clusters.len()
    );

    clusters
}
