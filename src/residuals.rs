//! Per-tile point-match residual statistics.
//!
//! Every qualifying point match is mapped into shared montage coordinates
//! through the transforms of its two tiles. For each correspondence pair the
//! midpoint of the two mapped points (a "position") and their Euclidean
//! distance (a "residual") are recorded.
//!
//! # Attribution
//!
//! Samples are accumulated under the **p-side tile only** by default. This
//! is a known asymmetry kept for parity with existing QC results; set
//! [`ResidualAttribution::BothSides`] to also credit the q tile.
//!
//! # Residual vs. RMSE
//!
//! `residuals` holds the raw per-pair distance `d` and is what seam
//! clustering consumes. `rmse` holds `sqrt(d² / n)`, where `n` is the number
//! of pairs in the originating match, for statistics that need error
//! normalized by match size.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{ConfigError, IntegrityWarning};
use crate::point_match::PointMatch;
use crate::transform::TransformMap;
use crate::Point2;

/// Which tile(s) of a match receive its residual samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidualAttribution {
    /// Credit the p tile only.
    #[default]
    PSide,
    /// Credit both the p and q tiles with the same samples.
    BothSides,
}

/// Parameters for residual accumulation.
#[derive(Debug, Clone)]
pub struct ResidualConfig {
    /// Matches with fewer correspondence pairs are excluded. Default 1.
    pub min_points: usize,
    /// Default: [`ResidualAttribution::PSide`].
    pub attribution: ResidualAttribution,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self {
            min_points: 1,
            attribution: ResidualAttribution::PSide,
        }
    }
}

impl ResidualConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_points == 0 {
            return Err(ConfigError::MinPoints);
        }
        Ok(())
    }
}

/// Samples accumulated for one tile. The three vectors are index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileResidualStats {
    /// Midpoints of mapped correspondence pairs, in shared coordinates.
    pub positions: Vec<Point2>,
    /// Raw per-pair distances.
    pub residuals: Vec<f64>,
    /// Per-pair `sqrt(d² / n)`.
    pub rmse: Vec<f64>,
}

impl TileResidualStats {
    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    pub fn mean_residual(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.residuals.iter().sum::<f64>() / self.len() as f64)
    }

    pub fn max_residual(&self) -> Option<f64> {
        self.residuals.iter().copied().reduce(f64::max)
    }

    /// Root of the mean squared residual over all samples of this tile.
    pub fn rmse(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum_sq: f64 = self.residuals.iter().map(|r| r * r).sum();
        Some((sum_sq / self.len() as f64).sqrt())
    }

    fn extend_from(&mut self, positions: &[Point2], residuals: &[f64], rmse: &[f64]) {
        self.positions.extend_from_slice(positions);
        self.residuals.extend_from_slice(residuals);
        self.rmse.extend_from_slice(rmse);
    }
}

/// Result of [`compute_residual_stats`].
#[derive(Debug, Clone, Default)]
pub struct ResidualStatistics {
    /// Only tiles with at least one sample are present.
    pub tiles: BTreeMap<String, TileResidualStats>,
    /// Matches that contributed samples.
    pub matches_used: usize,
    /// Matches skipped because a tile had no transform.
    pub matches_missing_transform: usize,
    /// Matches skipped for having fewer than `min_points` pairs.
    pub matches_below_min_points: usize,
    pub warnings: Vec<IntegrityWarning>,
}

impl ResidualStatistics {
    pub fn tile(&self, tile_id: &str) -> Option<&TileResidualStats> {
        self.tiles.get(tile_id)
    }

    /// Total number of samples over all tiles.
    pub fn num_samples(&self) -> usize {
        self.tiles.values().map(|t| t.len()).sum()
    }

    /// All positions and residuals concatenated in tile-id order.
    pub fn flatten(&self) -> (Vec<Point2>, Vec<f64>) {
        let n = self.num_samples();
        let mut positions = Vec::with_capacity(n);
        let mut residuals = Vec::with_capacity(n);
        for stats in self.tiles.values() {
            positions.extend_from_slice(&stats.positions);
            residuals.extend_from_slice(&stats.residuals);
        }
        (positions, residuals)
    }
}

/// Compute per-tile residual statistics for one section.
///
/// A match contributes only if both point arrays have equal length, it has
/// at least `config.min_points` pairs, and both tile ids have a transform
/// in `transforms`. Matches referencing tiles without transforms are
/// skipped silently (they may point outside the section). Point-count
/// mismatches, in the match itself or in a transform's output, skip the
/// match and are recorded as [`IntegrityWarning`]s.
pub fn compute_residual_stats(
    transforms: &TransformMap,
    matches: &[PointMatch],
    config: &ResidualConfig,
) -> ResidualStatistics {
    let mut stats = ResidualStatistics::default();

    for m in matches {
        if let Err(w) = m.check() {
            warn!("skipping point match: {}", w);
            stats.warnings.push(w);
            continue;
        }
        let n = m.len();
        if n == 0 || n < config.min_points {
            stats.matches_below_min_points += 1;
            continue;
        }
        let (Some(t_p), Some(t_q)) = (transforms.get(&m.p_id), transforms.get(&m.q_id)) else {
            stats.matches_missing_transform += 1;
            continue;
        };

        let mapped_p = t_p.apply(&m.p);
        let mapped_q = t_q.apply(&m.q);
        let short_side = if mapped_p.len() != n {
            Some((&m.p_id, mapped_p.len()))
        } else if mapped_q.len() != n {
            Some((&m.q_id, mapped_q.len()))
        } else {
            None
        };
        if let Some((tile_id, got)) = short_side {
            let w = IntegrityWarning::TransformOutputLength {
                tile_id: tile_id.clone(),
                expected: n,
                got,
            };
            warn!("skipping point match: {}", w);
            stats.warnings.push(w);
            continue;
        }

        let mut positions = Vec::with_capacity(n);
        let mut residuals = Vec::with_capacity(n);
        let mut rmse = Vec::with_capacity(n);
        for (a, b) in mapped_p.iter().zip(mapped_q.iter()) {
            positions.push(Point2::new(0.5 * (a.x + b.x), 0.5 * (a.y + b.y)));
            let d_sq = (*a - *b).norm_squared();
            residuals.push(d_sq.sqrt());
            rmse.push((d_sq / n as f64).sqrt());
        }

        stats
            .tiles
            .entry(m.p_id.clone())
            .or_default()
            .extend_from(&positions, &residuals, &rmse);
        if config.attribution == ResidualAttribution::BothSides {
            stats
                .tiles
                .entry(m.q_id.clone())
                .or_default()
                .extend_from(&positions, &residuals, &rmse);
        }
        stats.matches_used += 1;
    }

    stats.tiles.retain(|_, t| !t.is_empty());

    debug!(
        "Residuals: {} matches used, {} missing transforms, {} below min points, {} tiles with samples",
        stats.matches_used,
        stats.matches_missing_transform,
        stats.matches_below_min_points,
        stats.tiles.len()
    );

    stats
}
