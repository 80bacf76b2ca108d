//! Section analysis: run every defect detector for each requested z value
//! and aggregate the verdicts.
//!
//! Sections are independent. Each is analyzed on a worker of a dedicated
//! rayon pool against its own freshly built indices and graphs; the only
//! shared step is collecting the finished outcomes, which are then keyed by
//! z so the report never depends on completion order.
//!
//! A fetch failure, or a panic inside a collaborator-supplied transform, is
//! recorded as a [`SectionFailure`] for that section and does not affect the
//! others. Configuration errors abort the whole run
//! before any section is fetched.

pub mod source;

pub use source::{FixtureSource, SectionSource, StitchState};

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::defects::{cluster_seams, detect_disconnected_tiles, detect_stitching_gaps_detailed};
use crate::defects::{SeamCluster, SeamConfig};
use crate::error::{AnalysisError, ConfigError, IntegrityWarning};
use crate::residuals::{compute_residual_stats, ResidualConfig};
use crate::transform::TransformMap;
use crate::{Point2, ZValue};

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters for a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub residual: ResidualConfig,
    pub seam: SeamConfig,
    /// Number of worker threads. Default 20.
    pub pool_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            residual: ResidualConfig::default(),
            seam: SeamConfig::default(),
            pool_size: 20,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.residual.validate()?;
        self.seam.validate()?;
        if self.pool_size == 0 {
            return Err(ConfigError::PoolSize);
        }
        Ok(())
    }
}

// ── Results ─────────────────────────────────────────────────────────────────

/// Defects found in one section.
#[derive(Debug, Clone, Default)]
pub struct SectionVerdict {
    pub z: ZValue,
    /// Holes: tiles lost during stitching, in pre-stitch order.
    pub disconnected_tile_ids: Vec<String>,
    /// Tiles whose overlap count dropped, in pre-stitch order.
    pub gap_tile_ids: Vec<String>,
    /// One centroid per seam cluster, largest cluster first.
    pub seam_centroids: Vec<Point2>,
    pub seam_clusters: Vec<SeamCluster>,
    /// Number of tiles that received residual samples.
    pub tiles_with_residuals: usize,
    /// Number of point matches that contributed residual samples.
    pub matches_used: usize,
    /// Records skipped while analyzing this section.
    pub warnings: Vec<IntegrityWarning>,
}

impl SectionVerdict {
    pub fn has_holes(&self) -> bool {
        !self.disconnected_tile_ids.is_empty()
    }

    pub fn has_gaps(&self) -> bool {
        !self.gap_tile_ids.is_empty()
    }

    pub fn has_seams(&self) -> bool {
        !self.seam_centroids.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_holes() && !self.has_gaps() && !self.has_seams()
    }
}

/// A section whose data could not be fetched or whose analysis panicked.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionFailure {
    pub z: ZValue,
    /// Full error chain of the failed fetch, or the panic message.
    pub message: String,
}

/// Aggregate over all requested sections.
///
/// Every requested z lands in exactly one of `clean_sections`,
/// `failed_sections`, `cancelled_sections`, or at least one of the three
/// defect sets (which may overlap).
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub hole_sections: BTreeSet<ZValue>,
    pub gap_sections: BTreeSet<ZValue>,
    pub seam_sections: BTreeSet<ZValue>,
    pub clean_sections: BTreeSet<ZValue>,
    pub failed_sections: BTreeSet<ZValue>,
    /// Sections never started because the run was cancelled.
    pub cancelled_sections: BTreeSet<ZValue>,
    pub verdicts: BTreeMap<ZValue, SectionVerdict>,
    pub failures: BTreeMap<ZValue, SectionFailure>,
}

impl AnalysisReport {
    /// Seam centroids of section `z`; empty unless it is a seam section.
    pub fn seam_centroids(&self, z: ZValue) -> &[Point2] {
        self.verdicts
            .get(&z)
            .map(|v| v.seam_centroids.as_slice())
            .unwrap_or(&[])
    }

    /// True when every requested section was analyzed and found clean.
    pub fn qc_passed(&self) -> bool {
        self.hole_sections.is_empty()
            && self.gap_sections.is_empty()
            && self.seam_sections.is_empty()
            && self.failed_sections.is_empty()
            && self.cancelled_sections.is_empty()
    }

    fn record(&mut self, z: ZValue, outcome: SectionOutcome) {
        match outcome {
            SectionOutcome::Done(verdict) => {
                if verdict.has_holes() {
                    self.hole_sections.insert(z);
                }
                if verdict.has_gaps() {
                    self.gap_sections.insert(z);
                }
                if verdict.has_seams() {
                    self.seam_sections.insert(z);
                }
                if verdict.is_clean() {
                    self.clean_sections.insert(z);
                }
                self.verdicts.insert(z, verdict);
            }
            SectionOutcome::Failed(failure) => {
                self.failed_sections.insert(z);
                self.failures.insert(z, failure);
            }
            SectionOutcome::Cancelled => {
                self.cancelled_sections.insert(z);
            }
        }
    }
}

enum SectionOutcome {
    Done(SectionVerdict),
    Failed(SectionFailure),
    Cancelled,
}

// ── Section selection ───────────────────────────────────────────────────────

/// Sections of `available` inside the inclusive range `min_z..=max_z`,
/// sorted and deduplicated.
pub fn select_z_values(
    available: &[ZValue],
    min_z: ZValue,
    max_z: ZValue,
) -> Result<Vec<ZValue>, ConfigError> {
    let selected: BTreeSet<ZValue> = available
        .iter()
        .copied()
        .filter(|z| (min_z..=max_z).contains(z))
        .collect();
    if selected.is_empty() {
        return Err(ConfigError::NoSections { min_z, max_z });
    }
    Ok(selected.into_iter().collect())
}

// ── Single section ──────────────────────────────────────────────────────────

/// Fetch and analyze one section.
///
/// Residuals are computed from the point matches of every group present in
/// the post-stitch layout, mapped through the post-stitch tile transforms.
/// Only fetch errors are returned; bad records become warnings on the
/// verdict.
pub fn analyze_section<S>(z: ZValue, source: &S, config: &AnalysisConfig) -> Result<SectionVerdict>
where
    S: SectionSource + ?Sized,
{
    let pre_tiles = source
        .tile_records(StitchState::Pre, z)
        .with_context(|| format!("fetching pre-stitch tiles for z={z}"))?;
    let post_tiles = source
        .tile_records(StitchState::Post, z)
        .with_context(|| format!("fetching post-stitch tiles for z={z}"))?;

    let groups: BTreeSet<&str> = post_tiles.iter().map(|t| t.group_id.as_str()).collect();
    let mut matches = Vec::new();
    for group in &groups {
        let group_matches = source
            .point_matches(group)
            .with_context(|| format!("fetching point matches for group {group} (z={z})"))?;
        matches.extend(group_matches);
    }

    let transforms: TransformMap = post_tiles
        .iter()
        .filter_map(|t| source.resolve_transform(t).map(|tf| (t.tile_id.clone(), tf)))
        .collect();

    debug!(
        "z={}: {} pre tiles, {} post tiles, {} groups, {} matches, {} transforms",
        z,
        pre_tiles.len(),
        post_tiles.len(),
        groups.len(),
        matches.len(),
        transforms.len()
    );

    let stats = compute_residual_stats(&transforms, &matches, &config.residual);
    let disconnected_tile_ids = detect_disconnected_tiles(&pre_tiles, &post_tiles);
    let gaps = detect_stitching_gaps_detailed(&pre_tiles, &post_tiles);
    let (positions, residuals) = stats.flatten();
    let seam_clusters = cluster_seams(&positions, &residuals, &config.seam);

    let mut warnings = stats.warnings;
    warnings.extend(gaps.warnings);

    Ok(SectionVerdict {
        z,
        disconnected_tile_ids,
        gap_tile_ids: gaps.gap_tile_ids,
        seam_centroids: seam_clusters.iter().map(|c| c.centroid).collect(),
        seam_clusters,
        tiles_with_residuals: stats.tiles.len(),
        matches_used: stats.matches_used,
        warnings,
    })
}

// ── Many sections ───────────────────────────────────────────────────────────

/// Analyze every section in `z_values` on a pool of `config.pool_size`
/// workers.
pub fn analyze_sections<S>(
    z_values: &[ZValue],
    source: &S,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError>
where
    S: SectionSource + ?Sized,
{
    analyze_sections_with_cancel(z_values, source, config, &AtomicBool::new(false))
}

/// Same as [`analyze_sections`], checking `cancel` before each section.
///
/// Once `cancel` is set, sections that have not started are reported in
/// [`AnalysisReport::cancelled_sections`]. Sections already running always
/// finish, so no verdict is ever partial.
pub fn analyze_sections_with_cancel<S>(
    z_values: &[ZValue],
    source: &S,
    config: &AnalysisConfig,
    cancel: &AtomicBool,
) -> Result<AnalysisReport, AnalysisError>
where
    S: SectionSource + ?Sized,
{
    config.validate()?;

    let sections: Vec<ZValue> = z_values
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(
        "Analyzing {} sections with {} workers",
        sections.len(),
        config.pool_size
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.pool_size)
        .build()?;

    let outcomes: Vec<(ZValue, SectionOutcome)> = pool.install(|| {
        sections
            .par_iter()
            .map(|&z| {
                if cancel.load(Ordering::Acquire) {
                    return (z, SectionOutcome::Cancelled);
                }
                // a panicking collaborator transform fails only its own section
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    analyze_section(z, source, config)
                }))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!(
                        "section analysis panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });
                let outcome = match result {
                    Ok(verdict) => {
                        info!(
                            "z={}: {} holes, {} gap tiles, {} seams",
                            z,
                            verdict.disconnected_tile_ids.len(),
                            verdict.gap_tile_ids.len(),
                            verdict.seam_centroids.len()
                        );
                        SectionOutcome::Done(verdict)
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        warn!("z={}: section failed: {}", z, message);
                        SectionOutcome::Failed(SectionFailure { z, message })
                    }
                };
                (z, outcome)
            })
            .collect()
    });

    let mut report = AnalysisReport::default();
    for (z, outcome) in outcomes {
        report.record(z, outcome);
    }

    info!(
        "Analysis complete: {} hole, {} gap, {} seam, {} clean, {} failed, {} cancelled",
        report.hole_sections.len(),
        report.gap_sections.len(),
        report.seam_sections.len(),
        report.clean_sections.len(),
        report.failed_sections.len(),
        report.cancelled_sections.len()
    );

    Ok(report)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
