//! Error and warning taxonomy.
//!
//! - [`ConfigError`]: rejected before any section is processed.
//! - [`IntegrityWarning`]: a single bad record; skipped, logged, and kept on
//!   the section verdict. Never aborts a section.
//! - [`AnalysisError`]: run-level failure returned by the orchestrator.
//!
//! Per-section fetch failures are not errors at this level; they surface as
//! [`SectionFailure`](crate::SectionFailure) entries in the report.

use thiserror::Error;

use crate::ZValue;

/// Invalid analysis parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("residual threshold must be finite, got {0}")]
    ResidualThreshold(f64),

    #[error("proximity radius must be finite and non-negative, got {0}")]
    ProximityRadius(f64),

    #[error("minimum cluster size must be positive")]
    MinClusterSize,

    #[error("minimum point count per match must be positive")]
    MinPoints,

    #[error("worker pool size must be positive")]
    PoolSize,

    #[error("no sections found in z range {min_z}..={max_z}")]
    NoSections { min_z: ZValue, max_z: ZValue },
}

/// A record skipped because its contents are inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityWarning {
    #[error("point match {p_id} -> {q_id} has {p_len} p-points but {q_len} q-points")]
    MismatchedPointCounts {
        p_id: String,
        q_id: String,
        p_len: usize,
        q_len: usize,
    },

    #[error("transform of tile {tile_id} returned {got} points for {expected} inputs")]
    TransformOutputLength {
        tile_id: String,
        expected: usize,
        got: usize,
    },

    #[error("tile {tile_id} has a degenerate bounding box")]
    DegenerateBox { tile_id: String },

    #[error("tile {tile_id} appears more than once in the same state")]
    DuplicateTile { tile_id: String },
}

/// Failure of a whole analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
