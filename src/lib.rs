//! # montage_qc
//!
//! Structural quality control for stitched electron-microscopy montages.
//!
//! A section (all tiles sharing one z value) is compared in two states: the
//! tile layout *before* stitching and the layout *after* the montage solver
//! has placed every tile. Three kinds of defects are reported per section:
//!
//! - **Holes**: tiles present before stitching that are missing afterwards.
//! - **Gaps**: tiles that overlapped fewer neighbours after stitching than
//!   before, i.e. the solver pulled previously touching tiles apart.
//! - **Seams**: spatially clustered point-match residuals above a threshold,
//!   marking regions of locally poor alignment.
//!
//! The crate does no network I/O. Tile geometry, point matches and tile
//! transforms come from a [`SectionSource`] supplied by the caller.
//!
//! ## Example
//!
//! ```no_run
//! use montage_qc::{analyze_sections, AnalysisConfig, FixtureSource};
//!
//! let source = FixtureSource::new();
//! // ... populate pre/post tiles, matches and transforms ...
//! let report = analyze_sections(&[1028, 1029], &source, &AnalysisConfig::default()).unwrap();
//! for z in &report.seam_sections {
//!     println!("seam in section {z}: {:?}", report.seam_centroids(*z));
//! }
//! ```
//!
//! ## Pipeline overview
//!
//! 1. **Residuals**: map both sides of every point match through their tile
//!    transforms and record per-pair midpoints and distances
//!    ([`compute_residual_stats`]).
//! 2. **Disconnection**: id set difference pre − post
//!    ([`detect_disconnected_tiles`]).
//! 3. **Gaps**: bounding-box overlap graphs before and after stitching,
//!    compared by node degree ([`detect_stitching_gaps`]).
//! 4. **Seams**: threshold residual positions, link neighbours within a
//!    radius, keep large connected components ([`detect_seams`]).
//! 5. **Orchestration**: run 1-4 for every section on a worker pool and
//!    aggregate the verdicts by z ([`analyze_sections`]).

pub mod analysis;
pub mod defects;
mod error;
pub mod graph;
pub mod point_match;
pub mod residuals;
pub mod spatial_index;
pub mod tile;
pub mod transform;

pub use analysis::{
    analyze_section, analyze_sections, analyze_sections_with_cancel, select_z_values,
    AnalysisConfig, AnalysisReport, FixtureSource, SectionFailure, SectionSource,
    SectionVerdict, StitchState,
};
pub use defects::{
    cluster_seams, detect_disconnected_tiles, detect_seams, detect_stitching_gaps, SeamCluster,
    SeamConfig,
};
pub use error::{AnalysisError, ConfigError, IntegrityWarning};
pub use point_match::PointMatch;
pub use residuals::{
    compute_residual_stats, ResidualAttribution, ResidualConfig, ResidualStatistics,
    TileResidualStats,
};
pub use tile::{BoundingBox, TileRecord};
pub use transform::{AffineModel, PolynomialModel, TileTransform, Transform, TransformMap};

// Commonly used types.
// Montage coordinates routinely exceed 1e5 px, so everything is 64-bit.
pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Section index. Sections are addressed by integral z values.
pub type ZValue = i64;
