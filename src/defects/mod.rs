//! Montage defect detectors.
//!
//! Each detector works on the data of a single section and builds its own
//! spatial index and graph, so detectors can run concurrently for different
//! sections without sharing state.
//!
//! - [`detect_disconnected_tiles`]: holes, tiles lost during stitching.
//! - [`detect_stitching_gaps`]: tiles whose overlap count dropped.
//! - [`detect_seams`]: clusters of high point-match residuals.

pub mod disconnected;
pub mod gaps;
pub mod seams;

pub use disconnected::detect_disconnected_tiles;
pub use gaps::{detect_stitching_gaps, detect_stitching_gaps_detailed, GapDetection};
pub use seams::{cluster_seams, detect_seams, SeamCluster};

use crate::error::ConfigError;

/// Parameters for seam detection.
#[derive(Debug, Clone)]
pub struct SeamConfig {
    /// Positions whose residual is at least this value (pixels) are kept.
    /// Default 8.0.
    pub residual_threshold: f64,
    /// Two kept positions within this distance (pixels) are linked.
    /// Default 60.0.
    pub proximity_radius: f64,
    /// Components must have strictly more members than this to count as a
    /// seam. Must be positive. Default 15.
    pub min_cluster_size: usize,
}

impl Default for SeamConfig {
    fn default() -> Self {
        Self {
            residual_threshold: 8.0,
            proximity_radius: 60.0,
            min_cluster_size: 15,
        }
    }
}

impl SeamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.residual_threshold.is_finite() {
            return Err(ConfigError::ResidualThreshold(self.residual_threshold));
        }
        if !self.proximity_radius.is_finite() || self.proximity_radius < 0.0 {
            return Err(ConfigError::ProximityRadius(self.proximity_radius));
        }
        if self.min_cluster_size == 0 {
            return Err(ConfigError::MinClusterSize);
        }
        Ok(())
    }
}
