//! Collaborator boundary: where tile geometry, point matches and transforms
//! come from.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::point_match::PointMatch;
use crate::tile::TileRecord;
use crate::transform::Transform;
use crate::ZValue;

/// Which of the two compared layouts of a section to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StitchState {
    /// Reference layout before the montage solver ran.
    Pre,
    /// Layout produced by the montage solver.
    Post,
}

/// Supplies the data of one section to the analysis.
///
/// Implementations typically wrap a remote tile-metadata service. Calls for
/// different sections are made concurrently from worker threads, so the
/// source must be `Send + Sync`. Any retry policy belongs here, not in the
/// analysis.
pub trait SectionSource: Send + Sync {
    /// Tile records of section `z` in the given state.
    fn tile_records(&self, state: StitchState, z: ZValue) -> Result<Vec<TileRecord>>;

    /// Point matches within one tile group.
    fn point_matches(&self, group_id: &str) -> Result<Vec<PointMatch>>;

    /// Local-to-montage transform of a post-stitch tile, if it has one.
    fn resolve_transform(&self, tile: &TileRecord) -> Option<Arc<dyn Transform>>;
}

/// In-memory [`SectionSource`] for fixtures and tests.
#[derive(Default, Clone)]
pub struct FixtureSource {
    tiles: HashMap<(StitchState, ZValue), Vec<TileRecord>>,
    matches: HashMap<String, Vec<PointMatch>>,
    transforms: HashMap<String, Arc<dyn Transform>>,
    failing: HashSet<ZValue>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tiles(mut self, state: StitchState, z: ZValue, tiles: Vec<TileRecord>) -> Self {
        self.tiles.insert((state, z), tiles);
        self
    }

    /// Appends to any matches already registered for the group.
    pub fn with_matches(mut self, group_id: impl Into<String>, matches: Vec<PointMatch>) -> Self {
        self.matches.entry(group_id.into()).or_default().extend(matches);
        self
    }

    pub fn with_transform(mut self, tile_id: impl Into<String>, transform: impl Transform + 'static) -> Self {
        self.transforms.insert(tile_id.into(), Arc::new(transform));
        self
    }

    /// Every fetch for section `z` fails.
    pub fn fail_section(mut self, z: ZValue) -> Self {
        self.failing.insert(z);
        self
    }

    /// Sorted z values that have post-stitch tiles.
    pub fn post_z_values(&self) -> Vec<ZValue> {
        let zs: BTreeSet<ZValue> = self
            .tiles
            .keys()
            .filter(|(state, _)| *state == StitchState::Post)
            .map(|&(_, z)| z)
            .collect();
        zs.into_iter().collect()
    }
}

impl SectionSource for FixtureSource {
    fn tile_records(&self, state: StitchState, z: ZValue) -> Result<Vec<TileRecord>> {
        if self.failing.contains(&z) {
            return Err(anyhow!("tile service unavailable for z={}", z));
        }
        Ok(self.tiles.get(&(state, z)).cloned().unwrap_or_default())
    }

    fn point_matches(&self, group_id: &str) -> Result<Vec<PointMatch>> {
        Ok(self.matches.get(group_id).cloned().unwrap_or_default())
    }

    fn resolve_transform(&self, tile: &TileRecord) -> Option<Arc<dyn Transform>> {
        self.transforms.get(&tile.tile_id).cloned()
    }
}
