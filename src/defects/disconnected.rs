//! Hole detection: tiles present before stitching but absent afterwards.

use std::collections::HashSet;

use crate::tile::TileRecord;

/// Tile ids present in `pre_tiles` but not in `post_tiles`.
///
/// Treat the result as a set. Ids are reported once, in order of first
/// appearance in `pre_tiles`.
pub fn detect_disconnected_tiles(pre_tiles: &[TileRecord], post_tiles: &[TileRecord]) -> Vec<String> {
    let post_ids: HashSet<&str> = post_tiles.iter().map(|t| t.tile_id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(pre_tiles.len());
    pre_tiles
        .iter()
        .map(|t| t.tile_id.as_str())
        .filter(|id| !post_ids.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
