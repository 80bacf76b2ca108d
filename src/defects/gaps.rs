//! Stitching-gap detection by overlap-graph degree comparison.
//!
//! 1. Index the pre-stitch boxes and build graph G1: an edge joins two tiles
//!    whose boxes overlap. A tile's degree is its pre-stitch overlap count.
//! 2. Index the post-stitch boxes of tiles present in both states and build
//!    G2 the same way. Nodes keep the ids assigned from the pre-stitch
//!    enumeration, so degrees compare position for position.
//! 3. Every shared tile whose G1 degree exceeds its G2 degree lost an
//!    overlap during stitching and is reported as a gap tile.
//!
//! Tiles removed entirely by stitching are holes, not gaps, and are never
//! reported here.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::IntegrityWarning;
use crate::graph::AdjacencyGraph;
use crate::spatial_index::GridIndex;
use crate::tile::{BoundingBox, TileRecord};

/// Gap tiles plus diagnostics.
#[derive(Debug, Clone, Default)]
pub struct GapDetection {
    /// In pre-stitch order.
    pub gap_tile_ids: Vec<String>,
    /// Edge count of the pre-stitch overlap graph.
    pub pre_edges: usize,
    /// Edge count of the post-stitch overlap graph (shared tiles only).
    pub post_edges: usize,
    /// Tiles skipped for degenerate boxes or repeated ids.
    pub warnings: Vec<IntegrityWarning>,
}

/// Ids of tiles, present in both states, that overlap fewer neighbours
/// after stitching than before.
pub fn detect_stitching_gaps(pre_tiles: &[TileRecord], post_tiles: &[TileRecord]) -> Vec<String> {
    detect_stitching_gaps_detailed(pre_tiles, post_tiles).gap_tile_ids
}

/// Same as [`detect_stitching_gaps`], also returning graph sizes and the
/// integrity warnings for skipped tiles.
pub fn detect_stitching_gaps_detailed(
    pre_tiles: &[TileRecord],
    post_tiles: &[TileRecord],
) -> GapDetection {
    let mut warnings = Vec::new();

    // ── Pre-stitch enumeration: node id = index into pre_tiles ──
    let mut pre_node: HashMap<&str, usize> = HashMap::with_capacity(pre_tiles.len());
    let mut pre_nodes: Vec<usize> = Vec::with_capacity(pre_tiles.len());
    for (i, tile) in pre_tiles.iter().enumerate() {
        let seen = pre_node.contains_key(tile.tile_id.as_str());
        if !accept_tile(tile, seen, &mut warnings) {
            continue;
        }
        pre_node.insert(tile.tile_id.as_str(), i);
        pre_nodes.push(i);
    }
    let g1 = overlap_graph(
        pre_tiles.len(),
        pre_nodes.iter().map(|&i| (i, pre_tiles[i].bbox)).collect(),
    );

    // ── Post-stitch boxes for shared tiles, under pre-stitch node ids ──
    let mut post_seen: HashSet<&str> = HashSet::with_capacity(post_tiles.len());
    let mut shared: Vec<(usize, BoundingBox)> = Vec::new();
    for tile in post_tiles {
        let seen = post_seen.contains(tile.tile_id.as_str());
        if !accept_tile(tile, seen, &mut warnings) {
            continue;
        }
        post_seen.insert(tile.tile_id.as_str());
        if let Some(&node) = pre_node.get(tile.tile_id.as_str()) {
            shared.push((node, tile.bbox));
        }
    }
    shared.sort_unstable_by_key(|&(node, _)| node);
    let shared_nodes: Vec<usize> = shared.iter().map(|&(node, _)| node).collect();
    let g2 = overlap_graph(pre_tiles.len(), shared);

    let gap_tile_ids: Vec<String> = shared_nodes
        .into_iter()
        .filter(|&node| g1.degree(node) > g2.degree(node))
        .map(|node| pre_tiles[node].tile_id.clone())
        .collect();

    debug!(
        "Gaps: {} pre edges, {} post edges, {} gap tiles",
        g1.edge_count(),
        g2.edge_count(),
        gap_tile_ids.len()
    );

    GapDetection {
        gap_tile_ids,
        pre_edges: g1.edge_count(),
        post_edges: g2.edge_count(),
        warnings,
    }
}

/// Reject degenerate boxes and repeated ids, recording why.
fn accept_tile(tile: &TileRecord, seen: bool, warnings: &mut Vec<IntegrityWarning>) -> bool {
    let warning = if tile.bbox.is_degenerate() {
        IntegrityWarning::DegenerateBox {
            tile_id: tile.tile_id.clone(),
        }
    } else if seen {
        IntegrityWarning::DuplicateTile {
            tile_id: tile.tile_id.clone(),
        }
    } else {
        return true;
    };
    warn!("skipping tile in overlap graph: {}", warning);
    warnings.push(warning);
    false
}

/// Overlap graph over `n` nodes from `(node, box)` entries.
fn overlap_graph(n: usize, entries: Vec<(usize, BoundingBox)>) -> AdjacencyGraph {
    let mut graph = AdjacencyGraph::new(n);
    if entries.is_empty() {
        return graph;
    }
    let cell_size = typical_extent(entries.iter().map(|(_, b)| b));
    let (nodes, boxes): (Vec<usize>, Vec<BoundingBox>) = entries.into_iter().unzip();
    let index = GridIndex::new(boxes, cell_size);
    for (entry, &node) in nodes.iter().enumerate() {
        for other in index.query_intersecting(&index.boxes[entry]) {
            graph.add_edge(node, nodes[other]);
        }
    }
    graph
}

/// Mean of the larger box side, used as the grid cell size.
fn typical_extent<'a>(boxes: impl Iterator<Item = &'a BoundingBox>) -> f64 {
    let (sum, count) = boxes.fold((0.0, 0usize), |(s, c), b| {
        (s + b.width().max(b.height()), c + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
