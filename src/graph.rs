//! Minimal undirected graph utilities.
//!
//! - [`UnionFind`]: disjoint sets with path compression, used to extract
//!   connected components.
//! - [`AdjacencyGraph`]: deduplicated adjacency lists over integer node ids,
//!   used for node-degree comparisons.
//!
//! Self-loops are never stored.

use std::collections::BTreeSet;

/// Disjoint-set forest over `0..n`.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find root with path compression (halving).
    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            self.parent[x as usize] = self.parent[self.parent[x as usize] as usize];
            x = self.parent[x as usize];
        }
        x
    }

    /// Merge the sets holding `a` and `b`. Returns `false` if already joined.
    pub fn union(&mut self, a: u32, b: u32) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        // Merge smaller into larger; ties keep the lower root
        let (root, child) = match self.size[ra as usize].cmp(&self.size[rb as usize]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => (ra.min(rb), ra.max(rb)),
        };
        self.parent[child as usize] = root;
        self.size[root as usize] += self.size[child as usize];
        true
    }

    /// Connected components as lists of members.
    ///
    /// Members are ascending within a component; components are ordered by
    /// their smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut slot_for_root = vec![u32::MAX; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = self.find(i as u32) as usize;
            if slot_for_root[root] == u32::MAX {
                slot_for_root[root] = groups.len() as u32;
                groups.push(Vec::new());
            }
            groups[slot_for_root[root] as usize].push(i);
        }
        groups
    }
}

/// Undirected simple graph on nodes `0..n`.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    neighbors: Vec<BTreeSet<usize>>,
}

impl AdjacencyGraph {
    /// Graph with `n` isolated nodes.
    pub fn new(n: usize) -> Self {
        Self {
            neighbors: vec![BTreeSet::new(); n],
        }
    }

    /// Number of nodes, including isolated ones.
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(|s| s.len()).sum::<usize>() / 2
    }

    /// Add the edge `a`-`b`. Self-loops and repeated edges are ignored.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.neighbors[a].insert(b);
        self.neighbors[b].insert(a);
    }

    /// Number of neighbours of `node`; 0 for nodes outside the graph.
    pub fn degree(&self, node: usize) -> usize {
        self.neighbors.get(node).map_or(0, |s| s.len())
    }

    /// Neighbours of `node` in ascending order; empty for nodes outside
    /// the graph.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors
            .get(node)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }
}
