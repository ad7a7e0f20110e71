//! Nearest-node lookup for road graphs.
//!
//! Node positions are projected onto the unit sphere and stored in a KD-tree
//! (k=3). Nodes sharing an exact position collapse to one tree entry that
//! remembers the lowest node id, which keeps the tree free of duplicate
//! points and gives the deterministic tie-break for free.

use std::collections::HashMap;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

use crate::distance::{great_circle_m, unit_sphere};
use crate::graph::NodeId;

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Relative slack used when collecting candidates tied with the nearest hit.
const TIE_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct IndexedPosition {
    lat: f64,
    lon: f64,
    node: NodeId,
}

/// Spatial index answering "which node is closest to this coordinate".
pub struct NodeLocator {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    positions: Vec<IndexedPosition>,
}

impl NodeLocator {
    /// Build a locator from `(node id, latitude, longitude)` triples.
    pub fn build<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, f64, f64)>,
    {
        let mut by_position: HashMap<(u64, u64), usize> = HashMap::new();
        let mut positions: Vec<IndexedPosition> = Vec::new();

        for (node, lat, lon) in nodes {
            let key = (lat.to_bits(), lon.to_bits());
            match by_position.get(&key) {
                Some(&index) => {
                    let existing = &mut positions[index];
                    existing.node = existing.node.min(node);
                }
                None => {
                    by_position.insert(key, positions.len());
                    positions.push(IndexedPosition { lat, lon, node });
                }
            }
        }

        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (index, position) in positions.iter().enumerate() {
            tree.add(&unit_sphere(position.lat, position.lon), index);
        }

        Self { tree, positions }
    }

    /// Number of distinct indexed positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Node closest to `(lat, lon)` by great-circle distance.
    ///
    /// Among nodes at exactly the minimum distance the lowest id wins.
    /// Returns `None` only for an empty locator.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<NodeId> {
        if self.positions.is_empty() {
            return None;
        }

        let query = unit_sphere(lat, lon);
        let best = self
            .tree
            .nearest_n::<SquaredEuclidean>(&query, 1)
            .into_iter()
            .next()?;

        let radius = best.distance * (1.0 + TIE_SLACK) + f64::MIN_POSITIVE;
        let candidates = self.tree.within::<SquaredEuclidean>(&query, radius);

        candidates
            .into_iter()
            .map(|neighbour| {
                let position = self.positions[neighbour.item];
                (
                    great_circle_m(lat, lon, position.lat, position.lon),
                    position.node,
                )
            })
            .chain(std::iter::once({
                let position = self.positions[best.item];
                (
                    great_circle_m(lat, lon, position.lat, position.lon),
                    position.node,
                )
            }))
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, node)| node)
    }
}

impl std::fmt::Debug for NodeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeLocator")
            .field("positions", &self.positions.len())
            .finish()
    }
}
