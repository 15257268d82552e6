#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::doc::{Document, NodeId};
use crate::geometry::{Point, Rect};

/// Nodes whose full bounding box lies inside `rect`, in id order.
///
/// Partial overlap does not count.
#[must_use]
pub fn nodes_in_rect(doc: &Document, rect: &Rect) -> Vec<NodeId> {
    doc.nodes.values().filter(|node| rect.contains_rect(&node.bounds())).map(|node| node.id.clone()).collect()
}

/// Topmost node under `world_pt`. Later ids draw on top.
#[must_use]
pub fn node_at(doc: &Document, world_pt: Point) -> Option<NodeId> {
    doc.nodes
        .values()
        .rev()
        .find(|node| {
            let b = node.bounds();
            world_pt.x >= b.min.x && world_pt.x <= b.max.x && world_pt.y >= b.min.y && world_pt.y <= b.max.y
        })
        .map(|node| node.id.clone())
}
