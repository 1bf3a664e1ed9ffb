//! Hit testing: canvas point → node / connection lookup.
//!
//! Later entries in a store paint on top, so lookups walk the stores in
//! reverse. Connections are approximated by the straight segment between
//! their endpoints' centers.

use crate::geometry::{Bounds, Position};
use crate::id::{ConnectionId, NodeId};
use crate::workflow::Workflow;

/// Topmost node whose bounds contain `point`.
pub fn node_at(workflow: &Workflow, point: Position) -> Option<NodeId> {
    workflow
        .nodes()
        .iter()
        .rev()
        .find(|n| n.bounds().contains(point))
        .map(|n| n.id)
}

/// Every node whose bounds intersect `rect`, in store order.
/// Used for marquee selection.
pub fn nodes_in_rect(workflow: &Workflow, rect: Bounds) -> Vec<NodeId> {
    workflow
        .nodes()
        .iter()
        .filter(|n| n.bounds().intersects(&rect))
        .map(|n| n.id)
        .collect()
}

/// Topmost connection passing within `tolerance` of `point`.
pub fn connection_at(workflow: &Workflow, point: Position, tolerance: f64) -> Option<ConnectionId> {
    workflow.connections().iter().rev().find_map(|c| {
        let from = workflow.node(c.from)?.bounds().center();
        let to = workflow.node(c.to)?.bounds().center();
        (point.distance_to_segment(from, to) <= tolerance).then_some(c.id)
    })
}
