//! Multi-node alignment.
//!
//! `Left`/`Top` snap to the minimum edge, `Right`/`Bottom` to the maximum
//! far edge, `Center` to the mean horizontal center. There is no vertical
//! centering.

use crate::geometry::Position;
use crate::id::NodeId;
use crate::model::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignEdge {
    Left,
    Top,
    Right,
    Bottom,
    Center,
}

impl AlignEdge {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "center" => Some(Self::Center),
            _ => None,
        }
    }
}

/// Compute aligned positions for the nodes named by `ids`.
///
/// IDs that don't resolve are skipped. Returns an empty list when fewer
/// than two nodes resolve.
pub fn align_positions(nodes: &[Node], ids: &[NodeId], edge: AlignEdge) -> Vec<(NodeId, Position)> {
    let selected: Vec<&Node> = nodes.iter().filter(|n| ids.contains(&n.id)).collect();
    if selected.len() < 2 {
        return Vec::new();
    }

    let place = |f: &dyn Fn(&Node) -> Position| -> Vec<(NodeId, Position)> {
        selected.iter().map(|n| (n.id, f(n))).collect()
    };

    match edge {
        AlignEdge::Left => {
            let min = fold(&selected, f64::INFINITY, f64::min, |n| n.position.x);
            place(&|n: &Node| Position::new(min, n.position.y))
        }
        AlignEdge::Top => {
            let min = fold(&selected, f64::INFINITY, f64::min, |n| n.position.y);
            place(&|n: &Node| Position::new(n.position.x, min))
        }
        AlignEdge::Right => {
            let max = fold(&selected, f64::NEG_INFINITY, f64::max, |n| {
                n.position.x + n.width()
            });
            place(&|n: &Node| Position::new(max - n.width(), n.position.y))
        }
        AlignEdge::Bottom => {
            let max = fold(&selected, f64::NEG_INFINITY, f64::max, |n| {
                n.position.y + n.height()
            });
            place(&|n: &Node| Position::new(n.position.x, max - n.height()))
        }
        AlignEdge::Center => {
            let sum = fold(&selected, 0.0, |a, b| a + b, |n| {
                n.position.x + n.width() / 2.0
            });
            let mean = sum / selected.len() as f64;
            place(&|n: &Node| Position::new(mean - n.width() / 2.0, n.position.y))
        }
    }
}

fn fold(
    nodes: &[&Node],
    init: f64,
    combine: impl Fn(f64, f64) -> f64,
    key: impl Fn(&Node) -> f64,
) -> f64 {
    nodes.iter().fold(init, |acc, n| combine(acc, key(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, x: f64, y: f64, width: Option<f64>) -> Node {
        let mut n = Node::new(NodeId::intern(id), "action", id, Position::new(x, y));
        n.width = width;
        n
    }

    fn xs(result: &[(NodeId, Position)]) -> Vec<f64> {
        result.iter().map(|(_, p)| p.x).collect()
    }

    #[test]
    fn left_snaps_to_minimum_x() {
        let nodes = vec![
            node("l1", 50.0, 0.0, None),
            node("l2", 10.0, 5.0, None),
            node("l3", 30.0, 9.0, None),
        ];
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        let result = align_positions(&nodes, &ids, AlignEdge::Left);
        assert_eq!(xs(&result), vec![10.0, 10.0, 10.0]);
        // y untouched
        assert_eq!(result[2].1.y, 9.0);
    }

    #[test]
    fn top_snaps_to_minimum_y() {
        let nodes = vec![node("t1", 0.0, 40.0, None), node("t2", 7.0, 15.5, None)];
        let ids = [nodes[0].id, nodes[1].id];
        let result = align_positions(&nodes, &ids, AlignEdge::Top);
        assert_eq!(result[0].1, Position::new(0.0, 15.5));
        assert_eq!(result[1].1, Position::new(7.0, 15.5));
    }

    #[test]
    fn right_uses_widths_with_fallback() {
        let nodes = vec![node("r1", 0.0, 0.0, None), node("r2", 100.0, 0.0, Some(50.0))];
        let ids = [nodes[0].id, nodes[1].id];
        let result = align_positions(&nodes, &ids, AlignEdge::Right);
        assert_eq!(xs(&result), vec![80.0, 100.0]);
    }

    #[test]
    fn bottom_uses_heights() {
        let mut tall = node("b1", 0.0, 0.0, None);
        tall.height = Some(200.0);
        let nodes = vec![tall, node("b2", 0.0, 100.0, None)];
        let ids = [nodes[0].id, nodes[1].id];
        let result = align_positions(&nodes, &ids, AlignEdge::Bottom);
        assert_eq!(result[0].1.y, 0.0);
        assert_eq!(result[1].1.y, 130.0);
    }

    #[test]
    fn center_is_horizontal_mean() {
        // centers: 35 and 125 → mean 80
        let nodes = vec![node("c1", 0.0, 3.0, None), node("c2", 100.0, 4.0, Some(50.0))];
        let ids = [nodes[0].id, nodes[1].id];
        let result = align_positions(&nodes, &ids, AlignEdge::Center);
        assert_eq!(result[0].1, Position::new(45.0, 3.0));
        assert_eq!(result[1].1, Position::new(55.0, 4.0));
    }

    #[test]
    fn fewer_than_two_resolved_is_empty() {
        let nodes = vec![node("s1", 0.0, 0.0, None)];
        let ids = [nodes[0].id, NodeId::intern("missing")];
        assert!(align_positions(&nodes, &ids, AlignEdge::Left).is_empty());
        assert!(align_positions(&nodes, &[], AlignEdge::Right).is_empty());
    }

    #[test]
    fn parse_edges() {
        assert_eq!(AlignEdge::parse("bottom"), Some(AlignEdge::Bottom));
        assert_eq!(AlignEdge::parse("middle"), None);
    }
}
