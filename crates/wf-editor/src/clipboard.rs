//! Copy/paste of node subsets.
//!
//! A copy captures the resolved nodes plus the connections running
//! between them. Pasting re-IDs everything, offsets each successive paste
//! by another +20/+20, and selects the result.

use crate::engine::WorkflowEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wf_core::{Connection, DUPLICATE_OFFSET, Node, NodeId, Workflow};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    #[serde(skip)]
    pastes: u32,
}

impl Clipboard {
    pub fn copy(workflow: &Workflow, ids: &[NodeId]) -> Self {
        let nodes: Vec<Node> = workflow
            .nodes()
            .iter()
            .filter(|n| ids.contains(&n.id))
            .cloned()
            .collect();
        let inside = |id: NodeId| nodes.iter().any(|n| n.id == id);
        let connections = workflow
            .connections()
            .iter()
            .filter(|c| inside(c.from) && inside(c.to))
            .cloned()
            .collect();
        Self {
            nodes,
            connections,
            pastes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Insert fresh copies into `engine` and select them. Returns the new IDs.
    pub fn paste(&mut self, engine: &mut WorkflowEngine) -> Vec<NodeId> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        self.pastes += 1;
        let offset = DUPLICATE_OFFSET * f64::from(self.pastes);

        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(self.nodes.len());
        let mut pasted = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let id = engine.workflow().fresh_node_id("node");
            remap.insert(node.id, id);
            engine.add_node(Node {
                id,
                position: node.position.offset(offset, offset),
                ..node.clone()
            });
            pasted.push(id);
        }
        for c in &self.connections {
            if let (Some(&from), Some(&to)) = (remap.get(&c.from), remap.get(&c.to)) {
                engine.add_connection(from, to, Some(c.kind), None, c.label.clone());
            }
        }

        log::debug!("pasted {} node(s), {} connection(s)", pasted.len(), self.connections.len());
        engine.state.selection.set_selected(pasted.clone());
        pasted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wf_core::Position;

    fn engine() -> WorkflowEngine {
        let mut engine = WorkflowEngine::default();
        for (id, x) in [("cp_a", 0.0), ("cp_b", 100.0), ("cp_c", 200.0)] {
            engine.add_node(Node::new(NodeId::intern(id), "http", id, Position::new(x, 0.0)));
        }
        let id = |s| NodeId::intern(s);
        engine.add_connection(id("cp_a"), id("cp_b"), None, None, Some("ab".into()));
        engine.add_connection(id("cp_b"), id("cp_c"), None, None, None);
        engine
    }

    #[test]
    fn copy_keeps_only_internal_connections() {
        let engine = engine();
        let clip = Clipboard::copy(engine.workflow(), &[NodeId::intern("cp_a"), NodeId::intern("cp_b")]);
        assert_eq!(clip.len(), 2);
        assert_eq!(clip.connections.len(), 1);
        assert_eq!(clip.connections[0].label.as_deref(), Some("ab"));
    }

    #[test]
    fn paste_remaps_and_offsets() {
        let mut engine = engine();
        let mut clip = Clipboard::copy(engine.workflow(), &[NodeId::intern("cp_a"), NodeId::intern("cp_b")]);

        let first = clip.paste(&mut engine);
        assert_eq!(first.len(), 2);
        assert_eq!(engine.state.selection.selected, first);
        let a_copy = engine.workflow().node(first[0]).unwrap();
        assert_eq!(a_copy.position, Position::new(20.0, 20.0));
        assert_eq!(a_copy.name, "cp_a");

        let pasted_edge: Vec<_> = engine
            .workflow()
            .connections()
            .iter()
            .filter(|c| c.from == first[0])
            .collect();
        assert_eq!(pasted_edge.len(), 1);
        assert_eq!(pasted_edge[0].to, first[1]);

        let second = clip.paste(&mut engine);
        assert_eq!(
            engine.workflow().node(second[0]).unwrap().position,
            Position::new(40.0, 40.0)
        );
        assert!(engine.workflow().dangling_connections().is_empty());
    }

    #[test]
    fn empty_clipboard_is_noop() {
        let mut engine = engine();
        let before = engine.snapshot();
        assert!(Clipboard::default().paste(&mut engine).is_empty());
        assert!(engine.snapshot().ptr_eq(&before));
    }
}
