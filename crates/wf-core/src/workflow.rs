//! The node and connection stores, and every operation that mutates them.
//!
//! Both stores are `Arc<Vec<_>>` and mutate through `Arc::make_mut`: a
//! [`WorkflowSnapshot`] taken before an operation keeps the old contents,
//! so readers only ever see pre- or post-operation state. Operations that
//! resolve nothing return before touching either `Arc`, which leaves the
//! stores pointer-identical.
//!
//! Invariant: every connection's `from` and `to` name a node in the node
//! store. Node removal cascades, splitting replaces atomically, and
//! connection inserts referencing a missing node are refused.

use crate::align::{AlignEdge, align_positions};
use crate::geometry::{DUPLICATE_OFFSET, Position};
use crate::id::{ConnectionId, NodeId};
use crate::model::{Connection, ConnectionType, Node, NodePatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("connection '{connection}' references missing node '{node}'")]
    DanglingConnection { connection: String, node: String },

    #[error("invalid workflow JSON: {0}")]
    Json(String),
}

/// Cheap, immutable view of both stores at one point in time.
///
/// Only [`Workflow::snapshot`] produces one, so a restored snapshot always
/// satisfies the no-dangling-connection invariant.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSnapshot {
    nodes: Arc<Vec<Node>>,
    connections: Arc<Vec<Connection>>,
}

impl WorkflowSnapshot {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Whether both stores are the very same allocations as `other`'s.
    pub fn ptr_eq(&self, other: &WorkflowSnapshot) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes) && Arc::ptr_eq(&self.connections, &other.connections)
    }
}

/// Plain serializable shape handed to persistence collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Default)]
pub struct Workflow {
    nodes: Arc<Vec<Node>>,
    connections: Arc<Vec<Connection>>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from initial stores, rejecting connections to missing nodes.
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Result<Self, WorkflowError> {
        for c in &connections {
            for end in [c.from, c.to] {
                if !nodes.iter().any(|n| n.id == end) {
                    return Err(WorkflowError::DanglingConnection {
                        connection: c.id.as_str().to_string(),
                        node: end.as_str().to_string(),
                    });
                }
            }
        }
        Ok(Self {
            nodes: Arc::new(nodes),
            connections: Arc::new(connections),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        let doc: WorkflowDocument =
            serde_json::from_str(json).map_err(|e| WorkflowError::Json(e.to_string()))?;
        Self::from_parts(doc.nodes, doc.connections)
    }

    pub fn to_document(&self) -> WorkflowDocument {
        WorkflowDocument {
            nodes: self.nodes.to_vec(),
            connections: self.connections.to_vec(),
        }
    }

    // ─── Read surface ────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Connections with `id` as source or target.
    pub fn connections_of(&self, id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.touches(id))
    }

    /// Connections whose endpoints don't resolve. Always empty.
    pub fn dangling_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|c| !self.contains_node(c.from) || !self.contains_node(c.to))
            .map(|c| c.id)
            .collect()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            nodes: Arc::clone(&self.nodes),
            connections: Arc::clone(&self.connections),
        }
    }

    /// Swap both stores back to a previously taken snapshot.
    pub fn restore(&mut self, snapshot: WorkflowSnapshot) {
        self.nodes = snapshot.nodes;
        self.connections = snapshot.connections;
    }

    /// A node ID not present in the store.
    pub fn fresh_node_id(&self, prefix: &str) -> NodeId {
        loop {
            let id = NodeId::with_prefix(prefix);
            if !self.contains_node(id) {
                return id;
            }
        }
    }

    /// A connection ID not present in the store.
    pub fn fresh_connection_id(&self) -> ConnectionId {
        loop {
            let id = ConnectionId::generate();
            if self.connection(id).is_none() {
                return id;
            }
        }
    }

    fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn connection_index(&self, id: ConnectionId) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    /// Index of the node to edit, or `None` if it doesn't exist or
    /// `unchanged` says the edit would be a no-op. Callers only touch the
    /// store on `Some`, so misses keep the same allocation.
    fn editable_node(&self, id: NodeId, unchanged: impl FnOnce(&Node) -> bool) -> Option<usize> {
        self.node_index(id).filter(|&idx| !unchanged(&self.nodes[idx]))
    }

    fn editable_connection(&self, id: ConnectionId, unchanged: impl FnOnce(&Connection) -> bool) -> Option<usize> {
        self.connection_index(id)
            .filter(|&idx| !unchanged(&self.connections[idx]))
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut Arc::make_mut(&mut self.nodes)[idx]
    }

    fn connection_mut(&mut self, idx: usize) -> &mut Connection {
        &mut Arc::make_mut(&mut self.connections)[idx]
    }

    // ─── Node operations ─────────────────────────────────────────────────

    /// Append a node. The caller supplies a unique ID.
    pub fn add_node(&mut self, node: Node) {
        Arc::make_mut(&mut self.nodes).push(node);
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> bool {
        let Some(idx) = self.editable_node(id, |n| {
            let mut patched = n.clone();
            patch.clone().apply_to(&mut patched);
            patched == *n
        }) else {
            return false;
        };
        patch.apply_to(self.node_mut(idx));
        true
    }

    /// Position-only fast path for drag ticks.
    pub fn update_position(&mut self, id: NodeId, position: Position) -> bool {
        let Some(idx) = self.editable_node(id, |n| n.position == position) else {
            return false;
        };
        self.node_mut(idx).position = position;
        true
    }

    /// Remove a node and every connection touching it.
    ///
    /// Returns the IDs of cascaded connections, or `None` if the node
    /// doesn't exist.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Vec<ConnectionId>> {
        let idx = self.node_index(id)?;
        let cascaded: Vec<ConnectionId> = self.connections_of(id).map(|c| c.id).collect();

        Arc::make_mut(&mut self.nodes).remove(idx);
        if !cascaded.is_empty() {
            Arc::make_mut(&mut self.connections).retain(|c| !c.touches(id));
        }
        Some(cascaded)
    }

    /// Clone a node with a fresh ID, offset by +20/+20, named "… (copy)".
    /// Connections are not duplicated.
    pub fn duplicate_node(&mut self, id: NodeId) -> Option<NodeId> {
        let original = self.node(id)?;
        let new_id = self.fresh_node_id("node");
        let copy = Node {
            id: new_id,
            name: format!("{} (copy)", original.name),
            position: original.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET),
            ..original.clone()
        };
        self.add_node(copy);
        Some(new_id)
    }

    pub fn toggle_disabled(&mut self, id: NodeId) -> bool {
        let Some(idx) = self.node_index(id) else {
            return false;
        };
        let node = self.node_mut(idx);
        node.disabled = !node.disabled;
        true
    }

    pub fn lock(&mut self, id: NodeId) -> bool {
        self.set_locked(id, true)
    }

    pub fn unlock(&mut self, id: NodeId) -> bool {
        self.set_locked(id, false)
    }

    fn set_locked(&mut self, id: NodeId, locked: bool) -> bool {
        let Some(idx) = self.editable_node(id, |n| n.locked == locked) else {
            return false;
        };
        self.node_mut(idx).locked = locked;
        true
    }

    /// Align the resolvable nodes in `ids`. No-op below two nodes or when
    /// every node already sits on the edge.
    pub fn align(&mut self, ids: &[NodeId], edge: AlignEdge) -> bool {
        let targets: Vec<(NodeId, Position)> = align_positions(&self.nodes, ids, edge)
            .into_iter()
            .filter(|(id, position)| self.node(*id).is_some_and(|n| n.position != *position))
            .collect();
        if targets.is_empty() {
            return false;
        }
        let nodes = Arc::make_mut(&mut self.nodes);
        for (id, position) in targets {
            if let Some(node) = nodes.iter_mut().find(|n| n.id == id) {
                node.position = position;
            }
        }
        true
    }

    // ─── Connection operations ───────────────────────────────────────────

    /// Add `from → to`. Parallel edges and self-loops are accepted;
    /// endpoints that don't exist are refused (returns `None`).
    pub fn add_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: Option<ConnectionType>,
        id: Option<ConnectionId>,
        label: Option<String>,
    ) -> Option<ConnectionId> {
        if !self.contains_node(from) || !self.contains_node(to) {
            log::warn!("refusing connection {from} -> {to}: endpoint missing");
            return None;
        }
        let id = id.unwrap_or_else(|| self.fresh_connection_id());
        Arc::make_mut(&mut self.connections).push(Connection {
            id,
            from,
            to,
            kind: kind.unwrap_or_default(),
            label,
        });
        Some(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let Some(idx) = self.connection_index(id) else {
            return false;
        };
        Arc::make_mut(&mut self.connections).remove(idx);
        true
    }

    pub fn update_connection_type(&mut self, id: ConnectionId, kind: ConnectionType) -> bool {
        let Some(idx) = self.editable_connection(id, |c| c.kind == kind) else {
            return false;
        };
        self.connection_mut(idx).kind = kind;
        true
    }

    pub fn update_connection_label(&mut self, id: ConnectionId, label: Option<String>) -> bool {
        let Some(idx) = self.editable_connection(id, |c| c.label == label) else {
            return false;
        };
        self.connection_mut(idx).label = label;
        true
    }

    /// Replace one connection record wholesale. Refused if the replacement
    /// references a missing node.
    pub fn replace_connection(&mut self, id: ConnectionId, replacement: Connection) -> bool {
        if !self.contains_node(replacement.from) || !self.contains_node(replacement.to) {
            log::warn!("refusing replacement of {id}: endpoint missing");
            return false;
        }
        let Some(idx) = self.editable_connection(id, |c| *c == replacement) else {
            return false;
        };
        *self.connection_mut(idx) = replacement;
        true
    }

    /// Insert a new action node at the midpoint of a connection's endpoints
    /// and rewire `from → new → to`, carrying over the type and suffixing
    /// any label with " (in)" / " (out)".
    ///
    /// Returns `(new_node, incoming, outgoing)`, or `None` if the
    /// connection or either endpoint doesn't resolve.
    pub fn split_connection(&mut self, id: ConnectionId) -> Option<(NodeId, ConnectionId, ConnectionId)> {
        let idx = self.connection_index(id)?;
        let original = self.connections[idx].clone();
        let from = self.node(original.from)?;
        let to = self.node(original.to)?;

        let midpoint = Position::midpoint(from.position, to.position);
        let node_id = self.fresh_node_id("action");
        let node = Node::action(node_id, midpoint);

        let incoming_id = self.fresh_connection_id();
        let mut outgoing_id = self.fresh_connection_id();
        while outgoing_id == incoming_id {
            outgoing_id = self.fresh_connection_id();
        }
        let suffixed = |suffix: &str| original.label.as_ref().map(|l| format!("{l} ({suffix})"));
        let incoming = Connection {
            id: incoming_id,
            from: original.from,
            to: node_id,
            kind: original.kind,
            label: suffixed("in"),
        };
        let outgoing = Connection {
            id: outgoing_id,
            from: node_id,
            to: original.to,
            kind: original.kind,
            label: suffixed("out"),
        };

        Arc::make_mut(&mut self.nodes).push(node);
        let connections = Arc::make_mut(&mut self.connections);
        connections.remove(idx);
        connections.push(incoming);
        connections.push(outgoing);

        Some((node_id, incoming_id, outgoing_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node::new(NodeId::intern(id), "http", id, Position::new(x, y))
    }

    fn two_nodes() -> Workflow {
        let mut wf = Workflow::new();
        wf.add_node(node("wa", 0.0, 0.0));
        wf.add_node(node("wb", 100.0, 50.0));
        wf
    }

    #[test]
    fn from_parts_rejects_dangling() {
        let c = Connection::new(
            ConnectionId::intern("c"),
            NodeId::intern("fa"),
            NodeId::intern("ghost"),
        );
        let err = Workflow::from_parts(vec![node("fa", 0.0, 0.0)], vec![c]).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::DanglingConnection {
                connection: "c".into(),
                node: "ghost".into()
            }
        );
    }

    #[test]
    fn from_json_accepts_document() {
        let wf = Workflow::from_json(
            r#"{
                "nodes": [
                    {"id": "j1", "type": "trigger", "name": "Start", "position": {"x": 0, "y": 0}},
                    {"id": "j2", "type": "action", "name": "Do", "position": {"x": 90, "y": 0}}
                ],
                "connections": [{"id": "jc", "from": "j1", "to": "j2", "type": "straight"}]
            }"#,
        )
        .unwrap();
        assert_eq!(wf.nodes().len(), 2);
        assert_eq!(
            wf.connection(ConnectionId::intern("jc")).unwrap().kind,
            ConnectionType::Straight
        );
        assert!(matches!(Workflow::from_json("{"), Err(WorkflowError::Json(_))));
    }

    #[test]
    fn remove_cascades_to_connections() {
        let mut wf = two_nodes();
        let (a, b) = (NodeId::intern("wa"), NodeId::intern("wb"));
        let ab = wf.add_connection(a, b, None, None, None).unwrap();
        let ba = wf.add_connection(b, a, None, None, None).unwrap();

        let cascaded = wf.remove_node(a).unwrap();
        assert_eq!(cascaded, vec![ab, ba]);
        assert!(wf.connections().is_empty());
        assert!(wf.contains_node(b));
    }

    #[test]
    fn misses_leave_stores_pointer_identical() {
        let mut wf = two_nodes();
        let before = wf.snapshot();
        let ghost = NodeId::intern("ghost");

        assert!(!wf.update_node(ghost, NodePatch::name("x")));
        assert!(!wf.update_position(ghost, Position::new(1.0, 1.0)));
        assert!(wf.remove_node(ghost).is_none());
        assert!(wf.duplicate_node(ghost).is_none());
        assert!(!wf.toggle_disabled(ghost));
        assert!(!wf.lock(ghost));
        assert!(!wf.align(&[ghost, NodeId::intern("wa")], AlignEdge::Left));
        assert!(!wf.remove_connection(ConnectionId::intern("ghost")));
        assert!(wf.split_connection(ConnectionId::intern("ghost")).is_none());

        assert!(wf.snapshot().ptr_eq(&before));
    }

    #[test]
    fn redundant_edits_keep_stores_pointer_identical() {
        let mut wf = two_nodes();
        let (a, b) = (NodeId::intern("wa"), NodeId::intern("wb"));
        let c = wf
            .add_connection(a, b, Some(ConnectionType::Straight), None, Some("x".into()))
            .unwrap();
        wf.lock(a);
        assert!(wf.align(&[a, b], AlignEdge::Left));
        let before = wf.snapshot();

        assert!(!wf.lock(a));
        assert!(!wf.unlock(b));
        assert!(!wf.update_position(a, Position::new(0.0, 0.0)));
        assert!(!wf.update_node(a, NodePatch::name("wa")));
        assert!(!wf.align(&[a, b], AlignEdge::Left));
        assert!(!wf.update_connection_type(c, ConnectionType::Straight));
        assert!(!wf.update_connection_label(c, Some("x".into())));
        let same = wf.connection(c).unwrap().clone();
        assert!(!wf.replace_connection(c, same));

        assert!(wf.snapshot().ptr_eq(&before));
    }

    #[test]
    fn restore_round_trips_taken_snapshots() {
        let mut wf = two_nodes();
        let (a, b) = (NodeId::intern("wa"), NodeId::intern("wb"));
        wf.add_connection(a, b, None, None, None).unwrap();
        let before = wf.snapshot();

        wf.remove_node(a);
        assert!(wf.connections().is_empty());

        wf.restore(before.clone());
        assert!(wf.snapshot().ptr_eq(&before));
        assert_eq!(before.nodes().len(), 2);
        assert_eq!(before.connections().len(), 1);
        assert!(wf.dangling_connections().is_empty());

        wf.restore(WorkflowSnapshot::default());
        assert!(wf.nodes().is_empty() && wf.connections().is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut wf = two_nodes();
        let before = wf.snapshot();
        wf.update_position(NodeId::intern("wa"), Position::new(9.0, 9.0));
        assert_eq!(before.nodes()[0].position, Position::new(0.0, 0.0));
        assert_eq!(wf.nodes()[0].position, Position::new(9.0, 9.0));
    }

    #[test]
    fn duplicate_offsets_and_renames() {
        let mut wf = Workflow::new();
        wf.add_node(node("dup", 10.0, 10.0));
        let copy_id = wf.duplicate_node(NodeId::intern("dup")).unwrap();

        let copy = wf.node(copy_id).unwrap();
        assert_ne!(copy_id, NodeId::intern("dup"));
        assert_eq!(copy.position, Position::new(30.0, 30.0));
        assert_eq!(copy.name, "dup (copy)");
        assert_eq!(copy.kind, "http");
    }

    #[test]
    fn add_connection_refuses_missing_endpoint() {
        let mut wf = two_nodes();
        let before = wf.snapshot();
        assert!(
            wf.add_connection(NodeId::intern("wa"), NodeId::intern("ghost"), None, None, None)
                .is_none()
        );
        assert!(wf.snapshot().ptr_eq(&before));
    }

    #[test]
    fn add_connection_allows_loops_and_parallel_edges() {
        let mut wf = two_nodes();
        let a = NodeId::intern("wa");
        let b = NodeId::intern("wb");
        wf.add_connection(a, a, None, None, None).unwrap();
        wf.add_connection(a, b, None, None, None).unwrap();
        wf.add_connection(a, b, Some(ConnectionType::Stepped), None, None).unwrap();
        assert_eq!(wf.connections().len(), 3);
        assert_eq!(wf.connections()[0].kind, ConnectionType::Curved);
    }

    #[test]
    fn replace_connection_swaps_record() {
        let mut wf = two_nodes();
        let (a, b) = (NodeId::intern("wa"), NodeId::intern("wb"));
        let id = wf
            .add_connection(a, b, None, Some(ConnectionId::intern("rc")), None)
            .unwrap();

        let replacement = Connection {
            id,
            from: b,
            to: a,
            kind: ConnectionType::Straight,
            label: Some("back".into()),
        };
        assert!(wf.replace_connection(id, replacement.clone()));
        assert_eq!(wf.connection(id), Some(&replacement));

        let dangling = Connection {
            to: NodeId::intern("ghost"),
            ..replacement
        };
        assert!(!wf.replace_connection(id, dangling));
        assert!(wf.dangling_connections().is_empty());
    }

    #[test]
    fn split_without_label() {
        let mut wf = two_nodes();
        let (a, b) = (NodeId::intern("wa"), NodeId::intern("wb"));
        let id = wf.add_connection(a, b, Some(ConnectionType::Straight), None, None).unwrap();

        let (mid, incoming, outgoing) = wf.split_connection(id).unwrap();
        let node = wf.node(mid).unwrap();
        assert_eq!(node.position, Position::new(50.0, 25.0));
        assert_eq!(node.kind, "action");

        let incoming = wf.connection(incoming).unwrap();
        let outgoing = wf.connection(outgoing).unwrap();
        assert_eq!((incoming.from, incoming.to), (a, mid));
        assert_eq!((outgoing.from, outgoing.to), (mid, b));
        assert_eq!(incoming.kind, ConnectionType::Straight);
        assert_eq!(incoming.label, None);
        assert_eq!(outgoing.label, None);
        assert!(wf.connection(id).is_none());
    }
}
