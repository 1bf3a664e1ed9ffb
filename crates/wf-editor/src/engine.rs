//! The workflow editing engine.
//!
//! Every edit is a [`GraphMutation`] applied through [`WorkflowEngine::apply`],
//! which runs the store operation, prunes editor state that referenced
//! anything removed, and logs the result. UI layers hold one engine and
//! route all writes through it; the stores themselves are never exposed
//! mutably.

use crate::config::EditorConfig;
use crate::execute::{CodeRunner, ExecOutcome, execute_node};
use crate::state::EditorState;
use smallvec::SmallVec;
use wf_core::hit;
use wf_core::*;

/// One edit to the workflow stores.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphMutation {
    AddNode {
        node: Box<Node>,
    },
    UpdateNode {
        id: NodeId,
        patch: Box<NodePatch>,
    },
    /// Drag-tick fast path.
    UpdatePosition {
        id: NodeId,
        position: Position,
    },
    RemoveNode {
        id: NodeId,
    },
    DuplicateNode {
        id: NodeId,
    },
    ToggleDisabled {
        id: NodeId,
    },
    Lock {
        id: NodeId,
    },
    Unlock {
        id: NodeId,
    },
    Align {
        ids: Vec<NodeId>,
        edge: AlignEdge,
    },
    AddConnection {
        from: NodeId,
        to: NodeId,
        kind: Option<ConnectionType>,
        id: Option<ConnectionId>,
        label: Option<String>,
    },
    RemoveConnection {
        id: ConnectionId,
    },
    UpdateConnectionType {
        id: ConnectionId,
        kind: ConnectionType,
    },
    UpdateConnectionLabel {
        id: ConnectionId,
        label: Option<String>,
    },
    ReplaceConnection {
        id: ConnectionId,
        connection: Box<Connection>,
    },
    SplitConnection {
        id: ConnectionId,
    },
}

impl GraphMutation {
    /// Level a successful application is logged at. Drag ticks arrive once
    /// per pointer move and stay at `trace`.
    fn change_level(&self) -> log::Level {
        match self {
            Self::UpdatePosition { .. } => log::Level::Trace,
            _ => log::Level::Debug,
        }
    }

    /// Human-readable label, used for undo history entries.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "Add node",
            Self::UpdateNode { .. } => "Edit node",
            Self::UpdatePosition { .. } => "Move node",
            Self::RemoveNode { .. } => "Delete node",
            Self::DuplicateNode { .. } => "Duplicate node",
            Self::ToggleDisabled { .. } => "Toggle disabled",
            Self::Lock { .. } => "Lock node",
            Self::Unlock { .. } => "Unlock node",
            Self::Align { .. } => "Align nodes",
            Self::AddConnection { .. } => "Connect nodes",
            Self::RemoveConnection { .. } => "Delete connection",
            Self::UpdateConnectionType { .. } => "Change connection type",
            Self::UpdateConnectionLabel { .. } => "Edit connection label",
            Self::ReplaceConnection { .. } => "Edit connection",
            Self::SplitConnection { .. } => "Insert node into connection",
        }
    }
}

/// What a mutation did. `nodes`/`connections` list the IDs it created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOutcome {
    pub changed: bool,
    pub nodes: SmallVec<[NodeId; 1]>,
    pub connections: SmallVec<[ConnectionId; 2]>,
}

impl MutationOutcome {
    fn changed_if(changed: bool) -> Self {
        Self {
            changed,
            ..Default::default()
        }
    }

    fn created_node(id: NodeId) -> Self {
        Self {
            changed: true,
            nodes: smallvec::smallvec![id],
            connections: SmallVec::new(),
        }
    }
}

pub struct WorkflowEngine {
    workflow: Workflow,
    /// Selection, viewport, menus, preview. Plain pass-through state.
    pub state: EditorState,
    pub config: EditorConfig,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl WorkflowEngine {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_workflow(Workflow::new(), config)
    }

    pub fn with_workflow(workflow: Workflow, config: EditorConfig) -> Self {
        Self {
            workflow,
            state: EditorState::default(),
            config,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.workflow.snapshot()
    }

    /// Swap in a snapshot (undo/redo, document load) and drop editor
    /// state that points at anything the snapshot lacks.
    pub fn restore(&mut self, snapshot: WorkflowSnapshot) {
        self.workflow.restore(snapshot);
        self.state.retain_existing(&self.workflow);
    }

    /// Replace the whole document. Selection and menus are reset.
    pub fn load(&mut self, workflow: Workflow) {
        self.workflow = workflow;
        self.state.selection.clear();
        self.state.close_context_menu();
        self.state.cancel_preview();
    }

    // ─── Mutation dispatch ───────────────────────────────────────────────

    pub fn apply(&mut self, mutation: GraphMutation) -> MutationOutcome {
        let label = mutation.describe();
        let level = mutation.change_level();
        let outcome = self.apply_inner(mutation);
        if outcome.changed {
            log::log!(
                level,
                "{label}: +{} node(s), +{} connection(s)",
                outcome.nodes.len(),
                outcome.connections.len()
            );
        } else {
            log::trace!("{label}: no-op");
        }
        outcome
    }

    fn apply_inner(&mut self, mutation: GraphMutation) -> MutationOutcome {
        let wf = &mut self.workflow;
        match mutation {
            GraphMutation::AddNode { node } => {
                let id = node.id;
                wf.add_node(*node);
                MutationOutcome::created_node(id)
            }
            GraphMutation::UpdateNode { id, patch } => {
                MutationOutcome::changed_if(wf.update_node(id, *patch))
            }
            GraphMutation::UpdatePosition { id, position } => {
                MutationOutcome::changed_if(wf.update_position(id, position))
            }
            GraphMutation::RemoveNode { id } => match wf.remove_node(id) {
                Some(cascaded) => {
                    self.state.forget_node(id, &cascaded);
                    MutationOutcome::changed_if(true)
                }
                None => MutationOutcome::changed_if(false),
            },
            GraphMutation::DuplicateNode { id } => wf
                .duplicate_node(id)
                .map(MutationOutcome::created_node)
                .unwrap_or_default(),
            GraphMutation::ToggleDisabled { id } => MutationOutcome::changed_if(wf.toggle_disabled(id)),
            GraphMutation::Lock { id } => MutationOutcome::changed_if(wf.lock(id)),
            GraphMutation::Unlock { id } => MutationOutcome::changed_if(wf.unlock(id)),
            GraphMutation::Align { ids, edge } => MutationOutcome::changed_if(wf.align(&ids, edge)),
            GraphMutation::AddConnection {
                from,
                to,
                kind,
                id,
                label,
            } => match wf.add_connection(from, to, kind, id, label) {
                Some(id) => MutationOutcome {
                    changed: true,
                    nodes: SmallVec::new(),
                    connections: smallvec::smallvec![id],
                },
                None => MutationOutcome::default(),
            },
            GraphMutation::RemoveConnection { id } => {
                let removed = wf.remove_connection(id);
                if removed {
                    self.state.forget_connection(id);
                }
                MutationOutcome::changed_if(removed)
            }
            GraphMutation::UpdateConnectionType { id, kind } => {
                MutationOutcome::changed_if(wf.update_connection_type(id, kind))
            }
            GraphMutation::UpdateConnectionLabel { id, label } => {
                MutationOutcome::changed_if(wf.update_connection_label(id, label))
            }
            GraphMutation::ReplaceConnection { id, connection } => {
                MutationOutcome::changed_if(wf.replace_connection(id, *connection))
            }
            GraphMutation::SplitConnection { id } => match wf.split_connection(id) {
                Some((node, incoming, outgoing)) => {
                    self.state.forget_connection(id);
                    MutationOutcome {
                        changed: true,
                        nodes: smallvec::smallvec![node],
                        connections: smallvec::smallvec![incoming, outgoing],
                    }
                }
                None => MutationOutcome::default(),
            },
        }
    }

    // ─── Node operations ─────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.apply(GraphMutation::AddNode { node: Box::new(node) });
        id
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> bool {
        self.apply(GraphMutation::UpdateNode {
            id,
            patch: Box::new(patch),
        })
        .changed
    }

    pub fn update_position(&mut self, id: NodeId, position: Position) -> bool {
        self.apply(GraphMutation::UpdatePosition { id, position }).changed
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.apply(GraphMutation::RemoveNode { id }).changed
    }

    pub fn duplicate_node(&mut self, id: NodeId) -> Option<NodeId> {
        self.apply(GraphMutation::DuplicateNode { id }).nodes.first().copied()
    }

    pub fn toggle_disabled(&mut self, id: NodeId) -> bool {
        self.apply(GraphMutation::ToggleDisabled { id }).changed
    }

    pub fn lock(&mut self, id: NodeId) -> bool {
        self.apply(GraphMutation::Lock { id }).changed
    }

    pub fn unlock(&mut self, id: NodeId) -> bool {
        self.apply(GraphMutation::Unlock { id }).changed
    }

    pub fn align(&mut self, ids: Vec<NodeId>, edge: AlignEdge) -> bool {
        self.apply(GraphMutation::Align { ids, edge }).changed
    }

    // ─── Connection operations ───────────────────────────────────────────

    pub fn add_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: Option<ConnectionType>,
        id: Option<ConnectionId>,
        label: Option<String>,
    ) -> Option<ConnectionId> {
        self.apply(GraphMutation::AddConnection {
            from,
            to,
            kind,
            id,
            label,
        })
        .connections
        .first()
        .copied()
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        self.apply(GraphMutation::RemoveConnection { id }).changed
    }

    pub fn update_connection_type(&mut self, id: ConnectionId, kind: ConnectionType) -> bool {
        self.apply(GraphMutation::UpdateConnectionType { id, kind }).changed
    }

    pub fn update_connection_label(&mut self, id: ConnectionId, label: Option<String>) -> bool {
        self.apply(GraphMutation::UpdateConnectionLabel { id, label }).changed
    }

    pub fn replace_connection(&mut self, id: ConnectionId, connection: Connection) -> bool {
        self.apply(GraphMutation::ReplaceConnection {
            id,
            connection: Box::new(connection),
        })
        .changed
    }

    /// Returns the inserted node's ID.
    pub fn split_connection(&mut self, id: ConnectionId) -> Option<NodeId> {
        self.apply(GraphMutation::SplitConnection { id }).nodes.first().copied()
    }

    /// Attach the edge being dragged out to `target`, using its tentative
    /// type. The preview is cleared either way.
    pub fn finish_preview(&mut self, target: NodeId) -> Option<ConnectionId> {
        let preview = self.state.cancel_preview()?;
        self.add_connection(preview.source, target, Some(preview.kind), None, None)
    }

    // ─── Selection-level helpers ─────────────────────────────────────────

    pub fn select_all(&mut self) {
        let ids = self.workflow.nodes().iter().map(|n| n.id).collect();
        self.state.selection.set_selected(ids);
    }

    /// Marquee selection in canvas coordinates.
    pub fn select_in_rect(&mut self, rect: Bounds) {
        let ids = hit::nodes_in_rect(&self.workflow, rect);
        self.state.selection.set_selected(ids);
    }

    pub fn node_at(&self, canvas: Position) -> Option<NodeId> {
        hit::node_at(&self.workflow, canvas)
    }

    pub fn connection_at(&self, canvas: Position) -> Option<ConnectionId> {
        let tolerance = self.config.hit_tolerance / self.state.viewport.zoom;
        hit::connection_at(&self.workflow, canvas, tolerance)
    }

    pub fn delete_selected(&mut self) -> bool {
        let ids = self.state.selection.selected.clone();
        let mut changed = false;
        for id in ids {
            changed |= self.remove_node(id);
        }
        changed
    }

    /// Duplicate every selected node and select the copies.
    pub fn duplicate_selected(&mut self) -> bool {
        let ids = self.state.selection.selected.clone();
        let copies: Vec<NodeId> = ids.into_iter().filter_map(|id| self.duplicate_node(id)).collect();
        if copies.is_empty() {
            return false;
        }
        self.state.selection.set_selected(copies);
        true
    }

    pub fn align_selected(&mut self, edge: AlignEdge) -> bool {
        let ids = self.state.selection.selected.clone();
        self.align(ids, edge)
    }

    /// Lock the selection, or unlock it if every selected node is locked.
    pub fn toggle_lock_selected(&mut self) -> bool {
        let ids = self.state.selection.selected.clone();
        let all_locked = ids
            .iter()
            .filter_map(|id| self.workflow.node(*id))
            .all(|n| n.locked);
        let mut changed = false;
        for id in ids {
            changed |= if all_locked { self.unlock(id) } else { self.lock(id) };
        }
        changed
    }

    pub fn toggle_disabled_selected(&mut self) -> bool {
        let ids = self.state.selection.selected.clone();
        let mut changed = false;
        for id in ids {
            changed |= self.toggle_disabled(id);
        }
        changed
    }

    // ─── Execution ───────────────────────────────────────────────────────

    /// Run a node's script through `runner`. Never alters the stores.
    pub fn execute(&self, id: NodeId, runner: &dyn CodeRunner) -> ExecOutcome {
        execute_node(&self.workflow, id, runner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ContextMenu;
    use pretty_assertions::assert_eq;

    fn engine_with(ids: &[(&str, f64, f64)]) -> WorkflowEngine {
        let mut engine = WorkflowEngine::default();
        for (id, x, y) in ids {
            engine.add_node(Node::new(NodeId::intern(id), "http", *id, Position::new(*x, *y)));
        }
        engine
    }

    #[test]
    fn drag_ticks_log_below_debug() {
        let id = NodeId::intern("tick");
        let tick = GraphMutation::UpdatePosition {
            id,
            position: Position::new(1.0, 1.0),
        };
        assert_eq!(tick.change_level(), log::Level::Trace);
        assert_eq!(GraphMutation::Lock { id }.change_level(), log::Level::Debug);
        assert_eq!(GraphMutation::RemoveNode { id }.change_level(), log::Level::Debug);
    }

    #[test]
    fn remove_prunes_selection_and_focus() {
        let mut engine = engine_with(&[("ea", 0.0, 0.0), ("eb", 90.0, 0.0)]);
        let (a, b) = (NodeId::intern("ea"), NodeId::intern("eb"));
        engine.state.selection.set_selected(vec![a, b]);
        engine.state.selection.focus(Some(a));

        assert!(engine.remove_node(a));
        assert_eq!(engine.state.selection.selected, vec![b]);
        assert_eq!(engine.state.selection.focused, None);
    }

    #[test]
    fn cascade_closes_connection_menu() {
        let mut engine = engine_with(&[("ma", 0.0, 0.0), ("mb", 90.0, 0.0)]);
        let (a, b) = (NodeId::intern("ma"), NodeId::intern("mb"));
        let c = engine.add_connection(a, b, None, None, None).unwrap();
        engine.state.open_context_menu(ContextMenu::Connection {
            connection_id: c,
            screen: Position::default(),
        });

        engine.remove_node(b);
        assert_eq!(engine.state.context_menu, None);
    }

    #[test]
    fn split_reports_created_ids() {
        let mut engine = engine_with(&[("xa", 0.0, 0.0), ("xb", 100.0, 100.0)]);
        let c = engine
            .add_connection(NodeId::intern("xa"), NodeId::intern("xb"), None, None, None)
            .unwrap();
        let outcome = engine.apply(GraphMutation::SplitConnection { id: c });
        assert!(outcome.changed);
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.connections.len(), 2);
        assert_eq!(
            engine.workflow().node(outcome.nodes[0]).unwrap().position,
            Position::new(50.0, 50.0)
        );
    }

    #[test]
    fn finish_preview_uses_tentative_type() {
        let mut engine = engine_with(&[("pa", 0.0, 0.0), ("pb", 100.0, 0.0)]);
        let (a, b) = (NodeId::intern("pa"), NodeId::intern("pb"));
        engine
            .state
            .begin_preview(a, Position::new(70.0, 35.0), ConnectionType::Stepped);
        engine.state.update_preview(Position::new(100.0, 35.0));

        let id = engine.finish_preview(b).unwrap();
        let c = engine.workflow().connection(id).unwrap();
        assert_eq!((c.from, c.to, c.kind), (a, b, ConnectionType::Stepped));
        assert_eq!(engine.state.preview, None);
        assert_eq!(engine.finish_preview(b), None);
    }

    #[test]
    fn duplicate_selected_selects_copies() {
        let mut engine = engine_with(&[("da", 0.0, 0.0), ("db", 100.0, 0.0)]);
        engine.select_all();
        assert!(engine.duplicate_selected());
        assert_eq!(engine.workflow().nodes().len(), 4);
        let selected = &engine.state.selection.selected;
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|id| id.as_str().starts_with("node_")));
    }

    #[test]
    fn toggle_lock_selected_unlocks_when_all_locked() {
        let mut engine = engine_with(&[("la", 0.0, 0.0), ("lb", 100.0, 0.0)]);
        engine.select_all();
        engine.lock(NodeId::intern("la"));

        engine.toggle_lock_selected();
        assert!(engine.workflow().nodes().iter().all(|n| n.locked));
        engine.toggle_lock_selected();
        assert!(engine.workflow().nodes().iter().all(|n| !n.locked));
    }

    #[test]
    fn marquee_and_hit_queries() {
        let mut engine = engine_with(&[("qa", 0.0, 0.0), ("qb", 200.0, 0.0)]);
        engine.select_in_rect(Bounds::from_corners(
            Position::new(-5.0, -5.0),
            Position::new(50.0, 50.0),
        ));
        assert_eq!(engine.state.selection.selected, vec![NodeId::intern("qa")]);
        assert_eq!(engine.node_at(Position::new(210.0, 10.0)), Some(NodeId::intern("qb")));
    }
}
