//! WASM bridge for WF: exposes the workflow editing engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web` and loaded by the canvas
//! page. IDs cross the boundary as strings; nodes, connections, and editor
//! state cross as JSON text.

mod logger;
mod runner;

use runner::JsCodeRunner;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wf_core::{AlignEdge, Bounds, Connection, ConnectionId, ConnectionType, Node, NodeId, NodePatch, Position, Workflow};
use wf_editor::state::ContextMenu;
use wf_editor::{
    Clipboard, CommandStack, EditorConfig, ExecOutcome, GraphMutation, MutationOutcome, ShortcutAction, ShortcutMap,
    WorkflowEngine,
};

/// The main WASM-facing canvas controller.
///
/// Holds the engine, command stack, and clipboard. Every interaction from
/// the page goes through this struct, so every write lands in history.
#[wasm_bindgen]
pub struct WorkflowCanvas {
    engine: WorkflowEngine,
    commands: CommandStack,
    clipboard: Clipboard,
}

impl Default for WorkflowCanvas {
    fn default() -> Self {
        Self::with_config(EditorConfig::default())
    }
}

impl WorkflowCanvas {
    fn with_config(config: EditorConfig) -> Self {
        Self {
            commands: CommandStack::new(config.history_depth),
            engine: WorkflowEngine::new(config),
            clipboard: Clipboard::default(),
        }
    }

    fn apply(&mut self, mutation: GraphMutation) -> MutationOutcome {
        self.commands.execute(&mut self.engine, mutation)
    }

    fn canvas_point(&self, screen_x: f64, screen_y: f64) -> Position {
        self.engine.state.viewport.screen_to_canvas(Position::new(screen_x, screen_y))
    }

    fn paste_ids(&mut self) -> Vec<NodeId> {
        let clipboard = &mut self.clipboard;
        self.commands.record(&mut self.engine, "Paste", |e| clipboard.paste(e))
    }

    fn dispatch_action(&mut self, action: ShortcutAction) -> bool {
        let step = self.engine.config.zoom_step;
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::Duplicate => self.duplicate_selected(),
            ShortcutAction::Copy => {
                self.copy_selected();
                false
            }
            ShortcutAction::Cut => self.cut_selected(),
            ShortcutAction::Paste => !self.paste_ids().is_empty(),
            ShortcutAction::ToggleLock => self.toggle_lock_selected(),
            ShortcutAction::ToggleDisabled => self.toggle_disabled_selected(),
            ShortcutAction::Align(edge) => self.align_edge_selected(edge),
            ShortcutAction::SelectAll => {
                self.engine.select_all();
                false
            }
            ShortcutAction::ZoomIn => self.zoom_by(step),
            ShortcutAction::ZoomOut => self.zoom_by(1.0 / step),
            ShortcutAction::ZoomReset => {
                self.engine.state.viewport.set_zoom(1.0);
                true
            }
            ShortcutAction::ToggleGrid => {
                self.engine.state.viewport.toggle_grid();
                true
            }
            ShortcutAction::Escape => {
                self.engine.state.selection.clear();
                self.engine.state.close_context_menu();
                self.engine.state.cancel_preview();
                false
            }
        }
    }

    fn align_edge_selected(&mut self, edge: AlignEdge) -> bool {
        let ids = self.engine.state.selection.selected.clone();
        self.apply(GraphMutation::Align { ids, edge }).changed
    }

    fn zoom_by(&mut self, factor: f64) -> bool {
        let (min, max) = (self.engine.config.min_zoom, self.engine.config.max_zoom);
        let before = self.engine.state.viewport.zoom;
        self.engine.state.viewport.zoom_by(factor, min, max);
        self.engine.state.viewport.zoom != before
    }
}

#[wasm_bindgen]
impl WorkflowCanvas {
    /// Create a controller with default config and an empty workflow.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        logger::console_error_panic_hook_setup();
        logger::init(log::LevelFilter::Info);
        Self::default()
    }

    /// Replace the editor config. Resets undo history, since its depth
    /// is part of the config. Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn set_config_json(&mut self, json: &str) -> String {
        if self.commands.is_batching() {
            return error_json("cannot change config during a drag");
        }
        match EditorConfig::from_json(json) {
            Ok(config) => {
                self.commands = CommandStack::new(config.history_depth);
                self.engine.config = config;
                ok_json()
            }
            Err(e) => error_json(e),
        }
    }

    /// `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"` or `"off"`.
    pub fn set_log_level(&mut self, level: &str) -> bool {
        match logger::parse_level(level) {
            Some(level) => {
                logger::init(level);
                true
            }
            None => false,
        }
    }

    // ─── Document I/O ────────────────────────────────────────────────────

    /// Load `{"nodes":[...],"connections":[...]}`. Clears history and
    /// selection. Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn load_document(&mut self, json: &str) -> String {
        match Workflow::from_json(json) {
            Ok(workflow) => {
                self.engine.load(workflow);
                self.commands.clear();
                log::info!(
                    "loaded workflow: {} node(s), {} connection(s)",
                    self.engine.workflow().nodes().len(),
                    self.engine.workflow().connections().len()
                );
                ok_json()
            }
            Err(e) => {
                log::warn!("load_document: {e}");
                error_json(e)
            }
        }
    }

    pub fn get_document_json(&self) -> String {
        to_json(&self.engine.workflow().to_document(), "{}")
    }

    pub fn get_nodes_json(&self) -> String {
        to_json(self.engine.workflow().nodes(), "[]")
    }

    pub fn get_connections_json(&self) -> String {
        to_json(self.engine.workflow().connections(), "[]")
    }

    /// Selection, viewport, context menu, and connection preview.
    pub fn get_state_json(&self) -> String {
        to_json(&self.engine.state, "{}")
    }

    // ─── Node API ────────────────────────────────────────────────────────

    /// Add a node from its JSON record. The caller supplies a unique ID.
    /// Returns `{"ok":true,"id":"..."}` or `{"ok":false,"error":"..."}`.
    pub fn add_node_json(&mut self, json: &str) -> String {
        match serde_json::from_str::<Node>(json) {
            Ok(node) => {
                let id = node.id;
                self.apply(GraphMutation::AddNode { node: Box::new(node) });
                serde_json::json!({ "ok": true, "id": id }).to_string()
            }
            Err(e) => error_json(e),
        }
    }

    /// Drop a default action node at a screen point. Returns its ID.
    pub fn add_action_node(&mut self, screen_x: f64, screen_y: f64) -> String {
        let id = self.engine.workflow().fresh_node_id("action");
        let position = self.canvas_point(screen_x, screen_y);
        self.apply(GraphMutation::AddNode {
            node: Box::new(Node::action(id, position)),
        });
        id.to_string()
    }

    /// Shallow-merge a partial node record. Returns `{"ok":true,"changed":bool}`
    /// or `{"ok":false,"error":"..."}`.
    pub fn update_node_json(&mut self, node_id: &str, patch_json: &str) -> String {
        match serde_json::from_str::<NodePatch>(patch_json) {
            Ok(patch) => {
                let changed = self
                    .apply(GraphMutation::UpdateNode {
                        id: NodeId::intern(node_id),
                        patch: Box::new(patch),
                    })
                    .changed;
                serde_json::json!({ "ok": true, "changed": changed }).to_string()
            }
            Err(e) => error_json(e),
        }
    }

    /// Move a node to canvas coordinates. Wrap drag ticks in
    /// `begin_drag`/`end_drag` so the whole gesture is one undo step.
    pub fn update_position(&mut self, node_id: &str, x: f64, y: f64) -> bool {
        self.apply(GraphMutation::UpdatePosition {
            id: NodeId::intern(node_id),
            position: Position::new(x, y),
        })
        .changed
    }

    pub fn begin_drag(&mut self) {
        self.commands.begin_batch(&self.engine);
    }

    pub fn end_drag(&mut self) {
        self.commands.end_batch(&self.engine, "Move node");
    }

    pub fn remove_node(&mut self, node_id: &str) -> bool {
        self.apply(GraphMutation::RemoveNode {
            id: NodeId::intern(node_id),
        })
        .changed
    }

    /// Returns the copy's ID, or `""` if the node doesn't exist.
    pub fn duplicate_node(&mut self, node_id: &str) -> String {
        self.apply(GraphMutation::DuplicateNode {
            id: NodeId::intern(node_id),
        })
        .nodes
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
    }

    pub fn toggle_disabled(&mut self, node_id: &str) -> bool {
        self.apply(GraphMutation::ToggleDisabled {
            id: NodeId::intern(node_id),
        })
        .changed
    }

    pub fn lock(&mut self, node_id: &str) -> bool {
        self.apply(GraphMutation::Lock {
            id: NodeId::intern(node_id),
        })
        .changed
    }

    pub fn unlock(&mut self, node_id: &str) -> bool {
        self.apply(GraphMutation::Unlock {
            id: NodeId::intern(node_id),
        })
        .changed
    }

    /// `ids_json` is a JSON array of node IDs; `edge` is one of
    /// `left`, `right`, `top`, `bottom`, `center`.
    pub fn align(&mut self, ids_json: &str, edge: &str) -> bool {
        let Some(edge) = AlignEdge::parse(edge) else {
            log::warn!("align: unknown edge '{edge}'");
            return false;
        };
        let Some(ids) = parse_ids(ids_json) else {
            return false;
        };
        self.apply(GraphMutation::Align { ids, edge }).changed
    }

    // ─── Connection API ──────────────────────────────────────────────────

    /// Connect two nodes. `kind` defaults to `curved`. Returns the new
    /// connection's ID, or `""` if either endpoint is missing.
    pub fn add_connection(&mut self, from: &str, to: &str, kind: Option<String>, label: Option<String>) -> String {
        let kind = match kind.as_deref().map(ConnectionType::parse) {
            Some(None) => {
                log::warn!("add_connection: unknown type {kind:?}");
                return String::new();
            }
            Some(parsed) => parsed,
            None => None,
        };
        self.apply(GraphMutation::AddConnection {
            from: NodeId::intern(from),
            to: NodeId::intern(to),
            kind,
            id: None,
            label,
        })
        .connections
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> bool {
        self.apply(GraphMutation::RemoveConnection {
            id: ConnectionId::intern(connection_id),
        })
        .changed
    }

    /// `kind` is one of `curved`, `straight`, `stepped`.
    pub fn update_connection_type(&mut self, connection_id: &str, kind: &str) -> bool {
        let Some(kind) = ConnectionType::parse(kind) else {
            log::warn!("update_connection_type: unknown type '{kind}'");
            return false;
        };
        self.apply(GraphMutation::UpdateConnectionType {
            id: ConnectionId::intern(connection_id),
            kind,
        })
        .changed
    }

    /// `None` or an empty string clears the label.
    pub fn update_connection_label(&mut self, connection_id: &str, label: Option<String>) -> bool {
        self.apply(GraphMutation::UpdateConnectionLabel {
            id: ConnectionId::intern(connection_id),
            label: label.filter(|l| !l.is_empty()),
        })
        .changed
    }

    /// Replace a connection record wholesale.
    /// Returns `{"ok":true,"changed":bool}` or `{"ok":false,"error":"..."}`.
    pub fn replace_connection_json(&mut self, connection_id: &str, json: &str) -> String {
        match serde_json::from_str::<Connection>(json) {
            Ok(connection) => {
                let changed = self
                    .apply(GraphMutation::ReplaceConnection {
                        id: ConnectionId::intern(connection_id),
                        connection: Box::new(connection),
                    })
                    .changed;
                serde_json::json!({ "ok": true, "changed": changed }).to_string()
            }
            Err(e) => error_json(e),
        }
    }

    /// Insert an action node into a connection. Returns the node's ID,
    /// or `""` if the connection doesn't resolve.
    pub fn split_connection(&mut self, connection_id: &str) -> String {
        self.apply(GraphMutation::SplitConnection {
            id: ConnectionId::intern(connection_id),
        })
        .nodes
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
    }

    // ─── Edge drag (connection preview) ──────────────────────────────────

    pub fn begin_connection(&mut self, source: &str, screen_x: f64, screen_y: f64, kind: &str) -> bool {
        let source = NodeId::intern(source);
        if !self.engine.workflow().contains_node(source) {
            return false;
        }
        let kind = ConnectionType::parse(kind).unwrap_or_default();
        let start = self.canvas_point(screen_x, screen_y);
        self.engine.state.begin_preview(source, start, kind);
        true
    }

    pub fn update_connection_preview(&mut self, screen_x: f64, screen_y: f64) {
        let end = self.canvas_point(screen_x, screen_y);
        self.engine.state.update_preview(end);
    }

    /// Drop the dragged edge on `target`. Returns the new connection's ID
    /// or `""`.
    pub fn finish_connection(&mut self, target: &str) -> String {
        let Some(preview) = self.engine.state.cancel_preview() else {
            return String::new();
        };
        self.add_connection(
            preview.source.as_str(),
            target,
            Some(preview.kind.as_str().to_string()),
            None,
        )
    }

    pub fn cancel_connection(&mut self) {
        self.engine.state.cancel_preview();
    }

    // ─── Selection API ───────────────────────────────────────────────────

    /// Replace the selection with one node; `""` clears it.
    pub fn select(&mut self, node_id: &str) -> bool {
        if node_id.is_empty() {
            self.engine.state.selection.clear();
            return true;
        }
        let id = NodeId::intern(node_id);
        if self.engine.workflow().contains_node(id) {
            self.engine.state.selection.set_selected(vec![id]);
            true
        } else {
            false
        }
    }

    pub fn set_selection_json(&mut self, ids_json: &str) -> bool {
        let Some(ids) = parse_ids(ids_json) else {
            return false;
        };
        self.engine.state.selection.set_selected(ids);
        true
    }

    /// Shift-click: add or remove one node.
    pub fn toggle_selection(&mut self, node_id: &str) {
        self.engine.state.selection.toggle(NodeId::intern(node_id));
    }

    pub fn clear_selection(&mut self) {
        self.engine.state.selection.clear();
    }

    pub fn focus(&mut self, node_id: Option<String>) {
        let id = node_id.filter(|s| !s.is_empty()).map(|s| NodeId::intern(&s));
        self.engine.state.selection.focus(id);
    }

    pub fn get_selected_ids(&self) -> String {
        to_json(&self.engine.state.selection.selected, "[]")
    }

    pub fn select_all(&mut self) {
        self.engine.select_all();
    }

    /// Marquee select between two screen points.
    pub fn select_in_rect(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let rect = Bounds::from_corners(self.canvas_point(x1, y1), self.canvas_point(x2, y2));
        self.engine.select_in_rect(rect);
    }

    /// Topmost node under a screen point, or `""`.
    pub fn node_at(&self, screen_x: f64, screen_y: f64) -> String {
        self.engine
            .node_at(self.canvas_point(screen_x, screen_y))
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    /// Connection under a screen point, or `""`.
    pub fn connection_at(&self, screen_x: f64, screen_y: f64) -> String {
        self.engine
            .connection_at(self.canvas_point(screen_x, screen_y))
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    // ─── Selection-level commands ────────────────────────────────────────

    pub fn delete_selected(&mut self) -> bool {
        self.commands.record(&mut self.engine, "Delete selection", |e| e.delete_selected())
    }

    pub fn duplicate_selected(&mut self) -> bool {
        self.commands
            .record(&mut self.engine, "Duplicate selection", |e| e.duplicate_selected())
    }

    pub fn toggle_lock_selected(&mut self) -> bool {
        self.commands
            .record(&mut self.engine, "Toggle lock", |e| e.toggle_lock_selected())
    }

    pub fn toggle_disabled_selected(&mut self) -> bool {
        self.commands
            .record(&mut self.engine, "Toggle disabled", |e| e.toggle_disabled_selected())
    }

    pub fn align_selected(&mut self, edge: &str) -> bool {
        match AlignEdge::parse(edge) {
            Some(edge) => self.align_edge_selected(edge),
            None => false,
        }
    }

    /// Copy the selection. Returns how many nodes were copied.
    pub fn copy_selected(&mut self) -> usize {
        let ids = &self.engine.state.selection.selected;
        if ids.is_empty() {
            return 0;
        }
        self.clipboard = Clipboard::copy(self.engine.workflow(), ids);
        self.clipboard.len()
    }

    pub fn cut_selected(&mut self) -> bool {
        if self.copy_selected() == 0 {
            return false;
        }
        self.commands.record(&mut self.engine, "Cut", |e| e.delete_selected())
    }

    /// Paste the clipboard. Returns the pasted IDs as a JSON array,
    /// `[]` when the clipboard is empty.
    pub fn paste(&mut self) -> String {
        to_json(&self.paste_ids(), "[]")
    }

    // ─── Viewport API ────────────────────────────────────────────────────

    pub fn set_zoom(&mut self, zoom: f64) {
        let (min, max) = (self.engine.config.min_zoom, self.engine.config.max_zoom);
        self.engine.state.viewport.set_zoom(zoom.clamp(min, max));
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        self.engine.state.viewport.set_pan(Position::new(x, y));
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.engine.state.viewport.pan_by(dx, dy);
    }

    /// Wheel zoom keeping the canvas point under the cursor fixed.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) {
        let (min, max) = (self.engine.config.min_zoom, self.engine.config.max_zoom);
        self.engine
            .state
            .viewport
            .zoom_at(Position::new(screen_x, screen_y), factor, min, max);
    }

    pub fn toggle_grid(&mut self) {
        self.engine.state.viewport.toggle_grid();
    }

    // ─── Context menus ───────────────────────────────────────────────────

    /// Opening one menu closes any other.
    pub fn open_node_menu(&mut self, ids_json: &str, screen_x: f64, screen_y: f64) -> bool {
        let Some(node_ids) = parse_ids(ids_json) else {
            return false;
        };
        self.engine.state.open_context_menu(ContextMenu::Node {
            node_ids,
            screen: Position::new(screen_x, screen_y),
        });
        true
    }

    pub fn open_canvas_menu(&mut self, screen_x: f64, screen_y: f64) {
        let canvas = self.canvas_point(screen_x, screen_y);
        self.engine.state.open_context_menu(ContextMenu::Canvas {
            screen: Position::new(screen_x, screen_y),
            canvas,
        });
    }

    pub fn open_connection_menu(&mut self, connection_id: &str, screen_x: f64, screen_y: f64) -> bool {
        let connection_id = ConnectionId::intern(connection_id);
        if self.engine.workflow().connection(connection_id).is_none() {
            return false;
        }
        self.engine.state.open_context_menu(ContextMenu::Connection {
            connection_id,
            screen: Position::new(screen_x, screen_y),
        });
        true
    }

    pub fn close_context_menu(&mut self) {
        self.engine.state.close_context_menu();
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.commands.undo(&mut self.engine).is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.commands.redo(&mut self.engine).is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool, "action":"<action_name>"}`
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let action = match ShortcutMap::resolve(key, ctrl, shift, alt, meta) {
            Some(a) => a,
            None => return r#"{"changed":false,"action":"none"}"#.to_string(),
        };
        let changed = self.dispatch_action(action);
        serde_json::json!({ "changed": changed, "action": action.name() }).to_string()
    }

    // ─── Execution ───────────────────────────────────────────────────────

    /// Run a node's `data.code` with `data.input` bound to `input`.
    /// Returns `{"status":"skipped"}`, `{"status":"completed","result":...}`
    /// or `{"status":"failed","error":"..."}`. Never changes the workflow.
    pub fn execute(&self, node_id: &str) -> String {
        let outcome = self.engine.execute(NodeId::intern(node_id), &JsCodeRunner);
        if let ExecOutcome::Completed(result) = &outcome {
            log::info!("{node_id} returned {result}");
        }
        outcome_json(&outcome)
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn to_json<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("serialization failed: {e}");
        fallback.to_string()
    })
}

fn ok_json() -> String {
    r#"{"ok":true}"#.to_string()
}

fn error_json(err: impl std::fmt::Display) -> String {
    serde_json::json!({ "ok": false, "error": err.to_string() }).to_string()
}

fn parse_ids(json: &str) -> Option<Vec<NodeId>> {
    serde_json::from_str(json)
        .map_err(|e| log::warn!("expected a JSON array of node IDs: {e}"))
        .ok()
}

fn outcome_json(outcome: &ExecOutcome) -> String {
    let value = match outcome {
        ExecOutcome::Skipped => serde_json::json!({ "status": "skipped" }),
        ExecOutcome::Completed(result) => serde_json::json!({ "status": "completed", "result": result }),
        ExecOutcome::Failed(err) => serde_json::json!({ "status": "failed", "error": err.to_string() }),
    };
    value.to_string()
}
