//! Editor UI state: selection, viewport, context menus, connection preview.
//!
//! None of this is subject to graph invariants except that references to
//! removed nodes and connections are pruned (see [`EditorState::forget_node`]).

use serde::{Deserialize, Serialize};
use wf_core::{ConnectionId, ConnectionType, NodeId, Position, Workflow};

// ─── Selection ───────────────────────────────────────────────────────────

/// A focused node plus an independent multi-selection. The two are not
/// kept in lockstep; UI layers reconcile them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub focused: Option<NodeId>,
    pub selected: Vec<NodeId>,
}

impl Selection {
    pub fn focus(&mut self, id: Option<NodeId>) {
        self.focused = id;
    }

    /// Replace the selection with a single node.
    pub fn select(&mut self, id: NodeId) {
        self.selected = vec![id];
    }

    pub fn set_selected(&mut self, ids: Vec<NodeId>) {
        self.selected = ids;
    }

    /// Shift-click behavior: add if absent, remove if present.
    pub fn toggle(&mut self, id: NodeId) {
        if let Some(pos) = self.selected.iter().position(|s| *s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.focused = None;
    }

    /// Drop every reference to `id`.
    pub fn prune(&mut self, id: NodeId) {
        self.selected.retain(|s| *s != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// Pan/zoom transform: `screen = canvas * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub zoom: f64,
    pub pan: Position,
    pub show_grid: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Position::default(),
            show_grid: true,
        }
    }
}

impl Viewport {
    pub fn screen_to_canvas(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn canvas_to_screen(&self, canvas: Position) -> Position {
        Position::new(
            canvas.x * self.zoom + self.pan.x,
            canvas.y * self.zoom + self.pan.y,
        )
    }

    /// Raw setter, no clamping.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn set_pan(&mut self, pan: Position) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// Multiply zoom by `factor`, clamped to `[min, max]`.
    pub fn zoom_by(&mut self, factor: f64, min: f64, max: f64) {
        self.zoom = (self.zoom * factor).clamp(min, max);
    }

    /// Zoom keeping the canvas point under `screen` fixed (wheel zoom).
    pub fn zoom_at(&mut self, screen: Position, factor: f64, min: f64, max: f64) {
        let anchor = self.screen_to_canvas(screen);
        self.zoom_by(factor, min, max);
        self.pan = Position::new(
            screen.x - anchor.x * self.zoom,
            screen.y - anchor.y * self.zoom,
        );
    }

    pub fn toggle_grid(&mut self) {
        self.show_grid = !self.show_grid;
    }
}

// ─── Context menus ───────────────────────────────────────────────────────

/// The three context menus. The editor holds at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContextMenu {
    #[serde(rename_all = "camelCase")]
    Node {
        node_ids: Vec<NodeId>,
        screen: Position,
    },
    Canvas {
        screen: Position,
        canvas: Position,
    },
    #[serde(rename_all = "camelCase")]
    Connection {
        connection_id: ConnectionId,
        screen: Position,
    },
}

// ─── Connection preview ──────────────────────────────────────────────────

/// An edge being dragged out of `source`, not yet attached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPreview {
    pub source: NodeId,
    pub start: Position,
    pub end: Position,
    #[serde(rename = "type")]
    pub kind: ConnectionType,
}

// ─── Aggregate ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub selection: Selection,
    pub viewport: Viewport,
    pub context_menu: Option<ContextMenu>,
    pub preview: Option<ConnectionPreview>,
}

impl EditorState {
    /// Opening a menu replaces whichever menu was open.
    pub fn open_context_menu(&mut self, menu: ContextMenu) {
        self.context_menu = Some(menu);
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    pub fn begin_preview(&mut self, source: NodeId, start: Position, kind: ConnectionType) {
        self.preview = Some(ConnectionPreview {
            source,
            start,
            end: start,
            kind,
        });
    }

    pub fn update_preview(&mut self, end: Position) {
        if let Some(preview) = &mut self.preview {
            preview.end = end;
        }
    }

    pub fn cancel_preview(&mut self) -> Option<ConnectionPreview> {
        self.preview.take()
    }

    /// Prune references to a removed node and its cascaded connections.
    pub fn forget_node(&mut self, id: NodeId, cascaded: &[ConnectionId]) {
        self.selection.prune(id);

        let close = match &mut self.context_menu {
            Some(ContextMenu::Node { node_ids, .. }) => {
                node_ids.retain(|n| *n != id);
                node_ids.is_empty()
            }
            Some(ContextMenu::Connection { connection_id, .. }) => cascaded.contains(connection_id),
            _ => false,
        };
        if close {
            self.context_menu = None;
        }

        if self.preview.is_some_and(|p| p.source == id) {
            self.preview = None;
        }
    }

    pub fn forget_connection(&mut self, id: ConnectionId) {
        if matches!(&self.context_menu, Some(ContextMenu::Connection { connection_id, .. }) if *connection_id == id)
        {
            self.context_menu = None;
        }
    }

    /// Drop references to anything `workflow` no longer contains
    /// (after undo/redo swaps whole snapshots).
    pub fn retain_existing(&mut self, workflow: &Workflow) {
        let gone: Vec<NodeId> = self
            .selection
            .selected
            .iter()
            .copied()
            .chain(self.selection.focused)
            .chain(self.preview.map(|p| p.source))
            .filter(|id| !workflow.contains_node(*id))
            .collect();
        for id in gone {
            self.forget_node(id, &[]);
        }
        if let Some(ContextMenu::Node { node_ids, .. }) = &mut self.context_menu {
            node_ids.retain(|id| workflow.contains_node(*id));
            if node_ids.is_empty() {
                self.context_menu = None;
            }
        }
        if let Some(ContextMenu::Connection { connection_id, .. }) = &self.context_menu
            && workflow.connection(*connection_id).is_none()
        {
            self.context_menu = None;
        }
    }
}
