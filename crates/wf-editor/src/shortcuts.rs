//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so every host resolves keys the same way.

use wf_core::AlignEdge;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Copy,
    Cut,
    Paste,
    ToggleLock,
    ToggleDisabled,
    Align(AlignEdge),

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ToggleGrid,

    // ── UI ──
    /// Clear selection, close menus, cancel an edge drag.
    Escape,
}

impl ShortcutAction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Delete => "delete",
            Self::SelectAll => "selectAll",
            Self::Duplicate => "duplicate",
            Self::Copy => "copy",
            Self::Cut => "cut",
            Self::Paste => "paste",
            Self::ToggleLock => "toggleLock",
            Self::ToggleDisabled => "toggleDisabled",
            Self::Align(AlignEdge::Left) => "alignLeft",
            Self::Align(AlignEdge::Right) => "alignRight",
            Self::Align(AlignEdge::Top) => "alignTop",
            Self::Align(AlignEdge::Bottom) => "alignBottom",
            Self::Align(AlignEdge::Center) => "alignCenter",
            Self::ZoomIn => "zoomIn",
            Self::ZoomOut => "zoomOut",
            Self::ZoomReset => "zoomReset",
            Self::ToggleGrid => "toggleGrid",
            Self::Escape => "escape",
        }
    }
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "l" | "L" => Some(ShortcutAction::ToggleLock),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        if alt {
            let edge = match key {
                "a" | "A" => AlignEdge::Left,
                "d" | "D" => AlignEdge::Right,
                "w" | "W" => AlignEdge::Top,
                "s" | "S" => AlignEdge::Bottom,
                "h" | "H" => AlignEdge::Center,
                _ => return None,
            };
            return Some(ShortcutAction::Align(edge));
        }

        if shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Escape),
            "g" | "G" => Some(ShortcutAction::ToggleGrid),
            "e" | "E" => Some(ShortcutAction::ToggleDisabled),
            _ => None,
        }
    }
}
