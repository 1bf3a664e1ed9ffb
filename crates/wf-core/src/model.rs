//! Workflow data model.
//!
//! A workflow is two ordered stores: nodes (positioned, typed units of work)
//! and connections (directed edges between node IDs). The engine treats the
//! node `type` and the `data` bag as opaque; renderers and parameter editors
//! give them meaning.

use crate::geometry::{Bounds, DEFAULT_NODE_SIZE, Position, Size};
use crate::id::{ConnectionId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::{SmallVec, smallvec};

/// Port identifier. Opaque to the engine.
pub type PortId = String;

/// Node type of nodes created by connection splitting.
pub const ACTION_NODE_TYPE: &str = "action";

// ─── Node data ───────────────────────────────────────────────────────────

/// Open-ended, node-specific configuration.
///
/// Two keys are understood by the execution trigger: `code` (a script
/// string) and `input` (the value bound to `input` when the script runs).
/// Everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeData(Map<String, Value>);

impl NodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The node's script, if `code` holds a non-empty string.
    pub fn code(&self) -> Option<&str> {
        self.0
            .get("code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
    }

    pub fn input(&self) -> Option<&Value> {
        self.0.get("input")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for NodeData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A positioned, typed unit of work on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Node kind tag (`"trigger"`, `"action"`, `"http"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// Top-left anchor in canvas coordinates.
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub inputs: SmallVec<[PortId; 2]>,
    #[serde(default)]
    pub outputs: SmallVec<[PortId; 2]>,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub disabled: bool,
    /// Advisory: the UI refuses drags on locked nodes, the engine does not.
    #[serde(default)]
    pub locked: bool,
}

impl Node {
    pub fn new(id: NodeId, kind: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: name.into(),
            position,
            width: None,
            height: None,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            data: NodeData::default(),
            disabled: false,
            locked: false,
        }
    }

    /// The generic node inserted when a connection is split.
    pub fn action(id: NodeId, position: Position) -> Self {
        Self {
            width: Some(DEFAULT_NODE_SIZE),
            height: Some(DEFAULT_NODE_SIZE),
            inputs: smallvec!["input".to_string()],
            outputs: smallvec!["output".to_string()],
            ..Self::new(id, ACTION_NODE_TYPE, "Action", position)
        }
    }

    pub fn width(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_NODE_SIZE)
    }

    pub fn height(&self) -> f64 {
        self.height.unwrap_or(DEFAULT_NODE_SIZE)
    }

    /// Size with the 70×70 fallback applied.
    pub fn size(&self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.position, self.size())
    }
}

/// Partial node update. Present fields replace the node's wholesale
/// (a shallow merge: `data` is replaced, not deep-merged).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub position: Option<Position>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub inputs: Option<SmallVec<[PortId; 2]>>,
    pub outputs: Option<SmallVec<[PortId; 2]>>,
    pub data: Option<NodeData>,
    pub disabled: Option<bool>,
    pub locked: Option<bool>,
}

impl NodePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, node: &mut Node) {
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(name) = self.name {
            node.name = name;
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(width) = self.width {
            node.width = Some(width);
        }
        if let Some(height) = self.height {
            node.height = Some(height);
        }
        if let Some(inputs) = self.inputs {
            node.inputs = inputs;
        }
        if let Some(outputs) = self.outputs {
            node.outputs = outputs;
        }
        if let Some(data) = self.data {
            node.data = data;
        }
        if let Some(disabled) = self.disabled {
            node.disabled = disabled;
        }
        if let Some(locked) = self.locked {
            node.locked = locked;
        }
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// Rendering style of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Curved,
    Straight,
    Stepped,
}

impl ConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Curved => "curved",
            Self::Straight => "straight",
            Self::Stepped => "stepped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "curved" => Some(Self::Curved),
            "straight" => Some(Self::Straight),
            "stepped" => Some(Self::Stepped),
            _ => None,
        }
    }
}

/// A directed edge `from → to`. Self-loops and parallel edges are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type", default)]
    pub kind: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    pub fn new(id: ConnectionId, from: NodeId, to: NodeId) -> Self {
        Self {
            id,
            from,
            to,
            kind: ConnectionType::default(),
            label: None,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}
