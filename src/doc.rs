//! Document model: nodes, connectors, and the root `Document` aggregate.
//!
//! This module defines the data that describes a diagram (`Node`,
//! `Connector`), sparse-update types for incremental edits (`NodePatch`,
//! `ConnectorPatch`, `GridPatch`), the transient editing state that lives
//! beside the diagram (`Selection`, `ConnectorDraft`), and the bulk
//! replacement payload used by load/import (`DocumentPatch`).
//!
//! The node and connector maps are held behind `Arc` and only ever changed
//! through `Arc::make_mut` by the reducer, so successive documents (and undo
//! snapshots) share every slice an action did not touch.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{DEFAULT_GRID_SIZE, DEFAULT_NODE_DESCRIPTION, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};
use crate::geometry::{Point, Rect, Size};
pub use crate::viewport::{ScaleBounds, Viewport, ViewportPatch};

// =============================================================
// Identifiers
// =============================================================

fn short_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    suffix
}

/// Stable identifier of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id of the form `blk_<8 hex>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("blk_{}", short_suffix()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Stable identifier of a connector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(String);

impl ConnectorId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id of the form `conn_<8 hex>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("conn_{}", short_suffix()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// =============================================================
// Nodes
// =============================================================

/// Category of a flowchart node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Process,
    Decision,
    Io,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [Self::Start, Self::Process, Self::Decision, Self::Io, Self::End];

    /// Wire name, e.g. `"decision"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Process => "process",
            Self::Decision => "decision",
            Self::Io => "io",
            Self::End => "end",
        }
    }

    /// Default title for a new node of this kind.
    #[must_use]
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Process => "Process",
            Self::Decision => "Decision",
            Self::Io => "Io",
            Self::End => "End",
        }
    }

    /// Parse a wire name. Returns `None` for unknown kinds.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

fn empty_properties() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A positioned, sized block in the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Top-left corner in document coordinates.
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub title: String,
    /// Opaque rich-text payload.
    #[serde(default, rename = "descriptionHtml")]
    pub description: String,
    /// Free-form JSON property bag.
    #[serde(default = "empty_properties")]
    pub properties: serde_json::Value,
}

impl Node {
    /// A node with default size, title and description.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind, position: Point) -> Self {
        Self {
            id,
            kind,
            position,
            size: Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
            title: kind.default_title().to_string(),
            description: DEFAULT_NODE_DESCRIPTION.to_string(),
            properties: empty_properties(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Bounding box in document coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}

/// Sparse update for a node. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "descriptionHtml")]
    pub description: Option<String>,
    /// Replaces the whole property bag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl NodePatch {
    /// A copy of `node` with this patch applied.
    #[must_use]
    pub fn applied_to(&self, node: &Node) -> Node {
        let mut next = node.clone();
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(position) = self.position {
            next.position = position;
        }
        if let Some(size) = self.size {
            next.size = size;
        }
        if let Some(ref title) = self.title {
            next.title.clone_from(title);
        }
        if let Some(ref description) = self.description {
            next.description.clone_from(description);
        }
        if let Some(ref properties) = self.properties {
            next.properties.clone_from(properties);
        }
        next
    }
}

// =============================================================
// Connectors
// =============================================================

/// Path shape used to draw connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStyle {
    /// Cubic S-curve, horizontal at both ends.
    #[default]
    #[serde(alias = "bezier")]
    Curved,
    /// Three right-angle segments.
    Orthogonal,
}

/// A directed edge between two distinct nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub style: RoutingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connector {
    /// Label shown for this connector; falls back to its id.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }

    /// Whether `node` is either endpoint of this connector.
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// Sparse update for a connector. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<RoutingStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ConnectorPatch {
    /// A copy of `connector` with this patch applied.
    #[must_use]
    pub fn applied_to(&self, connector: &Connector) -> Connector {
        let mut next = connector.clone();
        if let Some(ref source) = self.source {
            next.source = source.clone();
        }
        if let Some(ref target) = self.target {
            next.target = target.clone();
        }
        if let Some(style) = self.style {
            next.style = style;
        }
        if let Some(ref label) = self.label {
            next.label = Some(label.clone());
        }
        next
    }
}

// =============================================================
// Grid
// =============================================================

/// Background grid and snapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub enabled: bool,
    /// Cell size in document units.
    pub size: f64,
    pub snap: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { enabled: true, size: DEFAULT_GRID_SIZE, snap: true }
    }
}

impl GridSettings {
    /// Cell size to snap to, or `None` when snapping is off.
    ///
    /// A non-positive configured size falls back to the default cell.
    #[must_use]
    pub fn snap_cell(&self) -> Option<f64> {
        if !(self.enabled && self.snap) {
            return None;
        }
        Some(if self.size > 0.0 { self.size } else { DEFAULT_GRID_SIZE })
    }

    /// A copy with `patch` applied.
    #[must_use]
    pub fn patched(&self, patch: &GridPatch) -> GridSettings {
        GridSettings {
            enabled: patch.enabled.unwrap_or(self.enabled),
            size: patch.size.unwrap_or(self.size),
            snap: patch.snap.unwrap_or(self.snap),
        }
    }
}

/// Sparse grid update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GridPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap: Option<bool>,
}

// =============================================================
// Transient editing state
// =============================================================

/// Single selection: a node, a connector, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Connector(ConnectorId),
}

impl Selection {
    #[must_use]
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn connector(&self) -> Option<&ConnectorId> {
        match self {
            Self::Connector(id) => Some(id),
            _ => None,
        }
    }
}

/// A connector being drawn: its source and the current pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorDraft {
    pub source: NodeId,
    pub point: Point,
}

// =============================================================
// Document
// =============================================================

/// The full diagram state.
///
/// Only nodes, connectors, viewport, grid and routing style are serialized.
/// Selection, the connector draft and the revision counter are transient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub nodes: Arc<BTreeMap<NodeId, Node>>,
    pub connectors: Arc<BTreeMap<ConnectorId, Connector>>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub grid: GridSettings,
    /// Default style; every connector is rewritten when it changes.
    #[serde(default)]
    pub routing_style: RoutingStyle,
    #[serde(skip)]
    pub selection: Selection,
    /// Ordered multi-selection of node ids.
    #[serde(skip)]
    pub multi_select: IndexSet<NodeId>,
    #[serde(skip)]
    pub draft: Option<ConnectorDraft>,
    /// Incremented by every content-changing action.
    #[serde(skip)]
    pub revision: u64,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn connector(&self, id: &ConnectorId) -> Option<&Connector> {
        self.connectors.get(id)
    }

    /// Whether a connector already runs from `source` to `target`.
    #[must_use]
    pub fn has_connection(&self, source: &NodeId, target: &NodeId) -> bool {
        self.connectors.values().any(|c| &c.source == source && &c.target == target)
    }

    /// Connectors with `node` as source or target. The iterator borrows
    /// only the document.
    pub fn connectors_touching<'a>(&'a self, node: &NodeId) -> impl Iterator<Item = &'a Connector> + use<'a> {
        let node = node.clone();
        self.connectors.values().filter(move |c| c.touches(&node))
    }

    /// Multi-selected nodes that still exist, in selection order.
    #[must_use]
    pub fn selected_nodes(&self) -> Vec<&Node> {
        self.multi_select.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    /// Structural equality restricted to the slices undo/redo cares about:
    /// nodes, connectors, viewport, grid and routing style.
    #[must_use]
    pub fn same_content(&self, other: &Document) -> bool {
        (Arc::ptr_eq(&self.nodes, &other.nodes) || self.nodes == other.nodes)
            && (Arc::ptr_eq(&self.connectors, &other.connectors) || self.connectors == other.connectors)
            && self.viewport == other.viewport
            && self.grid == other.grid
            && self.routing_style == other.routing_style
    }
}

/// Partial document shallow-merged over the live one by a bulk replace.
///
/// Used by load/import and "clear all". Present fields replace the live value
/// wholesale; absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<BTreeMap<NodeId, Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectors: Option<BTreeMap<ConnectorId, Connector>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_style: Option<RoutingStyle>,
    #[serde(skip)]
    pub selection: Option<Selection>,
    #[serde(skip)]
    pub multi_select: Option<Vec<NodeId>>,
}

impl DocumentPatch {
    /// Patch that replaces every serialized slice with `doc`'s and clears
    /// both selections.
    #[must_use]
    pub fn replacing_with(doc: &Document) -> Self {
        Self {
            nodes: Some(doc.nodes.as_ref().clone()),
            connectors: Some(doc.connectors.as_ref().clone()),
            viewport: Some(doc.viewport),
            grid: Some(doc.grid),
            routing_style: Some(doc.routing_style),
            selection: Some(Selection::None),
            multi_select: Some(Vec::new()),
        }
    }

    /// Merge this patch into `doc`.
    pub fn merge_into(&self, doc: &mut Document) {
        if let Some(ref nodes) = self.nodes {
            doc.nodes = Arc::new(nodes.clone());
        }
        if let Some(ref connectors) = self.connectors {
            doc.connectors = Arc::new(connectors.clone());
        }
        if let Some(viewport) = self.viewport {
            doc.viewport = viewport;
        }
        if let Some(grid) = self.grid {
            doc.grid = grid;
        }
        if let Some(style) = self.routing_style {
            doc.routing_style = style;
        }
        if let Some(ref selection) = self.selection {
            doc.selection = selection.clone();
        }
        if let Some(ref ids) = self.multi_select {
            doc.multi_select = ids.iter().cloned().collect();
        }
    }
}
