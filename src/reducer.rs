//! The pure state-transition function.
//!
//! [`apply`] maps a document and an [`Action`] to the next document. A no-op
//! returns the input `Arc` itself (so `Arc::ptr_eq` detects it); any change
//! yields a fresh `Document` whose untouched maps are still shared with the
//! input.
//!
//! Every content-changing branch bumps `revision`. Connector drafting and
//! selection changes are transient and leave it alone.

#[cfg(test)]
#[path = "reducer_test.rs"]
mod reducer_test;

use std::sync::Arc;

use indexmap::IndexSet;

use crate::doc::{
    Connector, ConnectorDraft, ConnectorId, ConnectorPatch, Document, DocumentPatch, GridPatch, Node, NodeId, NodePatch, RoutingStyle,
    Selection, ViewportPatch,
};
use crate::geometry::{CanvasSize, Point, Rect, clamp_to_canvas, group_correction, snap_to_grid};

/// Requested new position for one node in a group move.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMove {
    pub id: NodeId,
    pub position: Point,
}

/// Every state transition the reducer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddNode(Node),
    PatchNode { id: NodeId, patch: NodePatch },
    /// Snap, clamp, then move a single node.
    MoveNode { id: NodeId, position: Point },
    /// Move a group with one shared boundary correction.
    MoveNodes(Vec<NodeMove>),
    /// Remove a node and every connector touching it.
    DeleteNode(NodeId),
    AddConnector(Connector),
    PatchConnector { id: ConnectorId, patch: ConnectorPatch },
    DeleteConnector(ConnectorId),
    SetRoutingStyle(RoutingStyle),
    StartDraft { source: NodeId, point: Point },
    UpdateDraft(Point),
    CancelDraft,
    SelectNode(Option<NodeId>),
    SelectConnector(Option<ConnectorId>),
    SetMultiSelect(Vec<NodeId>),
    SetViewport(ViewportPatch),
    SetGrid(GridPatch),
    BumpRevision,
    /// Shallow-merge a partial document (load/import).
    Replace(DocumentPatch),
}

impl Action {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "add_node",
            Self::PatchNode { .. } => "patch_node",
            Self::MoveNode { .. } => "move_node",
            Self::MoveNodes(_) => "move_nodes",
            Self::DeleteNode(_) => "delete_node",
            Self::AddConnector(_) => "add_connector",
            Self::PatchConnector { .. } => "patch_connector",
            Self::DeleteConnector(_) => "delete_connector",
            Self::SetRoutingStyle(_) => "set_routing_style",
            Self::StartDraft { .. } => "start_draft",
            Self::UpdateDraft(_) => "update_draft",
            Self::CancelDraft => "cancel_draft",
            Self::SelectNode(_) => "select_node",
            Self::SelectConnector(_) => "select_connector",
            Self::SetMultiSelect(_) => "set_multi_select",
            Self::SetViewport(_) => "set_viewport",
            Self::SetGrid(_) => "set_grid",
            Self::BumpRevision => "bump_revision",
            Self::Replace(_) => "replace",
        }
    }

    /// Whether this is a node move (single or group).
    #[must_use]
    pub fn is_move(&self) -> bool {
        matches!(self, Self::MoveNode { .. } | Self::MoveNodes(_))
    }
}

/// Apply `action` on the default canvas.
#[must_use]
pub fn apply(doc: &Arc<Document>, action: &Action) -> Arc<Document> {
    apply_in(doc, action, CanvasSize::default())
}

/// Apply `action`, clamping moves into `canvas`.
#[must_use]
pub fn apply_in(doc: &Arc<Document>, action: &Action, canvas: CanvasSize) -> Arc<Document> {
    match action {
        Action::AddNode(node) => revise(doc, |d| {
            Arc::make_mut(&mut d.nodes).insert(node.id.clone(), node.clone());
        }),
        Action::PatchNode { id, patch } => patch_node(doc, id, patch),
        Action::MoveNode { id, position } => move_node(doc, id, *position, canvas),
        Action::MoveNodes(moves) => move_nodes(doc, moves, canvas),
        Action::DeleteNode(id) => delete_node(doc, id),
        Action::AddConnector(connector) => add_connector(doc, connector),
        Action::PatchConnector { id, patch } => patch_connector(doc, id, patch),
        Action::DeleteConnector(id) => delete_connector(doc, id),
        Action::SetRoutingStyle(style) => set_routing_style(doc, *style),
        Action::StartDraft { source, point } => {
            if !doc.nodes.contains_key(source) {
                return Arc::clone(doc);
            }
            transient(doc, |d| {
                d.draft = Some(ConnectorDraft { source: source.clone(), point: *point });
            })
        }
        Action::UpdateDraft(point) => match doc.draft {
            Some(ref draft) if draft.point != *point => transient(doc, |d| {
                if let Some(ref mut draft) = d.draft {
                    draft.point = *point;
                }
            }),
            _ => Arc::clone(doc),
        },
        Action::CancelDraft => {
            if doc.draft.is_none() {
                return Arc::clone(doc);
            }
            transient(doc, |d| d.draft = None)
        }
        Action::SelectNode(id) => {
            let next = match id {
                Some(id) if doc.nodes.contains_key(id) => Selection::Node(id.clone()),
                Some(_) => return Arc::clone(doc),
                None => Selection::None,
            };
            select(doc, next)
        }
        Action::SelectConnector(id) => {
            let next = match id {
                Some(id) if doc.connectors.contains_key(id) => Selection::Connector(id.clone()),
                Some(_) => return Arc::clone(doc),
                None => Selection::None,
            };
            select(doc, next)
        }
        Action::SetMultiSelect(ids) => set_multi_select(doc, ids),
        Action::SetViewport(patch) => {
            let viewport = doc.viewport.patched(patch);
            if viewport == doc.viewport {
                return Arc::clone(doc);
            }
            revise(doc, |d| d.viewport = viewport)
        }
        Action::SetGrid(patch) => {
            let grid = doc.grid.patched(patch);
            if grid == doc.grid {
                return Arc::clone(doc);
            }
            revise(doc, |d| d.grid = grid)
        }
        Action::BumpRevision => revise(doc, |_| {}),
        Action::Replace(patch) => revise(doc, |d| patch.merge_into(d)),
    }
}

/// Clone the document shell, mutate it, and bump the revision.
fn revise(doc: &Arc<Document>, f: impl FnOnce(&mut Document)) -> Arc<Document> {
    let mut next = Document::clone(doc);
    f(&mut next);
    next.revision += 1;
    Arc::new(next)
}

/// Like [`revise`] without touching the revision.
fn transient(doc: &Arc<Document>, f: impl FnOnce(&mut Document)) -> Arc<Document> {
    let mut next = Document::clone(doc);
    f(&mut next);
    Arc::new(next)
}

fn select(doc: &Arc<Document>, selection: Selection) -> Arc<Document> {
    if doc.selection == selection {
        return Arc::clone(doc);
    }
    transient(doc, |d| d.selection = selection)
}

fn set_multi_select(doc: &Arc<Document>, ids: &[NodeId]) -> Arc<Document> {
    let mut next = IndexSet::with_capacity(ids.len());
    for id in ids {
        if doc.nodes.contains_key(id) {
            next.insert(id.clone());
        }
    }
    if next.iter().eq(doc.multi_select.iter()) {
        return Arc::clone(doc);
    }
    transient(doc, |d| d.multi_select = next)
}

fn patch_node(doc: &Arc<Document>, id: &NodeId, patch: &NodePatch) -> Arc<Document> {
    let Some(node) = doc.nodes.get(id) else {
        return Arc::clone(doc);
    };
    let patched = patch.applied_to(node);
    if &patched == node {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        Arc::make_mut(&mut d.nodes).insert(id.clone(), patched);
    })
}

fn snapped(doc: &Document, position: Point) -> Point {
    match doc.grid.snap_cell() {
        Some(cell) => snap_to_grid(position, cell),
        None => position,
    }
}

fn move_node(doc: &Arc<Document>, id: &NodeId, position: Point, canvas: CanvasSize) -> Arc<Document> {
    let Some(node) = doc.nodes.get(id) else {
        return Arc::clone(doc);
    };
    let position = clamp_to_canvas(snapped(doc, position), node.size, canvas);
    if position == node.position {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        if let Some(node) = Arc::make_mut(&mut d.nodes).get_mut(id) {
            node.position = position;
        }
    })
}

fn move_nodes(doc: &Arc<Document>, moves: &[NodeMove], canvas: CanvasSize) -> Arc<Document> {
    let mut planned: Vec<(&NodeId, Point, Rect)> = Vec::with_capacity(moves.len());
    for m in moves {
        if let Some(node) = doc.nodes.get(&m.id) {
            let position = snapped(doc, m.position);
            planned.push((&m.id, position, Rect::from_origin_size(position, node.size)));
        }
    }
    let Some(bounds) = planned.iter().map(|(_, _, r)| *r).reduce(Rect::union) else {
        return Arc::clone(doc);
    };
    let (dx, dy) = group_correction(bounds, canvas);

    let changed: Vec<(&NodeId, Point)> = planned
        .into_iter()
        .map(|(id, p, _)| (id, p.offset(dx, dy)))
        .filter(|(id, p)| doc.nodes.get(*id).is_some_and(|n| n.position != *p))
        .collect();
    if changed.is_empty() {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        let nodes = Arc::make_mut(&mut d.nodes);
        for (id, position) in changed {
            if let Some(node) = nodes.get_mut(id) {
                node.position = position;
            }
        }
    })
}

fn delete_node(doc: &Arc<Document>, id: &NodeId) -> Arc<Document> {
    if !doc.nodes.contains_key(id) {
        return Arc::clone(doc);
    }
    let doomed: Vec<ConnectorId> = doc.connectors_touching(id).map(|c| c.id.clone()).collect();
    let clear_selection = match doc.selection {
        Selection::Node(ref selected) => selected == id,
        Selection::Connector(ref selected) => doomed.contains(selected),
        Selection::None => false,
    };
    let clear_draft = doc.draft.as_ref().is_some_and(|draft| &draft.source == id);
    revise(doc, |d| {
        Arc::make_mut(&mut d.nodes).remove(id);
        if !doomed.is_empty() {
            let connectors = Arc::make_mut(&mut d.connectors);
            for cid in &doomed {
                connectors.remove(cid);
            }
        }
        d.multi_select.shift_remove(id);
        if clear_selection {
            d.selection = Selection::None;
        }
        if clear_draft {
            d.draft = None;
        }
    })
}

/// Whether `connector` may exist in `doc`, ignoring the connector with id
/// `replacing` when checking for duplicate pairs.
fn connector_allowed(doc: &Document, connector: &Connector, replacing: Option<&ConnectorId>) -> bool {
    connector.source != connector.target
        && doc.nodes.contains_key(&connector.source)
        && doc.nodes.contains_key(&connector.target)
        && !doc.connectors.values().any(|c| {
            Some(&c.id) != replacing && c.source == connector.source && c.target == connector.target
        })
}

fn add_connector(doc: &Arc<Document>, connector: &Connector) -> Arc<Document> {
    if doc.connectors.contains_key(&connector.id) || !connector_allowed(doc, connector, None) {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        Arc::make_mut(&mut d.connectors).insert(connector.id.clone(), connector.clone());
    })
}

fn patch_connector(doc: &Arc<Document>, id: &ConnectorId, patch: &ConnectorPatch) -> Arc<Document> {
    let Some(connector) = doc.connectors.get(id) else {
        return Arc::clone(doc);
    };
    let patched = patch.applied_to(connector);
    if &patched == connector || !connector_allowed(doc, &patched, Some(id)) {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        Arc::make_mut(&mut d.connectors).insert(id.clone(), patched);
    })
}

fn delete_connector(doc: &Arc<Document>, id: &ConnectorId) -> Arc<Document> {
    if !doc.connectors.contains_key(id) {
        return Arc::clone(doc);
    }
    let clear_selection = doc.selection.connector() == Some(id);
    revise(doc, |d| {
        Arc::make_mut(&mut d.connectors).remove(id);
        if clear_selection {
            d.selection = Selection::None;
        }
    })
}

fn set_routing_style(doc: &Arc<Document>, style: RoutingStyle) -> Arc<Document> {
    if doc.routing_style == style {
        return Arc::clone(doc);
    }
    revise(doc, |d| {
        d.routing_style = style;
        if d.connectors.values().any(|c| c.style != style) {
            for connector in Arc::make_mut(&mut d.connectors).values_mut() {
                connector.style = style;
            }
        }
    })
}
