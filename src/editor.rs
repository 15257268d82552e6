//! Interaction coordinator.
//!
//! [`Editor`] turns gestures and commands into reducer actions. It owns the
//! [`UndoManager`] (and through it the store), the active [`InputState`], and
//! the [`FrameSlot`] that rate-limits drag updates to one per frame.
//!
//! Every user-visible change is wrapped in exactly one undo operation:
//! continuous gestures bracket themselves with `begin`/`commit`, one-shot
//! commands go through [`UndoManager::run`].

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EditorConfig;
use crate::consts::{AUTO_CREATE_LIFT, MOVE_OPERATION_LABEL, ZOOM_STEP};
use crate::doc::{
    Connector, ConnectorId, ConnectorPatch, Document, DocumentPatch, GridPatch, Node, NodeId, NodeKind, NodePatch,
    RoutingStyle, Selection, ViewportPatch,
};
use crate::geometry::{ArrangeKind, Point, arrangement_targets};
use crate::history::{HistoryStats, UndoManager};
use crate::hit::nodes_in_rect;
use crate::input::{FrameSlot, InputState, SelectMode};
use crate::persist::{self, LoadError};
use crate::reducer::{Action, NodeMove};
use crate::store::{Store, SubscriptionId};

/// Stateful editing session over one document.
#[derive(Debug)]
pub struct Editor {
    history: UndoManager,
    input: InputState,
    frame: FrameSlot,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    /// A session over an empty document.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(config.initial_document(), config)
    }

    /// A session over an existing document.
    #[must_use]
    pub fn with_document(doc: Document, config: EditorConfig) -> Self {
        let store = Store::new(doc, config.canvas);
        Self {
            history: UndoManager::with_limit(store, config.history_limit),
            input: InputState::Idle,
            frame: FrameSlot::default(),
            config,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> &Arc<Document> {
        self.history.state()
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[must_use]
    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    #[must_use]
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Document) + 'static) -> SubscriptionId {
        self.history.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.history.unsubscribe(id)
    }

    /// Dispatch a raw action through the coalescing path.
    pub fn dispatch(&mut self, action: &Action) {
        self.history.dispatch(action);
    }

    // --- Selection ---

    /// Select `id`, combining with the multi-selection per `mode`.
    pub fn select_node(&mut self, id: &NodeId, mode: SelectMode) {
        let doc = Arc::clone(self.state());
        if !doc.nodes.contains_key(id) {
            return;
        }
        let mut ids: Vec<NodeId> = match mode {
            SelectMode::Replace => Vec::new(),
            SelectMode::Add | SelectMode::Toggle => doc.multi_select.iter().cloned().collect(),
        };
        let present = ids.contains(id);
        let primary = if mode == SelectMode::Toggle && present {
            ids.retain(|x| x != id);
            ids.first().cloned()
        } else {
            if !present {
                ids.push(id.clone());
            }
            Some(id.clone())
        };
        self.history.dispatch(&Action::SetMultiSelect(ids));
        self.history.dispatch(&Action::SelectNode(primary));
    }

    pub fn select_connector(&mut self, id: &ConnectorId) {
        if !self.state().connectors.contains_key(id) {
            return;
        }
        self.history.dispatch(&Action::SetMultiSelect(Vec::new()));
        self.history.dispatch(&Action::SelectConnector(Some(id.clone())));
    }

    /// Select every node, the first in id order as primary. Returns the
    /// number selected.
    pub fn select_all(&mut self) -> usize {
        let ids: Vec<NodeId> = self.state().nodes.keys().cloned().collect();
        let Some(first) = ids.first().cloned() else {
            return 0;
        };
        let count = ids.len();
        self.history.dispatch(&Action::SetMultiSelect(ids));
        self.history.dispatch(&Action::SelectNode(Some(first)));
        count
    }

    pub fn clear_selection(&mut self) {
        self.history.dispatch(&Action::SetMultiSelect(Vec::new()));
        self.history.dispatch(&Action::SelectNode(None));
    }

    // --- Drag ---

    /// Start dragging `id` from `world_pt`.
    ///
    /// If `id` is part of the multi-selection the whole selection moves;
    /// otherwise it becomes the only selected node. Returns `false` when the
    /// node does not exist or another gesture is active.
    pub fn begin_drag(&mut self, id: &NodeId, world_pt: Point) -> bool {
        if !self.input.is_idle() || !self.state().nodes.contains_key(id) {
            return false;
        }
        if !self.state().multi_select.contains(id) {
            self.select_node(id, SelectMode::Replace);
        }
        let doc = Arc::clone(self.state());
        let initial: Vec<(NodeId, Point)> = doc
            .multi_select
            .iter()
            .filter_map(|nid| doc.nodes.get(nid).map(|n| (nid.clone(), n.position)))
            .collect();

        self.history.end_coalescing();
        self.history.begin(MOVE_OPERATION_LABEL);
        self.frame = FrameSlot::default();
        tracing::debug!(primary = %id, count = initial.len(), "drag started");
        self.input = InputState::DraggingNodes { primary: id.clone(), grab_world: world_pt, initial };
        true
    }

    /// Record the latest pointer position of a drag.
    ///
    /// Returns `true` when the host should schedule [`Editor::on_frame`].
    pub fn pointer_move(&mut self, world_pt: Point) -> bool {
        match self.input {
            InputState::DraggingNodes { .. } => self.frame.offer(world_pt),
            _ => false,
        }
    }

    /// Apply the pending pointer position, if any.
    pub fn on_frame(&mut self) {
        if let Some(point) = self.frame.take() {
            self.apply_drag(point);
        }
    }

    /// Finish the drag: flush the last pointer position, disarm the frame
    /// slot and commit. Returns `true` if an undo entry was recorded.
    pub fn end_drag(&mut self) -> bool {
        if !matches!(self.input, InputState::DraggingNodes { .. }) {
            return false;
        }
        if let Some(point) = self.frame.take() {
            self.apply_drag(point);
        }
        self.input = InputState::Idle;
        let recorded = self.history.commit();
        tracing::debug!(recorded, "drag ended");
        recorded
    }

    fn apply_drag(&mut self, point: Point) {
        let InputState::DraggingNodes { ref grab_world, ref initial, .. } = self.input else {
            return;
        };
        let (dx, dy) = (point.x - grab_world.x, point.y - grab_world.y);
        let action = match initial.as_slice() {
            [(id, origin)] => Action::MoveNode { id: id.clone(), position: origin.offset(dx, dy) },
            many => Action::MoveNodes(
                many.iter().map(|(id, origin)| NodeMove { id: id.clone(), position: origin.offset(dx, dy) }).collect(),
            ),
        };
        self.history.dispatch(&action);
    }

    // --- Marquee ---

    pub fn begin_marquee(&mut self, world_pt: Point) -> bool {
        if !self.input.is_idle() {
            return false;
        }
        self.input = InputState::Marquee { start: world_pt, current: world_pt };
        true
    }

    /// Grow the marquee to `world_pt` and select every node fully inside it.
    pub fn update_marquee(&mut self, world_pt: Point) {
        let InputState::Marquee { ref mut current, .. } = self.input else {
            return;
        };
        *current = world_pt;
        let Some(rect) = self.input.marquee_rect() else {
            return;
        };
        let ids = nodes_in_rect(self.state(), &rect);
        let primary = ids.first().cloned();
        self.history.dispatch(&Action::SetMultiSelect(ids));
        self.history.dispatch(&Action::SelectNode(primary));
    }

    /// Finish the marquee and return the selected ids.
    pub fn end_marquee(&mut self) -> Vec<NodeId> {
        if !matches!(self.input, InputState::Marquee { .. }) {
            return Vec::new();
        }
        self.input = InputState::Idle;
        self.state().multi_select.iter().cloned().collect()
    }

    /// Abort the marquee and clear the selection it made.
    pub fn cancel_marquee(&mut self) {
        if matches!(self.input, InputState::Marquee { .. }) {
            self.input = InputState::Idle;
            self.clear_selection();
        }
    }

    // --- Connectors ---

    /// Begin drawing a connector out of `source`.
    pub fn start_connector(&mut self, source: &NodeId, world_pt: Point) -> bool {
        if !self.input.is_idle() || !self.state().nodes.contains_key(source) {
            return false;
        }
        self.history.end_coalescing();
        self.history.begin("add-connector");
        self.history.dispatch(&Action::StartDraft { source: source.clone(), point: world_pt });
        self.input = InputState::DrawingConnector { source: source.clone() };
        true
    }

    pub fn update_connector(&mut self, world_pt: Point) {
        if matches!(self.input, InputState::DrawingConnector { .. }) {
            self.history.dispatch(&Action::UpdateDraft(world_pt));
        }
    }

    /// Drop the draft on `target`.
    ///
    /// Creates the connector and commits when the pair is valid; otherwise
    /// the operation is canceled and `None` returned.
    pub fn complete_connector(&mut self, target: Option<&NodeId>) -> Option<ConnectorId> {
        let InputState::DrawingConnector { ref source } = self.input else {
            return None;
        };
        let source = source.clone();
        self.input = InputState::Idle;
        self.history.dispatch(&Action::CancelDraft);
        let Some(connector) = target.and_then(|t| new_connector(self.state(), &source, t)) else {
            self.history.cancel();
            return None;
        };
        let id = connector.id.clone();
        self.history.dispatch(&Action::AddConnector(connector));
        self.history.commit();
        tracing::debug!(connector = %id, "connector drawn");
        Some(id)
    }

    /// Drop the draft on empty canvas: create a `kind` node just above
    /// `world_pt` and connect the source to it, as one undo step.
    ///
    /// Returns `None` (and records nothing) when no draft is active.
    pub fn complete_connector_to_new(&mut self, kind: NodeKind, world_pt: Point) -> Option<(NodeId, ConnectorId)> {
        let InputState::DrawingConnector { ref source } = self.input else {
            return None;
        };
        let source = source.clone();
        self.input = InputState::Idle;
        self.history.dispatch(&Action::CancelDraft);

        let id = NodeId::generate();
        let node = Node::new(id.clone(), kind, world_pt).with_size(self.config.node_size);
        let position = world_pt.offset(0.0, -AUTO_CREATE_LIFT);
        self.history.run("add-node", |store| place_node(store, node, position));
        let Some(connector) = new_connector(self.state(), &source, &id) else {
            self.history.cancel();
            return None;
        };
        let connector_id = connector.id.clone();
        self.history.dispatch(&Action::AddConnector(connector));
        self.history.commit();
        tracing::debug!(node = %id, connector = %connector_id, "node created from dropped connector");
        Some((id, connector_id))
    }

    /// Abandon the draft; nothing is recorded.
    pub fn cancel_connector(&mut self) {
        if matches!(self.input, InputState::DrawingConnector { .. }) {
            self.input = InputState::Idle;
            self.history.dispatch(&Action::CancelDraft);
            self.history.cancel();
        }
    }

    /// Connect `source` to `target` in one undo step.
    ///
    /// Returns `None` for a self-loop, a duplicate pair or a missing node.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Option<ConnectorId> {
        let connector = new_connector(self.state(), source, target)?;
        let id = connector.id.clone();
        self.history.run("add-connector", |store| store.dispatch(&Action::AddConnector(connector)));
        self.state().connectors.contains_key(&id).then_some(id)
    }

    pub fn delete_connector(&mut self, id: &ConnectorId) -> bool {
        self.run_changed("delete-connector", &[Action::DeleteConnector(id.clone())])
    }

    pub fn rename_connector(&mut self, id: &ConnectorId, label: &str) -> bool {
        let patch = ConnectorPatch { label: Some(label.to_string()), ..ConnectorPatch::default() };
        self.run_changed("rename-connector", &[Action::PatchConnector { id: id.clone(), patch }])
    }

    // --- Nodes ---

    /// Create a node of `kind` at `position` (snapped and clamped) and select it.
    pub fn create_node(&mut self, kind: NodeKind, position: Point) -> NodeId {
        let id = NodeId::generate();
        let node = Node::new(id.clone(), kind, position).with_size(self.config.node_size);
        self.history.run("add-node", |store| place_node(store, node, position));
        tracing::debug!(node = %id, kind = kind.as_str(), "node created");
        id
    }

    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        self.run_changed("update-node", &[Action::PatchNode { id: id.clone(), patch }])
    }

    /// Delete the selected connector, or every selected node with its
    /// connectors. Returns the number of entities removed directly.
    pub fn delete_selected(&mut self) -> usize {
        let doc = Arc::clone(self.state());
        let actions: Vec<Action> = match doc.selection {
            Selection::Connector(ref id) => vec![Action::DeleteConnector(id.clone())],
            Selection::Node(_) | Selection::None => {
                let mut ids: Vec<NodeId> = doc.multi_select.iter().cloned().collect();
                if let Some(primary) = doc.selection.node() {
                    if !ids.contains(primary) {
                        ids.push(primary.clone());
                    }
                }
                ids.into_iter().map(Action::DeleteNode).collect()
            }
        };
        let count = actions.len();
        if count == 0 || !self.run_changed("delete-selection", &actions) {
            return 0;
        }
        tracing::debug!(count, "selection deleted");
        count
    }

    // --- Layout ---

    /// Align or distribute the multi-selection. Returns the number of nodes
    /// moved.
    pub fn arrange(&mut self, kind: ArrangeKind) -> usize {
        let doc = Arc::clone(self.state());
        let targets = arrangement_targets(&doc.selected_nodes(), kind);
        let action = match targets.as_slice() {
            [] => return 0,
            [single] => Action::MoveNode { id: single.id.clone(), position: single.position },
            many => Action::MoveNodes(many.iter().map(|t| NodeMove { id: t.id.clone(), position: t.position }).collect()),
        };
        let moved = targets.len();
        if !self.run_changed("arrange-nodes", &[action]) {
            return 0;
        }
        tracing::debug!(kind = kind.as_str(), moved, "nodes arranged");
        moved
    }

    // --- Settings and view ---

    /// Change the default routing style and restyle every connector.
    pub fn set_routing_style(&mut self, style: RoutingStyle) -> bool {
        self.run_changed("routing-style", &[Action::SetRoutingStyle(style)])
    }

    pub fn set_grid(&mut self, patch: GridPatch) -> bool {
        self.run_changed("grid-settings", &[Action::SetGrid(patch)])
    }

    /// Flip grid visibility (and with it snapping).
    pub fn toggle_grid(&mut self) -> bool {
        let enabled = !self.state().grid.enabled;
        self.set_grid(GridPatch { enabled: Some(enabled), ..GridPatch::default() })
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        let patch = self.state().viewport.pan_patch(dx, dy);
        self.run_changed("pan", &[Action::SetViewport(patch)])
    }

    /// Zoom by `steps` wheel notches around a screen-space anchor.
    pub fn zoom_at(&mut self, anchor: Point, steps: i32) -> bool {
        let patch = self.state().viewport.zoom_patch(anchor, ZOOM_STEP.powi(steps));
        self.run_changed("zoom", &[Action::SetViewport(patch)])
    }

    pub fn reset_view(&mut self) -> bool {
        let patch = ViewportPatch { scale: Some(1.0), offset: Some(Point::default()), bounds: None };
        self.run_changed("reset-view", &[Action::SetViewport(patch)])
    }

    // --- Document ---

    /// Remove every node and connector.
    pub fn clear_all(&mut self) -> bool {
        self.abort_gesture();
        let patch = DocumentPatch {
            nodes: Some(BTreeMap::new()),
            connectors: Some(BTreeMap::new()),
            selection: Some(Selection::None),
            multi_select: Some(Vec::new()),
            ..DocumentPatch::default()
        };
        self.run_changed("clear-all", &[Action::Replace(patch)])
    }

    /// Replace the document with a validated JSON payload.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] that rejected the payload; the live document
    /// is left untouched.
    pub fn load_json(&mut self, text: &str) -> Result<(), LoadError> {
        let doc = match persist::parse_document(text) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "document load rejected");
                return Err(e);
            }
        };
        self.abort_gesture();
        let patch = DocumentPatch::replacing_with(&doc);
        self.history.run("load-document", |store| store.dispatch(&Action::Replace(patch)));
        tracing::debug!(nodes = doc.nodes.len(), connectors = doc.connectors.len(), "document loaded");
        Ok(())
    }

    /// The live document as pretty JSON.
    ///
    /// # Errors
    ///
    /// Fails only if a property bag cannot be serialized.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        persist::to_json(self.state())
    }

    // --- History ---

    /// Undo the last operation, abandoning any gesture in progress first.
    pub fn undo(&mut self) -> bool {
        self.abort_gesture();
        self.history.undo()
    }

    /// Redo the last undone operation, abandoning any gesture in progress first.
    pub fn redo(&mut self) -> bool {
        self.abort_gesture();
        self.history.redo()
    }

    // --- Internals ---

    /// End the current gesture early without recording it. A connector
    /// draft is dropped; dragged nodes go back to where the drag found them.
    fn abort_gesture(&mut self) {
        match self.input {
            InputState::DrawingConnector { .. } => {
                self.history.dispatch(&Action::CancelDraft);
            }
            InputState::DraggingNodes { ref initial, .. } => {
                let restore: Vec<Action> = initial
                    .iter()
                    .map(|(id, origin)| Action::PatchNode {
                        id: id.clone(),
                        patch: NodePatch { position: Some(*origin), ..NodePatch::default() },
                    })
                    .collect();
                self.frame = FrameSlot::default();
                for action in &restore {
                    self.history.dispatch(action);
                }
                tracing::debug!(count = restore.len(), "drag aborted");
            }
            InputState::Marquee { .. } => {
                self.input = InputState::Idle;
                return;
            }
            InputState::Idle => return,
        }
        self.input = InputState::Idle;
        self.history.cancel();
    }

    /// Run `actions` as one operation; `true` if the content changed.
    fn run_changed(&mut self, label: &str, actions: &[Action]) -> bool {
        self.history.run(label, |store| {
            let before = Arc::clone(store.state());
            for action in actions {
                store.dispatch(action);
            }
            !before.same_content(store.state())
        })
    }
}

/// Insert `node`, move it to `position` (snapped and clamped) and make it
/// the only selection.
fn place_node(store: &mut Store, node: Node, position: Point) {
    let id = node.id.clone();
    store.dispatch(&Action::AddNode(node));
    store.dispatch(&Action::MoveNode { id: id.clone(), position });
    store.dispatch(&Action::SetMultiSelect(vec![id.clone()]));
    store.dispatch(&Action::SelectNode(Some(id)));
}

/// Connector from `source` to `target` in the document's routing style, or
/// `None` when the pair is not allowed.
fn new_connector(doc: &Document, source: &NodeId, target: &NodeId) -> Option<Connector> {
    if source == target
        || !doc.nodes.contains_key(source)
        || !doc.nodes.contains_key(target)
        || doc.has_connection(source, target)
    {
        return None;
    }
    let id = ConnectorId::generate();
    Some(Connector {
        label: Some(id.to_string()),
        id,
        source: source.clone(),
        target: target.clone(),
        style: doc.routing_style,
    })
}
