#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{GridSettings, NodeKind};
use crate::geometry::Size;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn id(s: &str) -> NodeId {
    NodeId::new(s)
}

fn cid(s: &str) -> ConnectorId {
    ConnectorId::new(s)
}

fn node(name: &str, x: f64, y: f64) -> Node {
    Node::new(id(name), NodeKind::Process, pt(x, y)).with_size(Size::new(100.0, 50.0))
}

fn connector(name: &str, source: &str, target: &str) -> Connector {
    Connector { id: cid(name), source: id(source), target: id(target), style: RoutingStyle::Curved, label: None }
}

fn no_grid() -> GridSettings {
    GridSettings { enabled: false, ..GridSettings::default() }
}

fn doc(nodes: Vec<Node>, connectors: Vec<Connector>) -> Arc<Document> {
    Arc::new(Document {
        nodes: Arc::new(nodes.into_iter().map(|n| (n.id.clone(), n)).collect()),
        connectors: Arc::new(connectors.into_iter().map(|c| (c.id.clone(), c)).collect()),
        grid: no_grid(),
        ..Document::default()
    })
}

fn three_nodes() -> Arc<Document> {
    doc(
        vec![node("a", 0.0, 0.0), node("b", 200.0, 0.0), node("c", 400.0, 0.0)],
        vec![connector("ab", "a", "b"), connector("bc", "b", "c"), connector("ca", "c", "a")],
    )
}

fn position(d: &Document, name: &str) -> Point {
    d.nodes[&id(name)].position
}

// =============================================================
// Action metadata
// =============================================================

#[test]
fn only_moves_are_moves() {
    assert!(Action::MoveNode { id: id("a"), position: pt(0.0, 0.0) }.is_move());
    assert!(Action::MoveNodes(vec![]).is_move());
    assert!(!Action::DeleteNode(id("a")).is_move());
    assert_eq!(Action::BumpRevision.name(), "bump_revision");
}

// =============================================================
// Nodes
// =============================================================

#[test]
fn add_node_inserts_and_bumps_revision() {
    let d0 = doc(vec![], vec![]);
    let d1 = apply(&d0, &Action::AddNode(node("a", 10.0, 10.0)));
    assert_eq!(d1.nodes.len(), 1);
    assert_eq!(d1.revision, d0.revision + 1);
    assert!(d0.nodes.is_empty());
}

#[test]
fn untouched_maps_are_shared() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::MoveNode { id: id("a"), position: pt(50.0, 50.0) });
    assert!(Arc::ptr_eq(&d0.connectors, &d1.connectors));
    assert!(!Arc::ptr_eq(&d0.nodes, &d1.nodes));
}

#[test]
fn patch_node_replaces_subset() {
    let d0 = three_nodes();
    let patch = NodePatch { title: Some("Check".into()), kind: Some(NodeKind::Decision), ..NodePatch::default() };
    let d1 = apply(&d0, &Action::PatchNode { id: id("a"), patch });
    let a = &d1.nodes[&id("a")];
    assert_eq!(a.title, "Check");
    assert_eq!(a.kind, NodeKind::Decision);
    assert_eq!(a.position, pt(0.0, 0.0));
    assert_eq!(d1.revision, 1);
}

#[test]
fn patch_unknown_node_is_noop() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::PatchNode { id: id("ghost"), patch: NodePatch::default() });
    assert!(Arc::ptr_eq(&d0, &d1));
}

#[test]
fn patch_without_change_is_noop() {
    let d0 = three_nodes();
    let patch = NodePatch { position: Some(pt(0.0, 0.0)), ..NodePatch::default() };
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::PatchNode { id: id("a"), patch })));
}

// =============================================================
// Single move
// =============================================================

#[test]
fn move_to_current_position_is_noop() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::MoveNode { id: id("b"), position: pt(200.0, 0.0) });
    assert!(Arc::ptr_eq(&d0, &d1));
}

#[test]
fn move_snaps_to_grid() {
    let mut base = Document::clone(&doc(vec![node("a", 5.0, 5.0)], vec![]));
    base.grid = GridSettings { enabled: true, size: 25.0, snap: true };
    let d0 = Arc::new(base);
    let d1 = apply(&d0, &Action::MoveNode { id: id("a"), position: pt(37.0, 63.0) });
    assert_eq!(position(&d1, "a"), pt(25.0, 75.0));
}

#[test]
fn move_without_snap_keeps_fraction() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::MoveNode { id: id("a"), position: pt(12.5, 7.25) });
    assert_eq!(position(&d1, "a"), pt(12.5, 7.25));
}

#[test]
fn move_clamps_into_canvas() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::MoveNode { id: id("a"), position: pt(-50.0, 9000.0) });
    assert_eq!(position(&d1, "a"), pt(0.0, 3950.0));
}

#[test]
fn move_clamped_back_to_current_is_noop() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::MoveNode { id: id("a"), position: pt(-10.0, -10.0) });
    assert!(Arc::ptr_eq(&d0, &d1));
}

#[test]
fn move_respects_injected_canvas() {
    let d0 = three_nodes();
    let canvas = CanvasSize { width: 300.0, height: 300.0 };
    let d1 = apply_in(&d0, &Action::MoveNode { id: id("a"), position: pt(1000.0, 1000.0) }, canvas);
    assert_eq!(position(&d1, "a"), pt(200.0, 250.0));
}

#[test]
fn move_unknown_node_is_noop() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::MoveNode { id: id("zz"), position: pt(1.0, 1.0) })));
}

// =============================================================
// Group move
// =============================================================

fn moves(list: &[(&str, f64, f64)]) -> Action {
    Action::MoveNodes(list.iter().map(|(n, x, y)| NodeMove { id: id(n), position: pt(*x, *y) }).collect())
}

#[test]
fn group_move_translates_every_member() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &moves(&[("a", 10.0, 20.0), ("b", 210.0, 20.0)]));
    assert_eq!(position(&d1, "a"), pt(10.0, 20.0));
    assert_eq!(position(&d1, "b"), pt(210.0, 20.0));
    assert_eq!(position(&d1, "c"), pt(400.0, 0.0));
    assert_eq!(d1.revision, 1);
}

#[test]
fn group_clamp_preserves_relative_layout() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &moves(&[("a", -80.0, -30.0), ("b", 120.0, -30.0), ("c", 320.0, 10.0)]));
    assert_eq!(position(&d1, "a"), pt(0.0, 0.0));
    let a = position(&d1, "a");
    for (name, dx, dy) in [("b", 200.0, 0.0), ("c", 400.0, 40.0)] {
        let p = position(&d1, name);
        assert_eq!((p.x - a.x, p.y - a.y), (dx, dy));
    }
}

#[test]
fn group_clamp_at_far_edge() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &moves(&[("a", 3800.0, 3980.0), ("b", 4000.0, 3980.0)]));
    // box 3800..4100 x 3980..4030 → shift (-100, -30)
    assert_eq!(position(&d1, "a"), pt(3700.0, 3950.0));
    assert_eq!(position(&d1, "b"), pt(3900.0, 3950.0));
}

#[test]
fn group_wider_than_canvas_pins_left_edge() {
    let canvas = CanvasSize { width: 250.0, height: 1000.0 };
    let d0 = three_nodes();
    let d1 = apply_in(&d0, &moves(&[("a", 50.0, 0.0), ("c", 450.0, 0.0)]), canvas);
    assert_eq!(position(&d1, "a"), pt(0.0, 0.0));
    assert_eq!(position(&d1, "c"), pt(400.0, 0.0));
}

#[test]
fn group_move_snaps_before_correction() {
    let mut base = Document::clone(&three_nodes());
    base.grid = GridSettings { enabled: true, size: 25.0, snap: true };
    let d0 = Arc::new(base);
    let d1 = apply(&d0, &moves(&[("a", 37.0, 63.0), ("b", 212.0, 63.0)]));
    assert_eq!(position(&d1, "a"), pt(25.0, 75.0));
    assert_eq!(position(&d1, "b"), pt(200.0, 75.0));
}

#[test]
fn group_move_without_change_is_noop() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &moves(&[("a", 0.0, 0.0), ("b", 200.0, 0.0)]));
    assert!(Arc::ptr_eq(&d0, &d1));
}

#[test]
fn group_move_skips_unknown_ids() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &moves(&[("ghost", -500.0, -500.0), ("a", 30.0, 30.0)]));
    assert_eq!(position(&d1, "a"), pt(30.0, 30.0));
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &moves(&[("ghost", 1.0, 1.0)]))));
}

// =============================================================
// Delete node
// =============================================================

#[test]
fn delete_cascades_exactly_touching_connectors() {
    let d0 = doc(
        vec![node("a", 0.0, 0.0), node("b", 200.0, 0.0), node("c", 400.0, 0.0), node("d", 600.0, 0.0)],
        vec![connector("ab", "a", "b"), connector("ca", "c", "a"), connector("cd", "c", "d")],
    );
    let d1 = apply(&d0, &Action::DeleteNode(id("a")));
    assert!(!d1.nodes.contains_key(&id("a")));
    let remaining: Vec<&str> = d1.connectors.keys().map(ConnectorId::as_str).collect();
    assert_eq!(remaining, vec!["cd"]);
    assert_eq!(d1.nodes.len(), 3);
}

#[test]
fn delete_strips_selection() {
    let mut base = Document::clone(&three_nodes());
    base.selection = Selection::Node(id("a"));
    base.multi_select = [id("b"), id("a"), id("c")].into_iter().collect();
    let d1 = apply(&Arc::new(base), &Action::DeleteNode(id("a")));
    assert_eq!(d1.selection, Selection::None);
    let order: Vec<&str> = d1.multi_select.iter().map(NodeId::as_str).collect();
    assert_eq!(order, vec!["b", "c"]);
}

#[test]
fn delete_clears_selection_of_cascaded_connector() {
    let mut base = Document::clone(&three_nodes());
    base.selection = Selection::Connector(cid("ab"));
    let d1 = apply(&Arc::new(base), &Action::DeleteNode(id("a")));
    assert_eq!(d1.selection, Selection::None);
}

#[test]
fn delete_keeps_unrelated_selection() {
    let mut base = Document::clone(&three_nodes());
    base.selection = Selection::Connector(cid("bc"));
    let d1 = apply(&Arc::new(base), &Action::DeleteNode(id("a")));
    assert_eq!(d1.selection, Selection::Connector(cid("bc")));
}

#[test]
fn delete_unknown_node_is_noop() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::DeleteNode(id("nope")))));
}

// =============================================================
// Connectors
// =============================================================

#[test]
fn add_connector_rejects_self_loop() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::AddConnector(connector("aa", "a", "a")))));
}

#[test]
fn add_connector_rejects_duplicate_pair() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::AddConnector(connector("ab2", "a", "b")))));
}

#[test]
fn add_connector_allows_reverse_pair() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::AddConnector(connector("ba", "b", "a")));
    assert_eq!(d1.connectors.len(), 4);
}

#[test]
fn add_connector_rejects_missing_endpoint_and_existing_id() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::AddConnector(connector("ax", "a", "x")))));
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::AddConnector(connector("ab", "b", "a")))));
}

#[test]
fn patch_connector_label() {
    let d0 = three_nodes();
    let patch = ConnectorPatch { label: Some("yes".into()), ..ConnectorPatch::default() };
    let d1 = apply(&d0, &Action::PatchConnector { id: cid("ab"), patch });
    assert_eq!(d1.connectors[&cid("ab")].label.as_deref(), Some("yes"));
}

#[test]
fn patch_connector_rejects_self_loop_and_duplicate() {
    let d0 = three_nodes();
    let to_self = ConnectorPatch { target: Some(id("a")), ..ConnectorPatch::default() };
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::PatchConnector { id: cid("ab"), patch: to_self })));
    let to_dup = ConnectorPatch { source: Some(id("b")), target: Some(id("c")), ..ConnectorPatch::default() };
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::PatchConnector { id: cid("ab"), patch: to_dup })));
}

#[test]
fn delete_connector_clears_its_selection() {
    let mut base = Document::clone(&three_nodes());
    base.selection = Selection::Connector(cid("ab"));
    let d1 = apply(&Arc::new(base), &Action::DeleteConnector(cid("ab")));
    assert!(!d1.connectors.contains_key(&cid("ab")));
    assert_eq!(d1.selection, Selection::None);
    assert_eq!(d1.nodes.len(), 3);
}

#[test]
fn delete_unknown_connector_is_noop() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::DeleteConnector(cid("nope")))));
}

#[test]
fn routing_style_rewrites_every_connector() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::SetRoutingStyle(RoutingStyle::Orthogonal));
    assert_eq!(d1.routing_style, RoutingStyle::Orthogonal);
    assert!(d1.connectors.values().all(|c| c.style == RoutingStyle::Orthogonal));
    assert_eq!(d1.revision, 1);
    assert!(Arc::ptr_eq(&d1, &apply(&d1, &Action::SetRoutingStyle(RoutingStyle::Orthogonal))));
}

// =============================================================
// Draft
// =============================================================

#[test]
fn draft_lifecycle_is_transient() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::StartDraft { source: id("a"), point: pt(5.0, 5.0) });
    assert_eq!(d1.draft, Some(ConnectorDraft { source: id("a"), point: pt(5.0, 5.0) }));
    let d2 = apply(&d1, &Action::UpdateDraft(pt(50.0, 60.0)));
    assert_eq!(d2.draft.as_ref().map(|dr| dr.point), Some(pt(50.0, 60.0)));
    let d3 = apply(&d2, &Action::CancelDraft);
    assert!(d3.draft.is_none());
    assert_eq!(d3.revision, d0.revision);
}

#[test]
fn draft_updates_without_draft_are_noops() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::UpdateDraft(pt(1.0, 1.0)))));
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::CancelDraft)));
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::StartDraft { source: id("ghost"), point: pt(0.0, 0.0) })));
}

// =============================================================
// Selection
// =============================================================

#[test]
fn selection_is_exclusive_and_transient() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::SelectNode(Some(id("a"))));
    assert_eq!(d1.selection, Selection::Node(id("a")));
    let d2 = apply(&d1, &Action::SelectConnector(Some(cid("ab"))));
    assert_eq!(d2.selection, Selection::Connector(cid("ab")));
    assert_eq!(d2.selection.node(), None);
    let d3 = apply(&d2, &Action::SelectNode(None));
    assert_eq!(d3.selection, Selection::None);
    assert_eq!(d3.revision, 0);
}

#[test]
fn selecting_unknown_or_same_is_noop() {
    let d0 = three_nodes();
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::SelectNode(Some(id("ghost"))))));
    assert!(Arc::ptr_eq(&d0, &apply(&d0, &Action::SelectNode(None))));
}

#[test]
fn multi_select_replaces_wholesale_in_order() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::SetMultiSelect(vec![id("c"), id("ghost"), id("a")]));
    let order: Vec<&str> = d1.multi_select.iter().map(NodeId::as_str).collect();
    assert_eq!(order, vec!["c", "a"]);
    let d2 = apply(&d1, &Action::SetMultiSelect(vec![id("a"), id("c")]));
    assert!(!Arc::ptr_eq(&d1, &d2));
    assert!(Arc::ptr_eq(&d2, &apply(&d2, &Action::SetMultiSelect(vec![id("a"), id("c")]))));
}

// =============================================================
// Viewport, grid, revision, replace
// =============================================================

#[test]
fn set_viewport_merges_and_bumps() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::SetViewport(ViewportPatch { scale: Some(2.0), ..ViewportPatch::default() }));
    assert_eq!(d1.viewport.scale, 2.0);
    assert_eq!(d1.revision, 1);
    let same = ViewportPatch { scale: Some(2.0), ..ViewportPatch::default() };
    assert!(Arc::ptr_eq(&d1, &apply(&d1, &Action::SetViewport(same))));
}

#[test]
fn set_grid_merges() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::SetGrid(GridPatch { enabled: Some(true), size: Some(10.0), snap: None }));
    assert!(d1.grid.enabled);
    assert_eq!(d1.grid.size, 10.0);
    assert!(Arc::ptr_eq(&d1, &apply(&d1, &Action::SetGrid(GridPatch::default()))));
}

#[test]
fn bump_revision_only_counts() {
    let d0 = three_nodes();
    let d1 = apply(&d0, &Action::BumpRevision);
    assert_eq!(d1.revision, d0.revision + 1);
    assert!(d0.same_content(&d1));
}

#[test]
fn replace_shallow_merges() {
    let d0 = three_nodes();
    let patch = DocumentPatch { nodes: Some(std::collections::BTreeMap::new()), ..DocumentPatch::default() };
    let d1 = apply(&d0, &Action::Replace(patch));
    assert!(d1.nodes.is_empty());
    assert_eq!(d1.connectors.len(), 3);
    assert_eq!(d1.revision, 1);
}

#[test]
fn reducer_is_deterministic() {
    let d0 = three_nodes();
    let action = moves(&[("a", 13.7, 99.1), ("c", 413.7, 99.1)]);
    let x = apply(&d0, &action);
    let y = apply(&d0, &action);
    assert_eq!(x.nodes, y.nodes);
}
