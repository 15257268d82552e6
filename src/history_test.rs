#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{Connector, ConnectorId, GridSettings, Node, NodeId, NodeKind, RoutingStyle, ViewportPatch};
use crate::geometry::{CanvasSize, Point};
use crate::reducer::NodeMove;

// =============================================================
// Helpers
// =============================================================

fn id(s: &str) -> NodeId {
    NodeId::new(s)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn manager() -> UndoManager {
    let nodes = [Node::new(id("a"), NodeKind::Start, pt(0.0, 0.0)), Node::new(id("b"), NodeKind::End, pt(400.0, 0.0))];
    let doc = Document {
        nodes: Arc::new(nodes.into_iter().map(|n| (n.id.clone(), n)).collect()),
        grid: GridSettings { enabled: false, ..GridSettings::default() },
        ..Document::default()
    };
    UndoManager::new(Store::new(doc, CanvasSize::default()))
}

fn move_to(name: &str, x: f64, y: f64) -> Action {
    Action::MoveNode { id: id(name), position: pt(x, y) }
}

fn pos(m: &UndoManager, name: &str) -> Point {
    m.state().nodes[&id(name)].position
}

fn moved(m: &mut UndoManager, label: &str, x: f64) {
    m.run(label, |store| store.dispatch(&move_to("a", x, 0.0)));
}

// =============================================================
// begin / commit / cancel
// =============================================================

#[test]
fn commit_without_operation_is_false() {
    let mut m = manager();
    assert!(!m.commit());
}

#[test]
fn commit_records_changed_operation() {
    let mut m = manager();
    m.begin("move");
    m.store.dispatch(&move_to("a", 100.0, 0.0));
    assert!(m.commit());
    assert_eq!(m.stats().undo_depth, 1);
    assert_eq!(m.stats().last_undo_label.as_deref(), Some("move"));
    assert!(!m.is_operation_open());
}

#[test]
fn commit_discards_unchanged_operation() {
    let mut m = manager();
    m.begin("noop");
    m.store.dispatch(&Action::SelectNode(Some(id("a"))));
    assert!(!m.commit());
    assert_eq!(m.stats().undo_depth, 0);
}

#[test]
fn revision_only_change_is_not_recorded() {
    let mut m = manager();
    m.begin("bump");
    m.store.dispatch(&Action::BumpRevision);
    assert!(!m.commit());
}

#[test]
fn viewport_change_is_recorded() {
    let mut m = manager();
    m.run("zoom", |s| s.dispatch(&Action::SetViewport(ViewportPatch { scale: Some(2.0), ..ViewportPatch::default() })));
    assert!(m.can_undo());
}

#[test]
fn begin_does_not_nest() {
    let mut m = manager();
    m.begin("outer");
    m.store.dispatch(&move_to("a", 100.0, 0.0));
    m.begin("inner");
    m.store.dispatch(&move_to("a", 200.0, 0.0));
    assert!(m.commit());
    assert_eq!(m.stats().last_undo_label.as_deref(), Some("outer"));
    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
}

#[test]
fn cancel_discards_baseline() {
    let mut m = manager();
    m.begin("drag");
    m.store.dispatch(&move_to("a", 100.0, 0.0));
    m.cancel();
    assert!(!m.commit());
    assert!(!m.can_undo());
}

#[test]
fn commit_clears_redo() {
    let mut m = manager();
    moved(&mut m, "one", 100.0);
    assert!(m.undo());
    assert!(m.can_redo());
    moved(&mut m, "two", 50.0);
    assert!(!m.can_redo());
}

// =============================================================
// undo / redo
// =============================================================

#[test]
fn undo_redo_scenario() {
    let mut m = manager();
    moved(&mut m, "move-node", 100.0);

    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
    assert!(m.redo());
    assert_eq!(pos(&m, "a"), pt(100.0, 0.0));
    assert!(m.undo());
    let before = Arc::clone(m.state());
    assert!(!m.undo());
    assert!(Arc::ptr_eq(&before, m.state()));
}

#[test]
fn redo_on_empty_is_false() {
    let mut m = manager();
    assert!(!m.redo());
}

#[test]
fn undo_cancels_open_operation() {
    let mut m = manager();
    moved(&mut m, "first", 100.0);
    m.begin("aborted");
    m.store.dispatch(&move_to("a", 300.0, 0.0));
    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
    assert!(!m.is_operation_open());
    assert_eq!(m.stats().redo_depth, 1);
}

#[test]
fn undo_redo_roundtrip_over_sequence() {
    let mut m = manager();
    let link = Connector {
        id: ConnectorId::new("conn_ab"),
        source: id("a"),
        target: id("b"),
        style: RoutingStyle::Curved,
        label: None,
    };
    let steps = [
        move_to("a", 100.0, 0.0),
        Action::AddConnector(link),
        move_to("a", 200.0, 40.0),
        Action::DeleteNode(id("b")),
        move_to("a", 300.0, 80.0),
    ];

    let snapshot = |m: &UndoManager| (Arc::clone(&m.state().nodes), Arc::clone(&m.state().connectors));
    let mut states = vec![snapshot(&m)];
    for (i, action) in steps.iter().enumerate() {
        m.run(&format!("step{i}"), |store| store.dispatch(action));
        states.push(snapshot(&m));
    }
    assert_eq!(states[2].1.len(), 1);
    assert!(states[4].1.is_empty());

    for (nodes, connectors) in states.iter().rev().skip(1) {
        assert!(m.undo());
        assert_eq!(&m.state().nodes, nodes);
        assert_eq!(&m.state().connectors, connectors);
    }
    assert!(!m.undo());
    for (nodes, connectors) in states.iter().skip(1) {
        assert!(m.redo());
        assert_eq!(&m.state().nodes, nodes);
        assert_eq!(&m.state().connectors, connectors);
    }
    assert!(!m.redo());
}

#[test]
fn revision_stays_monotonic_across_traversal() {
    let mut m = manager();
    moved(&mut m, "one", 100.0);
    let after_move = m.state().revision;
    assert!(m.undo());
    assert!(m.state().revision > after_move);
    let after_undo = m.state().revision;
    assert!(m.redo());
    assert!(m.state().revision > after_undo);
}

#[test]
fn undo_drops_transient_draft() {
    let mut m = manager();
    moved(&mut m, "one", 100.0);
    m.store.dispatch(&Action::StartDraft { source: id("a"), point: pt(0.0, 0.0) });
    assert!(m.undo());
    assert!(m.state().draft.is_none());
}

#[test]
fn history_limit_evicts_oldest() {
    let mut m = UndoManager::with_limit(manager().store, 2);
    for (i, x) in [100.0, 200.0, 300.0].into_iter().enumerate() {
        moved(&mut m, &format!("op{i}"), x);
    }
    assert_eq!(m.stats().undo_depth, 2);
    assert!(m.undo());
    assert!(m.undo());
    assert!(!m.undo());
    assert_eq!(pos(&m, "a"), pt(100.0, 0.0));
}

#[test]
fn clear_drops_everything() {
    let mut m = manager();
    moved(&mut m, "one", 100.0);
    m.clear();
    assert_eq!(m.stats(), HistoryStats::default());
}

// =============================================================
// run
// =============================================================

#[test]
fn run_returns_closure_value_and_commits_on_err() {
    let mut m = manager();
    let out: Result<(), &str> = m.run("failing", |s| {
        s.dispatch(&move_to("a", 100.0, 0.0));
        Err("boom")
    });
    assert_eq!(out, Err("boom"));
    assert!(!m.is_operation_open());
    assert!(m.can_undo());
}

// =============================================================
// Move coalescing
// =============================================================

#[test]
fn consecutive_moves_coalesce_into_one_step() {
    let mut m = manager();
    for x in [10.0, 20.0, 30.0, 40.0] {
        m.dispatch(&move_to("a", x, 0.0));
    }
    let stats = m.stats();
    assert!(stats.operation_open);
    assert_eq!(stats.operation_label.as_deref(), Some(MOVE_OPERATION_LABEL));
    assert!(m.end_coalescing());
    assert_eq!(m.stats().undo_depth, 1);
    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
}

#[test]
fn non_move_commits_window_before_dispatch() {
    let mut m = manager();
    m.dispatch(&move_to("a", 50.0, 0.0));
    m.dispatch(&Action::DeleteNode(id("b")));
    assert!(!m.is_operation_open());
    assert_eq!(m.stats().undo_depth, 1);
    assert_eq!(m.stats().last_undo_label.as_deref(), Some(MOVE_OPERATION_LABEL));
    assert!(!m.state().nodes.contains_key(&id("b")));
}

#[test]
fn moves_inside_explicit_operation_do_not_coalesce() {
    let mut m = manager();
    m.begin("drag");
    m.dispatch(&Action::MoveNodes(vec![NodeMove { id: id("a"), position: pt(10.0, 10.0) }]));
    assert!(!m.end_coalescing());
    assert_eq!(m.stats().operation_label.as_deref(), Some("drag"));
    assert!(m.commit());
}

#[test]
fn run_ends_coalescing_first() {
    let mut m = manager();
    m.dispatch(&move_to("a", 50.0, 0.0));
    moved(&mut m, "explicit", 150.0);
    assert_eq!(m.stats().undo_depth, 2);
    assert_eq!(m.stats().last_undo_label.as_deref(), Some("explicit"));
}

#[test]
fn begin_ends_coalescing_first() {
    let mut m = manager();
    m.dispatch(&move_to("a", 100.0, 0.0));
    m.begin("add-node");
    m.dispatch(&Action::AddNode(Node::new(id("c"), NodeKind::Process, pt(600.0, 0.0))));
    assert!(m.commit());
    assert_eq!(m.stats().undo_depth, 2);
    assert_eq!(m.stats().last_undo_label.as_deref(), Some("add-node"));

    assert!(m.undo());
    assert!(!m.state().nodes.contains_key(&id("c")));
    assert_eq!(pos(&m, "a"), pt(100.0, 0.0));
    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
}

#[test]
fn run_inside_open_operation_joins_it() {
    let mut m = manager();
    m.begin("drag");
    m.dispatch(&move_to("a", 150.0, 0.0));
    let value = m.run("nested", |store| {
        store.dispatch(&move_to("b", 500.0, 0.0));
        7
    });
    assert_eq!(value, 7);
    assert!(m.is_operation_open());
    assert_eq!(m.stats().undo_depth, 0);

    m.dispatch(&move_to("a", 250.0, 0.0));
    assert!(m.commit());
    assert_eq!(m.stats().undo_depth, 1);
    assert_eq!(m.stats().last_undo_label.as_deref(), Some("drag"));
    assert!(m.undo());
    assert_eq!(pos(&m, "a"), pt(0.0, 0.0));
    assert_eq!(pos(&m, "b"), pt(400.0, 0.0));
}

#[test]
fn subscribers_hear_undo() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut m = manager();
    moved(&mut m, "one", 100.0);
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    let sub = m.subscribe(move |_| sink.set(sink.get() + 1));
    assert!(m.undo());
    assert!(m.redo());
    assert_eq!(hits.get(), 2);
    assert!(m.unsubscribe(sub));
}
