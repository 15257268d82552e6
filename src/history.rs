//! Operation-scoped undo/redo.
//!
//! [`UndoManager`] wraps a [`Store`]. Changes are grouped into *operations*:
//! `begin` captures the live document as a baseline, `commit` pushes that
//! baseline onto the undo stack if the semantic content (nodes, connectors,
//! viewport, grid, routing style) changed in between. A whole drag gesture is
//! therefore one undo step.
//!
//! Snapshots are the `Arc<Document>` values the store already holds. The
//! reducer never mutates a document in place, so capturing one is O(1).
//!
//! Move actions dispatched outside any operation open a coalescing window
//! labelled [`MOVE_OPERATION_LABEL`]; the first non-move action (or
//! [`UndoManager::end_coalescing`]) commits it.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::sync::Arc;

use crate::consts::{DEFAULT_HISTORY_LIMIT, MOVE_OPERATION_LABEL};
use crate::doc::Document;
use crate::reducer::Action;
use crate::store::{Store, SubscriptionId};

/// One undoable step: the document as it was before the operation.
#[derive(Debug, Clone)]
struct HistoryEntry {
    snapshot: Arc<Document>,
    label: String,
}

#[derive(Debug, Clone)]
struct Operation {
    baseline: Arc<Document>,
    label: String,
}

/// Snapshot of the history state for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub operation_open: bool,
    pub operation_label: Option<String>,
    pub last_undo_label: Option<String>,
    pub last_redo_label: Option<String>,
}

/// Two-stack undo engine over a [`Store`].
#[derive(Debug)]
pub struct UndoManager {
    store: Store,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    operation: Option<Operation>,
    coalescing: bool,
    limit: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(Store::default())
    }
}

impl UndoManager {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    /// An engine that keeps at most `limit` undo entries (minimum 1).
    #[must_use]
    pub fn with_limit(store: Store, limit: usize) -> Self {
        Self {
            store,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            operation: None,
            coalescing: false,
            limit: limit.max(1),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<Document> {
        self.store.state()
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Document) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    #[must_use]
    pub fn is_operation_open(&self) -> bool {
        self.operation.is_some()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // --- Operations ---

    /// Open an operation. An active move-coalescing window is committed
    /// first; any other open operation makes this a no-op.
    pub fn begin(&mut self, label: &str) {
        self.end_coalescing();
        if let Some(ref open) = self.operation {
            tracing::trace!(label, open = %open.label, "begin ignored; operation already open");
            return;
        }
        self.operation = Some(Operation { baseline: Arc::clone(self.store.state()), label: label.to_string() });
    }

    /// Close the open operation, recording it if the document changed.
    ///
    /// Returns `true` when an undo entry was pushed.
    pub fn commit(&mut self) -> bool {
        self.coalescing = false;
        let Some(op) = self.operation.take() else {
            return false;
        };
        if op.baseline.same_content(self.store.state()) {
            tracing::trace!(label = %op.label, "commit discarded; no content change");
            return false;
        }
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry { snapshot: op.baseline, label: op.label });
        if self.undo_stack.len() > self.limit {
            let evicted = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..evicted);
        }
        tracing::debug!(undo_depth = self.undo_stack.len(), "operation committed");
        true
    }

    /// Drop the open operation without recording it.
    pub fn cancel(&mut self) {
        self.coalescing = false;
        if let Some(op) = self.operation.take() {
            tracing::trace!(label = %op.label, "operation canceled");
        }
    }

    /// Begin, run `f` against the store, then commit.
    ///
    /// Any active move-coalescing window is committed first. Inside an
    /// explicitly opened operation `f` joins it and nothing is committed
    /// here. The commit runs whatever `f` returns, so an `Err` result still
    /// closes the operation.
    pub fn run<T>(&mut self, label: &str, f: impl FnOnce(&mut Store) -> T) -> T {
        self.end_coalescing();
        if let Some(ref open) = self.operation {
            tracing::trace!(label, open = %open.label, "run joins open operation");
            return f(&mut self.store);
        }
        self.begin(label);
        let out = f(&mut self.store);
        self.commit();
        out
    }

    // --- Dispatch ---

    /// Dispatch through the move-coalescing path.
    pub fn dispatch(&mut self, action: &Action) {
        if action.is_move() {
            if self.operation.is_none() {
                self.begin(MOVE_OPERATION_LABEL);
                self.coalescing = true;
            }
        } else if self.coalescing {
            self.commit();
        }
        self.store.dispatch(action);
    }

    /// Commit an active move-coalescing window. Returns `true` if an entry
    /// was pushed.
    pub fn end_coalescing(&mut self) -> bool {
        if self.coalescing { self.commit() } else { false }
    }

    // --- Traversal ---

    /// Step back one operation. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.cancel();
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let current = Arc::clone(self.store.state());
        tracing::debug!(label = %entry.label, undo_depth = self.undo_stack.len(), "undo");
        self.store.replace_state(restored(&entry.snapshot, &current));
        self.redo_stack.push(HistoryEntry { snapshot: current, label: entry.label });
        true
    }

    /// Re-apply the last undone operation. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.cancel();
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let current = Arc::clone(self.store.state());
        tracing::debug!(label = %entry.label, redo_depth = self.redo_stack.len(), "redo");
        self.store.replace_state(restored(&entry.snapshot, &current));
        self.undo_stack.push(HistoryEntry { snapshot: current, label: entry.label });
        true
    }

    /// Drop both stacks and any open operation.
    pub fn clear(&mut self) {
        self.cancel();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
            operation_open: self.operation.is_some(),
            operation_label: self.operation.as_ref().map(|op| op.label.clone()),
            last_undo_label: self.undo_stack.last().map(|e| e.label.clone()),
            last_redo_label: self.redo_stack.last().map(|e| e.label.clone()),
        }
    }
}

/// The snapshot's content with a revision past the live one, so revisions
/// stay monotonic across traversal. The transient draft is dropped.
fn restored(snapshot: &Arc<Document>, live: &Document) -> Arc<Document> {
    let mut doc = Document::clone(snapshot);
    doc.revision = live.revision + 1;
    doc.draft = None;
    Arc::new(doc)
}
