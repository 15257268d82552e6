//! Live document holder.
//!
//! The store owns the current `Arc<Document>`, runs the reducer on dispatch,
//! and notifies subscribers synchronously afterwards.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::fmt;
use std::sync::Arc;

use crate::doc::Document;
use crate::geometry::CanvasSize;
use crate::reducer::{Action, apply_in};

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Document)>;

/// Single-writer owner of the live document.
pub struct Store {
    state: Arc<Document>,
    canvas: CanvasSize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Document::default(), CanvasSize::default())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("revision", &self.state.revision)
            .field("nodes", &self.state.nodes.len())
            .field("connectors", &self.state.connectors.len())
            .field("canvas", &self.canvas)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    #[must_use]
    pub fn new(doc: Document, canvas: CanvasSize) -> Self {
        Self { state: Arc::new(doc), canvas, listeners: Vec::new(), next_subscription: 0 }
    }

    /// The live document. Treat as read-only; mutate through [`Store::dispatch`].
    #[must_use]
    pub fn state(&self) -> &Arc<Document> {
        &self.state
    }

    #[must_use]
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Run the reducer and notify every listener once.
    pub fn dispatch(&mut self, action: &Action) {
        let next = apply_in(&self.state, action, self.canvas);
        let changed = !Arc::ptr_eq(&next, &self.state);
        tracing::trace!(action = action.name(), changed, revision = next.revision, "dispatch");
        self.state = next;
        self.notify();
    }

    /// Swap in a whole document, bypassing the reducer. Used by undo/redo.
    pub fn replace_state(&mut self, doc: Arc<Document>) {
        self.state = doc;
        self.notify();
    }

    /// Register a listener called after every dispatch or replace.
    pub fn subscribe(&mut self, listener: impl FnMut(&Document) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        let state = Arc::clone(&self.state);
        for (_, listener) in &mut self.listeners {
            listener(&state);
        }
    }
}
