//! Logic core of an interactive flowchart editor.
//!
//! The crate holds everything that decides *what* the diagram looks like,
//! and none of the drawing. A host (browser canvas, native window, CLI) feeds
//! pointer and keyboard intent into [`editor::Editor`], renders from the
//! [`doc::Document`] it exposes, and asks [`geometry`] for connector paths.
//!
//! State moves only through the pure reducer in [`reducer`]. The [`store`]
//! holds the live document, and [`history`] records one undo step per
//! user-visible operation.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`editor`] | Interaction coordinator: drag, marquee, connector drafting, commands |
//! | [`history`] | Operation-scoped undo/redo over the store |
//! | [`store`] | Live document, dispatch and subscriptions |
//! | [`reducer`] | `Action` enum and the pure transition function |
//! | [`doc`] | Nodes, connectors, selection, grid and the document aggregate |
//! | [`geometry`] | Anchors, paths, direction markers, clamping, arrangement |
//! | [`viewport`] | Pan/zoom state and screen/world conversions |
//! | [`persist`] | JSON export and load-time validation |
//! | [`config`] | Canvas, grid and history settings from the environment |
//! | [`input`] | Gesture state machine and per-frame pointer slot |
//! | [`hit`] | Marquee containment and point hit-testing |
//! | [`consts`] | Shared numeric constants |

pub mod config;
pub mod consts;
pub mod doc;
pub mod editor;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod input;
pub mod persist;
pub mod reducer;
pub mod store;
pub mod viewport;
