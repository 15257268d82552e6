//! Shared numeric constants for the flowchart core.

// ── Canvas ──────────────────────────────────────────────────────

/// Default document canvas width in world units.
pub const DEFAULT_CANVAS_WIDTH: f64 = 4000.0;

/// Default document canvas height in world units.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 4000.0;

// ── Nodes ───────────────────────────────────────────────────────

/// Width given to freshly created nodes.
pub const DEFAULT_NODE_WIDTH: f64 = 170.0;

/// Height given to freshly created nodes.
pub const DEFAULT_NODE_HEIGHT: f64 = 100.0;

/// Rich description seeded into freshly created nodes.
pub const DEFAULT_NODE_DESCRIPTION: &str = "<p>Description...</p>";

/// How far above the drop point a node created from a dropped connector
/// is placed.
pub const AUTO_CREATE_LIFT: f64 = 40.0;

// ── Grid ────────────────────────────────────────────────────────

/// Grid cell size used when none (or a non-positive one) is configured.
pub const DEFAULT_GRID_SIZE: f64 = 20.0;

// ── Viewport ────────────────────────────────────────────────────

/// Smallest zoom factor a default viewport allows.
pub const DEFAULT_MIN_SCALE: f64 = 0.25;

/// Largest zoom factor a default viewport allows.
pub const DEFAULT_MAX_SCALE: f64 = 3.0;

/// Multiplicative zoom step for one wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

// ── Connector markers ───────────────────────────────────────────

/// Direction markers drawn along a connector, excluding the arrowhead.
pub const DIRECTION_MARKERS: usize = 3;

/// Parametric look-ahead used to estimate a path tangent.
pub const MARKER_LOOKAHEAD: f64 = 0.01;

/// Length of an interior direction marker triangle.
pub const MARKER_SIZE: f64 = 9.0;

/// Length of the terminal arrowhead triangle.
pub const ARROWHEAD_SIZE: f64 = 12.0;

/// Triangle base width as a fraction of its length.
pub const MARKER_WIDTH_RATIO: f64 = 0.6;

// ── History ─────────────────────────────────────────────────────

/// Undo entries kept before the oldest is evicted.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Label used for operations opened implicitly by a move dispatch.
pub const MOVE_OPERATION_LABEL: &str = "move-node";
