//! Pure 2-D geometry: anchors, connector paths, direction markers, placement
//! clamping and arrangement targets.
//!
//! Nothing here reads or writes a [`Document`](crate::doc::Document). Callers
//! hand in node geometry and get plain values back, and identical input always
//! produces bit-identical output.
//!
//! ## Connector routing
//!
//! A connector leaves its source node at the right-center anchor and enters
//! its target at the left-center anchor. Two path shapes exist:
//!
//! - **curved**: a cubic Bézier whose control points sit half the horizontal
//!   distance inward from each end, so the curve is horizontal at both ends;
//! - **orthogonal**: horizontal to the x midpoint, vertical to the target's
//!   height, horizontal into the target.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ARROWHEAD_SIZE, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, MARKER_LOOKAHEAD, MARKER_SIZE, MARKER_WIDTH_RATIO,
};
use crate::doc::{Node, NodeId, RoutingStyle};

// =============================================================
// Primitives
// =============================================================

/// A point in document (world) or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This point translated by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation toward `other` by `t`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self { x: self.x + (other.x - self.x) * t, y: self.y + (other.y - self.y) * t }
    }
}

/// Width and height of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Rectangle spanned by two arbitrary corners (order does not matter).
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Rectangle with its top-left corner at `origin`.
    #[must_use]
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { min: origin, max: origin.offset(size.width, size.height) }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0)
    }

    /// Smallest rectangle containing both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Rect) -> Rect {
        Rect {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Whether `inner` lies entirely within this rectangle (edges inclusive).
    #[must_use]
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.min.x >= self.min.x && inner.min.y >= self.min.y && inner.max.x <= self.max.x && inner.max.y <= self.max.y
    }
}

/// Fixed extent of the document canvas that nodes are clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self { width: DEFAULT_CANVAS_WIDTH, height: DEFAULT_CANVAS_HEIGHT }
    }
}

// =============================================================
// Placement
// =============================================================

/// Snap both coordinates to the nearest multiple of `cell`.
///
/// A non-positive cell leaves the point unchanged.
#[must_use]
pub fn snap_to_grid(point: Point, cell: f64) -> Point {
    if cell <= 0.0 {
        return point;
    }
    Point::new((point.x / cell).round() * cell, (point.y / cell).round() * cell)
}

/// Clamp a node origin into `[0, canvas - size]` on each axis.
///
/// When a node is larger than the canvas the upper bound collapses to 0.
#[must_use]
pub fn clamp_to_canvas(position: Point, size: Size, canvas: CanvasSize) -> Point {
    let max_x = (canvas.width - size.width).max(0.0);
    let max_y = (canvas.height - size.height).max(0.0);
    Point::new(position.x.max(0.0).min(max_x), position.y.max(0.0).min(max_y))
}

/// Shared `(dx, dy)` that moves a group's bounding box inside the canvas.
///
/// Each axis is corrected independently. When the group fits on an axis the
/// box ends up within `[0, canvas]`. When it is wider (or taller) than the
/// canvas, its min edge is pinned to 0 and overflow past the far edge is
/// accepted.
#[must_use]
pub fn group_correction(bounds: Rect, canvas: CanvasSize) -> (f64, f64) {
    (
        axis_correction(bounds.min.x, bounds.max.x, canvas.width),
        axis_correction(bounds.min.y, bounds.max.y, canvas.height),
    )
}

fn axis_correction(min: f64, max: f64, limit: f64) -> f64 {
    if max - min > limit || min < 0.0 {
        -min
    } else if max > limit {
        limit - max
    } else {
        0.0
    }
}

// =============================================================
// Anchors
// =============================================================

/// Where connectors attach to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    /// Right-center point; outgoing connectors start here.
    pub start: Point,
    /// Left-center point; incoming connectors end here.
    pub end: Point,
}

/// Anchors computed from the node's stored logical size.
#[must_use]
pub fn anchors(node: &Node) -> Anchors {
    anchors_with_size(node, node.size)
}

/// Anchors computed from a caller-supplied size (e.g. the live rendered size).
#[must_use]
pub fn anchors_with_size(node: &Node, size: Size) -> Anchors {
    let p = node.position;
    Anchors {
        start: Point::new(p.x + size.width, p.y + size.height / 2.0),
        end: Point::new(p.x, p.y + size.height / 2.0),
    }
}

/// Start and end points of a connector running from `source` to `target`.
#[must_use]
pub fn connector_endpoints(source: &Node, target: &Node) -> (Point, Point) {
    (anchors(source).start, anchors(target).end)
}

// =============================================================
// Paths
// =============================================================

/// Renderer-neutral description of a connector path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathDescriptor {
    /// Cubic Bézier from `start` to `end` through two control points.
    Cubic { start: Point, c1: Point, c2: Point, end: Point },
    /// Three-segment right-angle polyline through four corner points.
    Polyline { points: [Point; 4] },
}

impl PathDescriptor {
    #[must_use]
    pub fn start(&self) -> Point {
        match self {
            Self::Cubic { start, .. } => *start,
            Self::Polyline { points } => points[0],
        }
    }

    #[must_use]
    pub fn end(&self) -> Point {
        match self {
            Self::Cubic { end, .. } => *end,
            Self::Polyline { points } => points[3],
        }
    }

    /// SVG path data (`d` attribute) for this path.
    #[must_use]
    pub fn to_svg(&self) -> String {
        match self {
            Self::Cubic { start, c1, c2, end } => format!(
                "M {} {} C {} {}, {} {}, {} {}",
                start.x, start.y, c1.x, c1.y, c2.x, c2.y, end.x, end.y
            ),
            Self::Polyline { points: [a, b, c, d] } => {
                format!("M {} {} L {} {} L {} {} L {} {}", a.x, a.y, b.x, b.y, c.x, c.y, d.x, d.y)
            }
        }
    }
}

/// Build the path for a connector from `start` to `end` in the given style.
#[must_use]
pub fn path(style: RoutingStyle, start: Point, end: Point) -> PathDescriptor {
    match style {
        RoutingStyle::Curved => {
            let dx = (end.x - start.x) * 0.5;
            PathDescriptor::Cubic {
                start,
                c1: Point::new(start.x + dx, start.y),
                c2: Point::new(end.x - dx, end.y),
                end,
            }
        }
        RoutingStyle::Orthogonal => PathDescriptor::Polyline { points: orthogonal_corners(start, end) },
    }
}

fn orthogonal_corners(start: Point, end: Point) -> [Point; 4] {
    let mid_x = (start.x + end.x) / 2.0;
    [start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
}

/// Point at parameter `t` (clamped to `[0, 1]`) along the connector path.
///
/// Curved paths evaluate the cubic Bézier directly. Orthogonal paths treat the
/// three segments as proportional arc-length intervals; zero-length segments
/// are skipped and a fully degenerate path yields `start`.
#[must_use]
pub fn point_on_path(style: RoutingStyle, start: Point, end: Point, t: f64) -> Point {
    let t = t.clamp(0.0, 1.0);
    match path(style, start, end) {
        PathDescriptor::Cubic { start, c1, c2, end } => cubic_point(start, c1, c2, end, t),
        PathDescriptor::Polyline { points } => polyline_point(&points, t),
    }
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

fn polyline_point(points: &[Point; 4], t: f64) -> Point {
    let lengths = [points[0].distance(points[1]), points[1].distance(points[2]), points[2].distance(points[3])];
    let total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        return points[0];
    }
    let mut remaining = t * total;
    for (i, len) in lengths.iter().copied().enumerate() {
        if len <= 0.0 {
            continue;
        }
        if remaining <= len {
            return points[i].lerp(points[i + 1], remaining / len);
        }
        remaining -= len;
    }
    points[3]
}

// =============================================================
// Direction markers
// =============================================================

/// What a [`Marker`] represents on the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Interior direction indicator.
    Direction,
    /// Terminal arrowhead at the target anchor.
    Head,
}

impl MarkerKind {
    /// Triangle length drawn for this kind of marker.
    #[must_use]
    pub fn length(self) -> f64 {
        match self {
            Self::Direction => MARKER_SIZE,
            Self::Head => ARROWHEAD_SIZE,
        }
    }
}

/// A point on a connector path and the direction the path travels there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub point: Point,
    /// Tangent angle in radians (`atan2` convention, y grows downward).
    pub angle: f64,
    pub kind: MarkerKind,
}

/// `count` evenly spaced direction markers plus a terminal arrowhead.
///
/// Interior markers sit at `t = i / (count + 1)` for `i` in `1..=count`. Each
/// tangent points toward the path position a small parametric step further on.
#[must_use]
pub fn points_on_path(style: RoutingStyle, start: Point, end: Point, count: usize) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(count + 1);
    let slots = (count + 1) as f64;
    for i in 1..=count {
        let t = i as f64 / slots;
        let point = point_on_path(style, start, end, t);
        let ahead = point_on_path(style, start, end, (t + MARKER_LOOKAHEAD).min(1.0));
        markers.push(Marker { point, angle: heading(point, ahead), kind: MarkerKind::Direction });
    }
    let behind = point_on_path(style, start, end, 1.0 - MARKER_LOOKAHEAD);
    markers.push(Marker { point: end, angle: heading(behind, end), kind: MarkerKind::Head });
    markers
}

fn heading(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Triangle `[tip, left, right]` drawn for a marker of the given length.
///
/// Use [`MarkerKind::length`] for the default length of each kind.
#[must_use]
pub fn direction_triangle(marker: &Marker, length: f64) -> [Point; 3] {
    let p = marker.point;
    let a = marker.angle;
    let half_base = length * MARKER_WIDTH_RATIO / 2.0;
    [
        Point::new(p.x + a.cos() * length, p.y + a.sin() * length),
        Point::new(p.x + (a + FRAC_PI_2).cos() * half_base, p.y + (a + FRAC_PI_2).sin() * half_base),
        Point::new(p.x + (a - FRAC_PI_2).cos() * half_base, p.y + (a - FRAC_PI_2).sin() * half_base),
    ]
}

// =============================================================
// Arrangement
// =============================================================

/// Alignment or distribution applied to a group of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrangeKind {
    AlignLeft,
    AlignCenter,
    AlignRight,
    AlignTop,
    AlignMiddle,
    AlignBottom,
    DistributeHorizontal,
    DistributeVertical,
}

impl ArrangeKind {
    pub const ALL: [ArrangeKind; 8] = [
        Self::AlignLeft,
        Self::AlignCenter,
        Self::AlignRight,
        Self::AlignTop,
        Self::AlignMiddle,
        Self::AlignBottom,
        Self::DistributeHorizontal,
        Self::DistributeVertical,
    ];

    /// Stable command name, e.g. `"align-left"` or `"dist-h"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlignLeft => "align-left",
            Self::AlignCenter => "align-center",
            Self::AlignRight => "align-right",
            Self::AlignTop => "align-top",
            Self::AlignMiddle => "align-middle",
            Self::AlignBottom => "align-bottom",
            Self::DistributeHorizontal => "dist-h",
            Self::DistributeVertical => "dist-v",
        }
    }
}

impl fmt::Display for ArrangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an arrange command name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown arrange kind `{0}` (expected one of align-left, align-center, align-right, align-top, align-middle, align-bottom, dist-h, dist-v)")]
pub struct ParseArrangeKindError(pub String);

impl FromStr for ArrangeKind {
    type Err = ParseArrangeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseArrangeKindError(s.to_string()))
    }
}

/// New position for one node produced by an arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: NodeId,
    pub position: Point,
}

/// Positions that `kind` assigns to `nodes`.
///
/// Only nodes whose position actually changes are returned. Fewer than two
/// nodes never produce targets; distribution additionally needs three nodes
/// and a positive span.
#[must_use]
pub fn arrangement_targets(nodes: &[&Node], kind: ArrangeKind) -> Vec<Target> {
    if nodes.len() < 2 {
        return Vec::new();
    }
    match kind {
        ArrangeKind::DistributeHorizontal => distribute(nodes, Axis::Horizontal),
        ArrangeKind::DistributeVertical => distribute(nodes, Axis::Vertical),
        _ => align(nodes, kind),
    }
}

/// Bounding box of a set of nodes, or `None` when the set is empty.
#[must_use]
pub fn bounding_box(nodes: &[&Node]) -> Option<Rect> {
    nodes.iter().map(|n| n.bounds()).reduce(Rect::union)
}

fn align(nodes: &[&Node], kind: ArrangeKind) -> Vec<Target> {
    let Some(bounds) = bounding_box(nodes) else {
        return Vec::new();
    };
    let center = bounds.center();
    nodes
        .iter()
        .filter_map(|node| {
            let Point { x, y } = node.position;
            let Size { width, height } = node.size;
            let position = match kind {
                ArrangeKind::AlignLeft => Point::new(bounds.min.x, y),
                ArrangeKind::AlignRight => Point::new(bounds.max.x - width, y),
                ArrangeKind::AlignCenter => Point::new((center.x - width / 2.0).round(), y),
                ArrangeKind::AlignTop => Point::new(x, bounds.min.y),
                ArrangeKind::AlignBottom => Point::new(x, bounds.max.y - height),
                ArrangeKind::AlignMiddle => Point::new(x, (center.y - height / 2.0).round()),
                ArrangeKind::DistributeHorizontal | ArrangeKind::DistributeVertical => node.position,
            };
            (position != node.position).then(|| Target { id: node.id.clone(), position })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn lead(self, node: &Node) -> f64 {
        match self {
            Self::Horizontal => node.position.x,
            Self::Vertical => node.position.y,
        }
    }

    fn extent(self, node: &Node) -> f64 {
        match self {
            Self::Horizontal => node.size.width,
            Self::Vertical => node.size.height,
        }
    }

    fn with_lead(self, position: Point, lead: f64) -> Point {
        match self {
            Self::Horizontal => Point::new(lead, position.y),
            Self::Vertical => Point::new(position.x, lead),
        }
    }
}

fn distribute(nodes: &[&Node], axis: Axis) -> Vec<Target> {
    if nodes.len() < 3 {
        return Vec::new();
    }
    let mut ordered = nodes.to_vec();
    ordered.sort_by(|a, b| axis.lead(a).total_cmp(&axis.lead(b)).then_with(|| a.id.cmp(&b.id)));
    let (Some(first), Some(last)) = (ordered.first().copied(), ordered.last().copied()) else {
        return Vec::new();
    };
    let span = axis.lead(last) + axis.extent(last) - axis.lead(first);
    if span <= 0.0 {
        return Vec::new();
    }
    let occupied: f64 = ordered.iter().map(|n| axis.extent(n)).sum();
    let gap = (span - occupied) / (ordered.len() - 1) as f64;

    let mut cursor = axis.lead(first) + axis.extent(first) + gap;
    let mut targets = Vec::new();
    for node in &ordered[1..ordered.len() - 1] {
        let position = axis.with_lead(node.position, cursor.round());
        if position != node.position {
            targets.push(Target { id: node.id.clone(), position });
        }
        cursor += axis.extent(node) + gap;
    }
    targets
}
