#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE};
use crate::geometry::Point;

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleBounds {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self { min_scale: DEFAULT_MIN_SCALE, max_scale: DEFAULT_MAX_SCALE }
    }
}

impl ScaleBounds {
    /// Clamp `scale` into the allowed range.
    ///
    /// Inverted bounds resolve toward `min_scale`.
    #[must_use]
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.min(self.max_scale).max(self.min_scale)
    }
}

/// Pan/zoom state of the document view.
///
/// `offset` is in screen pixels. `scale` is a zoom factor (1.0 = no zoom).
/// A world point maps to `world * scale + offset` on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub offset: Point,
    pub bounds: ScaleBounds,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scale: 1.0, offset: Point::default(), bounds: ScaleBounds::default() }
    }
}

/// Sparse viewport update. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<ScaleBounds>,
}

impl Viewport {
    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.offset.x) / self.scale,
            y: (screen.y - self.offset.y) / self.scale,
        }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.scale + self.offset.x,
            y: world.y * self.scale + self.offset.y,
        }
    }

    /// Convert a screen-space distance to a world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }

    /// Apply a sparse update, then clamp the scale into the (possibly new) bounds.
    #[must_use]
    pub fn patched(&self, patch: &ViewportPatch) -> Viewport {
        let bounds = patch.bounds.unwrap_or(self.bounds);
        Viewport {
            scale: bounds.clamp(patch.scale.unwrap_or(self.scale)),
            offset: patch.offset.unwrap_or(self.offset),
            bounds,
        }
    }

    /// Patch that zooms by `factor` while keeping the world point under
    /// `anchor` (screen space) fixed on screen.
    #[must_use]
    pub fn zoom_patch(&self, anchor: Point, factor: f64) -> ViewportPatch {
        let scale = self.bounds.clamp(self.scale * factor);
        let world = self.screen_to_world(anchor);
        let offset = Point::new(anchor.x - world.x * scale, anchor.y - world.y * scale);
        ViewportPatch { scale: Some(scale), offset: Some(offset), bounds: None }
    }

    /// Patch that pans the view by a screen-space delta.
    #[must_use]
    pub fn pan_patch(&self, dx: f64, dy: f64) -> ViewportPatch {
        ViewportPatch { offset: Some(self.offset.offset(dx, dy)), ..ViewportPatch::default() }
    }
}
