//! Editor configuration.
//!
//! Values are injected into the store, history and editor at construction.
//! Nothing reads the environment after that.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::env::VarError;
use std::str::FromStr;

use crate::consts::{DEFAULT_HISTORY_LIMIT, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};
use crate::doc::{Document, GridSettings};
use crate::geometry::{CanvasSize, Size};

pub const ENV_CANVAS_WIDTH: &str = "FLOWCORE_CANVAS_WIDTH";
pub const ENV_CANVAS_HEIGHT: &str = "FLOWCORE_CANVAS_HEIGHT";
pub const ENV_GRID_SIZE: &str = "FLOWCORE_GRID_SIZE";
pub const ENV_GRID_ENABLED: &str = "FLOWCORE_GRID_ENABLED";
pub const ENV_HISTORY_LIMIT: &str = "FLOWCORE_HISTORY_LIMIT";

/// Tuning knobs for an editor session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Extent nodes are clamped into.
    pub canvas: CanvasSize,
    /// Grid settings of a fresh document.
    pub grid: GridSettings,
    /// Undo entries kept before eviction.
    pub history_limit: usize,
    /// Size given to nodes created through the editor.
    pub node_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::default(),
            grid: GridSettings::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            node_size: Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
        }
    }
}

impl EditorConfig {
    /// Read overrides from `FLOWCORE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_value)
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Missing, unparsable, non-finite or non-positive values fall back to
    /// the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let positive = |key: &str, default: f64| {
            parse_or(&lookup, key, default).filter(|v: &f64| v.is_finite() && *v > 0.0).unwrap_or(default)
        };
        let grid = GridSettings {
            enabled: parse_or(&lookup, ENV_GRID_ENABLED, defaults.grid.enabled).unwrap_or(defaults.grid.enabled),
            size: positive(ENV_GRID_SIZE, defaults.grid.size),
            snap: defaults.grid.snap,
        };
        Self {
            canvas: CanvasSize {
                width: positive(ENV_CANVAS_WIDTH, defaults.canvas.width),
                height: positive(ENV_CANVAS_HEIGHT, defaults.canvas.height),
            },
            grid,
            history_limit: parse_or(&lookup, ENV_HISTORY_LIMIT, defaults.history_limit)
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.history_limit),
            node_size: defaults.node_size,
        }
    }

    /// An empty document carrying this config's grid settings.
    #[must_use]
    pub fn initial_document(&self) -> Document {
        Document { grid: self.grid, ..Document::default() }
    }
}

/// Environment value for `key`. A value that is not valid unicode is
/// reported and treated as absent.
fn env_value(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => {
            tracing::warn!(key, value = ?raw, "ignoring non-unicode config value");
            None
        }
    }
}

/// Parsed value for `key`, `Some(default)` when absent, `None` when present
/// but unparsable.
fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Option<T> {
    let Some(raw) = lookup(key) else {
        return Some(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}
