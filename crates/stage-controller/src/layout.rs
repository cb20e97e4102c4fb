//! Stage geometry, quadrant transforms and layout modes.

use crate::media::QuadrantSlot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Default filmstrip breakpoint in pixels.
///
/// A vertical filmstrip narrower than this overlays the stage instead of
/// taking width from it.
pub const DEFAULT_FILMSTRIP_BREAKPOINT: u32 = 180;

/// Default double-tap window.
pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Clockwise rotation of one quadrant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Next rotation step, wrapping after 270.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Rotation and mirror state of one quadrant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantTransform {
    pub rotation: Rotation,
    pub flip_x: bool,
}

impl QuadrantTransform {
    #[must_use]
    pub const fn rotated(self) -> Self {
        Self {
            rotation: self.rotation.next(),
            flip_x: self.flip_x,
        }
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        Self {
            rotation: self.rotation,
            flip_x: !self.flip_x,
        }
    }
}

/// How the four quadrants are laid out on the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// All four quadrants.
    #[default]
    SideBySide,
    /// Local-sub hidden; remote feeds get the space.
    RemoteFocus,
    /// Local half hidden.
    RemoteOnly,
}

impl LayoutMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::SideBySide => "side_by_side",
            LayoutMode::RemoteFocus => "remote_focus",
            LayoutMode::RemoteOnly => "remote_only",
        }
    }

    /// Whether `slot` is rendered in this layout.
    #[must_use]
    pub const fn is_slot_visible(&self, slot: QuadrantSlot) -> bool {
        match self {
            LayoutMode::SideBySide => true,
            LayoutMode::RemoteFocus => !matches!(slot, QuadrantSlot::LocalSub),
            LayoutMode::RemoteOnly => !slot.is_local(),
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "side_by_side" => Ok(LayoutMode::SideBySide),
            "remote_focus" => Ok(LayoutMode::RemoteFocus),
            "remote_only" => Ok(LayoutMode::RemoteOnly),
            other => Err(format!("unknown layout mode '{other}'")),
        }
    }
}

/// Window and filmstrip dimensions reported by the view layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub filmstrip_visible: bool,
    #[serde(default)]
    pub filmstrip_resizable: bool,
    #[serde(default)]
    pub filmstrip_width: u32,
}

/// Size available to the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGeometry {
    pub width: u32,
    pub height: u32,
    /// Filmstrip width taken from the viewport (0 when overlaid or hidden).
    pub filmstrip_width: u32,
}

impl StageGeometry {
    /// Compute the stage size for a viewport.
    #[must_use]
    pub fn compute(viewport: Viewport, breakpoint: u32) -> Self {
        let filmstrip_width = if viewport.filmstrip_visible
            && viewport.filmstrip_resizable
            && viewport.filmstrip_width >= breakpoint
        {
            viewport.filmstrip_width
        } else {
            0
        };

        Self {
            width: viewport.width.saturating_sub(filmstrip_width),
            height: viewport.height,
            filmstrip_width,
        }
    }
}

/// Detects two taps within a window.
#[derive(Debug, Clone)]
pub struct DoubleTapDetector {
    window: Duration,
    armed_at: Option<Instant>,
}

impl DoubleTapDetector {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed_at: None,
        }
    }

    /// Register a tap. Returns `true` when it completes a double tap.
    pub fn register(&mut self, now: Instant) -> bool {
        match self.armed_at.take() {
            Some(first) if now.saturating_duration_since(first) < self.window => true,
            _ => {
                self.armed_at = Some(now);
                false
            }
        }
    }
}

impl Default for DoubleTapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_TAP_WINDOW)
    }
}
