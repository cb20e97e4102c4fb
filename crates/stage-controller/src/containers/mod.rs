//! Display containers: the swappable rendering surfaces on the stage.
//!
//! Each surface sits behind the [`DisplayContainer`] capability trait and is
//! addressed through the closed [`ContainerKind`] enum. The coordinator owns
//! only the registry slot, never the surface internals.

pub mod registry;
pub mod surface;

pub use registry::ContainerRegistry;
pub use surface::LoggingSurface;

use crate::errors::SurfaceError;
use crate::layout::{LayoutMode, QuadrantTransform, StageGeometry};
use crate::media::{QuadrantSlot, StreamHandle, VideoKind};
use async_trait::async_trait;
use common::types::StreamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying a container variant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    /// Default video surface.
    #[default]
    Camera,
    /// The video surface addressed as a desktop share.
    Desktop,
    /// Placeholder shown while a remote screen share is starting.
    ScreenSharePlaceholder,
    /// Shared external video player.
    SharedVideo,
    /// Collaborative whiteboard.
    Whiteboard,
}

impl ContainerKind {
    /// Returns the kind as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Camera => "camera",
            ContainerKind::Desktop => "desktop",
            ContainerKind::ScreenSharePlaceholder => "screen-share-placeholder",
            ContainerKind::SharedVideo => "shared-video",
            ContainerKind::Whiteboard => "whiteboard",
        }
    }

    /// Whether this kind addresses the plain video surface.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, ContainerKind::Camera | ContainerKind::Desktop)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renderable surface on the stage.
///
/// Attaching a stream is split in two: [`prepare`](Self::prepare) performs
/// the slow, fallible media-engine work and may suspend; [`commit`](Self::commit)
/// binds the prepared stream and must not suspend. The coordinator only
/// commits when the attach is still the latest one requested for that slot.
///
/// Surfaces that never render streams keep the default no-op hooks.
#[async_trait]
pub trait DisplayContainer: fmt::Debug + Send + Sync {
    /// Make the surface visible.
    async fn show(&self) -> Result<(), SurfaceError>;

    /// Hide the surface.
    async fn hide(&self) -> Result<(), SurfaceError>;

    /// Acquire what the surface needs to render `stream` in `slot`.
    async fn prepare(
        &self,
        _slot: QuadrantSlot,
        _stream: &StreamHandle,
    ) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unavailable)
    }

    /// Bind a prepared stream to `slot`.
    fn commit(&self, _slot: QuadrantSlot, _stream: StreamHandle, _kind: VideoKind) {}

    /// ID of the stream bound to the local-main slot.
    fn stream_id(&self) -> Option<StreamId> {
        None
    }

    /// Apply new stage geometry.
    fn resize(&self, _geometry: StageGeometry, _animate: bool) {}

    /// Mirror the local feeds.
    fn set_local_flip_x(&self, _flip: bool) {}

    /// Apply a per-quadrant rotation/flip.
    fn set_quadrant_transform(&self, _slot: QuadrantSlot, _transform: QuadrantTransform) {}

    /// Switch the quadrant layout.
    fn set_layout(&self, _mode: LayoutMode) {}

    /// Audio level of the participant on stage, in `[0.0, 1.0]`.
    fn set_audio_level(&self, _level: f32) {}

    /// Release the surface. Called once, when the last registry entry for it
    /// goes away.
    fn destroy(&self);
}
