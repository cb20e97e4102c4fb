//! Headless rendering surface.
//!
//! Keeps the same per-slot state a real surface would and reports every
//! transition through tracing. Used by the replay harness.

use super::{ContainerKind, DisplayContainer};
use crate::errors::SurfaceError;
use crate::layout::{LayoutMode, QuadrantTransform, StageGeometry};
use crate::media::{QuadrantSlot, StreamHandle, VideoKind};
use async_trait::async_trait;
use common::types::StreamId;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SurfaceState {
    visible: bool,
    destroyed: bool,
    layout: LayoutMode,
    slots: BTreeMap<QuadrantSlot, StreamHandle>,
}

/// A surface that renders nothing and logs what it would have done.
#[derive(Debug)]
pub struct LoggingSurface {
    name: ContainerKind,
    state: Mutex<SurfaceState>,
}

impl LoggingSurface {
    #[must_use]
    pub fn new(name: ContainerKind) -> Self {
        Self {
            name,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    /// Whether the surface is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).visible
    }

    /// Stream bound to `slot`.
    #[must_use]
    pub fn slot(&self, slot: QuadrantSlot) -> Option<StreamId> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .get(&slot)
            .map(|s| s.id().clone())
    }

    /// Slots the current layout does not render.
    #[must_use]
    pub fn hidden_slots(&self) -> Vec<QuadrantSlot> {
        let layout = self.state.lock().unwrap_or_else(PoisonError::into_inner).layout;
        QuadrantSlot::ALL
            .into_iter()
            .filter(|slot| !layout.is_slot_visible(*slot))
            .collect()
    }

    fn set_visible(&self, visible: bool) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.destroyed {
            return Err(SurfaceError::Unavailable);
        }
        state.visible = visible;
        info!(target: "stage.surface", surface = %self.name, visible, "Visibility changed");
        Ok(())
    }
}

#[async_trait]
impl DisplayContainer for LoggingSurface {
    async fn show(&self) -> Result<(), SurfaceError> {
        self.set_visible(true)
    }

    async fn hide(&self) -> Result<(), SurfaceError> {
        self.set_visible(false)
    }

    async fn prepare(
        &self,
        _slot: QuadrantSlot,
        _stream: &StreamHandle,
    ) -> Result<(), SurfaceError> {
        if !self.name.is_video() {
            return Err(SurfaceError::Unavailable);
        }
        if self.state.lock().unwrap_or_else(PoisonError::into_inner).destroyed {
            return Err(SurfaceError::Unavailable);
        }
        Ok(())
    }

    fn commit(&self, slot: QuadrantSlot, stream: StreamHandle, kind: VideoKind) {
        info!(
            target: "stage.surface",
            surface = %self.name,
            slot = %slot,
            stream_id = %stream.id(),
            kind = %kind,
            force_reattach = stream.force_reattach(),
            "Stream attached"
        );
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .insert(slot, stream);
    }

    fn stream_id(&self) -> Option<StreamId> {
        self.slot(QuadrantSlot::LocalMain)
    }

    fn resize(&self, geometry: StageGeometry, animate: bool) {
        debug!(
            target: "stage.surface",
            surface = %self.name,
            width = geometry.width,
            height = geometry.height,
            animate,
            "Resized"
        );
    }

    fn set_local_flip_x(&self, flip: bool) {
        debug!(target: "stage.surface", surface = %self.name, flip, "Local mirror set");
    }

    fn set_quadrant_transform(&self, slot: QuadrantSlot, transform: QuadrantTransform) {
        debug!(
            target: "stage.surface",
            surface = %self.name,
            slot = %slot,
            rotation = transform.rotation.degrees(),
            flip_x = transform.flip_x,
            "Quadrant transform set"
        );
    }

    fn set_layout(&self, mode: LayoutMode) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).layout = mode;
        debug!(
            target: "stage.surface",
            surface = %self.name,
            mode = %mode,
            hidden = ?self.hidden_slots(),
            "Layout set"
        );
    }

    fn set_audio_level(&self, level: f32) {
        debug!(target: "stage.surface", surface = %self.name, level, "Audio level");
    }

    fn destroy(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.destroyed = true;
        state.visible = false;
        state.slots.clear();
        info!(target: "stage.surface", surface = %self.name, "Destroyed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attach_and_visibility() {
        let surface = LoggingSurface::new(ContainerKind::Camera);
        surface.show().await.unwrap();
        assert!(surface.is_visible());

        let stream = StreamHandle::camera("cam-1");
        surface.prepare(QuadrantSlot::LocalMain, &stream).await.unwrap();
        surface.commit(QuadrantSlot::LocalMain, stream, VideoKind::Camera);
        assert_eq!(surface.stream_id().map(|id| id.to_string()), Some("cam-1".to_string()));
    }

    #[tokio::test]
    async fn test_non_video_surface_rejects_streams() {
        let surface = LoggingSurface::new(ContainerKind::Whiteboard);
        let result = surface
            .prepare(QuadrantSlot::RemoteMain, &StreamHandle::camera("cam-2"))
            .await;
        assert_eq!(result, Err(SurfaceError::Unavailable));
    }

    #[test]
    fn test_layout_hides_slots() {
        let surface = LoggingSurface::new(ContainerKind::Camera);
        assert!(surface.hidden_slots().is_empty());

        surface.set_layout(LayoutMode::RemoteFocus);
        assert_eq!(surface.hidden_slots(), vec![QuadrantSlot::LocalSub]);

        surface.set_layout(LayoutMode::RemoteOnly);
        assert_eq!(
            surface.hidden_slots(),
            vec![QuadrantSlot::LocalMain, QuadrantSlot::LocalSub]
        );
    }

    #[tokio::test]
    async fn test_destroyed_surface_is_unavailable() {
        let surface = LoggingSurface::new(ContainerKind::Camera);
        surface.destroy();
        assert_eq!(surface.show().await, Err(SurfaceError::Unavailable));
        assert!(surface.stream_id().is_none());
    }
}
