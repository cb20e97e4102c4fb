//! Mock display container for stage testing.
//!
//! Records every call the coordinator makes and can be configured to:
//! - Delay `prepare` per stream (to race attaches)
//! - Fail `prepare` per stream
//! - Reject `show`
//!
//! # Example
//!
//! ```rust,ignore
//! use stage_test_utils::MockContainer;
//!
//! let video = MockContainer::builder()
//!     .with_prepare_delay("cam-a", Duration::from_millis(100))
//!     .fail_prepare("cam-gone", SurfaceError::StreamEnded)
//!     .build();
//! ```

use async_trait::async_trait;
use common::types::StreamId;
use stage_controller::containers::{ContainerKind, DisplayContainer};
use stage_controller::errors::SurfaceError;
use stage_controller::layout::{LayoutMode, QuadrantTransform, StageGeometry};
use stage_controller::media::{QuadrantSlot, StreamHandle, VideoKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One committed attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub slot: QuadrantSlot,
    pub stream_id: StreamId,
    pub kind: VideoKind,
    pub force_reattach: bool,
}

#[derive(Debug, Default)]
struct MockState {
    visible: bool,
    destroyed: bool,
    slots: BTreeMap<QuadrantSlot, StreamHandle>,
    commits: Vec<CommitRecord>,
    geometry: Option<(StageGeometry, bool)>,
    local_flip_x: Option<bool>,
    layout: Option<LayoutMode>,
    transforms: BTreeMap<QuadrantSlot, QuadrantTransform>,
    audio_level: Option<f32>,
}

/// Mock `DisplayContainer`.
#[derive(Debug)]
pub struct MockContainer {
    kind: ContainerKind,
    renders_streams: bool,
    reject_show: bool,
    prepare_delays: HashMap<StreamId, Duration>,
    prepare_failures: HashMap<StreamId, SurfaceError>,
    show_calls: AtomicUsize,
    hide_calls: AtomicUsize,
    prepare_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    state: Mutex<MockState>,
}

impl MockContainer {
    /// Create a new MockContainer builder.
    #[must_use]
    pub fn builder() -> MockContainerBuilder {
        MockContainerBuilder::default()
    }

    /// Video surface that accepts every stream immediately.
    #[must_use]
    pub fn video() -> Arc<Self> {
        Arc::new(Self::builder().build())
    }

    /// Feature container of `kind` that cannot render streams.
    #[must_use]
    pub fn feature(kind: ContainerKind) -> Arc<Self> {
        Arc::new(Self::builder().kind(kind).build())
    }

    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().unwrap().destroyed
    }

    #[must_use]
    pub fn show_calls(&self) -> usize {
        self.show_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn hide_calls(&self) -> usize {
        self.hide_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// Every committed attach, oldest first.
    #[must_use]
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.state.lock().unwrap().commits.clone()
    }

    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    /// Stream currently bound to `slot`.
    #[must_use]
    pub fn slot(&self, slot: QuadrantSlot) -> Option<StreamId> {
        self.state
            .lock()
            .unwrap()
            .slots
            .get(&slot)
            .map(|s| s.id().clone())
    }

    /// Last geometry applied and whether it was animated.
    #[must_use]
    pub fn geometry(&self) -> Option<(StageGeometry, bool)> {
        self.state.lock().unwrap().geometry
    }

    #[must_use]
    pub fn local_flip_x(&self) -> Option<bool> {
        self.state.lock().unwrap().local_flip_x
    }

    #[must_use]
    pub fn layout(&self) -> Option<LayoutMode> {
        self.state.lock().unwrap().layout
    }

    #[must_use]
    pub fn transform(&self, slot: QuadrantSlot) -> Option<QuadrantTransform> {
        self.state.lock().unwrap().transforms.get(&slot).copied()
    }

    #[must_use]
    pub fn audio_level(&self) -> Option<f32> {
        self.state.lock().unwrap().audio_level
    }
}

#[async_trait]
impl DisplayContainer for MockContainer {
    async fn show(&self) -> Result<(), SurfaceError> {
        self.show_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_show {
            return Err(SurfaceError::Engine("show rejected".to_string()));
        }
        self.state.lock().unwrap().visible = true;
        Ok(())
    }

    async fn hide(&self) -> Result<(), SurfaceError> {
        self.hide_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().visible = false;
        Ok(())
    }

    async fn prepare(
        &self,
        _slot: QuadrantSlot,
        stream: &StreamHandle,
    ) -> Result<(), SurfaceError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if !self.renders_streams || self.is_destroyed() {
            return Err(SurfaceError::Unavailable);
        }
        if let Some(delay) = self.prepare_delays.get(stream.id()) {
            tokio::time::sleep(*delay).await;
        }
        match self.prepare_failures.get(stream.id()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn commit(&self, slot: QuadrantSlot, stream: StreamHandle, kind: VideoKind) {
        let mut state = self.state.lock().unwrap();
        state.commits.push(CommitRecord {
            slot,
            stream_id: stream.id().clone(),
            kind,
            force_reattach: stream.force_reattach(),
        });
        state.slots.insert(slot, stream);
    }

    fn stream_id(&self) -> Option<StreamId> {
        self.slot(QuadrantSlot::LocalMain)
    }

    fn resize(&self, geometry: StageGeometry, animate: bool) {
        self.state.lock().unwrap().geometry = Some((geometry, animate));
    }

    fn set_local_flip_x(&self, flip: bool) {
        self.state.lock().unwrap().local_flip_x = Some(flip);
    }

    fn set_quadrant_transform(&self, slot: QuadrantSlot, transform: QuadrantTransform) {
        self.state.lock().unwrap().transforms.insert(slot, transform);
    }

    fn set_layout(&self, mode: LayoutMode) {
        self.state.lock().unwrap().layout = Some(mode);
    }

    fn set_audio_level(&self, level: f32) {
        self.state.lock().unwrap().audio_level = Some(level);
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.destroyed = true;
        state.visible = false;
    }
}

/// Builder for MockContainer configuration.
#[derive(Debug, Default)]
pub struct MockContainerBuilder {
    kind: Option<ContainerKind>,
    reject_show: bool,
    prepare_delays: HashMap<StreamId, Duration>,
    prepare_failures: HashMap<StreamId, SurfaceError>,
}

impl MockContainerBuilder {
    /// Set the container kind (default: `Camera`).
    ///
    /// Only video kinds render streams.
    #[must_use]
    pub fn kind(mut self, kind: ContainerKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Make `prepare` for `stream` take `delay`.
    #[must_use]
    pub fn with_prepare_delay(mut self, stream: impl Into<StreamId>, delay: Duration) -> Self {
        self.prepare_delays.insert(stream.into(), delay);
        self
    }

    /// Make `prepare` for `stream` fail with `err`.
    #[must_use]
    pub fn fail_prepare(mut self, stream: impl Into<StreamId>, err: SurfaceError) -> Self {
        self.prepare_failures.insert(stream.into(), err);
        self
    }

    /// Make `show` fail.
    #[must_use]
    pub fn reject_show(mut self) -> Self {
        self.reject_show = true;
        self
    }

    /// Build the MockContainer.
    #[must_use]
    pub fn build(self) -> MockContainer {
        let kind = self.kind.unwrap_or_default();
        MockContainer {
            kind,
            renders_streams: kind.is_video(),
            reject_show: self.reject_show,
            prepare_delays: self.prepare_delays,
            prepare_failures: self.prepare_failures,
            show_calls: AtomicUsize::new(0),
            hide_calls: AtomicUsize::new(0),
            prepare_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            state: Mutex::new(MockState::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_container_records_commits() {
        let video = MockContainer::video();
        let stream = StreamHandle::camera("cam-a");

        video.prepare(QuadrantSlot::LocalMain, &stream).await.unwrap();
        video.commit(QuadrantSlot::LocalMain, stream, VideoKind::Camera);

        assert_eq!(video.prepare_calls(), 1);
        assert_eq!(video.commit_count(), 1);
        assert_eq!(video.stream_id(), Some(StreamId::new("cam-a")));
    }

    #[tokio::test]
    async fn test_mock_container_failures() {
        let video = MockContainer::builder()
            .fail_prepare("cam-gone", SurfaceError::StreamEnded)
            .reject_show()
            .build();

        let result = video
            .prepare(QuadrantSlot::RemoteMain, &StreamHandle::camera("cam-gone"))
            .await;
        assert_eq!(result, Err(SurfaceError::StreamEnded));
        assert!(video.show().await.is_err());
        assert!(!video.is_visible());
    }

    #[tokio::test]
    async fn test_feature_container_cannot_render() {
        let whiteboard = MockContainer::feature(ContainerKind::Whiteboard);
        let result = whiteboard
            .prepare(QuadrantSlot::LocalMain, &StreamHandle::camera("cam-a"))
            .await;
        assert_eq!(result, Err(SurfaceError::Unavailable));
    }

    #[test]
    fn test_destroy() {
        let video = MockContainer::video();
        video.destroy();
        assert!(video.is_destroyed());
        assert_eq!(video.destroy_calls(), 1);
    }
}
