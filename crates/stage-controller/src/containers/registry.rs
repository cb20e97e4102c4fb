//! Container registry: kind → surface, plus the "currently visible" pointer.
//!
//! One surface may be registered under several kinds (the video surface is
//! both `Camera` and `Desktop`). Identity is the `Arc` pointer.

use super::{ContainerKind, DisplayContainer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of display containers keyed by kind.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    containers: HashMap<ContainerKind, Arc<dyn DisplayContainer>>,
    current: Option<ContainerKind>,
}

impl ContainerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the container for `kind`.
    ///
    /// Returns the replaced container, if any.
    pub fn add(
        &mut self,
        kind: ContainerKind,
        container: Arc<dyn DisplayContainer>,
    ) -> Option<Arc<dyn DisplayContainer>> {
        debug!(target: "stage.registry", kind = %kind, "Container registered");
        self.containers.insert(kind, container)
    }

    /// Unregister the container for `kind`.
    ///
    /// If it was the visible one, the pointer falls back to a remaining
    /// video kind, otherwise it is cleared.
    pub fn remove(&mut self, kind: ContainerKind) -> Option<Arc<dyn DisplayContainer>> {
        let removed = self.containers.remove(&kind)?;

        if self.current == Some(kind) {
            self.current = self.video_kind();
            debug!(
                target: "stage.registry",
                removed = %kind,
                fallback = ?self.current,
                "Visible container removed"
            );
        }

        Some(removed)
    }

    #[must_use]
    pub fn get(&self, kind: ContainerKind) -> Option<&Arc<dyn DisplayContainer>> {
        self.containers.get(&kind)
    }

    #[must_use]
    pub fn contains(&self, kind: ContainerKind) -> bool {
        self.containers.contains_key(&kind)
    }

    /// First registered video kind, `Camera` before `Desktop`.
    #[must_use]
    pub fn video_kind(&self) -> Option<ContainerKind> {
        [ContainerKind::Camera, ContainerKind::Desktop]
            .into_iter()
            .find(|kind| self.contains(*kind))
    }

    /// Kind of the visible container.
    #[must_use]
    pub fn current_kind(&self) -> Option<ContainerKind> {
        self.current
    }

    /// The visible container.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<dyn DisplayContainer>> {
        self.current.and_then(|kind| self.containers.get(&kind))
    }

    /// Move the visible pointer. Returns `false` if `kind` is not registered.
    pub fn set_current(&mut self, kind: ContainerKind) -> bool {
        if self.containers.contains_key(&kind) {
            self.current = Some(kind);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_visible(&self, kind: ContainerKind) -> bool {
        self.current == Some(kind)
    }

    /// Whether `container` is still registered under any kind.
    #[must_use]
    pub fn contains_surface(&self, container: &Arc<dyn DisplayContainer>) -> bool {
        self.containers.values().any(|c| Arc::ptr_eq(c, container))
    }

    /// Whether two kinds resolve to the same surface.
    #[must_use]
    pub fn shares_surface(&self, a: ContainerKind, b: ContainerKind) -> bool {
        match (self.containers.get(&a), self.containers.get(&b)) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<ContainerKind> {
        let mut kinds: Vec<ContainerKind> = self.containers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Empty the registry, returning each distinct surface once.
    pub fn drain_unique(&mut self) -> Vec<Arc<dyn DisplayContainer>> {
        self.current = None;
        let mut unique: Vec<Arc<dyn DisplayContainer>> = Vec::new();
        for (_, container) in self.containers.drain() {
            if !unique.iter().any(|c| Arc::ptr_eq(c, &container)) {
                unique.push(container);
            }
        }
        unique
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::SurfaceError;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct NullSurface;

    #[async_trait]
    impl DisplayContainer for NullSurface {
        async fn show(&self) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn hide(&self) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn destroy(&self) {}
    }

    fn surface() -> Arc<dyn DisplayContainer> {
        Arc::new(NullSurface)
    }

    #[test]
    fn test_add_replaces_existing() {
        let mut registry = ContainerRegistry::new();
        assert!(registry.add(ContainerKind::Whiteboard, surface()).is_none());
        assert!(registry.add(ContainerKind::Whiteboard, surface()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_current_requires_registration() {
        let mut registry = ContainerRegistry::new();
        assert!(!registry.set_current(ContainerKind::SharedVideo));
        assert_eq!(registry.current_kind(), None);

        registry.add(ContainerKind::SharedVideo, surface());
        assert!(registry.set_current(ContainerKind::SharedVideo));
        assert!(registry.is_visible(ContainerKind::SharedVideo));
        assert!(registry.current().is_some());
    }

    #[test]
    fn test_remove_visible_falls_back_to_camera() {
        let mut registry = ContainerRegistry::new();
        registry.add(ContainerKind::Camera, surface());
        registry.add(ContainerKind::Whiteboard, surface());
        registry.set_current(ContainerKind::Whiteboard);

        assert!(registry.remove(ContainerKind::Whiteboard).is_some());
        assert_eq!(registry.current_kind(), Some(ContainerKind::Camera));
    }

    #[test]
    fn test_remove_visible_camera_falls_back_to_desktop_alias() {
        let mut registry = ContainerRegistry::new();
        let video = surface();
        registry.add(ContainerKind::Camera, Arc::clone(&video));
        registry.add(ContainerKind::Desktop, Arc::clone(&video));
        registry.set_current(ContainerKind::Camera);

        registry.remove(ContainerKind::Camera);
        assert_eq!(registry.current_kind(), Some(ContainerKind::Desktop));
        assert!(Arc::ptr_eq(registry.current().unwrap(), &video));
        assert_eq!(registry.video_kind(), Some(ContainerKind::Desktop));
    }

    #[test]
    fn test_remove_visible_without_camera_clears_pointer() {
        let mut registry = ContainerRegistry::new();
        registry.add(ContainerKind::Whiteboard, surface());
        registry.set_current(ContainerKind::Whiteboard);

        registry.remove(ContainerKind::Whiteboard);
        assert_eq!(registry.current_kind(), None);
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut registry = ContainerRegistry::new();
        assert!(registry.remove(ContainerKind::Desktop).is_none());
    }

    #[test]
    fn test_shared_surface_drains_once() {
        let mut registry = ContainerRegistry::new();
        let video = surface();
        registry.add(ContainerKind::Camera, Arc::clone(&video));
        registry.add(ContainerKind::Desktop, Arc::clone(&video));
        registry.add(ContainerKind::Whiteboard, surface());
        registry.set_current(ContainerKind::Camera);

        assert!(registry.shares_surface(ContainerKind::Camera, ContainerKind::Desktop));
        assert!(!registry.shares_surface(ContainerKind::Camera, ContainerKind::Whiteboard));

        let drained = registry.drain_unique();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.current_kind(), None);
    }

    #[test]
    fn test_contains_surface_tracks_aliases() {
        let mut registry = ContainerRegistry::new();
        let video = surface();
        registry.add(ContainerKind::Camera, Arc::clone(&video));
        registry.add(ContainerKind::Desktop, Arc::clone(&video));

        registry.remove(ContainerKind::Camera);
        assert!(registry.contains_surface(&video));

        registry.remove(ContainerKind::Desktop);
        assert!(!registry.contains_surface(&video));
    }
}
