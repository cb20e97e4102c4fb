//! Stream vocabulary shared by the router, the containers and the coordinator.
//!
//! The stage never creates or destroys tracks. It only reads the handles the
//! media engine hands out and forwards them to rendering surfaces.

use crate::containers::ContainerKind;
use common::types::StreamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Video source type of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    /// Camera capture (also the fallback when the type is unknown).
    Camera,
    /// Screen/desktop capture.
    Desktop,
}

impl VideoKind {
    /// Returns the kind as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            VideoKind::Camera => "camera",
            VideoKind::Desktop => "desktop",
        }
    }

    /// The video container kind that renders this source type.
    #[must_use]
    pub const fn container_kind(&self) -> ContainerKind {
        match self {
            VideoKind::Camera => ContainerKind::Camera,
            VideoKind::Desktop => ContainerKind::Desktop,
        }
    }
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four simultaneous stream slots on the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadrantSlot {
    LocalMain,
    LocalSub,
    RemoteMain,
    RemoteSub,
}

impl QuadrantSlot {
    /// All slots, in display order.
    pub const ALL: [QuadrantSlot; 4] = [
        QuadrantSlot::LocalMain,
        QuadrantSlot::LocalSub,
        QuadrantSlot::RemoteMain,
        QuadrantSlot::RemoteSub,
    ];

    /// Returns the slot as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            QuadrantSlot::LocalMain => "local_main",
            QuadrantSlot::LocalSub => "local_sub",
            QuadrantSlot::RemoteMain => "remote_main",
            QuadrantSlot::RemoteSub => "remote_sub",
        }
    }

    /// Whether the slot shows the local side of the call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, QuadrantSlot::LocalMain | QuadrantSlot::LocalSub)
    }
}

impl fmt::Display for QuadrantSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a live media stream.
///
/// Cloning a handle does not clone the stream; it is a cheap reference the
/// surface uses to bind the underlying track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    id: StreamId,
    #[serde(default)]
    kind: Option<VideoKind>,
    /// Forces the surface to re-bind even if it already shows this stream.
    #[serde(default)]
    force_reattach: bool,
}

impl StreamHandle {
    /// Create a handle for a stream with an optional known source type.
    #[must_use]
    pub fn new(id: impl Into<StreamId>, kind: Option<VideoKind>) -> Self {
        Self {
            id: id.into(),
            kind,
            force_reattach: false,
        }
    }

    /// Shorthand for a camera stream.
    #[must_use]
    pub fn camera(id: impl Into<StreamId>) -> Self {
        Self::new(id, Some(VideoKind::Camera))
    }

    /// Shorthand for a desktop stream.
    #[must_use]
    pub fn desktop(id: impl Into<StreamId>) -> Self {
        Self::new(id, Some(VideoKind::Desktop))
    }

    /// Return a copy flagged for forced re-attachment.
    #[must_use]
    pub fn with_force_reattach(mut self) -> Self {
        self.force_reattach = true;
        self
    }

    #[must_use]
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> Option<VideoKind> {
        self.kind
    }

    #[must_use]
    pub fn force_reattach(&self) -> bool {
        self.force_reattach
    }
}

/// A participant's video tracks, local/remote x main/second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantTracks {
    #[serde(default)]
    pub local_main: Option<StreamHandle>,
    #[serde(default)]
    pub local_sub: Option<StreamHandle>,
    #[serde(default)]
    pub remote_main: Option<StreamHandle>,
    #[serde(default)]
    pub remote_sub: Option<StreamHandle>,
}

impl ParticipantTracks {
    /// Track entry for a slot, before any swap is applied.
    #[must_use]
    pub fn get(&self, slot: QuadrantSlot) -> Option<&StreamHandle> {
        match slot {
            QuadrantSlot::LocalMain => self.local_main.as_ref(),
            QuadrantSlot::LocalSub => self.local_sub.as_ref(),
            QuadrantSlot::RemoteMain => self.remote_main.as_ref(),
            QuadrantSlot::RemoteSub => self.remote_sub.as_ref(),
        }
    }

    /// Replace the track entry for a slot.
    pub fn set(&mut self, slot: QuadrantSlot, stream: Option<StreamHandle>) {
        let entry = match slot {
            QuadrantSlot::LocalMain => &mut self.local_main,
            QuadrantSlot::LocalSub => &mut self.local_sub,
            QuadrantSlot::RemoteMain => &mut self.remote_main,
            QuadrantSlot::RemoteSub => &mut self.remote_sub,
        };
        *entry = stream;
    }

    /// Whether any video track is present.
    #[must_use]
    pub fn has_video(&self) -> bool {
        QuadrantSlot::ALL.iter().any(|slot| self.get(*slot).is_some())
    }

    /// Source type of the first track that reports one, in slot order.
    #[must_use]
    pub fn first_video_kind(&self) -> Option<VideoKind> {
        QuadrantSlot::ALL
            .iter()
            .filter_map(|slot| self.get(*slot))
            .find_map(StreamHandle::kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_force_reattach_is_per_copy() {
        let original = StreamHandle::camera("cam-1");
        let forced = original.clone().with_force_reattach();

        assert!(forced.force_reattach());
        assert!(!original.force_reattach());
        assert_eq!(forced.id(), original.id());
    }

    #[test]
    fn test_tracks_set_and_get() {
        let mut tracks = ParticipantTracks::default();
        assert!(!tracks.has_video());

        tracks.set(QuadrantSlot::RemoteSub, Some(StreamHandle::desktop("desk-1")));
        assert!(tracks.has_video());
        assert_eq!(
            tracks.get(QuadrantSlot::RemoteSub).map(|s| s.id().as_str()),
            Some("desk-1")
        );
        assert_eq!(tracks.first_video_kind(), Some(VideoKind::Desktop));

        tracks.set(QuadrantSlot::RemoteSub, None);
        assert!(!tracks.has_video());
    }

    #[test]
    fn test_first_video_kind_skips_unknown() {
        let tracks = ParticipantTracks {
            local_main: Some(StreamHandle::new("unknown", None)),
            local_sub: Some(StreamHandle::camera("cam-2")),
            ..ParticipantTracks::default()
        };
        assert_eq!(tracks.first_video_kind(), Some(VideoKind::Camera));
    }

    #[test]
    fn test_handle_deserializes_without_optional_fields() {
        let handle: StreamHandle = serde_json::from_str(r#"{"id":"cam-9"}"#).unwrap();
        assert_eq!(handle.id().as_str(), "cam-9");
        assert_eq!(handle.kind(), None);
        assert!(!handle.force_reattach());
    }

    #[test]
    fn test_slot_labels() {
        assert_eq!(QuadrantSlot::LocalSub.as_str(), "local_sub");
        assert!(QuadrantSlot::LocalMain.is_local());
        assert!(!QuadrantSlot::RemoteMain.is_local());
    }
}
