//! Pre-configured conference state for stage testing.
//!
//! Stream IDs follow `{participant}-{slot}` (e.g. `me-local_main`), so tests
//! can name an expected stream without looking it up.

use common::types::{ParticipantId, StreamId};
use stage_controller::media::{QuadrantSlot, StreamHandle};
use stage_controller::state::{ConferenceStore, ParticipantInfo, StageSettings, StateSource};
use std::sync::Arc;
use uuid::Uuid;

/// Shorthand for a participant ID.
#[must_use]
pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

/// Stream ID a fixture assigns to `participant`'s `slot`.
#[must_use]
pub fn stream_id(participant: &str, slot: QuadrantSlot) -> StreamId {
    StreamId::new(format!("{participant}-{}", slot.as_str()))
}

/// Conference state builder backed by a shared `ConferenceStore`.
#[derive(Debug, Clone, Default)]
pub struct TestConference {
    store: Arc<ConferenceStore>,
}

impl TestConference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying store, for mutations mid-test.
    #[must_use]
    pub fn store(&self) -> Arc<ConferenceStore> {
        Arc::clone(&self.store)
    }

    /// The store as a coordinator state source.
    #[must_use]
    pub fn state(&self) -> Arc<dyn StateSource> {
        Arc::clone(&self.store) as Arc<dyn StateSource>
    }

    /// Add the local participant with no tracks.
    #[must_use]
    pub fn with_local(self, id: &str) -> Self {
        self.store.upsert_participant(ParticipantInfo::local(id));
        self
    }

    /// Add a remote participant with no tracks.
    #[must_use]
    pub fn with_remote(self, id: &str) -> Self {
        self.store.upsert_participant(ParticipantInfo::remote(id));
        self
    }

    /// Add a remote participant with a random ID; returns the ID.
    #[must_use]
    pub fn add_random_remote(&self) -> ParticipantId {
        let id = format!("remote-{}", Uuid::new_v4());
        self.store.upsert_participant(ParticipantInfo::remote(id.as_str()));
        ParticipantId::new(id)
    }

    /// Add a screen-share pseudo-participant with a desktop stream in
    /// remote-main.
    #[must_use]
    pub fn with_screen_share(self, id: &str) -> Self {
        self.store.upsert_participant(ParticipantInfo::screen_share(id));
        self.store.set_track(
            &pid(id),
            QuadrantSlot::RemoteMain,
            Some(StreamHandle::desktop(stream_id(id, QuadrantSlot::RemoteMain))),
        );
        self
    }

    /// Give `id` a camera stream in `slot`.
    #[must_use]
    pub fn with_camera(self, id: &str, slot: QuadrantSlot) -> Self {
        self.store.set_track(
            &pid(id),
            slot,
            Some(StreamHandle::camera(stream_id(id, slot))),
        );
        self
    }

    /// Give `id` a desktop stream in `slot`.
    #[must_use]
    pub fn with_desktop(self, id: &str, slot: QuadrantSlot) -> Self {
        self.store.set_track(
            &pid(id),
            slot,
            Some(StreamHandle::desktop(stream_id(id, slot))),
        );
        self
    }

    /// Local participant with camera streams in all four slots.
    #[must_use]
    pub fn with_local_quad(self, id: &str) -> Self {
        QuadrantSlot::ALL
            .into_iter()
            .fold(self.with_local(id), |conf, slot| conf.with_camera(id, slot))
    }

    /// Replace the stored settings.
    #[must_use]
    pub fn with_settings(self, settings: StageSettings) -> Self {
        self.store.set_settings(settings);
        self
    }

    /// Pin `id`.
    #[must_use]
    pub fn with_pinned(self, id: &str) -> Self {
        self.store.set_pinned(Some(pid(id)));
        self
    }

    /// Replace one stream mid-test.
    pub fn replace_stream(&self, id: &str, slot: QuadrantSlot, stream: &str) {
        self.store
            .set_track(&pid(id), slot, Some(StreamHandle::camera(stream)));
    }

    /// Remove one stream mid-test.
    pub fn clear_stream(&self, id: &str, slot: QuadrantSlot) {
        self.store.set_track(&pid(id), slot, None);
    }
}
