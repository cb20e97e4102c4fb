//! Read-only conference state consumed by the coordinator.
//!
//! The coordinator never subscribes to the store. It takes a
//! [`ConferenceSnapshot`] at decision time through [`StateSource`], so a
//! decision always reflects the state at the moment it is made.

use crate::media::{ParticipantTracks, QuadrantSlot, StreamHandle};
use crate::router::SwapFlags;
use common::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Participant metadata the stage cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    #[serde(default)]
    pub display_name: String,
    /// The participant running this client.
    #[serde(default)]
    pub is_local: bool,
    /// Synthetic participant (shared video, whiteboard, screen share).
    #[serde(default)]
    pub is_fake: bool,
    /// Screen-share pseudo-participant.
    #[serde(default)]
    pub is_screen_share: bool,
}

impl ParticipantInfo {
    /// Regular remote participant.
    #[must_use]
    pub fn remote(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            is_local: false,
            is_fake: false,
            is_screen_share: false,
        }
    }

    /// The local participant.
    #[must_use]
    pub fn local(id: impl Into<ParticipantId>) -> Self {
        Self {
            is_local: true,
            ..Self::remote(id)
        }
    }

    /// Screen-share pseudo-participant.
    #[must_use]
    pub fn screen_share(id: impl Into<ParticipantId>) -> Self {
        Self {
            is_fake: true,
            is_screen_share: true,
            ..Self::remote(id)
        }
    }
}

/// User-toggled stage settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSettings {
    /// Exchange local main/sub feeds.
    #[serde(default)]
    pub swap_local: bool,
    /// Exchange remote main/sub feeds.
    #[serde(default)]
    pub swap_remote: bool,
    /// Mirror local video; `None` until the user has chosen.
    #[serde(default)]
    pub local_flip_x: Option<bool>,
    /// Hide the local participant's own video.
    #[serde(default)]
    pub hide_self_view: bool,
}

impl StageSettings {
    #[must_use]
    pub const fn swap_flags(&self) -> SwapFlags {
        SwapFlags::new(self.swap_local, self.swap_remote)
    }
}

/// Point-in-time view of the conference state.
#[derive(Debug, Clone, Default)]
pub struct ConferenceSnapshot {
    pub participants: HashMap<ParticipantId, ParticipantInfo>,
    pub tracks: HashMap<ParticipantId, ParticipantTracks>,
    pub pinned: Option<ParticipantId>,
    pub settings: StageSettings,
}

impl ConferenceSnapshot {
    #[must_use]
    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantInfo> {
        self.participants.get(id)
    }

    #[must_use]
    pub fn tracks_for(&self, id: &ParticipantId) -> Option<&ParticipantTracks> {
        self.tracks.get(id)
    }

    /// The local participant's ID, if it has joined.
    #[must_use]
    pub fn local_participant_id(&self) -> Option<&ParticipantId> {
        self.participants
            .values()
            .find(|p| p.is_local)
            .map(|p| &p.id)
    }
}

/// Source of conference state snapshots.
///
/// Implemented by whatever owns the conference state; the coordinator only
/// reads from it.
pub trait StateSource: Send + Sync {
    /// Take a snapshot of the current state.
    fn snapshot(&self) -> ConferenceSnapshot;
}

/// In-process conference state store.
///
/// Writers mutate through the helper methods; readers take snapshots.
#[derive(Debug, Default)]
pub struct ConferenceStore {
    inner: RwLock<ConferenceSnapshot>,
}

impl ConferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an arbitrary mutation.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ConferenceSnapshot),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Insert or replace a participant.
    pub fn upsert_participant(&self, participant: ParticipantInfo) {
        self.update(|s| {
            s.participants.insert(participant.id.clone(), participant);
        });
    }

    /// Remove a participant, its tracks, and its pin.
    pub fn remove_participant(&self, id: &ParticipantId) {
        self.update(|s| {
            s.participants.remove(id);
            s.tracks.remove(id);
            if s.pinned.as_ref() == Some(id) {
                s.pinned = None;
            }
        });
    }

    /// Set or clear one track entry for a participant.
    pub fn set_track(&self, id: &ParticipantId, slot: QuadrantSlot, stream: Option<StreamHandle>) {
        self.update(|s| {
            s.tracks.entry(id.clone()).or_default().set(slot, stream);
        });
    }

    /// Pin a participant, or unpin with `None`.
    pub fn set_pinned(&self, id: Option<ParticipantId>) {
        self.update(|s| s.pinned = id);
    }

    /// Replace the stage settings.
    pub fn set_settings(&self, settings: StageSettings) {
        self.update(|s| s.settings = settings);
    }
}

impl StateSource for ConferenceStore {
    fn snapshot(&self) -> ConferenceSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
