//! Quadrant stream router.
//!
//! Resolves a participant and the two swap toggles into the four slot
//! streams. Pure: every call reads the snapshot it is given and nothing else.

use crate::media::{QuadrantSlot, StreamHandle, VideoKind};
use crate::state::ConferenceSnapshot;
use common::types::ParticipantId;
use serde::{Deserialize, Serialize};

/// Operator-toggled main/sub exchange flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFlags {
    pub swap_local: bool,
    pub swap_remote: bool,
}

impl SwapFlags {
    #[must_use]
    pub const fn new(swap_local: bool, swap_remote: bool) -> Self {
        Self {
            swap_local,
            swap_remote,
        }
    }

    /// Track entry that feeds `slot` under these flags.
    #[must_use]
    pub const fn source_for(&self, slot: QuadrantSlot) -> QuadrantSlot {
        match (slot, self.swap_local, self.swap_remote) {
            (QuadrantSlot::LocalMain, true, _) => QuadrantSlot::LocalSub,
            (QuadrantSlot::LocalSub, true, _) => QuadrantSlot::LocalMain,
            (QuadrantSlot::RemoteMain, _, true) => QuadrantSlot::RemoteSub,
            (QuadrantSlot::RemoteSub, _, true) => QuadrantSlot::RemoteMain,
            (other, _, _) => other,
        }
    }
}

/// A stream resolved for one slot, with its derived video kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub handle: StreamHandle,
    pub kind: VideoKind,
}

/// The four slot streams for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadrantAssignment {
    pub local_main: Option<ResolvedStream>,
    pub local_sub: Option<ResolvedStream>,
    pub remote_main: Option<ResolvedStream>,
    pub remote_sub: Option<ResolvedStream>,
}

impl QuadrantAssignment {
    /// Order in which slots are attached; the primary local-main goes last.
    pub const ATTACH_ORDER: [QuadrantSlot; 4] = [
        QuadrantSlot::LocalSub,
        QuadrantSlot::RemoteMain,
        QuadrantSlot::RemoteSub,
        QuadrantSlot::LocalMain,
    ];

    #[must_use]
    pub fn get(&self, slot: QuadrantSlot) -> Option<&ResolvedStream> {
        match slot {
            QuadrantSlot::LocalMain => self.local_main.as_ref(),
            QuadrantSlot::LocalSub => self.local_sub.as_ref(),
            QuadrantSlot::RemoteMain => self.remote_main.as_ref(),
            QuadrantSlot::RemoteSub => self.remote_sub.as_ref(),
        }
    }

    /// Move the stream out of `slot`.
    pub fn take(&mut self, slot: QuadrantSlot) -> Option<ResolvedStream> {
        self.slot_mut(slot).take()
    }

    /// Mark every resolved copy for forced re-attachment.
    ///
    /// Each slot owns its own handle copy, so the flag never leaks to the
    /// conference state or to another slot sharing the same stream.
    pub fn mark_force_reattach(&mut self) {
        for slot in QuadrantSlot::ALL {
            if let Some(resolved) = self.slot_mut(slot).take() {
                *self.slot_mut(slot) = Some(ResolvedStream {
                    handle: resolved.handle.with_force_reattach(),
                    kind: resolved.kind,
                });
            }
        }
    }

    /// Number of slots with a stream.
    #[must_use]
    pub fn len(&self) -> usize {
        QuadrantSlot::ALL
            .iter()
            .filter(|slot| self.get(**slot).is_some())
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, slot: QuadrantSlot) -> &mut Option<ResolvedStream> {
        match slot {
            QuadrantSlot::LocalMain => &mut self.local_main,
            QuadrantSlot::LocalSub => &mut self.local_sub,
            QuadrantSlot::RemoteMain => &mut self.remote_main,
            QuadrantSlot::RemoteSub => &mut self.remote_sub,
        }
    }
}

/// Stateless resolver from participant + swap flags to slot streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadrantRouter;

impl QuadrantRouter {
    /// Resolve the four slots for `id`.
    ///
    /// Local slots are only filled for the local participant. Missing track
    /// entries produce empty slots.
    #[must_use]
    pub fn resolve(
        snapshot: &ConferenceSnapshot,
        id: &ParticipantId,
        swap: SwapFlags,
    ) -> QuadrantAssignment {
        let Some(tracks) = snapshot.tracks_for(id) else {
            return QuadrantAssignment::default();
        };
        let participant = snapshot.participant(id);
        let is_local = participant.is_some_and(|p| p.is_local);
        let is_screen_share = participant.is_some_and(|p| p.is_screen_share);

        let resolve_slot = |slot: QuadrantSlot| {
            if slot.is_local() && !is_local {
                return None;
            }
            tracks.get(swap.source_for(slot)).map(|handle| {
                let kind = if is_screen_share || handle.kind() == Some(VideoKind::Desktop) {
                    VideoKind::Desktop
                } else {
                    VideoKind::Camera
                };
                ResolvedStream {
                    handle: handle.clone(),
                    kind,
                }
            })
        };

        QuadrantAssignment {
            local_main: resolve_slot(QuadrantSlot::LocalMain),
            local_sub: resolve_slot(QuadrantSlot::LocalSub),
            remote_main: resolve_slot(QuadrantSlot::RemoteMain),
            remote_sub: resolve_slot(QuadrantSlot::RemoteSub),
        }
    }

    /// Video kind used to pick a container for `id`.
    ///
    /// Synthetic participants other than screen shares render as camera;
    /// screen shares as desktop; everyone else by their first video track.
    /// `None` when unknown.
    #[must_use]
    pub fn remote_video_kind(
        snapshot: &ConferenceSnapshot,
        id: &ParticipantId,
    ) -> Option<VideoKind> {
        let participant = snapshot.participant(id)?;

        if participant.is_screen_share {
            return Some(VideoKind::Desktop);
        }
        if participant.is_fake {
            return Some(VideoKind::Camera);
        }

        snapshot
            .tracks_for(id)
            .and_then(crate::media::ParticipantTracks::first_video_kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::state::{ConferenceStore, ParticipantInfo, StateSource};

    fn store_with_four_streams() -> (ConferenceStore, ParticipantId) {
        let store = ConferenceStore::new();
        let id = ParticipantId::new("p");
        store.upsert_participant(ParticipantInfo::local("p"));
        store.set_track(&id, QuadrantSlot::LocalMain, Some(StreamHandle::camera("A")));
        store.set_track(&id, QuadrantSlot::LocalSub, Some(StreamHandle::camera("B")));
        store.set_track(&id, QuadrantSlot::RemoteMain, Some(StreamHandle::camera("C")));
        store.set_track(&id, QuadrantSlot::RemoteSub, Some(StreamHandle::desktop("D")));
        (store, id)
    }

    fn ids(assignment: &QuadrantAssignment) -> [Option<String>; 4] {
        QuadrantSlot::ALL.map(|slot| {
            assignment
                .get(slot)
                .map(|r| r.handle.id().as_str().to_string())
        })
    }

    fn named(a: &str, b: &str, c: &str, d: &str) -> [Option<String>; 4] {
        [a, b, c, d].map(|s| Some(s.to_string()))
    }

    #[test]
    fn test_swap_combinations() {
        let (store, id) = store_with_four_streams();
        let snapshot = store.snapshot();

        let cases = [
            (false, false, named("A", "B", "C", "D")),
            (true, false, named("B", "A", "C", "D")),
            (false, true, named("A", "B", "D", "C")),
            (true, true, named("B", "A", "D", "C")),
        ];

        for (swap_local, swap_remote, expected) in cases {
            let assignment =
                QuadrantRouter::resolve(&snapshot, &id, SwapFlags::new(swap_local, swap_remote));
            assert_eq!(
                ids(&assignment),
                expected,
                "swap_local={swap_local} swap_remote={swap_remote}"
            );
        }
    }

    #[test]
    fn test_derived_kinds() {
        let (store, id) = store_with_four_streams();
        let assignment = QuadrantRouter::resolve(&store.snapshot(), &id, SwapFlags::default());

        assert_eq!(assignment.get(QuadrantSlot::LocalMain).unwrap().kind, VideoKind::Camera);
        assert_eq!(assignment.get(QuadrantSlot::RemoteSub).unwrap().kind, VideoKind::Desktop);
    }

    #[test]
    fn test_screen_share_participant_resolves_desktop() {
        let store = ConferenceStore::new();
        let id = ParticipantId::new("share-1");
        store.upsert_participant(ParticipantInfo::screen_share("share-1"));
        store.set_track(&id, QuadrantSlot::RemoteMain, Some(StreamHandle::new("s", None)));

        let assignment = QuadrantRouter::resolve(&store.snapshot(), &id, SwapFlags::default());
        assert_eq!(assignment.get(QuadrantSlot::RemoteMain).unwrap().kind, VideoKind::Desktop);
    }

    #[test]
    fn test_missing_entries_are_empty_slots() {
        let store = ConferenceStore::new();
        let id = ParticipantId::new("q");
        store.set_track(&id, QuadrantSlot::RemoteMain, Some(StreamHandle::camera("only")));

        let assignment =
            QuadrantRouter::resolve(&store.snapshot(), &id, SwapFlags::new(false, true));
        assert!(assignment.get(QuadrantSlot::RemoteMain).is_none());
        assert!(assignment.get(QuadrantSlot::RemoteSub).is_some());
        assert_eq!(assignment.len(), 1);

        let unknown = QuadrantRouter::resolve(
            &store.snapshot(),
            &ParticipantId::new("nobody"),
            SwapFlags::default(),
        );
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_remote_participant_local_slots_stay_empty() {
        let store = ConferenceStore::new();
        let id = ParticipantId::new("bob");
        store.upsert_participant(ParticipantInfo::remote("bob"));
        store.set_track(&id, QuadrantSlot::LocalMain, Some(StreamHandle::camera("bob-lm")));
        store.set_track(&id, QuadrantSlot::LocalSub, Some(StreamHandle::camera("bob-ls")));
        store.set_track(&id, QuadrantSlot::RemoteMain, Some(StreamHandle::camera("bob-rm")));
        let snapshot = store.snapshot();

        for (swap_local, swap_remote) in [(false, false), (true, true)] {
            let assignment =
                QuadrantRouter::resolve(&snapshot, &id, SwapFlags::new(swap_local, swap_remote));
            assert!(assignment.local_main.is_none());
            assert!(assignment.local_sub.is_none());
            assert_eq!(assignment.len(), 1);
        }

        // Tracks without participant metadata are treated as remote.
        let unknown = ParticipantId::new("ghost");
        store.set_track(&unknown, QuadrantSlot::LocalMain, Some(StreamHandle::camera("g-lm")));
        let assignment = QuadrantRouter::resolve(&store.snapshot(), &unknown, SwapFlags::default());
        assert!(assignment.is_empty());
    }

    #[test]
    fn test_mark_force_reattach_is_per_slot_copy() {
        let (store, id) = store_with_four_streams();
        let snapshot = store.snapshot();
        let mut assignment = QuadrantRouter::resolve(&snapshot, &id, SwapFlags::default());

        assignment.mark_force_reattach();

        for slot in QuadrantSlot::ALL {
            assert!(assignment.get(slot).unwrap().handle.force_reattach());
        }
        let stored = store.snapshot();
        let tracks = stored.tracks_for(&id).unwrap();
        assert!(QuadrantSlot::ALL
            .iter()
            .all(|slot| !tracks.get(*slot).unwrap().force_reattach()));
    }

    #[test]
    fn test_remote_video_kind() {
        let store = ConferenceStore::new();
        store.upsert_participant(ParticipantInfo::screen_share("share"));
        store.upsert_participant(ParticipantInfo {
            is_fake: true,
            ..ParticipantInfo::remote("whiteboard-bot")
        });
        store.upsert_participant(ParticipantInfo::remote("presenter"));
        store.upsert_participant(ParticipantInfo::remote("silent"));
        store.set_track(
            &ParticipantId::new("presenter"),
            QuadrantSlot::RemoteMain,
            Some(StreamHandle::desktop("deck")),
        );

        let snapshot = store.snapshot();
        let kind = |id: &str| QuadrantRouter::remote_video_kind(&snapshot, &ParticipantId::new(id));

        assert_eq!(kind("share"), Some(VideoKind::Desktop));
        assert_eq!(kind("whiteboard-bot"), Some(VideoKind::Camera));
        assert_eq!(kind("presenter"), Some(VideoKind::Desktop));
        assert_eq!(kind("silent"), None);
        assert_eq!(kind("ghost"), None);
    }
}
