//! Scripted conference events.
//!
//! The binary has no conference behind it, so state changes arrive as a
//! script: one JSON object per line, tagged by `type`. Blank lines and lines
//! starting with `#` are ignored.
//!
//! ```text
//! {"type":"join","id":"alice","local":true}
//! {"type":"set_track","id":"alice","slot":"local_main","stream":"cam-a"}
//! {"type":"update","id":"alice"}
//! ```

use crate::actors::StageActorHandle;
use crate::containers::{ContainerKind, LoggingSurface};
use crate::errors::StageError;
use crate::layout::{LayoutMode, Viewport};
use crate::media::{QuadrantSlot, StreamHandle, VideoKind};
use crate::state::{ConferenceStore, ParticipantInfo, StageSettings};

use common::types::ParticipantId;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// A participant joined (or changed metadata).
    Join {
        id: ParticipantId,
        #[serde(default)]
        display_name: String,
        #[serde(default)]
        local: bool,
        #[serde(default)]
        fake: bool,
        #[serde(default)]
        screen_share: bool,
    },
    /// A participant left.
    Leave { id: ParticipantId },
    /// A track appeared in one of the participant's slots.
    SetTrack {
        id: ParticipantId,
        slot: QuadrantSlot,
        stream: String,
        #[serde(default)]
        kind: Option<VideoKind>,
    },
    /// A track went away.
    ClearTrack {
        id: ParticipantId,
        slot: QuadrantSlot,
    },
    /// Stored settings, read by the stage at initialization.
    Settings(StageSettings),
    /// Pin a participant, or unpin.
    Pin {
        #[serde(default)]
        id: Option<ParticipantId>,
    },
    /// Record the intended subject of the stage.
    Active { id: ParticipantId },
    /// Ask the stage to show a participant.
    Update {
        id: ParticipantId,
        #[serde(default)]
        force_update: bool,
        #[serde(default)]
        force_reattach: bool,
    },
    /// Operator swap of main/sub feeds.
    ChangeView {
        id: ParticipantId,
        #[serde(default)]
        swap_local: bool,
        #[serde(default)]
        swap_remote: bool,
    },
    /// Register a feature container.
    AddContainer { kind: ContainerKind },
    /// Unregister a feature container.
    RemoveContainer { kind: ContainerKind },
    /// Show or hide a container.
    ShowContainer { kind: ContainerKind, show: bool },
    /// Last-N membership changed.
    LastN {
        #[serde(default)]
        leaving: Vec<ParticipantId>,
        #[serde(default)]
        entering: Vec<ParticipantId>,
    },
    /// A participant's video may have gone away.
    VideoMuted { id: ParticipantId },
    /// Window or filmstrip size changed.
    Resize(Viewport),
    LocalFlipX { flip: bool },
    HideSelfView { hidden: bool },
    ScreenShareFocus {
        sharing: bool,
        #[serde(default)]
        see_what_is_shared: bool,
    },
    AudioLevel { id: ParticipantId, level: f32 },
    Rotate { slot: QuadrantSlot },
    Flip { slot: QuadrantSlot },
    Layout { mode: LayoutMode },
    /// A tap, `at_ms` after the script started.
    Tap { at_ms: u64 },
    /// Let pending attaches run.
    Sleep { ms: u64 },
    /// Tear the stage down.
    Reset,
}

impl ScriptEvent {
    /// Event type as a string for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScriptEvent::Join { .. } => "join",
            ScriptEvent::Leave { .. } => "leave",
            ScriptEvent::SetTrack { .. } => "set_track",
            ScriptEvent::ClearTrack { .. } => "clear_track",
            ScriptEvent::Settings(_) => "settings",
            ScriptEvent::Pin { .. } => "pin",
            ScriptEvent::Active { .. } => "active",
            ScriptEvent::Update { .. } => "update",
            ScriptEvent::ChangeView { .. } => "change_view",
            ScriptEvent::AddContainer { .. } => "add_container",
            ScriptEvent::RemoveContainer { .. } => "remove_container",
            ScriptEvent::ShowContainer { .. } => "show_container",
            ScriptEvent::LastN { .. } => "last_n",
            ScriptEvent::VideoMuted { .. } => "video_muted",
            ScriptEvent::Resize(_) => "resize",
            ScriptEvent::LocalFlipX { .. } => "local_flip_x",
            ScriptEvent::HideSelfView { .. } => "hide_self_view",
            ScriptEvent::ScreenShareFocus { .. } => "screen_share_focus",
            ScriptEvent::AudioLevel { .. } => "audio_level",
            ScriptEvent::Rotate { .. } => "rotate",
            ScriptEvent::Flip { .. } => "flip",
            ScriptEvent::Layout { .. } => "layout",
            ScriptEvent::Tap { .. } => "tap",
            ScriptEvent::Sleep { .. } => "sleep",
            ScriptEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("stage error: {0}")]
    Stage(#[from] StageError),
}

/// Parse a script. Line numbers in errors are 1-based.
///
/// # Errors
///
/// Returns `ReplayError::Parse` for the first malformed line.
pub fn parse_script(input: &str) -> Result<Vec<ScriptEvent>, ReplayError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim()).map_err(|source| ReplayError::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Applies script events to a conference store and a stage.
///
/// Conference-state events mutate the store first and then notify the stage,
/// the same order a live conference would use.
#[derive(Debug)]
pub struct ScriptRunner {
    store: Arc<ConferenceStore>,
    stage: StageActorHandle,
    started: Instant,
}

impl ScriptRunner {
    #[must_use]
    pub fn new(store: Arc<ConferenceStore>, stage: StageActorHandle) -> Self {
        Self {
            store,
            stage,
            started: Instant::now(),
        }
    }

    /// Apply every event in order.
    ///
    /// # Errors
    ///
    /// Stops at the first event the stage rejects.
    pub async fn run(&self, events: Vec<ScriptEvent>) -> Result<(), ReplayError> {
        for event in events {
            self.apply(event).await?;
        }
        Ok(())
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::Stage` if the stage rejects the event or its
    /// actor has stopped.
    pub async fn apply(&self, event: ScriptEvent) -> Result<(), ReplayError> {
        debug!(target: "stage.replay", event = event.as_str(), "Applying script event");

        match event {
            ScriptEvent::Join {
                id,
                display_name,
                local,
                fake,
                screen_share,
            } => {
                self.store.upsert_participant(ParticipantInfo {
                    id,
                    display_name,
                    is_local: local,
                    is_fake: fake || screen_share,
                    is_screen_share: screen_share,
                });
            }
            ScriptEvent::Leave { id } => self.store.remove_participant(&id),
            ScriptEvent::SetTrack {
                id,
                slot,
                stream,
                kind,
            } => {
                self.store
                    .set_track(&id, slot, Some(StreamHandle::new(stream, kind)));
            }
            ScriptEvent::ClearTrack { id, slot } => self.store.set_track(&id, slot, None),
            ScriptEvent::Settings(settings) => self.store.set_settings(settings),
            ScriptEvent::Pin { id } => {
                self.store.set_pinned(id.clone());
                self.stage.on_pinned_participant_changed(id).await?;
            }
            ScriptEvent::Active { id } => self.stage.set_active_participant(id).await?,
            ScriptEvent::Update {
                id,
                force_update,
                force_reattach,
            } => {
                let decision = self
                    .stage
                    .update_large_video(id.clone(), force_update, force_reattach)
                    .await?;
                info!(
                    target: "stage.replay",
                    participant_id = %id,
                    decision = decision.label(),
                    "Update requested"
                );
            }
            ScriptEvent::ChangeView {
                id,
                swap_local,
                swap_remote,
            } => {
                let decision = self
                    .stage
                    .change_view(id.clone(), swap_local, swap_remote)
                    .await?;
                info!(
                    target: "stage.replay",
                    participant_id = %id,
                    swap_local,
                    swap_remote,
                    decision = decision.label(),
                    "View changed"
                );
            }
            ScriptEvent::AddContainer { kind } => {
                self.stage
                    .add_container(kind, Arc::new(LoggingSurface::new(kind)))
                    .await?;
            }
            ScriptEvent::RemoveContainer { kind } => {
                let removed = self.stage.remove_container(kind).await?;
                info!(target: "stage.replay", kind = %kind, removed, "Container removed");
            }
            ScriptEvent::ShowContainer { kind, show } => {
                self.stage.show_large_video_container(kind, show).await?;
            }
            ScriptEvent::LastN { leaving, entering } => {
                self.stage
                    .on_last_n_endpoints_changed(leaving, entering)
                    .await?;
            }
            ScriptEvent::VideoMuted { id } => {
                self.stage.update_video_muted_for_no_tracks(id).await?;
            }
            ScriptEvent::Resize(viewport) => self.stage.resize(viewport).await?,
            ScriptEvent::LocalFlipX { flip } => {
                self.store.update(|s| s.settings.local_flip_x = Some(flip));
                self.stage.on_local_flip_x_changed(flip).await?;
            }
            ScriptEvent::HideSelfView { hidden } => {
                self.store.update(|s| s.settings.hide_self_view = hidden);
                self.stage.on_hide_self_view_changed(hidden).await?;
            }
            ScriptEvent::ScreenShareFocus {
                sharing,
                see_what_is_shared,
            } => {
                self.stage
                    .on_screen_share_focus(sharing, see_what_is_shared)
                    .await?;
            }
            ScriptEvent::AudioLevel { id, level } => self.stage.set_audio_level(id, level).await?,
            ScriptEvent::Rotate { slot } => {
                let transform = self.stage.rotate_quadrant(slot).await?;
                info!(
                    target: "stage.replay",
                    slot = %slot,
                    degrees = transform.rotation.degrees(),
                    "Quadrant rotated"
                );
            }
            ScriptEvent::Flip { slot } => {
                let transform = self.stage.flip_quadrant(slot).await?;
                info!(
                    target: "stage.replay",
                    slot = %slot,
                    flip_x = transform.flip_x,
                    "Quadrant flipped"
                );
            }
            ScriptEvent::Layout { mode } => self.stage.set_layout_mode(mode).await?,
            ScriptEvent::Tap { at_ms } => {
                let at = self.started + Duration::from_millis(at_ms);
                self.stage.on_tap(at).await?;
            }
            ScriptEvent::Sleep { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            ScriptEvent::Reset => self.stage.reset().await?,
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::{StageActor, StageActorMetrics, DEFAULT_STAGE_CHANNEL_BUFFER};
    use crate::coordinator::{CoordinatorConfig, LargeVideoCoordinator, StageEvent};
    use crate::state::StateSource;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn spawn_runner() -> (
        ScriptRunner,
        StageActorHandle,
        mpsc::UnboundedReceiver<StageEvent>,
    ) {
        let store = Arc::new(ConferenceStore::new());
        let (coordinator, events) = LargeVideoCoordinator::new(
            Arc::clone(&store) as Arc<dyn StateSource>,
            CoordinatorConfig::default(),
        );
        let (handle, _task) = StageActor::spawn(
            "stage-replay-test".to_string(),
            coordinator,
            CancellationToken::new(),
            StageActorMetrics::new(),
            DEFAULT_STAGE_CHANNEL_BUFFER,
        );
        (ScriptRunner::new(store, handle.clone()), handle, events)
    }

    #[test]
    fn test_parse_script_skips_comments_and_blanks() {
        let script = r#"
# setup
{"type":"join","id":"alice","local":true}

{"type":"set_track","id":"alice","slot":"local_main","stream":"cam-a","kind":"camera"}
{"type":"update","id":"alice","force_update":true}
{"type":"reset"}
"#;
        let events = parse_script(script).unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(
            events.first(),
            Some(&ScriptEvent::Join {
                id: ParticipantId::new("alice"),
                display_name: String::new(),
                local: true,
                fake: false,
                screen_share: false,
            })
        );
        assert_eq!(events.last(), Some(&ScriptEvent::Reset));
    }

    #[test]
    fn test_parse_script_reports_line_number() {
        let script = "{\"type\":\"reset\"}\n\n{\"type\":\"teleport\"}\n";
        let err = parse_script(script).unwrap_err();

        assert!(matches!(err, ReplayError::Parse { line: 3, .. }));
        assert!(err.to_string().starts_with("line 3:"));
    }

    #[test]
    fn test_parse_newtype_variants() {
        let events = parse_script(
            "{\"type\":\"resize\",\"width\":1280,\"height\":720}\n\
             {\"type\":\"settings\",\"swap_local\":true}\n",
        )
        .unwrap();

        assert!(matches!(
            events.first(),
            Some(ScriptEvent::Resize(Viewport { width: 1280, height: 720, .. }))
        ));
        assert!(matches!(
            events.last(),
            Some(ScriptEvent::Settings(StageSettings { swap_local: true, .. }))
        ));
    }

    #[tokio::test]
    async fn test_runner_shows_participant() {
        let (runner, handle, mut events) = spawn_runner();
        handle
            .initialize(Arc::new(LoggingSurface::new(ContainerKind::Camera)))
            .await
            .unwrap();

        let script = parse_script(
            r#"
{"type":"join","id":"alice","local":true}
{"type":"set_track","id":"alice","slot":"local_main","stream":"cam-a"}
{"type":"update","id":"alice"}
"#,
        )
        .unwrap();
        runner.run(script).await.unwrap();

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.participant_id, Some(ParticipantId::new("alice")));

        let event = events.recv().await;
        assert!(matches!(
            event,
            Some(StageEvent::Attach(ref report)) if report.slot == QuadrantSlot::LocalMain
        ));
    }

    #[tokio::test]
    async fn test_runner_propagates_stage_errors() {
        let (runner, _handle, _events) = spawn_runner();

        let result = runner
            .apply(ScriptEvent::ShowContainer {
                kind: ContainerKind::Whiteboard,
                show: true,
            })
            .await;

        assert!(matches!(
            result,
            Err(ReplayError::Stage(StageError::NotInitialized))
        ));
    }
}
