//! Message types for the stage actor.
//!
//! Requests carry a `oneshot` reply channel. Notifications from state
//! listeners (last-N, resize, audio level, mirror) are fire-and-forget.

use crate::containers::{ContainerKind, DisplayContainer};
use crate::coordinator::{StageStatus, UpdateDecision};
use crate::errors::StageError;
use crate::layout::{LayoutMode, QuadrantTransform, Viewport};
use crate::media::{QuadrantSlot, VideoKind};
use common::types::ParticipantId;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Messages sent to `StageActor`.
#[derive(Debug)]
pub enum StageMessage {
    /// Register the default video surface and show it.
    Initialize {
        video: Arc<dyn DisplayContainer>,
        respond_to: oneshot::Sender<Result<(), StageError>>,
    },

    /// Register or replace a feature container.
    AddContainer {
        kind: ContainerKind,
        container: Arc<dyn DisplayContainer>,
    },

    /// Unregister and destroy a feature container.
    RemoveContainer {
        kind: ContainerKind,
        /// Whether anything was registered.
        respond_to: oneshot::Sender<bool>,
    },

    /// Record the intended subject of the stage.
    SetActiveParticipant { participant_id: ParticipantId },

    /// Run the update decision for a participant.
    UpdateLargeVideo {
        participant_id: ParticipantId,
        force_update: bool,
        force_reattach: bool,
        respond_to: oneshot::Sender<UpdateDecision>,
    },

    /// Operator swap of main/sub feeds.
    ChangeView {
        participant_id: ParticipantId,
        swap_local: bool,
        swap_remote: bool,
        respond_to: oneshot::Sender<UpdateDecision>,
    },

    /// Show or hide a container kind.
    ShowContainer {
        kind: ContainerKind,
        show: bool,
        respond_to: oneshot::Sender<Result<(), StageError>>,
    },

    /// Query container visibility.
    IsContainerVisible {
        kind: ContainerKind,
        respond_to: oneshot::Sender<bool>,
    },

    /// Last-N membership changed.
    LastNChanged {
        leaving: Vec<ParticipantId>,
        entering: Vec<ParticipantId>,
    },

    /// Window or filmstrip size changed.
    Resize { viewport: Viewport },

    /// Local mirror setting changed.
    LocalFlipX { flip: bool },

    /// Audio level for a participant.
    AudioLevel {
        participant_id: ParticipantId,
        level: f32,
    },

    /// A participant's video tracks may have all gone away.
    VideoMutedForNoTracks { participant_id: ParticipantId },

    /// Self-view hide setting changed.
    HideSelfView { hidden: bool },

    /// Screen-share focus state changed.
    ScreenShareFocus {
        sharing: bool,
        see_what_is_shared: bool,
    },

    /// Pinned participant changed (`None` = unpinned).
    PinnedChanged {
        participant_id: Option<ParticipantId>,
    },

    /// Rotate one quadrant a quarter turn.
    RotateQuadrant {
        slot: QuadrantSlot,
        respond_to: oneshot::Sender<QuadrantTransform>,
    },

    /// Toggle mirroring of one quadrant.
    FlipQuadrant {
        slot: QuadrantSlot,
        respond_to: oneshot::Sender<QuadrantTransform>,
    },

    /// Switch the quadrant layout.
    SetLayout { mode: LayoutMode },

    /// A tap on the stage.
    Tap { at: Instant },

    /// Video kind used to pick a participant's container.
    RemoteVideoKind {
        participant_id: ParticipantId,
        respond_to: oneshot::Sender<Option<VideoKind>>,
    },

    /// Get the stage status.
    GetStatus {
        respond_to: oneshot::Sender<StageStatus>,
    },

    /// Tear the stage down.
    Reset { respond_to: oneshot::Sender<()> },
}

impl StageMessage {
    /// Returns the message type as a string for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StageMessage::Initialize { .. } => "initialize",
            StageMessage::AddContainer { .. } => "add_container",
            StageMessage::RemoveContainer { .. } => "remove_container",
            StageMessage::SetActiveParticipant { .. } => "set_active_participant",
            StageMessage::UpdateLargeVideo { .. } => "update_large_video",
            StageMessage::ChangeView { .. } => "change_view",
            StageMessage::ShowContainer { .. } => "show_container",
            StageMessage::IsContainerVisible { .. } => "is_container_visible",
            StageMessage::LastNChanged { .. } => "last_n_changed",
            StageMessage::Resize { .. } => "resize",
            StageMessage::LocalFlipX { .. } => "local_flip_x",
            StageMessage::AudioLevel { .. } => "audio_level",
            StageMessage::VideoMutedForNoTracks { .. } => "video_muted_for_no_tracks",
            StageMessage::HideSelfView { .. } => "hide_self_view",
            StageMessage::ScreenShareFocus { .. } => "screen_share_focus",
            StageMessage::PinnedChanged { .. } => "pinned_changed",
            StageMessage::RotateQuadrant { .. } => "rotate_quadrant",
            StageMessage::FlipQuadrant { .. } => "flip_quadrant",
            StageMessage::SetLayout { .. } => "set_layout",
            StageMessage::Tap { .. } => "tap",
            StageMessage::RemoteVideoKind { .. } => "remote_video_kind",
            StageMessage::GetStatus { .. } => "get_status",
            StageMessage::Reset { .. } => "reset",
        }
    }
}
