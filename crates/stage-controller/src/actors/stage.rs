//! `StageActor` - owns one `LargeVideoCoordinator` on a single task.
//!
//! Every coordinator operation is serialized through the actor mailbox, so
//! the coordinator itself needs no locking. The handle is what a conference
//! session holds; dropping every handle or cancelling the token tears the
//! stage down.

use super::messages::StageMessage;
use super::metrics::{MailboxMonitor, StageActorMetrics};
use crate::containers::{ContainerKind, DisplayContainer};
use crate::coordinator::{LargeVideoCoordinator, StageStatus, UpdateDecision};
use crate::errors::StageError;
use crate::layout::{LayoutMode, QuadrantTransform, Viewport};
use crate::media::{QuadrantSlot, VideoKind};

use common::types::ParticipantId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Default mailbox capacity.
pub const DEFAULT_STAGE_CHANNEL_BUFFER: usize = 256;

/// Handle to a `StageActor`.
#[derive(Clone, Debug)]
pub struct StageActorHandle {
    sender: mpsc::Sender<StageMessage>,
    cancel_token: CancellationToken,
    mailbox: Arc<MailboxMonitor>,
    session_id: String,
}

impl StageActorHandle {
    async fn send(&self, message: StageMessage) -> Result<(), StageError> {
        self.mailbox.record_enqueue();
        self.sender.send(message).await.map_err(|e| {
            self.mailbox.record_drop();
            StageError::Internal(format!("channel send failed: {e}"))
        })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> StageMessage,
    ) -> Result<T, StageError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|e| StageError::Internal(format!("response receive failed: {e}")))
    }

    /// Register the default video surface and show it.
    pub async fn initialize(&self, video: Arc<dyn DisplayContainer>) -> Result<(), StageError> {
        self.request(|respond_to| StageMessage::Initialize { video, respond_to })
            .await?
    }

    /// Register or replace a feature container.
    pub async fn add_container(
        &self,
        kind: ContainerKind,
        container: Arc<dyn DisplayContainer>,
    ) -> Result<(), StageError> {
        self.send(StageMessage::AddContainer { kind, container }).await
    }

    /// Unregister and destroy a feature container.
    pub async fn remove_container(&self, kind: ContainerKind) -> Result<bool, StageError> {
        self.request(|respond_to| StageMessage::RemoveContainer { kind, respond_to })
            .await
    }

    pub async fn set_active_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<(), StageError> {
        self.send(StageMessage::SetActiveParticipant { participant_id })
            .await
    }

    /// Run the update decision for a participant.
    pub async fn update_large_video(
        &self,
        participant_id: ParticipantId,
        force_update: bool,
        force_reattach: bool,
    ) -> Result<UpdateDecision, StageError> {
        self.request(|respond_to| StageMessage::UpdateLargeVideo {
            participant_id,
            force_update,
            force_reattach,
            respond_to,
        })
        .await
    }

    /// Operator swap of main/sub feeds.
    pub async fn change_view(
        &self,
        participant_id: ParticipantId,
        swap_local: bool,
        swap_remote: bool,
    ) -> Result<UpdateDecision, StageError> {
        self.request(|respond_to| StageMessage::ChangeView {
            participant_id,
            swap_local,
            swap_remote,
            respond_to,
        })
        .await
    }

    /// Show or hide a container kind.
    pub async fn show_large_video_container(
        &self,
        kind: ContainerKind,
        show: bool,
    ) -> Result<(), StageError> {
        self.request(|respond_to| StageMessage::ShowContainer {
            kind,
            show,
            respond_to,
        })
        .await?
    }

    pub async fn is_large_container_kind_visible(
        &self,
        kind: ContainerKind,
    ) -> Result<bool, StageError> {
        self.request(|respond_to| StageMessage::IsContainerVisible { kind, respond_to })
            .await
    }

    pub async fn on_last_n_endpoints_changed(
        &self,
        leaving: Vec<ParticipantId>,
        entering: Vec<ParticipantId>,
    ) -> Result<(), StageError> {
        self.send(StageMessage::LastNChanged { leaving, entering })
            .await
    }

    pub async fn resize(&self, viewport: Viewport) -> Result<(), StageError> {
        self.send(StageMessage::Resize { viewport }).await
    }

    pub async fn on_local_flip_x_changed(&self, flip: bool) -> Result<(), StageError> {
        self.send(StageMessage::LocalFlipX { flip }).await
    }

    pub async fn set_audio_level(
        &self,
        participant_id: ParticipantId,
        level: f32,
    ) -> Result<(), StageError> {
        self.send(StageMessage::AudioLevel {
            participant_id,
            level,
        })
        .await
    }

    pub async fn update_video_muted_for_no_tracks(
        &self,
        participant_id: ParticipantId,
    ) -> Result<(), StageError> {
        self.send(StageMessage::VideoMutedForNoTracks { participant_id })
            .await
    }

    pub async fn on_hide_self_view_changed(&self, hidden: bool) -> Result<(), StageError> {
        self.send(StageMessage::HideSelfView { hidden }).await
    }

    pub async fn on_screen_share_focus(
        &self,
        sharing: bool,
        see_what_is_shared: bool,
    ) -> Result<(), StageError> {
        self.send(StageMessage::ScreenShareFocus {
            sharing,
            see_what_is_shared,
        })
        .await
    }

    pub async fn on_pinned_participant_changed(
        &self,
        participant_id: Option<ParticipantId>,
    ) -> Result<(), StageError> {
        self.send(StageMessage::PinnedChanged { participant_id })
            .await
    }

    pub async fn rotate_quadrant(
        &self,
        slot: QuadrantSlot,
    ) -> Result<QuadrantTransform, StageError> {
        self.request(|respond_to| StageMessage::RotateQuadrant { slot, respond_to })
            .await
    }

    pub async fn flip_quadrant(&self, slot: QuadrantSlot) -> Result<QuadrantTransform, StageError> {
        self.request(|respond_to| StageMessage::FlipQuadrant { slot, respond_to })
            .await
    }

    pub async fn set_layout_mode(&self, mode: LayoutMode) -> Result<(), StageError> {
        self.send(StageMessage::SetLayout { mode }).await
    }

    /// Register a tap on the stage at `at`.
    pub async fn on_tap(&self, at: Instant) -> Result<(), StageError> {
        self.send(StageMessage::Tap { at }).await
    }

    pub async fn remote_video_kind(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Option<VideoKind>, StageError> {
        self.request(|respond_to| StageMessage::RemoteVideoKind {
            participant_id,
            respond_to,
        })
        .await
    }

    /// Get the stage status.
    pub async fn get_status(&self) -> Result<StageStatus, StageError> {
        self.request(|respond_to| StageMessage::GetStatus { respond_to })
            .await
    }

    /// Tear the stage down. The actor keeps running; further updates are no-ops.
    pub async fn reset(&self) -> Result<(), StageError> {
        self.request(|respond_to| StageMessage::Reset { respond_to })
            .await
    }

    /// Cancel the actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Mailbox statistics shared with the actor.
    #[must_use]
    pub fn mailbox(&self) -> &MailboxMonitor {
        &self.mailbox
    }
}

/// The stage actor.
pub struct StageActor {
    session_id: String,
    receiver: mpsc::Receiver<StageMessage>,
    cancel_token: CancellationToken,
    coordinator: LargeVideoCoordinator,
    metrics: Arc<StageActorMetrics>,
    mailbox: Arc<MailboxMonitor>,
}

impl StageActor {
    /// Spawn a stage actor around `coordinator`.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        session_id: String,
        coordinator: LargeVideoCoordinator,
        cancel_token: CancellationToken,
        metrics: Arc<StageActorMetrics>,
        mailbox_capacity: usize,
    ) -> (StageActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(mailbox_capacity.max(1));
        let mailbox = Arc::new(MailboxMonitor::new(session_id.clone()));

        let actor = Self {
            session_id: session_id.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            coordinator,
            metrics,
            mailbox: Arc::clone(&mailbox),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = StageActorHandle {
            sender,
            cancel_token,
            mailbox,
            session_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "stage.actor", fields(session_id = %self.session_id))]
    async fn run(mut self) {
        self.metrics.stage_started();
        info!(target: "stage.actor", session_id = %self.session_id, "StageActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "stage.actor",
                        session_id = %self.session_id,
                        "StageActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_dequeue();
                            self.handle_message(message).await;
                            self.metrics.record_message_processed();
                        }
                        None => {
                            info!(
                                target: "stage.actor",
                                session_id = %self.session_id,
                                "StageActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.coordinator.reset();
        self.metrics.stage_stopped();

        info!(
            target: "stage.actor",
            session_id = %self.session_id,
            messages_processed = self.mailbox.messages_processed(),
            peak_depth = self.mailbox.peak_depth(),
            "StageActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: StageMessage) {
        debug!(target: "stage.actor", message = message.as_str(), "Handling message");

        match message {
            StageMessage::Initialize { video, respond_to } => {
                let result = self.coordinator.initialize(video).await;
                let _ = respond_to.send(result);
            }

            StageMessage::AddContainer { kind, container } => {
                self.coordinator.add_container(kind, container);
            }

            StageMessage::RemoveContainer { kind, respond_to } => {
                let removed = self.coordinator.remove_container(kind).await;
                let _ = respond_to.send(removed);
            }

            StageMessage::SetActiveParticipant { participant_id } => {
                self.coordinator.set_active_participant(participant_id);
            }

            StageMessage::UpdateLargeVideo {
                participant_id,
                force_update,
                force_reattach,
                respond_to,
            } => {
                let decision =
                    self.coordinator
                        .update_large_video(&participant_id, force_update, force_reattach);
                let _ = respond_to.send(decision);
            }

            StageMessage::ChangeView {
                participant_id,
                swap_local,
                swap_remote,
                respond_to,
            } => {
                let decision = self
                    .coordinator
                    .change_view(&participant_id, swap_local, swap_remote);
                let _ = respond_to.send(decision);
            }

            StageMessage::ShowContainer {
                kind,
                show,
                respond_to,
            } => {
                let result = self.coordinator.show_large_video_container(kind, show).await;
                let _ = respond_to.send(result);
            }

            StageMessage::IsContainerVisible { kind, respond_to } => {
                let _ = respond_to.send(self.coordinator.is_large_container_kind_visible(kind));
            }

            StageMessage::LastNChanged { leaving, entering } => {
                self.coordinator
                    .on_last_n_endpoints_changed(&leaving, &entering);
            }

            StageMessage::Resize { viewport } => {
                self.coordinator.resize(viewport);
            }

            StageMessage::LocalFlipX { flip } => {
                self.coordinator.on_local_flip_x_changed(flip);
            }

            StageMessage::AudioLevel {
                participant_id,
                level,
            } => {
                self.coordinator.set_audio_level(&participant_id, level);
            }

            StageMessage::VideoMutedForNoTracks { participant_id } => {
                self.coordinator
                    .update_video_muted_for_no_tracks(&participant_id);
            }

            StageMessage::HideSelfView { hidden } => {
                self.coordinator.on_hide_self_view_changed(hidden);
            }

            StageMessage::ScreenShareFocus {
                sharing,
                see_what_is_shared,
            } => {
                self.coordinator
                    .on_screen_share_focus(sharing, see_what_is_shared);
            }

            StageMessage::PinnedChanged { participant_id } => {
                self.coordinator
                    .on_pinned_participant_changed(participant_id);
            }

            StageMessage::RotateQuadrant { slot, respond_to } => {
                let _ = respond_to.send(self.coordinator.rotate_quadrant(slot));
            }

            StageMessage::FlipQuadrant { slot, respond_to } => {
                let _ = respond_to.send(self.coordinator.flip_quadrant(slot));
            }

            StageMessage::SetLayout { mode } => {
                self.coordinator.set_layout_mode(mode);
            }

            StageMessage::Tap { at } => {
                self.coordinator.on_double_tap(at);
            }

            StageMessage::RemoteVideoKind {
                participant_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.coordinator.remote_video_kind(&participant_id));
            }

            StageMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.coordinator.status());
            }

            StageMessage::Reset { respond_to } => {
                self.coordinator.reset();
                let _ = respond_to.send(());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::containers::LoggingSurface;
    use crate::coordinator::{CoordinatorConfig, CoordinatorPhase};
    use crate::state::ConferenceStore;

    fn spawn_stage() -> (StageActorHandle, JoinHandle<()>, Arc<StageActorMetrics>) {
        let store = Arc::new(ConferenceStore::new());
        let (coordinator, _events) =
            LargeVideoCoordinator::new(store, CoordinatorConfig::default());
        let metrics = StageActorMetrics::new();
        let (handle, task) = StageActor::spawn(
            "stage-test".to_string(),
            coordinator,
            CancellationToken::new(),
            Arc::clone(&metrics),
            DEFAULT_STAGE_CHANNEL_BUFFER,
        );
        (handle, task, metrics)
    }

    #[tokio::test]
    async fn test_initialize_and_status() {
        let (handle, _task, _metrics) = spawn_stage();

        handle
            .initialize(Arc::new(LoggingSurface::new(ContainerKind::Camera)))
            .await
            .unwrap();

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.phase, CoordinatorPhase::Initialized);
        assert_eq!(status.container_kind, Some(ContainerKind::Camera));
        assert!(handle
            .is_large_container_kind_visible(ContainerKind::Camera)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_show_before_initialize_is_rejected() {
        let (handle, _task, _metrics) = spawn_stage();

        let result = handle
            .show_large_video_container(ContainerKind::Whiteboard, true)
            .await;
        assert!(matches!(result, Err(StageError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_cancel_resets_and_stops() {
        let (handle, task, metrics) = spawn_stage();
        handle
            .initialize(Arc::new(LoggingSurface::new(ContainerKind::Camera)))
            .await
            .unwrap();

        handle.cancel();
        task.await.unwrap();

        assert!(handle.is_cancelled());
        assert_eq!(metrics.active_stage_count(), 0);
        assert!(matches!(
            handle.get_status().await,
            Err(StageError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_fire_and_forget_messages_are_processed_in_order() {
        let (handle, _task, metrics) = spawn_stage();

        handle.set_layout_mode(LayoutMode::RemoteFocus).await.unwrap();
        let transform = handle.rotate_quadrant(QuadrantSlot::LocalSub).await.unwrap();
        assert_eq!(transform.rotation.degrees(), 90);

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.layout, LayoutMode::RemoteFocus);
        assert!(metrics.messages_processed() >= 2);
        assert_eq!(handle.mailbox().current_depth(), 0);
    }
}
