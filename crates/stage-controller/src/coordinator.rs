//! `LargeVideoCoordinator` - decides what the stage shows.
//!
//! The coordinator owns the container registry and the visible pointer,
//! tracks which participant is on the stage, and decides on every change
//! whether the video surface must be re-attached or left alone.
//!
//! # Lifecycle
//!
//! `Uninitialized → Initialized → Destroyed`. Destroyed is terminal: a
//! session that needs a stage again builds a new coordinator.
//!
//! # Attach generations
//!
//! `update_large_video` fires one attach task per resolved slot and returns
//! without awaiting them. Each slot carries a generation counter; a task
//! commits its stream only while its generation is still the slot's current
//! one, so the last requested stream wins regardless of completion order.

use crate::containers::{ContainerKind, ContainerRegistry, DisplayContainer};
use crate::errors::{StageError, SurfaceError};
use crate::layout::{
    DoubleTapDetector, LayoutMode, QuadrantTransform, StageGeometry, Viewport,
    DEFAULT_DOUBLE_TAP_WINDOW, DEFAULT_FILMSTRIP_BREAKPOINT,
};
use crate::media::{QuadrantSlot, VideoKind};
use crate::observability::metrics;
use crate::router::{QuadrantAssignment, QuadrantRouter, ResolvedStream, SwapFlags};
use crate::state::StateSource;

use chrono::{DateTime, Utc};
use common::types::{ParticipantId, StreamId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Two taps closer than this request tile view.
    pub double_tap_window: Duration,
    /// Minimum filmstrip width that takes space from the stage.
    pub filmstrip_breakpoint: u32,
    /// Layout applied at initialization.
    pub initial_layout: LayoutMode,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            double_tap_window: DEFAULT_DOUBLE_TAP_WINDOW,
            filmstrip_breakpoint: DEFAULT_FILMSTRIP_BREAKPOINT,
            initial_layout: LayoutMode::default(),
        }
    }
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorPhase {
    Uninitialized,
    Initialized,
    Destroyed,
}

/// What `update_large_video` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Attach tasks were fired for `slots` slots.
    Applied { slots: usize },
    /// The participant is already on stage with the same stream.
    Skipped,
    /// The coordinator is not initialized.
    NotInitialized,
}

impl UpdateDecision {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            UpdateDecision::Applied { .. } => "applied",
            UpdateDecision::Skipped => "skipped",
            UpdateDecision::NotInitialized => "not_initialized",
        }
    }
}

/// Result of one slot attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The stream was bound to the slot.
    Applied,
    /// A newer attach for the slot was requested first; nothing was bound.
    Superseded,
    /// The surface rejected the stream; it keeps its previous content.
    Failed(SurfaceError),
}

impl AttachOutcome {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            AttachOutcome::Applied => "applied",
            AttachOutcome::Superseded => "superseded",
            AttachOutcome::Failed(_) => "failed",
        }
    }
}

/// Report of one finished attach task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachReport {
    pub participant_id: ParticipantId,
    pub slot: QuadrantSlot,
    pub stream_id: StreamId,
    pub generation: u64,
    pub outcome: AttachOutcome,
}

/// Events the stage reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Attach(AttachReport),
    /// A double tap asked the view layer to switch to tile view.
    TileViewRequested,
}

#[derive(Debug, Default)]
struct SlotGenerations {
    local_main: u64,
    local_sub: u64,
    remote_main: u64,
    remote_sub: u64,
}

impl SlotGenerations {
    fn slot_mut(&mut self, slot: QuadrantSlot) -> &mut u64 {
        match slot {
            QuadrantSlot::LocalMain => &mut self.local_main,
            QuadrantSlot::LocalSub => &mut self.local_sub,
            QuadrantSlot::RemoteMain => &mut self.remote_main,
            QuadrantSlot::RemoteSub => &mut self.remote_sub,
        }
    }
}

/// Per-slot attach generations, shared with in-flight attach tasks.
#[derive(Debug, Clone, Default)]
pub struct AttachGenerations {
    inner: Arc<Mutex<SlotGenerations>>,
}

impl AttachGenerations {
    /// Start a new attach for `slot` and return its generation.
    pub fn bump(&self, slot: QuadrantSlot) -> u64 {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.slot_mut(slot);
        *generation = generation.wrapping_add(1);
        *generation
    }

    /// Invalidate every in-flight attach.
    pub fn bump_all(&self) {
        for slot in QuadrantSlot::ALL {
            self.bump(slot);
        }
    }

    #[must_use]
    pub fn current(&self, slot: QuadrantSlot) -> u64 {
        *self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slot_mut(slot)
    }

    /// Run `commit` only if `generation` is still current for `slot`.
    ///
    /// The lock is held across the check and the commit, so a concurrent
    /// `bump` cannot slip between them.
    pub fn commit_if_current<F>(&self, slot: QuadrantSlot, generation: u64, commit: F) -> bool
    where
        F: FnOnce(),
    {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard.slot_mut(slot) == generation {
            commit();
            true
        } else {
            false
        }
    }
}

/// Snapshot of the stage for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct StageStatus {
    pub phase: CoordinatorPhase,
    pub participant_id: Option<ParticipantId>,
    pub active_participant_id: Option<ParticipantId>,
    pub container_kind: Option<ContainerKind>,
    pub registered: Vec<ContainerKind>,
    pub swap: SwapFlags,
    pub layout: LayoutMode,
    pub local_flip_x: bool,
    pub geometry: StageGeometry,
    pub created_at: DateTime<Utc>,
}

/// The large video display coordinator.
pub struct LargeVideoCoordinator {
    state: Arc<dyn StateSource>,
    config: CoordinatorConfig,
    phase: CoordinatorPhase,
    registry: ContainerRegistry,
    /// Participant whose streams are on the stage.
    current_participant: Option<ParticipantId>,
    /// Intended subject of the stage.
    active_participant: Option<ParticipantId>,
    /// Swap flags of the last applied assignment.
    swap: SwapFlags,
    generations: AttachGenerations,
    transforms: HashMap<QuadrantSlot, QuadrantTransform>,
    layout: LayoutMode,
    local_flip_x: bool,
    hide_self_view: bool,
    viewport: Viewport,
    geometry: StageGeometry,
    double_tap: DoubleTapDetector,
    events: mpsc::UnboundedSender<StageEvent>,
    created_at: DateTime<Utc>,
}

impl LargeVideoCoordinator {
    /// Create an uninitialized coordinator and the receiver for its events.
    #[must_use]
    pub fn new(
        state: Arc<dyn StateSource>,
        config: CoordinatorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<StageEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let coordinator = Self {
            state,
            config,
            phase: CoordinatorPhase::Uninitialized,
            registry: ContainerRegistry::new(),
            current_participant: None,
            active_participant: None,
            swap: SwapFlags::default(),
            generations: AttachGenerations::default(),
            transforms: HashMap::new(),
            layout: config.initial_layout,
            local_flip_x: false,
            hide_self_view: false,
            viewport: Viewport::default(),
            geometry: StageGeometry::default(),
            double_tap: DoubleTapDetector::new(config.double_tap_window),
            events,
            created_at: Utc::now(),
        };
        (coordinator, receiver)
    }

    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    fn is_initialized(&self) -> bool {
        self.phase == CoordinatorPhase::Initialized
    }

    /// Attach generations, for observing in-flight attaches.
    #[must_use]
    pub fn generations(&self) -> &AttachGenerations {
        &self.generations
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Register the default video surface and make it visible.
    ///
    /// The surface is registered as both `Camera` and `Desktop`. The pending
    /// local mirror setting is taken from the state source. Initializing
    /// twice tears the first stage down first.
    ///
    /// # Errors
    ///
    /// - `StageError::Destroyed` after `reset`
    /// - `StageError::Surface` if the video surface cannot be shown; the
    ///   coordinator is left uninitialized
    pub async fn initialize(&mut self, video: Arc<dyn DisplayContainer>) -> Result<(), StageError> {
        match self.phase {
            CoordinatorPhase::Destroyed => return Err(StageError::Destroyed),
            CoordinatorPhase::Initialized => {
                debug!(target: "stage.coordinator", "Re-initializing stage");
                self.teardown();
            }
            CoordinatorPhase::Uninitialized => {}
        }

        let snapshot = self.state.snapshot();
        self.swap = snapshot.settings.swap_flags();
        self.hide_self_view = snapshot.settings.hide_self_view;
        if let Some(flip) = snapshot.settings.local_flip_x {
            self.local_flip_x = flip;
        }

        self.registry.add(ContainerKind::Camera, Arc::clone(&video));
        self.registry.add(ContainerKind::Desktop, Arc::clone(&video));
        self.registry.set_current(ContainerKind::Camera);

        if let Err(source) = video.show().await {
            warn!(target: "stage.coordinator", error = %source, "Video surface failed to show");
            self.teardown();
            return Err(StageError::Surface {
                kind: ContainerKind::Camera,
                source,
            });
        }

        video.set_local_flip_x(self.local_flip_x);
        video.set_layout(self.layout);
        for (slot, transform) in &self.transforms {
            video.set_quadrant_transform(*slot, *transform);
        }
        self.geometry = StageGeometry::compute(self.viewport, self.config.filmstrip_breakpoint);
        video.resize(self.geometry, false);

        self.phase = CoordinatorPhase::Initialized;
        metrics::set_containers_registered(self.registry.len());

        info!(
            target: "stage.coordinator",
            local_flip_x = self.local_flip_x,
            swap_local = self.swap.swap_local,
            swap_remote = self.swap.swap_remote,
            layout = %self.layout,
            "Stage initialized"
        );

        Ok(())
    }

    /// Destroy every container and move to `Destroyed`.
    ///
    /// Every slot generation is bumped, so attaches still in flight report
    /// `Superseded` instead of touching a destroyed surface.
    pub fn reset(&mut self) {
        if self.phase == CoordinatorPhase::Destroyed {
            return;
        }
        self.teardown();
        self.phase = CoordinatorPhase::Destroyed;
        info!(target: "stage.coordinator", "Stage destroyed");
    }

    fn teardown(&mut self) {
        self.generations.bump_all();
        for container in self.registry.drain_unique() {
            container.destroy();
        }
        self.current_participant = None;
        self.active_participant = None;
        self.phase = CoordinatorPhase::Uninitialized;
        metrics::set_containers_registered(0);
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    /// Register or replace a feature container.
    ///
    /// Ignored before initialization. A replaced surface that is no longer
    /// registered under any kind is destroyed.
    pub fn add_container(&mut self, kind: ContainerKind, container: Arc<dyn DisplayContainer>) {
        if !self.is_initialized() {
            debug!(
                target: "stage.coordinator",
                kind = %kind,
                "Stage not initialized, container ignored"
            );
            return;
        }

        if let Some(replaced) = self.registry.add(kind, container) {
            if !self.registry.contains_surface(&replaced) {
                replaced.destroy();
            }
        }
        metrics::set_containers_registered(self.registry.len());
    }

    /// Unregister and destroy a container.
    ///
    /// If it was visible, the stage falls back to a remaining video
    /// container and shows it. Returns `false` if nothing was registered for
    /// `kind`.
    pub async fn remove_container(&mut self, kind: ContainerKind) -> bool {
        if !self.is_initialized() {
            return false;
        }

        let was_visible = self.registry.is_visible(kind);
        let Some(removed) = self.registry.remove(kind) else {
            return false;
        };
        let still_registered = self.registry.contains_surface(&removed);
        if !still_registered {
            removed.destroy();
        }
        metrics::set_containers_registered(self.registry.len());

        if was_visible && !still_registered {
            if let Some(fallback) = self.registry.current().cloned() {
                if let Err(e) = fallback.show().await {
                    warn!(
                        target: "stage.coordinator",
                        error = %e,
                        "Fallback container failed to show"
                    );
                }
            }
        }

        true
    }

    /// Container registered for `kind`; `None` when not initialized.
    #[must_use]
    pub fn get_container(&self, kind: ContainerKind) -> Option<Arc<dyn DisplayContainer>> {
        if !self.is_initialized() {
            return None;
        }
        self.registry.get(kind).cloned()
    }

    /// The visible container; `None` when not initialized.
    #[must_use]
    pub fn current_container(&self) -> Option<Arc<dyn DisplayContainer>> {
        if !self.is_initialized() {
            return None;
        }
        self.registry.current().cloned()
    }

    #[must_use]
    pub fn current_container_kind(&self) -> Option<ContainerKind> {
        self.registry.current_kind()
    }

    /// The surface quadrant streams go to: the visible container when it is
    /// a video kind, otherwise the first registered video kind.
    fn video_surface(&self) -> Option<Arc<dyn DisplayContainer>> {
        match self.registry.current_kind() {
            Some(kind) if kind.is_video() => self.registry.current().cloned(),
            _ => self
                .registry
                .video_kind()
                .and_then(|kind| self.registry.get(kind))
                .cloned(),
        }
    }

    // ------------------------------------------------------------------------
    // Participant on stage
    // ------------------------------------------------------------------------

    /// Record the intended subject of the stage. Does not refresh.
    pub fn set_active_participant(&mut self, id: ParticipantId) {
        if !self.is_initialized() {
            return;
        }
        self.active_participant = Some(id);
    }

    #[must_use]
    pub fn active_participant(&self) -> Option<&ParticipantId> {
        self.active_participant.as_ref()
    }

    /// Participant whose streams are on the stage.
    #[must_use]
    pub fn large_video_id(&self) -> Option<&ParticipantId> {
        self.current_participant.as_ref()
    }

    #[must_use]
    pub fn is_currently_on_large(&self, id: &ParticipantId) -> bool {
        self.current_participant.as_ref() == Some(id)
    }

    /// Decide whether `id` needs a (re-)attach and fire it.
    ///
    /// Slots are routed with the swap settings current in the state source.
    /// Re-attaching the same stream is skipped when `id` is already on stage
    /// on a video container and its local-main stream has not changed.
    pub fn update_large_video(
        &mut self,
        id: &ParticipantId,
        force_update: bool,
        force_reattach: bool,
    ) -> UpdateDecision {
        let decision = self.decide_update(id, force_update, force_reattach, None);
        metrics::record_update_decision(decision.label());
        decision
    }

    /// `swap` overrides the stored swap settings for this decision.
    fn decide_update(
        &mut self,
        id: &ParticipantId,
        force_update: bool,
        force_reattach: bool,
        swap: Option<SwapFlags>,
    ) -> UpdateDecision {
        if !self.is_initialized() {
            debug!(
                target: "stage.coordinator",
                participant_id = %id,
                "Stage not initialized, update ignored"
            );
            return UpdateDecision::NotInitialized;
        }

        let snapshot = self.state.snapshot();
        let swap = swap.unwrap_or_else(|| snapshot.settings.swap_flags());
        let mut assignment = QuadrantRouter::resolve(&snapshot, id, swap);

        if self.is_currently_on_large(id)
            && !force_update
            && !self.local_main_changed(&assignment)
        {
            debug!(
                target: "stage.coordinator",
                participant_id = %id,
                "Stage unchanged, attach skipped"
            );
            return UpdateDecision::Skipped;
        }

        if force_reattach {
            assignment.mark_force_reattach();
        }

        self.current_participant = Some(id.clone());
        self.swap = swap;

        let Some(video) = self.video_surface() else {
            debug!(
                target: "stage.coordinator",
                participant_id = %id,
                "No video surface registered"
            );
            return UpdateDecision::Applied { slots: 0 };
        };

        let mut slots = 0;
        for slot in QuadrantAssignment::ATTACH_ORDER {
            if let Some(resolved) = assignment.take(slot) {
                let generation = self.generations.bump(slot);
                self.spawn_attach(Arc::clone(&video), id.clone(), slot, resolved, generation);
                slots += 1;
            }
        }

        debug!(
            target: "stage.coordinator",
            participant_id = %id,
            slots,
            force_update,
            force_reattach,
            swap_local = swap.swap_local,
            swap_remote = swap.swap_remote,
            "Stage updated"
        );

        UpdateDecision::Applied { slots }
    }

    /// Whether the video surface shows a different local-main stream than
    /// `assignment` resolves. `false` unless a video container is visible
    /// and a local-main stream exists.
    fn local_main_changed(&self, assignment: &QuadrantAssignment) -> bool {
        let on_video = self.registry.current_kind().is_some_and(|k| k.is_video());
        let Some(local_main) = assignment.get(QuadrantSlot::LocalMain) else {
            return false;
        };
        if !on_video {
            return false;
        }

        let attached = self.video_surface().and_then(|v| v.stream_id());
        attached.as_ref() != Some(local_main.handle.id())
    }

    fn spawn_attach(
        &self,
        video: Arc<dyn DisplayContainer>,
        participant_id: ParticipantId,
        slot: QuadrantSlot,
        resolved: ResolvedStream,
        generation: u64,
    ) {
        let generations = self.generations.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let stream_id = resolved.handle.id().clone();

            let outcome = match video.prepare(slot, &resolved.handle).await {
                Ok(()) => {
                    let ResolvedStream { handle, kind } = resolved;
                    if generations.commit_if_current(slot, generation, || {
                        video.commit(slot, handle, kind);
                    }) {
                        AttachOutcome::Applied
                    } else {
                        AttachOutcome::Superseded
                    }
                }
                Err(e) => AttachOutcome::Failed(e),
            };

            metrics::record_attach_duration(slot.as_str(), started.elapsed());
            metrics::record_attach(slot.as_str(), outcome.label());

            match &outcome {
                AttachOutcome::Failed(e) => {
                    metrics::record_attach_failure(e.label());
                    warn!(
                        target: "stage.attach",
                        participant_id = %participant_id,
                        slot = %slot,
                        stream_id = %stream_id,
                        error = %e,
                        "Attach failed, surface keeps previous content"
                    );
                }
                AttachOutcome::Superseded => {
                    debug!(
                        target: "stage.attach",
                        slot = %slot,
                        stream_id = %stream_id,
                        generation,
                        "Attach superseded"
                    );
                }
                AttachOutcome::Applied => {}
            }

            // Receiver gone means nobody is listening for reports.
            let _ = events.send(StageEvent::Attach(AttachReport {
                participant_id,
                slot,
                stream_id,
                generation,
                outcome,
            }));
        });
    }

    /// Operator swap: reassign all four slots for `id` with the given flags.
    ///
    /// The flags apply to this reassignment only. The stored swap settings
    /// stay with the state source and drive later updates.
    pub fn change_view(
        &mut self,
        id: &ParticipantId,
        swap_local: bool,
        swap_remote: bool,
    ) -> UpdateDecision {
        let swap = SwapFlags::new(swap_local, swap_remote);
        let decision = self.decide_update(id, true, false, Some(swap));
        metrics::record_update_decision(decision.label());
        if decision != UpdateDecision::NotInitialized {
            info!(
                target: "stage.coordinator",
                participant_id = %id,
                swap_local,
                swap_remote,
                "View changed"
            );
        }
        decision
    }

    /// Swap flags of the last applied assignment.
    #[must_use]
    pub fn swap_flags(&self) -> SwapFlags {
        self.swap
    }

    /// Refresh the participant on stage if it entered or left last-N.
    pub fn on_last_n_endpoints_changed(
        &mut self,
        leaving: &[ParticipantId],
        entering: &[ParticipantId],
    ) -> Vec<UpdateDecision> {
        let on_stage: Vec<ParticipantId> = leaving
            .iter()
            .chain(entering)
            .filter(|id| self.is_currently_on_large(id))
            .cloned()
            .collect();

        on_stage
            .iter()
            .map(|id| self.update_large_video(id, false, false))
            .collect()
    }

    /// Refresh `id` when it has no video tracks and is on stage, so the
    /// surface switches to its muted state.
    pub fn update_video_muted_for_no_tracks(
        &mut self,
        id: &ParticipantId,
    ) -> Option<UpdateDecision> {
        let has_video = self
            .state
            .snapshot()
            .tracks_for(id)
            .is_some_and(crate::media::ParticipantTracks::has_video);

        if has_video || !self.is_currently_on_large(id) {
            return None;
        }
        Some(self.update_large_video(id, true, false))
    }

    /// Video kind for `id`, used to pick its container.
    #[must_use]
    pub fn remote_video_kind(&self, id: &ParticipantId) -> Option<VideoKind> {
        QuadrantRouter::remote_video_kind(&self.state.snapshot(), id)
    }

    /// Self-view toggled: refresh when the local participant is on stage.
    pub fn on_hide_self_view_changed(&mut self, hidden: bool) -> Option<UpdateDecision> {
        if hidden == self.hide_self_view {
            return None;
        }
        self.hide_self_view = hidden;

        let local = self.state.snapshot().local_participant_id().cloned()?;
        if !self.is_currently_on_large(&local) {
            return None;
        }
        Some(self.update_large_video(&local, true, false))
    }

    /// Screen-share focus: when sharing and the user wants to see what is
    /// shared, force a re-attach of the participant on stage.
    pub fn on_screen_share_focus(
        &mut self,
        sharing: bool,
        see_what_is_shared: bool,
    ) -> Option<UpdateDecision> {
        if !(sharing && see_what_is_shared) {
            return None;
        }
        let id = self.current_participant.clone()?;
        Some(self.update_large_video(&id, true, true))
    }

    /// Pin changed: a pinned participant becomes the active subject and is
    /// put on stage. Unpinning leaves the stage as is.
    pub fn on_pinned_participant_changed(
        &mut self,
        id: Option<ParticipantId>,
    ) -> Option<UpdateDecision> {
        let id = id?;
        self.set_active_participant(id.clone());
        Some(self.update_large_video(&id, true, false))
    }

    // ------------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------------

    /// Show or hide a container kind.
    ///
    /// Hiding falls back to the pinned participant's video container, or to
    /// `Camera` when nobody is pinned, so the stage is never blank.
    ///
    /// # Errors
    ///
    /// - `StageError::NotInitialized` before `initialize` or after `reset`
    /// - `StageError::ContainerNotFound` if the target kind is not registered
    /// - `StageError::Surface` if a surface rejects the transition
    pub async fn show_large_video_container(
        &mut self,
        kind: ContainerKind,
        show: bool,
    ) -> Result<(), StageError> {
        let result = self.transition_visibility(kind, show).await;
        if let Err(e) = &result {
            metrics::record_error("show_container", e.label());
        }
        result
    }

    async fn transition_visibility(
        &mut self,
        kind: ContainerKind,
        show: bool,
    ) -> Result<(), StageError> {
        if !self.is_initialized() {
            return Err(StageError::NotInitialized);
        }
        if self.registry.is_visible(kind) == show {
            return Ok(());
        }

        let target = if show { kind } else { self.hide_fallback_kind() };
        let next = self
            .registry
            .get(target)
            .cloned()
            .ok_or(StageError::ContainerNotFound(target))?;

        let previous = self.registry.current_kind();
        if previous == Some(target) {
            return Ok(());
        }

        let shared = previous.is_some_and(|prev| self.registry.shares_surface(prev, target));
        if !shared {
            if let Some(prev_kind) = previous {
                if let Some(prev) = self.registry.get(prev_kind).cloned() {
                    prev.hide().await.map_err(|source| StageError::Surface {
                        kind: prev_kind,
                        source,
                    })?;
                }
            }
            next.show()
                .await
                .map_err(|source| StageError::Surface { kind: target, source })?;
        }

        self.registry.set_current(target);
        metrics::record_container_switch(target.as_str());
        info!(
            target: "stage.coordinator",
            from = ?previous,
            to = %target,
            "Visible container changed"
        );

        Ok(())
    }

    fn hide_fallback_kind(&self) -> ContainerKind {
        let snapshot = self.state.snapshot();
        let kind = snapshot.pinned.as_ref().map_or(ContainerKind::Camera, |pinned| {
            QuadrantRouter::remote_video_kind(&snapshot, pinned)
                .unwrap_or(VideoKind::Camera)
                .container_kind()
        });
        if self.registry.contains(kind) {
            kind
        } else {
            self.registry.video_kind().unwrap_or(kind)
        }
    }

    #[must_use]
    pub fn is_large_container_kind_visible(&self, kind: ContainerKind) -> bool {
        self.is_initialized() && self.registry.is_visible(kind)
    }

    #[must_use]
    pub fn is_large_video_visible(&self) -> bool {
        self.is_large_container_kind_visible(ContainerKind::Camera)
    }

    // ------------------------------------------------------------------------
    // Geometry and transforms
    // ------------------------------------------------------------------------

    /// Recompute the stage geometry and resize the visible container.
    ///
    /// The resize animates only when the filmstrip width taken from the
    /// stage changed.
    pub fn resize(&mut self, viewport: Viewport) -> StageGeometry {
        let geometry = StageGeometry::compute(viewport, self.config.filmstrip_breakpoint);
        let animate = geometry.filmstrip_width != self.geometry.filmstrip_width;
        self.viewport = viewport;
        self.geometry = geometry;

        if let Some(container) = self.current_container() {
            container.resize(geometry, animate);
        }
        geometry
    }

    #[must_use]
    pub fn geometry(&self) -> StageGeometry {
        self.geometry
    }

    /// Mirror the local feeds on the video surface.
    pub fn on_local_flip_x_changed(&mut self, flip: bool) {
        self.local_flip_x = flip;
        if !self.is_initialized() {
            return;
        }
        if let Some(video) = self.video_surface() {
            video.set_local_flip_x(flip);
        }
    }

    /// Forward the audio level of `id` when it is on stage.
    ///
    /// Returns whether the level was forwarded.
    pub fn set_audio_level(&self, id: &ParticipantId, level: f32) -> bool {
        if !self.is_initialized() || !self.is_currently_on_large(id) {
            return false;
        }
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        match self.video_surface() {
            Some(video) => {
                video.set_audio_level(level);
                true
            }
            None => false,
        }
    }

    /// Rotate one quadrant a quarter turn clockwise.
    pub fn rotate_quadrant(&mut self, slot: QuadrantSlot) -> QuadrantTransform {
        self.update_transform(slot, QuadrantTransform::rotated)
    }

    /// Toggle horizontal mirroring of one quadrant.
    pub fn flip_quadrant(&mut self, slot: QuadrantSlot) -> QuadrantTransform {
        self.update_transform(slot, QuadrantTransform::flipped)
    }

    fn update_transform(
        &mut self,
        slot: QuadrantSlot,
        f: fn(QuadrantTransform) -> QuadrantTransform,
    ) -> QuadrantTransform {
        let entry = self.transforms.entry(slot).or_default();
        *entry = f(*entry);
        let transform = *entry;

        if self.is_initialized() {
            if let Some(video) = self.video_surface() {
                video.set_quadrant_transform(slot, transform);
            }
        }
        transform
    }

    #[must_use]
    pub fn quadrant_transform(&self, slot: QuadrantSlot) -> QuadrantTransform {
        self.transforms.get(&slot).copied().unwrap_or_default()
    }

    /// Switch the quadrant layout. Returns whether it changed.
    pub fn set_layout_mode(&mut self, mode: LayoutMode) -> bool {
        if self.layout == mode {
            return false;
        }
        self.layout = mode;
        if self.is_initialized() {
            if let Some(video) = self.video_surface() {
                video.set_layout(mode);
            }
        }
        true
    }

    #[must_use]
    pub fn layout_mode(&self) -> LayoutMode {
        self.layout
    }

    /// Register a tap on the stage; a double tap requests tile view.
    pub fn on_double_tap(&mut self, at: Instant) -> bool {
        if !self.double_tap.register(at) {
            return false;
        }
        metrics::record_tile_view_request();
        debug!(target: "stage.coordinator", "Tile view requested");
        let _ = self.events.send(StageEvent::TileViewRequested);
        true
    }

    /// Diagnostics snapshot.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        StageStatus {
            phase: self.phase,
            participant_id: self.current_participant.clone(),
            active_participant_id: self.active_participant.clone(),
            container_kind: self.registry.current_kind(),
            registered: self.registry.kinds(),
            swap: self.swap,
            layout: self.layout,
            local_flip_x: self.local_flip_x,
            geometry: self.geometry,
            created_at: self.created_at,
        }
    }
}
