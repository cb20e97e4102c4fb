//! Stage actor metrics and mailbox monitoring.
//!
//! | Depth | Level |
//! |-------|-------|
//! | < 50 | Normal |
//! | 50-200 | Warning |
//! | > 200 | Critical |
//!
//! Stage traffic is bursty (a resize storm, a last-N reshuffle), so the
//! warning level is logged once per crossing and critical on every enqueue.

use crate::observability::metrics;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Depth below which the mailbox is considered healthy.
pub const STAGE_MAILBOX_NORMAL: usize = 50;

/// Depth above which the mailbox is critical.
pub const STAGE_MAILBOX_WARNING: usize = 200;

/// Mailbox depth level for alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    /// Below normal threshold.
    Normal,
    /// Between normal and warning thresholds.
    Warning,
    /// Above warning threshold.
    Critical,
}

/// Tracks the stage actor's queue depth.
///
/// Shared between the handle (which enqueues) and the actor (which dequeues).
#[derive(Debug)]
pub struct MailboxMonitor {
    session_id: String,
    depth: AtomicUsize,
    peak_depth: AtomicUsize,
    messages_processed: AtomicU64,
    messages_dropped: AtomicU64,
}

impl MailboxMonitor {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            depth: AtomicUsize::new(0),
            peak_depth: AtomicUsize::new(0),
            messages_processed: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    /// Record a message being added to the mailbox.
    pub fn record_enqueue(&self) {
        let new_depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_depth.fetch_max(new_depth, Ordering::Relaxed);
        metrics::set_actor_mailbox_depth(new_depth);

        match Self::level_for_depth(new_depth) {
            MailboxLevel::Critical => {
                warn!(
                    target: "stage.actor.mailbox",
                    session_id = %self.session_id,
                    depth = new_depth,
                    threshold = STAGE_MAILBOX_WARNING,
                    "Mailbox depth critical"
                );
            }
            MailboxLevel::Warning if new_depth == STAGE_MAILBOX_NORMAL + 1 => {
                debug!(
                    target: "stage.actor.mailbox",
                    session_id = %self.session_id,
                    depth = new_depth,
                    "Mailbox depth elevated"
                );
            }
            _ => {}
        }
    }

    /// Record a message taken off the mailbox and processed.
    pub fn record_dequeue(&self) {
        let previous = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| Some(d.saturating_sub(1)))
            .unwrap_or(0);
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        metrics::set_actor_mailbox_depth(previous.saturating_sub(1));
    }

    /// Record a message that never reached the mailbox (actor gone).
    pub fn record_drop(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| Some(d.saturating_sub(1)));
        let dropped = self.messages_dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            target: "stage.actor.mailbox",
            session_id = %self.session_id,
            dropped,
            "Message dropped, stage actor mailbox closed"
        );
    }

    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn current_level(&self) -> MailboxLevel {
        Self::level_for_depth(self.current_depth())
    }

    fn level_for_depth(depth: usize) -> MailboxLevel {
        if depth > STAGE_MAILBOX_WARNING {
            MailboxLevel::Critical
        } else if depth > STAGE_MAILBOX_NORMAL {
            MailboxLevel::Warning
        } else {
            MailboxLevel::Normal
        }
    }
}

/// Process-wide stage actor counters.
#[derive(Debug, Default)]
pub struct StageActorMetrics {
    /// Stage actors currently running.
    pub active_stages: AtomicUsize,
    /// Actor panics (indicates bugs).
    pub actor_panics: AtomicU64,
    /// Messages processed across all stage actors.
    pub total_messages_processed: AtomicU64,
}

impl StageActorMetrics {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stage_started(&self) {
        self.active_stages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stage_stopped(&self) {
        let _ = self
            .active_stages
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    /// Record a stage actor panic.
    pub fn record_panic(&self) {
        let total = self.actor_panics.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::error!(
            target: "stage.actor.panic",
            total_panics = total,
            "Stage actor panic detected - indicates bug, investigation required"
        );
    }

    pub fn record_message_processed(&self) {
        self.total_messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn active_stage_count(&self) -> usize {
        self.active_stages.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.total_messages_processed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mailbox_enqueue_dequeue() {
        let monitor = MailboxMonitor::new("stage-test");
        assert_eq!(monitor.current_depth(), 0);

        monitor.record_enqueue();
        monitor.record_enqueue();
        monitor.record_enqueue();
        assert_eq!(monitor.current_depth(), 3);
        assert_eq!(monitor.peak_depth(), 3);

        monitor.record_dequeue();
        assert_eq!(monitor.current_depth(), 2);
        assert_eq!(monitor.peak_depth(), 3);
        assert_eq!(monitor.messages_processed(), 1);
    }

    #[test]
    fn test_mailbox_levels() {
        let monitor = MailboxMonitor::new("stage-test");
        assert_eq!(monitor.current_level(), MailboxLevel::Normal);

        for _ in 0..75 {
            monitor.record_enqueue();
        }
        assert_eq!(monitor.current_level(), MailboxLevel::Warning);

        for _ in 0..150 {
            monitor.record_enqueue();
        }
        assert_eq!(monitor.current_level(), MailboxLevel::Critical);
    }

    #[test]
    fn test_drop_does_not_leave_phantom_depth() {
        let monitor = MailboxMonitor::new("stage-test");
        monitor.record_enqueue();
        monitor.record_drop();

        assert_eq!(monitor.current_depth(), 0);
        assert_eq!(monitor.messages_dropped(), 1);
        assert_eq!(monitor.messages_processed(), 0);
    }

    #[test]
    fn test_dequeue_never_underflows() {
        let monitor = MailboxMonitor::new("stage-test");
        monitor.record_dequeue();
        assert_eq!(monitor.current_depth(), 0);
    }

    #[test]
    fn test_actor_metrics() {
        let metrics = StageActorMetrics::new();

        metrics.stage_started();
        metrics.stage_started();
        metrics.stage_stopped();
        assert_eq!(metrics.active_stage_count(), 1);

        metrics.record_message_processed();
        assert_eq!(metrics.messages_processed(), 1);

        metrics.record_panic();
        assert_eq!(metrics.actor_panics.load(Ordering::Relaxed), 1);
    }
}
