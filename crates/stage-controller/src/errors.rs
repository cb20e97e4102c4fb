//! Stage Controller error types.
//!
//! Nothing here is user-facing: every failure path degrades to "stage does
//! not change". Errors carry enough detail for traces and metric labels.

use crate::containers::ContainerKind;
use thiserror::Error;

/// Stage Controller error type.
#[derive(Debug, Error)]
pub enum StageError {
    /// Operation requires an initialized coordinator.
    #[error("Large video is not initialized")]
    NotInitialized,

    /// Coordinator was torn down and cannot be reused.
    #[error("Large video has been destroyed")]
    Destroyed,

    /// No container registered for the requested kind.
    #[error("Container not registered: {0}")]
    ContainerNotFound(ContainerKind),

    /// A container rejected a visibility transition.
    #[error("Container {kind} failed: {source}")]
    Surface {
        kind: ContainerKind,
        #[source]
        source: SurfaceError,
    },

    /// Internal error (mailbox closed, response dropped).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            StageError::NotInitialized => "not_initialized",
            StageError::Destroyed => "destroyed",
            StageError::ContainerNotFound(_) => "container_not_found",
            StageError::Surface { .. } => "surface",
            StageError::Internal(_) => "internal",
        }
    }
}

/// Failures reported by a rendering surface.
///
/// Attach failures are expected (a track can end while an attach is in
/// flight) and are never propagated to the caller of an update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The stream ended before it could be bound.
    #[error("Stream ended before attach")]
    StreamEnded,

    /// The surface cannot render streams (placeholder, destroyed, etc.).
    #[error("Rendering surface unavailable")]
    Unavailable,

    /// The media engine rejected the operation.
    #[error("Media engine error: {0}")]
    Engine(String),
}

impl SurfaceError {
    /// Returns a bounded label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SurfaceError::StreamEnded => "stream_ended",
            SurfaceError::Unavailable => "unavailable",
            SurfaceError::Engine(_) => "engine",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", StageError::NotInitialized),
            "Large video is not initialized"
        );
        assert_eq!(
            format!("{}", StageError::ContainerNotFound(ContainerKind::Whiteboard)),
            "Container not registered: whiteboard"
        );
        assert_eq!(
            format!(
                "{}",
                StageError::Surface {
                    kind: ContainerKind::SharedVideo,
                    source: SurfaceError::Engine("player gone".to_string()),
                }
            ),
            "Container shared-video failed: Media engine error: player gone"
        );
    }

    #[test]
    fn test_labels_are_bounded() {
        assert_eq!(StageError::Destroyed.label(), "destroyed");
        assert_eq!(
            StageError::Internal("channel closed".to_string()).label(),
            "internal"
        );
        assert_eq!(SurfaceError::StreamEnded.label(), "stream_ended");
        assert_eq!(
            SurfaceError::Engine("anything at all".to_string()).label(),
            "engine"
        );
    }
}
