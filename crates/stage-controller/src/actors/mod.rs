//! Actor wrapper around the stage coordinator.
//!
//! ```text
//! StageActorHandle (cloned by each state listener)
//! └── mpsc mailbox
//!     └── StageActor (one per conference session)
//!         ├── owns LargeVideoCoordinator
//!         └── fires attach tasks (tokio::spawn, generation-guarded)
//! ```
//!
//! # Modules
//!
//! - [`stage`] - `StageActor` and its handle
//! - [`messages`] - Message types for the stage mailbox
//! - [`metrics`] - Mailbox monitoring and actor counters

pub mod messages;
pub mod metrics;
pub mod stage;

// Re-export primary types
pub use messages::*;
pub use metrics::{MailboxLevel, MailboxMonitor, StageActorMetrics};
pub use stage::{StageActor, StageActorHandle, DEFAULT_STAGE_CHANNEL_BUFFER};
