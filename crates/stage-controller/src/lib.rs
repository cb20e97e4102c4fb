//! Stage Controller Library
//!
//! Coordinates the large video area ("stage") of a conference client:
//!
//! - Registry of display containers (video surface, shared video, whiteboard, ...)
//! - Deciding which participant is shown, and whether a re-attach is needed
//! - Routing up to four streams into the local/remote main/sub quadrants
//! - Operator swap of main and sub feeds, per side
//! - Last-requested-wins attaches via per-slot generation counters
//!
//! # Architecture
//!
//! ```text
//! conference state (StateSource)
//! └── StageActor (one per session, serializes every operation)
//!     └── LargeVideoCoordinator
//!         ├── ContainerRegistry (kind -> Arc<dyn DisplayContainer>)
//!         ├── QuadrantRouter (participant tracks + swap -> slot assignment)
//!         └── AttachGenerations (slot -> latest requested attach)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Closed container kinds**: Surfaces are addressed by `ContainerKind`, not strings
//! - **Explicit lifecycle**: `Uninitialized -> Initialized -> Destroyed`, with `Destroyed` terminal
//! - **Split attach**: slow `prepare` off the actor, instantaneous `commit` under the slot guard
//! - **Swap is orthogonal**: swap flags never mark a slot for re-attach
//!
//! # Modules
//!
//! - [`actors`] - Stage actor, handle, and mailbox monitoring
//! - [`config`] - Configuration from environment
//! - [`containers`] - Container trait, kinds, and registry
//! - [`coordinator`] - The stage decision logic
//! - [`errors`] - Error types
//! - [`layout`] - Geometry, quadrant transforms, layout modes
//! - [`media`] - Streams, slots, and per-participant tracks
//! - [`observability`] - Prometheus metrics
//! - [`replay`] - Scripted conference events for the binary
//! - [`router`] - Quadrant stream resolution
//! - [`state`] - Read-only conference state

pub mod actors;
pub mod config;
pub mod containers;
pub mod coordinator;
pub mod errors;
pub mod layout;
pub mod media;
pub mod observability;
pub mod replay;
pub mod router;
pub mod state;
