//! Observability for the Stage Controller.
//!
//! Tracing targets are `stage.*`; metrics are `stage_*`. Labels never carry
//! participant or stream IDs.
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `stage_updates_total` | Counter | `decision` | Update decisions (applied/skipped) |
//! | `stage_attach_total` | Counter | `slot`, `outcome` | Per-slot attach results |
//! | `stage_attach_failures_total` | Counter | `reason` | Attach failures by cause |
//! | `stage_attach_duration_seconds` | Histogram | `slot` | Attach preparation latency |
//! | `stage_container_switches_total` | Counter | `kind` | Visible container changes |
//! | `stage_tile_view_requests_total` | Counter | none | Double-tap tile view requests |
//! | `stage_errors_total` | Counter | `operation`, `reason` | Rejected stage operations |
//! | `stage_actor_mailbox_depth` | Gauge | none | Stage actor backpressure |
//! | `stage_containers_registered` | Gauge | none | Registered container kinds |

pub mod metrics;

pub use self::metrics::init_metrics_recorder;
