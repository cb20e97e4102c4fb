//! Stage Controller
//!
//! Drives one stage from a script of conference events and reports the
//! resulting stage status and metrics.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing (text or JSON)
//! 3. Initialize Prometheus metrics recorder
//! 4. Build the conference store, coordinator, and stage actor
//! 5. Initialize the stage with the default video surface
//! 6. Replay the script (`STAGE_SCRIPT_PATH`, or stdin)
//! 7. Log the final status, print metrics, and shut the actor down

#![warn(clippy::pedantic)]

use anyhow::Context;
use stage_controller::actors::{StageActor, StageActorMetrics};
use stage_controller::config::Config;
use stage_controller::containers::{ContainerKind, LoggingSurface};
use stage_controller::coordinator::{LargeVideoCoordinator, StageEvent};
use stage_controller::observability::init_metrics_recorder;
use stage_controller::replay::{parse_script, ScriptRunner};
use stage_controller::state::{ConferenceStore, StateSource};
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.as_str().into());
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        session_id = %config.session_id,
        mailbox_capacity = config.mailbox_capacity,
        double_tap_window_ms = config.double_tap_window_ms,
        filmstrip_breakpoint = config.filmstrip_breakpoint,
        initial_layout = %config.initial_layout,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        anyhow::anyhow!(e)
    })?;

    let script = read_script(&config)?;
    let events = parse_script(&script).context("Failed to parse script")?;
    info!(events = events.len(), "Script loaded");

    let store = Arc::new(ConferenceStore::new());
    let (coordinator, mut stage_events) = LargeVideoCoordinator::new(
        Arc::clone(&store) as Arc<dyn StateSource>,
        config.coordinator_config(),
    );

    let event_task = tokio::spawn(async move {
        while let Some(event) = stage_events.recv().await {
            match event {
                StageEvent::Attach(report) => debug!(
                    participant_id = %report.participant_id,
                    slot = %report.slot,
                    stream_id = %report.stream_id,
                    generation = report.generation,
                    outcome = report.outcome.label(),
                    "Attach finished"
                ),
                StageEvent::TileViewRequested => info!("Tile view requested"),
            }
        }
    });

    let metrics = StageActorMetrics::new();
    let cancel_token = CancellationToken::new();
    let (stage, stage_task) = StageActor::spawn(
        config.session_id.clone(),
        coordinator,
        cancel_token.clone(),
        Arc::clone(&metrics),
        config.mailbox_capacity,
    );

    stage
        .initialize(Arc::new(LoggingSurface::new(ContainerKind::Camera)))
        .await
        .context("Failed to initialize stage")?;

    let runner = ScriptRunner::new(store, stage.clone());
    if let Err(e) = runner.run(events).await {
        warn!(error = %e, "Script stopped early");
    }

    // Drain the mailbox before reading the final state
    let status = stage.get_status().await?;
    info!(
        status = %serde_json::to_string(&status).unwrap_or_default(),
        "Final stage status"
    );

    println!("{}", prometheus_handle.render());

    info!("Shutting down stage");
    cancel_token.cancel();
    if let Err(e) = stage_task.await {
        if e.is_panic() {
            metrics.record_panic();
        }
        error!(error = %e, "Stage actor task failed");
    }
    drop(stage);
    drop(runner);
    event_task.abort();

    info!(
        messages_processed = metrics.messages_processed(),
        "Stage Controller shutdown complete"
    );
    Ok(())
}

fn read_script(config: &Config) -> anyhow::Result<String> {
    match &config.script_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        None => {
            let mut script = String::new();
            std::io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read script from stdin")?;
            Ok(script)
        }
    }
}
