//! Stage Controller configuration.
//!
//! Every value comes from a `STAGE_*` environment variable with a default.
//! Values that are present but unparseable are rejected, not defaulted.

use crate::actors::DEFAULT_STAGE_CHANNEL_BUFFER;
use crate::coordinator::CoordinatorConfig;
use crate::layout::{LayoutMode, DEFAULT_DOUBLE_TAP_WINDOW, DEFAULT_FILMSTRIP_BREAKPOINT};
use common::config::ObservabilityConfig;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Prefix for generated session IDs.
pub const DEFAULT_SESSION_ID_PREFIX: &str = "stage";

/// Default double-tap window in milliseconds.
#[allow(clippy::cast_possible_truncation)] // 300ms fits in u64
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: u64 = DEFAULT_DOUBLE_TAP_WINDOW.as_millis() as u64;

/// Stage Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Session identifier used in logs (`stage-{hostname}-{uuid}` if unset).
    pub session_id: String,

    /// Stage actor mailbox capacity.
    pub mailbox_capacity: usize,

    /// Two taps closer than this request tile view.
    pub double_tap_window_ms: u64,

    /// Minimum filmstrip width that takes space from the stage.
    pub filmstrip_breakpoint: u32,

    /// Quadrant layout applied at initialization.
    pub initial_layout: LayoutMode,

    /// Script of conference events to replay (stdin if unset).
    pub script_path: Option<PathBuf>,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is present but invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let session_id = vars.get("STAGE_SESSION_ID").cloned().unwrap_or_else(|| {
            let hostname = env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_SESSION_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        if session_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "STAGE_SESSION_ID must not be empty".to_string(),
            ));
        }

        let mailbox_capacity: usize =
            parse_var(vars, "STAGE_MAILBOX_CAPACITY", DEFAULT_STAGE_CHANNEL_BUFFER)?;
        if mailbox_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "STAGE_MAILBOX_CAPACITY must be greater than 0".to_string(),
            ));
        }

        let double_tap_window_ms: u64 =
            parse_var(vars, "STAGE_DOUBLE_TAP_WINDOW_MS", DEFAULT_DOUBLE_TAP_WINDOW_MS)?;
        if double_tap_window_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "STAGE_DOUBLE_TAP_WINDOW_MS must be greater than 0".to_string(),
            ));
        }

        let filmstrip_breakpoint =
            parse_var(vars, "STAGE_FILMSTRIP_BREAKPOINT", DEFAULT_FILMSTRIP_BREAKPOINT)?;

        let initial_layout = parse_var(vars, "STAGE_INITIAL_LAYOUT", LayoutMode::default())?;

        let script_path = vars
            .get("STAGE_SCRIPT_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let observability = ObservabilityConfig::from_vars(vars)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(Config {
            session_id,
            mailbox_capacity,
            double_tap_window_ms,
            filmstrip_breakpoint,
            initial_layout,
            script_path,
            observability,
        })
    }

    /// Coordinator tuning derived from this configuration.
    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            double_tap_window: Duration::from_millis(self.double_tap_window_ms),
            filmstrip_breakpoint: self.filmstrip_breakpoint,
            initial_layout: self.initial_layout,
        }
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{name}='{raw}': {e}"))),
    }
}
