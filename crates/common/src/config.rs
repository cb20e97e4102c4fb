//! Common configuration types for stage components.

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "stage_controller=debug";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "stage_controller=debug")
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Load from a variable map.
    ///
    /// Reads `STAGE_LOG_LEVEL` and `STAGE_LOG_JSON` ("true"/"false"/"1"/"0").
    ///
    /// # Errors
    ///
    /// Returns `CommonError::Configuration` if `STAGE_LOG_JSON` is not a boolean.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let log_level = vars
            .get("STAGE_LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let json_logs = match vars.get("STAGE_LOG_JSON").map(String::as_str) {
            None => false,
            Some("true" | "1") => true,
            Some("false" | "0") => false,
            Some(other) => {
                return Err(CommonError::Configuration(format!(
                    "STAGE_LOG_JSON must be a boolean, got '{other}'"
                )))
            }
        };

        Ok(Self {
            log_level,
            json_logs,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ObservabilityConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, ObservabilityConfig::default());
    }

    #[test]
    fn test_json_logs_flag() {
        let vars = HashMap::from([("STAGE_LOG_JSON".to_string(), "1".to_string())]);
        let config = ObservabilityConfig::from_vars(&vars).unwrap();
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_json_flag_rejected() {
        let vars = HashMap::from([("STAGE_LOG_JSON".to_string(), "yes".to_string())]);
        let result = ObservabilityConfig::from_vars(&vars);
        assert!(matches!(result, Err(CommonError::Configuration(_))));
    }
}
