use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite database file. Defaults to `~/.jobflow/data/jobflow.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Root directory for uploaded quotes, proofs of payment, invoices and photos.
    pub media_directory: String,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knobs for the job state machine, passed explicitly to every entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Administrators may perform any step (except creating jobs) and see
    /// every link. When false they are read-only.
    #[serde(default = "default_true")]
    pub admin_may_act: bool,
    /// Agents may only see and act on jobs they created.
    #[serde(default = "default_true")]
    pub enforce_agent_ownership: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            admin_may_act: true,
            enforce_agent_ownership: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Log notifications instead of handing them to subscribers.
    #[serde(default)]
    pub skip_send: bool,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// Buffered notifications per subscriber before old ones are dropped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_from_address() -> String {
    "noreply@jobflow.local".to_string()
}

fn default_channel_capacity() -> usize {
    100
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            skip_send: false,
            from_address: default_from_address(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"version": "1.0", "media_directory": "/srv/media"}"#,
        )
        .unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.workflow, WorkflowConfig::default());
        assert!(!config.notifications.skip_send);
        assert_eq!(config.notifications.channel_capacity, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_workflow_section() {
        let workflow: WorkflowConfig =
            serde_json::from_str(r#"{"admin_may_act": false}"#).unwrap();
        assert!(!workflow.admin_may_act);
        assert!(workflow.enforce_agent_ownership);
    }
}
