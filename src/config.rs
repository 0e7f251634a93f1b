//! Engine configuration: YAML file with environment and CLI overrides
//! (spec.md ambient stack; precedence matches the teacher's `RUST_LOG`
//! resolution in `main.rs`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

fn default_temperatures() -> Vec<f64> {
    vec![0.0, 0.2, 0.5, 1.0]
}
fn default_deadline_secs() -> u64 {
    300
}
fn default_completions_per_request() -> u32 {
    5
}
fn default_validator_timeout_secs() -> u64 {
    30
}
fn default_validator_command() -> Vec<String> {
    vec!["npx".to_string(), "mocha".to_string(), "--reporter".to_string(), "json".to_string()]
}

/// The engine's tunable parameters. Every field has a built-in default;
/// a config file may override any subset, and select fields additionally
/// accept an environment override (documented per field).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenforgeConfig {
    /// Sampling temperatures tried, low to high, until one yields a pass.
    pub temperatures: Vec<f64>,
    /// Wall-clock budget per function, in seconds.
    pub deadline_secs: u64,
    /// Completion provider base URL. Env override: `GENFORGE_API_BASE`.
    pub api_base: Option<String>,
    /// Completion provider API key. Env override: `GENFORGE_API_KEY`.
    pub api_key: Option<String>,
    /// Completion provider model identifier. Env override: `GENFORGE_MODEL`.
    pub model: String,
    /// Number of completions requested per prompt.
    pub completions_per_request: u32,
    /// Per-test-run timeout for the validator, in seconds.
    pub validator_timeout_secs: u64,
    /// Validator command template: program followed by its fixed arguments,
    /// invoked with the candidate test's path appended as the final
    /// argument. Env override: `GENFORGE_VALIDATOR_COMMAND` (whitespace
    /// separated).
    #[serde(default = "default_validator_command")]
    pub validator_command: Vec<String>,
    /// Path to a `{functionName: [snippet, ...]}` sidecar, if any.
    pub snippet_map_path: Option<String>,
}

impl Default for GenforgeConfig {
    fn default() -> Self {
        Self {
            temperatures: default_temperatures(),
            deadline_secs: default_deadline_secs(),
            api_base: None,
            api_key: None,
            model: "gpt-4".to_string(),
            completions_per_request: default_completions_per_request(),
            validator_timeout_secs: default_validator_timeout_secs(),
            validator_command: default_validator_command(),
            snippet_map_path: None,
        }
    }
}

impl GenforgeConfig {
    /// Load a YAML config file, falling back to defaults for any field it
    /// omits.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Start from `base` (typically loaded via [`Self::from_file`] or
    /// [`Self::default`]) and apply environment-variable overrides:
    /// `GENFORGE_API_BASE`, `GENFORGE_API_KEY`, `GENFORGE_MODEL`,
    /// `GENFORGE_VALIDATOR_COMMAND`. CLI flags take precedence over both and
    /// are applied by the caller after this.
    pub fn from_env(mut base: Self) -> Self {
        if let Ok(v) = std::env::var("GENFORGE_API_BASE") {
            base.api_base = Some(v);
        }
        if let Ok(v) = std::env::var("GENFORGE_API_KEY") {
            base.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("GENFORGE_MODEL") {
            base.model = v;
        }
        if let Ok(v) = std::env::var("GENFORGE_VALIDATOR_COMMAND") {
            let parts: Vec<String> = v.split_whitespace().map(str::to_string).collect();
            if !parts.is_empty() {
                base.validator_command = parts;
            }
        }
        base
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_nonempty_temperatures() {
        assert!(!GenforgeConfig::default().temperatures.is_empty());
    }

    #[test]
    fn from_file_overrides_only_specified_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genforge.yaml");
        std::fs::write(&path, "model: gpt-4-turbo\n").unwrap();
        let cfg = GenforgeConfig::from_file(&path).unwrap();
        assert_eq!(cfg.model, "gpt-4-turbo");
        assert_eq!(cfg.temperatures, default_temperatures());
    }

    #[test]
    fn env_overrides_take_precedence_over_file_values() {
        std::env::set_var("GENFORGE_MODEL", "env-model");
        let cfg = GenforgeConfig::from_env(GenforgeConfig::default());
        assert_eq!(cfg.model, "env-model");
        std::env::remove_var("GENFORGE_MODEL");
    }

    #[test]
    fn validator_command_env_override_splits_on_whitespace() {
        std::env::set_var("GENFORGE_VALIDATOR_COMMAND", "node run-tests.js --json");
        let cfg = GenforgeConfig::from_env(GenforgeConfig::default());
        assert_eq!(
            cfg.validator_command,
            vec!["node".to_string(), "run-tests.js".to_string(), "--json".to_string()]
        );
        std::env::remove_var("GENFORGE_VALIDATOR_COMMAND");
    }

    #[test]
    fn default_validator_command_is_npx_mocha() {
        assert_eq!(GenforgeConfig::default().validator_command, default_validator_command());
    }
}
