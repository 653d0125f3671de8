#![allow(clippy::result_large_err)]

use super::EngineConfig;
use crate::core::error::FlowError;
use std::env;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from a workspace root (`<workspace>/botflow.toml`).
    /// Environment variables override config file values. Missing file
    /// falls back to defaults plus env vars.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<EngineConfig, FlowError> {
        let config_path = workspace_path.join("botflow.toml");
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Load config from a specific file path. Returns Ok(None) if the file
    /// does not exist.
    pub fn load_from_file(path: &Path) -> Result<Option<EngineConfig>, FlowError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::new(
                crate::core::types::ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            FlowError::new(
                crate::core::types::ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides. Env vars take precedence over
    /// config file values.
    fn apply_env_overrides(config: &mut EngineConfig) {
        if let Ok(raw) = env::var("BOTFLOW_SANDBOX_MAX_ITERATIONS") {
            if let Ok(value) = raw.parse::<usize>() {
                config.sandbox_max_iterations = value;
            }
        }

        if let Ok(raw) = env::var("BOTFLOW_HTTP_TIMEOUT_SECONDS") {
            if let Ok(value) = raw.parse::<u64>() {
                config.http_timeout_seconds = value;
            }
        }

        if let Ok(raw) = env::var("BOTFLOW_MAX_DELAY_SECONDS") {
            if let Ok(value) = raw.parse::<u64>() {
                config.max_delay_seconds = value;
            }
        }

        if let Ok(raw) = env::var("BOTFLOW_SHEETS_BASE_URL") {
            if !raw.trim().is_empty() {
                config.sheets_base_url = raw;
            }
        }
    }
}
