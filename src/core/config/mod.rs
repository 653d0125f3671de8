pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use serde::{Deserialize, Serialize};

fn default_sandbox_max_iterations() -> usize {
    100
}

fn default_http_timeout_seconds() -> u64 {
    30
}

fn default_max_delay_seconds() -> u64 {
    86_400
}

fn default_redact_keys() -> Vec<String> {
    vec!["token".into(), "password".into(), "secret".into()]
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

/// Engine configuration loaded from `botflow.toml` with environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard iteration cap applied by the dry-run executor.
    #[serde(default = "default_sandbox_max_iterations")]
    pub sandbox_max_iterations: usize,
    /// Timeout applied to outbound HTTP requests issued by apiRequest/webhook nodes.
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    /// Upper bound for a delay node's configured duration.
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
    /// Context keys redacted before an execution checkpoint is persisted.
    #[serde(default = "default_redact_keys")]
    pub redact_keys: Vec<String>,
    /// Base URL the googleSheets node appends rows against.
    #[serde(default = "default_sheets_base_url")]
    pub sheets_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sandbox_max_iterations: default_sandbox_max_iterations(),
            http_timeout_seconds: default_http_timeout_seconds(),
            max_delay_seconds: default_max_delay_seconds(),
            redact_keys: default_redact_keys(),
            sheets_base_url: default_sheets_base_url(),
        }
    }
}
