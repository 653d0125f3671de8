#![allow(clippy::result_large_err)]

use super::EngineConfig;
use crate::core::error::FlowError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &EngineConfig) -> Result<(), FlowError> {
        if config.sandbox_max_iterations == 0 {
            return Err(FlowError::new(
                ErrorCategory::ValidationError,
                "sandbox_max_iterations must be >= 1",
            )
            .with_code("FLW-CFG-001"));
        }

        if config.http_timeout_seconds == 0 {
            return Err(FlowError::new(
                ErrorCategory::ValidationError,
                "http_timeout_seconds must be >= 1",
            )
            .with_code("FLW-CFG-001"));
        }

        if config.max_delay_seconds == 0 {
            return Err(FlowError::new(
                ErrorCategory::ValidationError,
                "max_delay_seconds must be >= 1",
            )
            .with_code("FLW-CFG-001"));
        }

        if config.sheets_base_url.trim().is_empty() {
            return Err(FlowError::new(
                ErrorCategory::ValidationError,
                "sheets_base_url cannot be empty",
            )
            .with_code("FLW-CFG-001"));
        }

        Ok(())
    }
}
