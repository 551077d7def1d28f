//! Range checks applied once all configuration sources are merged.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Reject values that would make fetching or rendering misbehave.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `user_agent` is empty
    /// - `timeout_ms` or `navigation_timeout_ms` is below 100ms or above 5 minutes
    /// - `settle_delay_ms` exceeds one minute
    /// - `image_concurrency` is 0 or above 32
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("navigation_timeout_ms", self.navigation_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 300_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.settle_delay_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "settle_delay_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.image_concurrency == 0 || self.image_concurrency > 32 {
            return Err(ConfigError::Invalid {
                field: "image_concurrency".into(),
                reason: "must be between 1 and 32".into(),
            });
        }

        if self.min_content_length == 0 {
            tracing::warn!("min_content_length is 0; every direct fetch body will be accepted");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_navigation_timeout_exceeds_limit() {
        let config = AppConfig { navigation_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "navigation_timeout_ms"));
    }

    #[test]
    fn test_validate_settle_delay_exceeds_limit() {
        let config = AppConfig { settle_delay_ms: 60_001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "settle_delay_ms"));
    }

    #[test]
    fn test_validate_zero_settle_delay() {
        let config = AppConfig { settle_delay_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_image_concurrency_zero() {
        let config = AppConfig { image_concurrency: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "image_concurrency"));
    }

    #[test]
    fn test_validate_image_concurrency_too_large() {
        let config = AppConfig { image_concurrency: 33, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "image_concurrency"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { timeout_ms: 100, navigation_timeout_ms: 300_000, image_concurrency: 32, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
