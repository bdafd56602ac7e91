//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field has a default so an empty file is valid.

pub mod audit;
pub mod backend;
pub mod cache;
pub mod email;
pub mod features;
pub mod logging;
pub mod optimistic;
pub mod storage;

use serde::{Deserialize, Serialize};

use self::audit::AuditConfig;
use self::backend::BackendConfig;
use self::cache::CacheConfig;
use self::email::EmailConfig;
use self::features::FeatureFlags;
use self::logging::LoggingConfig;
use self::optimistic::OptimisticConfig;
use self::storage::StorageConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hosted backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Read cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Optimistic update engine settings.
    #[serde(default)]
    pub optimistic: OptimisticConfig,
    /// Audit trail cache and outbox settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Attachment storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Transactional email settings.
    #[serde(default)]
    pub email: EmailConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feature flags.
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `SITEHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SITEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML string.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.optimistic.success_clear_ms, 3000);
        assert_eq!(config.optimistic.error_clear_ms, 5000);
        assert_eq!(config.audit.cache_ttl_seconds, 300);
        assert_eq!(config.cache.default_ttl_seconds, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_sections_override() {
        let config = AppConfig::from_toml(
            r#"
            [backend]
            url = "https://example.test"
            anon_key = "k"

            [audit]
            debounce_ms = 150

            [features]
            variation_emails = false
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.url, "https://example.test");
        assert_eq!(config.audit.debounce_ms, 150);
        assert!(!config.features.variation_emails);
        assert!(config.features.audit_trail);
    }
}
