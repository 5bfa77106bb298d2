use crate::{env_parse, env_required, ConfigError, FromEnv};
use std::time::Duration;

/// Default upper bound for a single hosted-backend request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted record backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedBackendConfig {
    pub base_url: String,
    pub project_id: String,
    pub public_key: String,
    pub timeout: Duration,
}

impl HostedBackendConfig {
    /// Whether a backend URL is configured, without validating the rest
    pub fn is_configured() -> bool {
        std::env::var("CRM_BACKEND_URL").is_ok_and(|url| !url.trim().is_empty())
    }
}

impl FromEnv for HostedBackendConfig {
    /// Reads:
    /// - CRM_BACKEND_URL (required)
    /// - CRM_PROJECT_ID (required)
    /// - CRM_PUBLIC_KEY (required)
    /// - CRM_BACKEND_TIMEOUT_SECS: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = env_parse("CRM_BACKEND_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "CRM_BACKEND_TIMEOUT_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            base_url: env_required("CRM_BACKEND_URL")?,
            project_id: env_required("CRM_PROJECT_ID")?,
            public_key: env_required("CRM_PUBLIC_KEY")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
