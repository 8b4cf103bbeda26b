use serde::{Deserialize, Serialize};
use thiserror::Error;

use portal_spec::{ExtensionConfig, TemplateRenderer, extensions::DEFAULT_HASH_ROUNDS};

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const HASH_ROUNDS_ENV: &str = "PORTAL_HASH_ROUNDS";
pub const SSH_KEY_COMMENT_ENV: &str = "PORTAL_SSH_KEY_COMMENT";
pub const FETCH_TIMEOUT_ENV: &str = "PORTAL_FETCH_TIMEOUT";

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Process-wide settings shared by every wizard render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default = "default_hash_rounds")]
    pub hash_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_comment: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_hash_rounds() -> u32 {
    DEFAULT_HASH_ROUNDS
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            hash_rounds: DEFAULT_HASH_ROUNDS,
            ssh_key_comment: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self {
            github_token: get(GITHUB_TOKEN_ENV),
            ssh_key_comment: get(SSH_KEY_COMMENT_ENV),
            ..Self::default()
        };
        if let Some(raw) = get(HASH_ROUNDS_ENV) {
            config.hash_rounds = parse_positive(HASH_ROUNDS_ENV, &raw)?;
        }
        if let Some(raw) = get(FETCH_TIMEOUT_ENV) {
            config.fetch_timeout_secs = parse_positive(FETCH_TIMEOUT_ENV, &raw)?;
        }
        Ok(config)
    }

    /// Parses a JSON config document; an empty document means defaults.
    pub fn from_json(config_json: &str) -> Result<Self, ConfigError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(config_json).map_err(ConfigError::Parse)?;
        config.ensure_positive()
    }

    fn ensure_positive(self) -> Result<Self, ConfigError> {
        if self.hash_rounds == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "hash_rounds",
                value: self.hash_rounds.to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "fetch_timeout_secs",
                value: self.fetch_timeout_secs.to_string(),
            });
        }
        Ok(self)
    }

    pub fn extensions(&self) -> ExtensionConfig {
        ExtensionConfig {
            hash_rounds: self.hash_rounds,
            ssh_key_comment: self.ssh_key_comment.clone(),
        }
    }

    pub fn renderer(&self) -> TemplateRenderer {
        TemplateRenderer::new(&self.extensions())
    }
}

fn parse_positive<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}
