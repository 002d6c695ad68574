//! Registry configuration, optionally loaded from TOML.
//!
//! ```toml
//! # messaging.toml
//! action_key = "type"
//! multi_match = "last-registered"
//! ```

use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use std::{fs, io, path::Path};

/// Which reply wins when several subscriptions match one envelope and respond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiMatchPolicy {
    #[default]
    FirstRegistered,
    LastRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessagingConfig {
    /// Field of `data` that [`ActionMap`](crate::ActionMap) dispatches on.
    pub action_key: String,
    pub multi_match: MultiMatchPolicy,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            action_key: "action".to_string(),
            multi_match: MultiMatchPolicy::default(),
        }
    }
}

#[cfg(feature = "config")]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(feature = "config")]
impl MessagingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
