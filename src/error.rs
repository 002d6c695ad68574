use thiserror::Error;

#[cfg(feature = "config")]
use crate::config::ConfigError;

/// Boxed error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error raised by a host primitive, carrying the host's message text
/// (e.g. "Could not establish connection. Receiving end does not exist.").
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything that can go wrong while sending, receiving or wiring up the runtime.
#[derive(Error, Debug)]
pub enum MessagingError {
    /// The host primitive failed synchronously or its future rejected.
    #[error("host primitive failed: {0}")]
    Host(#[from] HostError),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode host response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("no active tab in the current window")]
    NoActiveTab,

    /// Neither a callback-style nor a promise-style host is available.
    #[error("no extension runtime host is available")]
    NoHost,

    #[error("action tags must not be empty")]
    EmptyAction,

    #[error("action `{0}` is already registered")]
    DuplicateAction(String),

    #[error("messaging runtime is already installed")]
    AlreadyInstalled,

    #[error("messaging runtime has not been installed")]
    NotInstalled,

    #[cfg(feature = "config")]
    #[error("invalid messaging config: {0}")]
    Config(#[from] ConfigError),
}
