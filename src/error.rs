use crate::proxy::ProxyError;
use thiserror::Error;

/// Golden Gate application error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid route '{prefix}': {reason}")]
    InvalidRoute { prefix: String, reason: String },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),
}

impl Error {
    pub fn invalid_route(prefix: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidRoute {
            prefix: prefix.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_setting(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
