//! Error Types
//!
//! Most failure modes in the framework degrade silently: an
//! unknown route renders the not-found markup, an unregistered component is
//! left alone and a missing state value renders as empty text. The errors
//! below are the cases a caller can act on.

use thiserror::Error;

/// Failure reported by a lazy route loader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the framework.
#[derive(Debug, Error)]
pub enum Error {
    /// The mount element is not in the document.
    #[error("mount element #{0} not found")]
    MountNotFound(String),

    /// A lazy route's loader failed. The mount is left showing the loading markup.
    #[error("failed to load route '{route}': {source}")]
    RouteLoad {
        route: String,
        #[source]
        source: LoadError,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
