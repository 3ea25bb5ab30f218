use thiserror::Error;

use crate::descriptor::PluginKind;

/// Failure to load a plugin module
///
/// Never fatal: the registry records it and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoadError {
    #[error("No module at {0}")]
    NotFound(String),

    #[error("Invalid plugin locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Failed to load {locator}: {reason}")]
    Failed { locator: String, reason: String },
}

impl LoadError {
    pub fn failed(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        LoadError::Failed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("{kind} plugin '{name}' is not loaded")]
    NotLoaded { name: String, kind: PluginKind },

    #[error("Plugin '{0}' requires an open document")]
    RequiresDocument(String),
}

pub type PluginResult<T> = Result<T, PluginError>;
