use selfheal_async_utils::Abandoned;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the oracle.
///
/// Cloneable because one settled resolution is handed to every caller that
/// was waiting on the same stale identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No credential or endpoint is configured. Callers should treat this as
    /// fatal: continuing would silently skip every resolution.
    #[error("oracle unavailable: {reason}")]
    Unavailable { reason: String },

    /// Transport error, non-success status, or a reply we could not read.
    #[error("oracle call failed: {0}")]
    CallFailed(String),

    /// The task driving the resolution was dropped before it settled.
    #[error("oracle resolution was abandoned before it settled")]
    Abandoned,
}

impl From<Abandoned> for OracleError {
    fn from(_: Abandoned) -> Self {
        OracleError::Abandoned
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::CallFailed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("element `{resolved}` not found (requested `{requested}`)")]
    ElementNotFound { requested: String, resolved: String },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid identifier mapping: {0}")]
    Mapping(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T, E = LocateError> = std::result::Result<T, E>;
