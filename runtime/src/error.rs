//! Failure taxonomy for price acquisition.

use crate::price::ParseError;
use serde::Serialize;

/// Errors raised while acquiring prices.
///
/// `NavigationTimeout`, `NotFound` and `Parse` are recovered inside the per-product
/// retry loop. `SessionInit` is fatal to a run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquireError {
    #[error("page {url} did not become ready: {detail}")]
    NavigationTimeout { url: String, detail: String },

    #[error("no extraction strategy matched a price element")]
    NotFound,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("browser session could not be started: {0}")]
    SessionInit(String),
}

impl AcquireError {
    /// Kind of a recoverable failure; `None` for session-level errors.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::NavigationTimeout { .. } => Some(FailureKind::NavigationTimeout),
            Self::NotFound => Some(FailureKind::NotFound),
            Self::Parse(_) => Some(FailureKind::ParseError),
            Self::SessionInit(_) => None,
        }
    }
}

/// Per-product failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NavigationTimeout,
    NotFound,
    ParseError,
}

/// Errors raised by the observation store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("product {0:?} is not registered")]
    UnknownProduct(String),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors raised while loading or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog is empty")]
    Empty,

    #[error("duplicate product key {0:?}")]
    DuplicateKey(String),

    #[error("duplicate product name {0:?}")]
    DuplicateName(String),

    #[error("product {key:?} has an invalid URL {url:?}: {reason}")]
    InvalidUrl {
        key: String,
        url: String,
        reason: String,
    },
}
