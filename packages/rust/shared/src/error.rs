//! Error types for modbind.
//!
//! Library crates use [`ModbindError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all modbind operations.
#[derive(Debug, thiserror::Error)]
pub enum ModbindError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Credential or page-context probing failed.
    #[error("credential error: {message}")]
    Credential { message: String },

    /// Module traversal failed (resolver or page metadata lookup).
    #[error("traversal error: {message}")]
    Traversal { message: String },

    /// Retrieval of a single page from the content service failed.
    #[error("fetch error for page {page_id}: {message}")]
    Fetch { page_id: String, message: String },

    /// A cross-context message could not be delivered.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Merging fetched documents into one failed.
    #[error("assembly error: {message}")]
    Assembly { message: String },

    /// Transport-level HTTP error.
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected JSON or HTML shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The crawl was cancelled before it finished.
    #[error("crawl cancelled")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ModbindError>;

impl ModbindError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a credential error from any displayable message.
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential {
            message: msg.into(),
        }
    }

    /// Create a traversal error from any displayable message.
    pub fn traversal(msg: impl Into<String>) -> Self {
        Self::Traversal {
            message: msg.into(),
        }
    }

    /// Create a fetch error for the given page id.
    pub fn fetch(page_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            page_id: page_id.into(),
            message: msg.into(),
        }
    }

    /// Create an assembly error from any displayable message.
    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Re-tag a transport or shape error as a traversal failure.
    ///
    /// Errors that already carry a traversal tag pass through unchanged.
    pub fn into_traversal(self) -> Self {
        match self {
            Self::Traversal { .. } | Self::Cancelled => self,
            other => Self::traversal(other.to_string()),
        }
    }

    /// Re-tag a transport or shape error as a fetch failure for `page_id`.
    pub fn into_fetch(self, page_id: &str) -> Self {
        match self {
            Self::Fetch { .. } | Self::Cancelled => self,
            other => Self::fetch(page_id, other.to_string()),
        }
    }
}
