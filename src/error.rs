//! Unified error types for vetbot.
//!
//! Library code (`vetbot::analysis`, `vetbot::collab`) uses `Error` and
//! `Result<T>`. Binary code (`vet-bot`, `track-bot`) uses `anyhow` for
//! ergonomic CLI error handling, converting via the blanket `From<Error>`
//! impl `anyhow::Error` already provides.

use thiserror::Error as ThisError;

/// Unified error type for vetbot library operations.
///
/// Variants line up with the error kinds named in §7. `Parse` and
/// `TypeCheck` are per-file/per-package and are meant to be caught and
/// logged by the pipeline rather than propagated to the caller; see
/// `analysis::pipeline` for where that happens.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Missing required option or malformed accept-list; fatal at startup.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Accept-list document failed to parse.
    #[error("failed to parse accept-list: {0}")]
    AcceptListParse(#[from] serde_yaml::Error),

    /// Syntax or declaration error in a single source file.
    ///
    /// Per §7 this is not fatal: the file is skipped and the
    /// package continues.
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// Hard type-check error that aborts a package (soft errors are logged
    /// and ignored, never represented as this variant).
    #[error("type-check error in package {package}: {message}")]
    TypeCheck { package: String, message: String },

    /// Unexpected internal failure in a single analyzer.
    #[error("analyzer `{analyzer}` failed: {message}")]
    Analyzer { analyzer: String, message: String },

    /// Network, HTTP status, decompression, or malformed archive failure
    /// while fetching a repository tarball.
    #[error("fetch error for {owner}/{repo}: {message}")]
    Fetch {
        owner: String,
        repo: String,
        message: String,
    },

    /// GitHub API request failed.
    #[error("github api error: {0}")]
    GitHub(String),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with attached context.
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// Generic error for other cases.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn type_check(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeCheck {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn analyzer(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analyzer {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }

    pub fn fetch(
        owner: impl Into<String>,
        repo: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            owner: owner.into(),
            repo: repo.into(),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias for vetbot library operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::other(err.to_string())
    }
}
