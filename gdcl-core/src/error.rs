use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving groups and streaming dictionary sources.
///
/// `CorruptArchive` and `EncodingError` are per-file: the session reports
/// them and continues with the rest of the group. The others abort the
/// session before any output is produced.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("corrupt archive {path}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("undecodable {encoding} data in {path}")]
    EncodingError { path: PathBuf, encoding: &'static str },

    #[error("group [{0}] not found")]
    GroupNotFound(String),

    #[error("empty search keyword")]
    EmptyQuery,

    #[error("invalid markup pattern {pattern:?}: {source}")]
    BadMarkupPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid search pattern {pattern:?}: {source}")]
    BadQueryPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DslError {
    /// Per-file failures are reported and skipped; everything else ends the
    /// session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DslError::CorruptArchive { .. } | DslError::EncodingError { .. }
        )
    }
}
