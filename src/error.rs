//! Error types for dump scanning and auxiliary input

use std::path::PathBuf;

/// Failures that abort a run
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// I/O failure on one of our inputs or outputs
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dump line that is not a valid entity record
    #[error("Invalid entity record at {}:{line}: {message}", path.display())]
    DumpParse {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Result type for library operations that fail with [`ExtractError`]
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn dump_parse(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        Self::DumpParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
