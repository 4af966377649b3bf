use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the search, pairing and carving phases.
///
/// Validation outcomes are not errors; they are reported through
/// [`AnalysisResult`](crate::types::AnalysisResult).
#[derive(Error, Debug)]
pub enum ScoopError {
    #[error("Pattern syntax error in {pattern:?} at position {position}: {message}")]
    PatternSyntax {
        pattern: String,
        position: usize,
        message: String,
    },

    #[error("Failed to open input {path:?}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid chunk size {0}: must be greater than zero")]
    InvalidChunkSize(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ScoopError {
    pub fn pattern_syntax(pattern: &str, position: usize, message: impl Into<String>) -> Self {
        Self::PatternSyntax {
            pattern: pattern.to_string(),
            position,
            message: message.into(),
        }
    }

    pub fn directory_create(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_syntax_display() {
        let err = ScoopError::pattern_syntax(r"(\x0a", 0, "unbalanced '('");
        let msg = err.to_string();
        assert!(msg.contains("unbalanced"));
        assert!(msg.contains("position 0"));
    }

    #[test]
    fn test_directory_create_keeps_source() {
        let err = ScoopError::directory_create(
            "/nope",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/nope"));
    }
}
