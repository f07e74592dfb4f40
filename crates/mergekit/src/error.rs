//! Error types for merge jobs.
//!
//! Every error belongs to one of three kinds: I/O, configuration or merge.
//! None of them are retried; the kind only drives what the user is told.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a merge failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source, target or temporary file could not be read or written
    Io,
    /// The control properties or the job definition are unusable
    Configuration,
    /// The engine could not combine the sources
    Merge,
}

impl ErrorKind {
    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Io => "File access failed",
            Self::Configuration => "Invalid merge configuration",
            Self::Merge => "Sources could not be merged",
        }
    }

    /// Get actionable advice for resolving this error kind.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Io => "Check that every source exists and the target directory is writable",
            Self::Configuration => "Fix the properties file or the job definition and run again",
            Self::Merge => "Check that the sources are well-formed XML with the same root element",
        }
    }
}

/// Errors that can occur while running a merge job.
#[derive(Debug, Error)]
pub enum Error {
    /// A source file could not be opened for reading
    #[error("cannot open source {}: {source}", .path.display())]
    SourceOpen {
        /// Path of the source that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A source file failed while being read
    #[error("cannot read source {}: {source}", .path.display())]
    SourceRead {
        /// Path of the source being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The target (or its staging file) could not be written
    #[error("cannot write target {}: {source}", .path.display())]
    TargetWrite {
        /// Path of the target being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The merged stream could not be read back from the engine
    #[error("cannot read merged output for {}: {source}", .path.display())]
    ResultRead {
        /// Path of the target being produced
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The control properties file could not be read
    #[error("cannot read properties {}: {source}", .path.display())]
    PropertiesRead {
        /// Path of the properties file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The control properties file is malformed
    #[error("invalid properties at line {line}: {message}")]
    PropertiesParse {
        /// Line number where the parse error occurred (1-indexed)
        line: usize,
        /// Description of the syntax error
        message: String,
    },

    /// The engine rejected a merge directive
    #[error("invalid directive `{key}`: {message}")]
    InvalidDirective {
        /// The property key carrying the directive
        key: String,
        /// Why the engine rejected it
        message: String,
    },

    /// A job was defined without any source files
    #[error("merge job for {} has no sources", .target.display())]
    NoSources {
        /// Target of the offending job
        target: PathBuf,
    },

    /// A source is not well-formed XML
    #[error("malformed XML in {}: {message}", .path.display())]
    Xml {
        /// Source file at fault
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The engine could not combine the sources
    #[error("merge failed: {0}")]
    Merge(String),
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SourceOpen { .. }
            | Error::SourceRead { .. }
            | Error::TargetWrite { .. }
            | Error::ResultRead { .. } => ErrorKind::Io,
            Error::PropertiesRead { .. }
            | Error::PropertiesParse { .. }
            | Error::InvalidDirective { .. }
            | Error::NoSources { .. } => ErrorKind::Configuration,
            Error::Xml { .. } | Error::Merge(_) => ErrorKind::Merge,
        }
    }

    /// Shorthand for an invalid directive error.
    pub fn directive(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidDirective {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_io() {
        let err = Error::SourceOpen {
            path: PathBuf::from("a.xml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("a.xml"));
    }

    #[test]
    fn test_kind_configuration() {
        let err = Error::directive("/root", "unknown action");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "invalid directive `/root`: unknown action");

        let err = Error::NoSources {
            target: PathBuf::from("out.xml"),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_kind_merge() {
        let err = Error::Merge("root mismatch".to_string());
        assert_eq!(err.kind(), ErrorKind::Merge);
        assert!(!err.kind().advice().is_empty());
    }
}
