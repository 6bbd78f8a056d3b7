//! Error types for filesplit

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filesplit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of a split job at which an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Configuration and source checks, before any worker starts
    Validation,
    /// Block extraction inside a worker
    Extraction,
    /// Size and digest checks after all parts are written
    Verification,
    /// Manifest encoding, decoding or persistence
    Manifest,
    /// Runtime failures unrelated to the data
    Internal,
}

/// Main error type for filesplit
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Source file missing or not a regular file
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Source exists but could not be read
    #[error("Cannot read source {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output directory could not be created
    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker hit a read or write failure
    #[error("Worker {worker} failed after block {}: {source}", fmt_block(.last_block))]
    Extraction {
        worker: usize,
        last_block: Option<u64>,
        #[source]
        source: std::io::Error,
    },

    /// A worker stopped because the job was cancelled
    #[error("Worker {worker} cancelled after block {}", fmt_block(.last_block))]
    Cancelled {
        worker: usize,
        last_block: Option<u64>,
    },

    /// A worker task panicked before returning
    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// A part file could not be read back during verification
    #[error("Cannot read part {file_name}: {source}")]
    PartUnreadable {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    /// Reconstructed content does not hash to the original digest
    #[error("Split verification failed for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// A single part no longer matches its recorded digest
    #[error("Part {order} ({file_name}) is corrupt: expected {expected}, got {actual}")]
    CorruptPart {
        order: u64,
        file_name: String,
        expected: String,
        actual: String,
    },

    /// Parts do not add up to the source size
    #[error("Size mismatch: source has {expected} bytes, parts hold {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_block(block: &Option<u64>) -> String {
    match block {
        Some(b) => b.to_string(),
        None => "none".to_string(),
    }
}

impl Error {
    /// The job stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_)
            | Error::InvalidConfig(_)
            | Error::SourceNotFound(_)
            | Error::SourceUnreadable { .. }
            | Error::OutputDir { .. } => Stage::Validation,
            Error::Extraction { .. } | Error::Cancelled { .. } | Error::WorkerPanicked { .. } => {
                Stage::Extraction
            }
            Error::IntegrityMismatch { .. }
            | Error::PartUnreadable { .. }
            | Error::CorruptPart { .. }
            | Error::SizeMismatch { .. } => Stage::Verification,
            Error::Serialization(_) | Error::Deserialization(_) => Stage::Manifest,
            Error::Io(_) | Error::Internal(_) => Stage::Internal,
        }
    }

    /// Index of the failing worker, if the error came from one
    pub fn worker(&self) -> Option<usize> {
        match self {
            Error::Extraction { worker, .. }
            | Error::Cancelled { worker, .. }
            | Error::WorkerPanicked { worker, .. } => Some(*worker),
            _ => None,
        }
    }

    /// Last block the failing worker wrote successfully
    pub fn last_block(&self) -> Option<u64> {
        match self {
            Error::Extraction { last_block, .. } | Error::Cancelled { last_block, .. } => {
                *last_block
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_context() {
        let err = Error::Extraction {
            worker: 2,
            last_block: Some(4),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"),
        };

        assert_eq!(err.stage(), Stage::Extraction);
        assert_eq!(err.worker(), Some(2));
        assert_eq!(err.last_block(), Some(4));
        assert_eq!(err.to_string(), "Worker 2 failed after block 4: truncated");
    }

    #[test]
    fn test_cancelled_before_first_block() {
        let err = Error::Cancelled {
            worker: 0,
            last_block: None,
        };
        assert_eq!(err.to_string(), "Worker 0 cancelled after block none");
    }

    #[test]
    fn test_worker_panic_keeps_index() {
        let err = Error::WorkerPanicked {
            worker: 5,
            message: "boom".into(),
        };
        assert_eq!(err.stage(), Stage::Extraction);
        assert_eq!(err.worker(), Some(5));
        assert_eq!(err.last_block(), None);
    }

    #[test]
    fn test_stages() {
        assert_eq!(
            Error::InvalidConfig("x".into()).stage(),
            Stage::Validation
        );
        assert_eq!(
            Error::SizeMismatch {
                expected: 1,
                actual: 0
            }
            .stage(),
            Stage::Verification
        );
        assert_eq!(Error::Serialization("x".into()).stage(), Stage::Manifest);
        assert_eq!(
            Error::PartUnreadable {
                file_name: "a.part".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .stage(),
            Stage::Verification
        );
        assert_eq!(Error::Internal("x".into()).worker(), None);
    }
}
