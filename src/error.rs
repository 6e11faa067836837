use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::ServiceError;

/// Fatal errors: any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Export service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Export job {job_id} produced no artifact after {attempts} status checks")]
    PollLimitExceeded { job_id: String, attempts: u32 },

    #[error("Archive {archive} is unreadable: {reason}")]
    Archive { archive: String, reason: String },

    #[error("Staging error at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a script or stylesheet could not be minified.
///
/// Every variant is recovered by copying the original file verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MinifyError {
    #[error("not valid UTF-8")]
    Encoding,

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("printer error: {0}")]
    Printer(String),

    #[error("minifier produced empty output")]
    Empty,
}

/// A true I/O failure while writing a file into the output tree.
///
/// Distinct from [`MinifyError`]: this one means the destination may be missing.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
