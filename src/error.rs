//! Error types for loading inputs and talking to the vocabulary service
//!
//! Loading errors are fatal for a run. API errors are caught by the sync
//! driver and turned into bad entries; they never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for input loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for vocabulary service calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures while reading the prefix map, term CSVs or the external ontology
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be opened or read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV record could not be decoded
    #[error("malformed CSV in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required CSV column is absent from the header row
    #[error("'{path}' is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// Directory traversal failed
    #[error("failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Ontology file is syntactically invalid
    #[error("invalid ontology '{path}': {source}")]
    Ontology {
        path: PathBuf,
        #[source]
        source: OboError,
    },
}

/// OBO flat-file errors
#[derive(Debug, Error)]
pub enum OboError {
    /// The document does not follow the OBO 1.4 grammar
    #[error("{0}")]
    Parse(#[from] fastobo::error::Error),
}

/// Failures talking to the vocabulary service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced an HTTP response
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Listing endpoint answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Base URL or term ID did not form a valid request URL
    #[error("invalid request url '{0}'")]
    InvalidUrl(String),
}
