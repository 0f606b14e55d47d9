//! Error types for flowviz-core
//!
//! Only programmer-error-class inputs surface here (bad field names,
//! self-referential field pairs, invalid catalogs). Data-dependent
//! conditions degrade gracefully and are reported through
//! `DataQualityReport` and `DiagramStatus` instead.

use thiserror::Error;

/// Main error type for flowviz-core
#[derive(Error, Debug)]
pub enum Error {
    /// Field name not present in the catalog
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Source and target field are the same
    #[error("Field pair must use two different fields, got {0} twice")]
    SelfPairing(String),

    /// Catalog definition is invalid
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Record snapshot could not be read
    #[error("Records error: {0}")]
    Records(String),

    /// Command sent to a display service that has already stopped
    #[error("Display service stopped")]
    ServiceStopped,

    /// Shared-library error (config, I/O in common)
    #[error(transparent)]
    Common(#[from] flowviz_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using flowviz-core Error
pub type Result<T> = std::result::Result<T, Error>;
