/// Error types for the ingestion engine and case store.
use crate::model::{CaseObject, ImageId, ObjectId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Why a source path failed pre-flight validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The path does not exist (or cannot even be stat'ed).
    Missing,
    /// The path exists but cannot be opened or listed.
    Unreadable,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("does not exist"),
            Self::Unreadable => f.write_str("is not readable"),
        }
    }
}

/// Errors reported by a [`CaseStore`](crate::store::CaseStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// No object with this identity exists in the case.
    #[error("Object not found: {0}")]
    NotFound(ObjectId),

    /// No image with this identity is registered in the case.
    #[error("Unknown image: {0}")]
    UnknownImage(ImageId),

    /// Snapshot I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialisation failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure reported by an external store.
    #[error("Case store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors reported by the ingestion engine.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The engine was closed and no longer holds a case store.
    #[error("Attempted to use the ingestion engine after it was closed")]
    EngineClosed,

    /// A source path failed validation before anything was created.
    #[error("Local file or directory {} {reason}; nothing was added", path.display())]
    ValidationFailed {
        path: PathBuf,
        reason: ValidationFailure,
    },

    /// The case store rejected or failed a call.
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// The source filesystem failed while a tree was being mirrored.
    #[error("Error reading {}: {source}", path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A root could not be fully added after validation passed.
    ///
    /// `added` holds the roots created earlier in the same call. Objects
    /// created for `path` before the failure also remain in the store.
    #[error("Local file or directory {} could not be added ({} earlier root(s) were added)", path.display(), added.len())]
    PartialCreationFailure {
        path: PathBuf,
        added: Vec<CaseObject>,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Wrap a store error with context.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// `true` if the failure happened before any object was created.
    pub fn nothing_added(&self) -> bool {
        matches!(self, Self::EngineClosed | Self::ValidationFailed { .. })
    }
}

/// Errors loading an [`IngestConfig`](crate::config::IngestConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
