use std::fmt;
use thiserror::Error;

/// Coarse classification of a store failure, reported alongside a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// The store or one of its keys does not exist (or is not readable anonymously).
    NotFound,
    /// The store exists but does not look like the expected ERA5 layout.
    SchemaMismatch,
    /// Transport failure or an unexpected HTTP status.
    Network,
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreErrorKind::NotFound => "not-found",
            StoreErrorKind::SchemaMismatch => "schema-mismatch",
            StoreErrorKind::Network => "network",
            StoreErrorKind::Other => "other",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Store {url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("No store found at {0}")]
    NotFound(String),

    #[error("Failed to parse consolidated metadata of {0}")]
    MetadataParse(String, #[source] serde_json::Error),

    #[error("Invalid metadata in {url}: {message}")]
    InvalidMetadata { url: String, message: String },

    #[error("Store {url} has no array '{array}'")]
    MissingArray { url: String, array: String },

    #[error("Store {url} has no usable coordinate '{name}'")]
    MissingCoordinate { url: String, name: String },

    #[error("Store {url} has none of the dimensions [{expected}]")]
    MissingDimension { url: String, expected: String },

    #[error("Array '{array}' in {url} has dimensions {dims:?}, expected time, latitude and longitude")]
    UnexpectedDimensions {
        url: String,
        array: String,
        dims: Vec<String>,
    },

    #[error("Grid of {url} differs from the grid resolved for earlier months")]
    GridMismatch { url: String },

    #[error("Selection on axis '{axis}' of {url} is empty")]
    EmptySelection { url: String, axis: String },

    #[error("Zarr access failed for {url}: {message}")]
    ZarrAccess { url: String, message: String },

    #[error("Read of '{array}' in {url} returned {found} values, expected {expected}")]
    ShortRead {
        url: String,
        array: String,
        expected: usize,
        found: usize,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::NetworkRequest(..) | StoreError::Unreachable { .. } => {
                StoreErrorKind::Network
            }
            StoreError::HttpStatus { status, .. } => {
                if *status == reqwest::StatusCode::NOT_FOUND
                    || *status == reqwest::StatusCode::FORBIDDEN
                {
                    StoreErrorKind::NotFound
                } else {
                    StoreErrorKind::Network
                }
            }
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::MetadataParse(..)
            | StoreError::InvalidMetadata { .. }
            | StoreError::MissingArray { .. }
            | StoreError::MissingCoordinate { .. }
            | StoreError::MissingDimension { .. }
            | StoreError::UnexpectedDimensions { .. }
            | StoreError::GridMismatch { .. } => StoreErrorKind::SchemaMismatch,
            StoreError::EmptySelection { .. }
            | StoreError::ZarrAccess { .. }
            | StoreError::ShortRead { .. }
            | StoreError::TaskJoin(_) => StoreErrorKind::Other,
        }
    }
}
