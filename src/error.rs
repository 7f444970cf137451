use crate::loader::FallbackTrigger;
use crate::store::StoreError;
use crate::types::time::DayRange;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Era5Error {
    #[error("var must be one of [{valid}] (got {given})")]
    UnknownVariable { given: String, valid: String },

    #[error("Invalid time selection: {0}")]
    InvalidTime(String),

    #[error("Invalid resample frequency '{token}': {reason}")]
    InvalidResample { token: String, reason: String },

    #[error("Invalid spatial extent: {0}")]
    InvalidExtent(String),

    // Not a fallback trigger: the request itself cannot be interpreted
    #[error("Store {url} has both 'time0' and 'time1' dimensions, cannot pick a time axis")]
    AmbiguousTimeDimension { url: String },

    // Unreachable from a validated request: every day range touches a month
    #[error("Nothing was planned for {days}")]
    NothingPlanned { days: DayRange },

    #[error("Primary store failed ({primary}) and fallback store failed as well")]
    AllBackendsFailed {
        primary: Box<FallbackTrigger>,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed building DataFrame")]
    Polars(#[from] PolarsError),

    #[error("Materialized data does not fit the planned grid")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
