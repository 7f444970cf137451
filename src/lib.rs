mod dataset;
mod era5;
mod error;
mod loader;
mod store;
mod types;

#[cfg(test)]
mod test_support;

pub use dataset::{Era5Dataset, GridCube, CRS};
pub use era5::*;
pub use error::Era5Error;
pub use loader::{Backend, FallbackTrigger};

pub use store::{
    ArrayInfo, Attributes, ChunkReader, CoordinateValues, MemoryOpener, MemoryStore,
    StoreDataset, StoreError, StoreErrorKind, StoreOpener, ZarrOpener,
};

pub use types::extent::{BoundingBox, SpatialSelection};
pub use types::frequency::{MonthLabel, Resample};
pub use types::reducer::Reducer;
pub use types::time::{DayRange, Month, TimeSelection};
pub use types::variable::{ArcoVariable, Era5Variable};
