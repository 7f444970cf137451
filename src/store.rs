//! Access to cloud-hosted Zarr stores.
//!
//! A store is opened by URL through a [`StoreOpener`]. Opening reads the
//! consolidated metadata and every coordinate array eagerly; data variables
//! stay behind a [`ChunkReader`] until a dataset is collected.

mod cf_time;
mod error;
mod memory;
mod metadata;
mod zarr;

pub use error::{StoreError, StoreErrorKind};
pub use memory::{MemoryOpener, MemoryStore};
pub use zarr::ZarrOpener;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Dataset- or variable-level attributes, as stored in `.zattrs`.
pub type Attributes = serde_json::Map<String, Value>;

/// Decoded values of a 1-D coordinate array.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateValues {
    Numeric(Vec<f64>),
    /// CF-encoded time, decoded to naive UTC.
    Time(Vec<NaiveDateTime>),
}

impl CoordinateValues {
    pub fn len(&self) -> usize {
        match self {
            CoordinateValues::Numeric(v) => v.len(),
            CoordinateValues::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape, dimension names and attributes of one array in a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<u64>,
    pub attributes: Attributes,
    /// The array's own `fill_value`, if it is numeric (or NaN).
    pub fill_value: Option<f64>,
}

impl ArrayInfo {
    /// Position of `dim` in this array's dimension order.
    pub fn axis(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Every value that marks a missing sample: the array fill value plus the
    /// CF `_FillValue` and `missing_value` attributes.
    pub fn missing_values(&self) -> Vec<f32> {
        let mut values: Vec<f32> = Vec::new();
        let mut push = |v: f64| {
            let v = v as f32;
            if !v.is_nan() && !values.contains(&v) {
                values.push(v);
            }
        };
        if let Some(fill) = self.fill_value {
            push(fill);
        }
        for key in ["_FillValue", "missing_value"] {
            match self.attributes.get(key) {
                Some(Value::Number(n)) => {
                    if let Some(v) = n.as_f64() {
                        push(v)
                    }
                }
                Some(Value::Array(items)) => {
                    items.iter().filter_map(Value::as_f64).for_each(&mut push)
                }
                _ => {}
            }
        }
        values
    }
}

/// Lazy access to the data variables of an opened store.
#[async_trait]
pub trait ChunkReader: Send + Sync {
    /// Reads the hyper-rectangle `ranges` (one range per dimension, in the
    /// array's own dimension order) and returns it flattened in C order.
    async fn read(&self, array: &str, ranges: &[Range<u64>]) -> Result<Vec<f32>, StoreError>;
}

/// An opened store: metadata and coordinates in memory, data behind a reader.
#[derive(Clone)]
pub struct StoreDataset {
    url: String,
    attributes: Attributes,
    arrays: BTreeMap<String, ArrayInfo>,
    coordinates: BTreeMap<String, CoordinateValues>,
    reader: Arc<dyn ChunkReader>,
}

impl StoreDataset {
    pub fn new(
        url: impl Into<String>,
        attributes: Attributes,
        arrays: BTreeMap<String, ArrayInfo>,
        coordinates: BTreeMap<String, CoordinateValues>,
        reader: Arc<dyn ChunkReader>,
    ) -> Self {
        Self {
            url: url.into(),
            attributes,
            arrays,
            coordinates,
            reader,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn array(&self, name: &str) -> Result<&ArrayInfo, StoreError> {
        self.arrays.get(name).ok_or_else(|| StoreError::MissingArray {
            url: self.url.clone(),
            array: name.to_string(),
        })
    }

    pub fn arrays(&self) -> impl Iterator<Item = &ArrayInfo> {
        self.arrays.values()
    }

    /// Whether any array in the store is laid out along `dim`.
    pub fn has_dimension(&self, dim: &str) -> bool {
        self.arrays
            .values()
            .any(|array| array.dims.iter().any(|d| d == dim))
    }

    pub fn numeric_coordinate(&self, name: &str) -> Result<&[f64], StoreError> {
        match self.coordinates.get(name) {
            Some(CoordinateValues::Numeric(values)) => Ok(values),
            _ => Err(self.missing_coordinate(name)),
        }
    }

    pub fn time_coordinate(&self, name: &str) -> Result<&[NaiveDateTime], StoreError> {
        match self.coordinates.get(name) {
            Some(CoordinateValues::Time(values)) => Ok(values),
            _ => Err(self.missing_coordinate(name)),
        }
    }

    pub fn reader(&self) -> Arc<dyn ChunkReader> {
        Arc::clone(&self.reader)
    }

    fn missing_coordinate(&self, name: &str) -> StoreError {
        StoreError::MissingCoordinate {
            url: self.url.clone(),
            name: name.to_string(),
        }
    }
}

impl fmt::Debug for StoreDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreDataset")
            .field("url", &self.url)
            .field("arrays", &self.arrays.keys().collect::<Vec<_>>())
            .field("coordinates", &self.coordinates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Opens a store by URL.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<StoreDataset, StoreError>;
}
