//! In-memory stores, keyed by URL.

use crate::store::{
    ArrayInfo, Attributes, ChunkReader, CoordinateValues, StoreDataset, StoreError,
    StoreErrorKind, StoreOpener,
};
use async_trait::async_trait;
use ndarray::{ArrayD, Slice};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::{Arc, Mutex};

/// A complete store held in memory: attributes, coordinates and data arrays.
///
/// # Examples
///
/// ```
/// use era5::{CoordinateValues, MemoryStore};
/// use ndarray::ArrayD;
///
/// let store = MemoryStore::new()
///     .with_attribute("institution", "ECMWF")
///     .with_coordinate("lat", CoordinateValues::Numeric(vec![10.0, 0.0]))
///     .with_array("t2m", &["lat"], ArrayD::from_shape_vec(vec![2], vec![280.0, 290.0]).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    attributes: Attributes,
    arrays: BTreeMap<String, ArrayInfo>,
    coordinates: BTreeMap<String, CoordinateValues>,
    data: HashMap<String, Arc<ArrayD<f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Adds a 1-D coordinate array named after its own dimension.
    pub fn with_coordinate(mut self, name: &str, values: CoordinateValues) -> Self {
        self.arrays.insert(
            name.to_string(),
            ArrayInfo {
                name: name.to_string(),
                dims: vec![name.to_string()],
                shape: vec![values.len() as u64],
                attributes: Attributes::new(),
                fill_value: None,
            },
        );
        self.coordinates.insert(name.to_string(), values);
        self
    }

    pub fn with_array(self, name: &str, dims: &[&str], data: ArrayD<f32>) -> Self {
        self.with_array_attributes(name, dims, data, Attributes::new())
    }

    pub fn with_array_attributes(
        mut self,
        name: &str,
        dims: &[&str],
        data: ArrayD<f32>,
        attributes: Attributes,
    ) -> Self {
        self.arrays.insert(
            name.to_string(),
            ArrayInfo {
                name: name.to_string(),
                dims: dims.iter().map(|d| d.to_string()).collect(),
                shape: data.shape().iter().map(|&n| n as u64).collect(),
                attributes,
                fill_value: Some(f64::NAN),
            },
        );
        self.data.insert(name.to_string(), Arc::new(data));
        self
    }
}

#[derive(Debug)]
struct MemoryReader {
    url: String,
    data: HashMap<String, Arc<ArrayD<f32>>>,
}

#[async_trait]
impl ChunkReader for MemoryReader {
    async fn read(&self, array: &str, ranges: &[Range<u64>]) -> Result<Vec<f32>, StoreError> {
        let data = self.data.get(array).ok_or_else(|| StoreError::MissingArray {
            url: self.url.clone(),
            array: array.to_string(),
        })?;
        if ranges.len() != data.ndim()
            || ranges
                .iter()
                .zip(data.shape())
                .any(|(range, &len)| range.start > range.end || range.end > len as u64)
        {
            return Err(StoreError::ZarrAccess {
                url: self.url.clone(),
                message: format!("subset {ranges:?} out of bounds for {:?}", data.shape()),
            });
        }
        let view = data.slice_each_axis(|axis| {
            let range = &ranges[axis.axis.index()];
            Slice::from(range.start as usize..range.end as usize)
        });
        Ok(view.iter().copied().collect())
    }
}

/// A [`StoreOpener`] serving [`MemoryStore`]s, for tests, benchmarks and demos.
///
/// Unknown URLs fail as not-found; URLs registered with
/// [`MemoryOpener::with_failure`] fail with the given kind. Every attempted
/// open is recorded.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    stores: HashMap<String, MemoryStore>,
    failures: HashMap<String, StoreErrorKind>,
    opened: Mutex<Vec<String>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, url: impl Into<String>, store: MemoryStore) -> Self {
        self.stores.insert(url.into(), store);
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, kind: StoreErrorKind) -> Self {
        self.failures.insert(url.into(), kind);
        self
    }

    /// URLs passed to [`StoreOpener::open`], in call order.
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl StoreOpener for MemoryOpener {
    async fn open(&self, url: &str) -> Result<StoreDataset, StoreError> {
        match self.opened.lock() {
            Ok(mut urls) => urls.push(url.to_string()),
            Err(poisoned) => poisoned.into_inner().push(url.to_string()),
        }
        if let Some(kind) = self.failures.get(url) {
            return Err(synthetic_failure(url, *kind));
        }
        let store = self
            .stores
            .get(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        let reader = Arc::new(MemoryReader {
            url: url.to_string(),
            data: store.data.clone(),
        });
        Ok(StoreDataset::new(
            url,
            store.attributes.clone(),
            store.arrays.clone(),
            store.coordinates.clone(),
            reader,
        ))
    }
}

fn synthetic_failure(url: &str, kind: StoreErrorKind) -> StoreError {
    match kind {
        StoreErrorKind::NotFound => StoreError::NotFound(url.to_string()),
        StoreErrorKind::SchemaMismatch => StoreError::InvalidMetadata {
            url: url.to_string(),
            message: "unexpected layout".to_string(),
        },
        StoreErrorKind::Network => StoreError::Unreachable {
            url: url.to_string(),
            message: "simulated network failure".to_string(),
        },
        StoreErrorKind::Other => StoreError::ZarrAccess {
            url: url.to_string(),
            message: "simulated failure".to_string(),
        },
    }
}
