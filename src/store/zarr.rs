//! Anonymous HTTP access to public Zarr v2 stores.
//!
//! Consolidated metadata is fetched with `reqwest`; chunk reads go through
//! `zarrs` on top of an `object_store` HTTP store, bridged to the sync
//! `zarrs` API on a blocking thread.

use crate::store::cf_time::CfTimeUnits;
use crate::store::metadata::ConsolidatedMetadata;
use crate::store::{
    ArrayInfo, ChunkReader, CoordinateValues, StoreDataset, StoreError, StoreOpener,
};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
// The HTTP store type must come from the object_store release zarrs_object_store is built on
use zarrs_object_store::object_store::http::{HttpBuilder, HttpStore};
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

/// Drives async storage requests from the blocking thread a read runs on.
#[derive(Clone)]
struct HandleBlockOn(Handle);

impl AsyncToSyncBlockOn for HandleBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        self.0.block_on(future)
    }
}

type HttpStorage = AsyncToSyncStorageAdapter<AsyncObjectStore<HttpStore>, HandleBlockOn>;

/// Opens stores over anonymous HTTP(S).
///
/// The URL is the store root, e.g.
/// `https://era5-pds.s3.us-east-1.amazonaws.com/zarr/2021/06/data/air_temperature_at_2_metres.zarr`.
#[derive(Debug, Clone, Default)]
pub struct ZarrOpener {
    client: Client,
}

impl ZarrOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_metadata(&self, url: &str) -> Result<ConsolidatedMetadata, StoreError> {
        let metadata_url = format!("{url}/.zmetadata");
        let response = self
            .client
            .get(&metadata_url)
            .send()
            .await
            .map_err(|e| StoreError::NetworkRequest(metadata_url.clone(), e))?;

        let status = response.status();
        let response = response
            .error_for_status()
            .map_err(|e| StoreError::HttpStatus {
                url: metadata_url.clone(),
                status,
                source: e,
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::NetworkRequest(metadata_url.clone(), e))?;
        ConsolidatedMetadata::parse(url, &bytes)
    }
}

#[async_trait]
impl StoreOpener for ZarrOpener {
    async fn open(&self, url: &str) -> Result<StoreDataset, StoreError> {
        let url = url.trim_end_matches('/');
        let metadata = self.fetch_metadata(url).await?;
        debug!(
            "Consolidated metadata for {url} lists {} arrays",
            metadata.arrays.len()
        );

        let reader = Arc::new(ZarrReader::new(url)?);
        let mut coordinates = BTreeMap::new();
        for name in metadata.coordinate_names() {
            let info = &metadata.arrays[name];
            let length = info.shape[0];
            let values = reader.read_f64(name, &[0..length]).await?;
            coordinates.insert(name.to_string(), decode_coordinate(url, info, values)?);
        }
        info!(
            "Opened {url} ({} coordinates read eagerly)",
            coordinates.len()
        );

        Ok(StoreDataset::new(
            url,
            metadata.attributes,
            metadata.arrays,
            coordinates,
            reader,
        ))
    }
}

fn decode_coordinate(
    url: &str,
    info: &ArrayInfo,
    values: Vec<f64>,
) -> Result<CoordinateValues, StoreError> {
    let units = info.attributes.get("units").and_then(Value::as_str);
    let Some(units) = units.and_then(CfTimeUnits::parse) else {
        return Ok(CoordinateValues::Numeric(values));
    };
    values
        .into_iter()
        .map(|v| units.decode(v))
        .collect::<Option<Vec<_>>>()
        .map(CoordinateValues::Time)
        .ok_or_else(|| StoreError::InvalidMetadata {
            url: url.to_string(),
            message: format!("time coordinate '{}' holds undecodable values", info.name),
        })
}

/// Values opened once per key and shared afterwards.
struct OpenCache<T> {
    entries: Mutex<HashMap<String, Arc<T>>>,
}

impl<T> OpenCache<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_open<E>(
        &self,
        key: &str,
        open: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let cached = match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        };
        if let Some(value) = cached {
            return Ok(value);
        }
        let value = Arc::new(open()?);
        match self.entries.lock() {
            Ok(mut entries) => entries.insert(key.to_string(), Arc::clone(&value)),
            Err(poisoned) => poisoned
                .into_inner()
                .insert(key.to_string(), Arc::clone(&value)),
        };
        Ok(value)
    }
}

type ArrayCache = OpenCache<Array<HttpStorage>>;

struct ZarrReader {
    url: String,
    storage: Arc<HttpStorage>,
    arrays: Arc<ArrayCache>,
}

impl ZarrReader {
    fn new(url: &str) -> Result<Self, StoreError> {
        let http = HttpBuilder::new()
            .with_url(url)
            .build()
            .map_err(|e| StoreError::ZarrAccess {
                url: url.to_string(),
                message: format!("Failed to create HTTP store: {e}"),
            })?;
        let async_store = Arc::new(AsyncObjectStore::new(http));
        let storage = AsyncToSyncStorageAdapter::new(async_store, HandleBlockOn(Handle::current()));
        Ok(Self {
            url: url.to_string(),
            storage: Arc::new(storage),
            arrays: Arc::new(OpenCache::new()),
        })
    }

    async fn subset(
        &self,
        array: &str,
        ranges: &[Range<u64>],
        cast: Cast,
    ) -> Result<Decoded, StoreError> {
        let storage = Arc::clone(&self.storage);
        let arrays = Arc::clone(&self.arrays);
        let url = self.url.clone();
        let path = format!("/{array}");
        let ranges = ranges.to_vec();
        task::spawn_blocking(move || {
            let array = arrays.get_or_open(&path, || {
                Array::open(storage, &path).map_err(|e| StoreError::ZarrAccess {
                    url: url.clone(),
                    message: e.to_string(),
                })
            })?;
            read_subset(&array, &url, &path, &ranges, cast)
        })
        .await?
    }

    async fn read_f64(&self, array: &str, ranges: &[Range<u64>]) -> Result<Vec<f64>, StoreError> {
        Ok(match self.subset(array, ranges, Cast::F64).await? {
            Decoded::F64(values) => values,
            Decoded::F32(values) => values.into_iter().map(f64::from).collect(),
        })
    }
}

#[async_trait]
impl ChunkReader for ZarrReader {
    async fn read(&self, array: &str, ranges: &[Range<u64>]) -> Result<Vec<f32>, StoreError> {
        debug!("Reading {array}{ranges:?} from {}", self.url);
        Ok(match self.subset(array, ranges, Cast::F32).await? {
            Decoded::F32(values) => values,
            Decoded::F64(values) => values.into_iter().map(|v| v as f32).collect(),
        })
    }
}

#[derive(Clone, Copy)]
enum Cast {
    F32,
    F64,
}

enum Decoded {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

fn read_subset(
    array: &Array<HttpStorage>,
    url: &str,
    path: &str,
    ranges: &[Range<u64>],
    cast: Cast,
) -> Result<Decoded, StoreError> {
    let access = |e: String| StoreError::ZarrAccess {
        url: url.to_string(),
        message: e,
    };
    let subset = ArraySubset::new_with_ranges(ranges);

    macro_rules! retrieve {
        ($t:ty) => {{
            let values = array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map_err(|e| access(e.to_string()))?;
            match cast {
                Cast::F32 => Decoded::F32(values.into_iter().map(|v| v as f32).collect()),
                Cast::F64 => Decoded::F64(values.into_iter().map(|v| v as f64).collect()),
            }
        }};
    }

    let decoded = match array.data_type() {
        DataType::Float32 => retrieve!(f32),
        DataType::Float64 => retrieve!(f64),
        DataType::Int16 => retrieve!(i16),
        DataType::Int32 => retrieve!(i32),
        DataType::Int64 => retrieve!(i64),
        DataType::UInt16 => retrieve!(u16),
        DataType::UInt32 => retrieve!(u32),
        other => {
            return Err(access(format!(
                "unsupported data type {other:?} for '{path}'"
            )))
        }
    };
    Ok(decoded)
}
