//! The lazy result of a load, and its materialized form.

use crate::error::Era5Error;
use crate::loader::resample::{reduce_buckets, Bucket};
use crate::loader::selection::contiguous_runs;
use crate::loader::{Backend, FallbackTrigger};
use crate::store::{Attributes, ChunkReader, StoreError};
use crate::types::frequency::Resample;
use crate::types::reducer::Reducer;
use crate::types::variable::Era5Variable;
use chrono::NaiveDateTime;
use log::debug;
use ndarray::{concatenate, s, Array3, ArrayView3, Axis};
use polars::prelude::{DataFrame, IntoLazy, LazyFrame};
use serde_json::Value;
use std::ops::Range;
use std::sync::Arc;

/// Coordinate reference system of every dataset this crate returns.
pub const CRS: &str = "EPSG:4326";

/// The planned read of one opened store.
pub(crate) struct DatasetPart {
    pub reader: Arc<dyn ChunkReader>,
    pub url: String,
    pub array: String,
    /// Positions of the time, latitude and longitude dimensions in the array.
    pub axes: [usize; 3],
    pub time_window: Range<u64>,
    pub lat_indices: Vec<u64>,
    pub lon_indices: Vec<u64>,
    pub missing_values: Vec<f32>,
}

impl DatasetPart {
    /// Reads the selected samples as time × lat × lon, missing values as NaN.
    async fn read(&self) -> Result<Array3<f32>, Era5Error> {
        let n_time = (self.time_window.end - self.time_window.start) as usize;
        let mut raw = Array3::<f32>::from_elem(
            (n_time, self.lat_indices.len(), self.lon_indices.len()),
            f32::NAN,
        );
        if n_time == 0 {
            return Ok(raw);
        }
        let lat_runs = contiguous_runs(&self.lat_indices);
        let lon_runs = contiguous_runs(&self.lon_indices);
        debug!(
            "Reading {} block(s) of '{}' from {}",
            lat_runs.len() * lon_runs.len(),
            self.array,
            self.url
        );

        for lat_run in &lat_runs {
            for lon_run in &lon_runs {
                let runs = [
                    self.time_window.clone(),
                    lat_run.start..lat_run.start + lat_run.len,
                    lon_run.start..lon_run.start + lon_run.len,
                ];
                let mut ranges = vec![0..0; 3];
                let mut shape = [0usize; 3];
                for (k, range) in runs.into_iter().enumerate() {
                    shape[self.axes[k]] = (range.end - range.start) as usize;
                    ranges[self.axes[k]] = range;
                }
                let values = self.reader.read(&self.array, &ranges).await?;
                let expected = shape.iter().product::<usize>();
                if values.len() != expected {
                    return Err(StoreError::ShortRead {
                        url: self.url.clone(),
                        array: self.array.clone(),
                        expected,
                        found: values.len(),
                    }
                    .into());
                }
                let block = ArrayView3::from_shape(shape, &values)?.permuted_axes(self.axes);
                let lat_end = lat_run.position + lat_run.len as usize;
                let lon_end = lon_run.position + lon_run.len as usize;
                raw.slice_mut(s![.., lat_run.position..lat_end, lon_run.position..lon_end])
                    .assign(&block);
            }
        }

        if !self.missing_values.is_empty() {
            raw.mapv_inplace(|v| {
                if self.missing_values.contains(&v) {
                    f32::NAN
                } else {
                    v
                }
            });
        }
        Ok(raw)
    }
}

/// A regional ERA5 dataset, not yet read.
///
/// Coordinates, attributes and the provenance of the data are available
/// immediately; the values themselves are only fetched by
/// [`Era5Dataset::collect`].
pub struct Era5Dataset {
    variable: Era5Variable,
    time: Vec<NaiveDateTime>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    attributes: Attributes,
    variable_attributes: Attributes,
    backend: Backend,
    fallback: Option<FallbackTrigger>,
    reducer: Reducer,
    resample: Resample,
    buckets: Vec<Bucket>,
    parts: Vec<DatasetPart>,
}

impl Era5Dataset {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        variable: Era5Variable,
        lat: Vec<f64>,
        lon: Vec<f64>,
        mut attributes: Attributes,
        variable_attributes: Attributes,
        backend: Backend,
        fallback: Option<FallbackTrigger>,
        reducer: Reducer,
        resample: Resample,
        buckets: Vec<Bucket>,
        parts: Vec<DatasetPart>,
    ) -> Self {
        attributes.insert("crs".to_string(), Value::from(CRS));
        Self {
            variable,
            time: buckets.iter().map(|b| b.label).collect(),
            lat,
            lon,
            attributes,
            variable_attributes,
            backend,
            fallback,
            reducer,
            resample,
            buckets,
            parts,
        }
    }

    pub fn variable(&self) -> Era5Variable {
        self.variable
    }

    /// Bucket labels of the resampled time axis.
    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Longitudes, in the convention of the request (`[-180, 180)` if the
    /// request used a negative longitude or the fallback store answered it).
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// `(time, lat, lon)` sizes.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.time.len(), self.lat.len(), self.lon.len())
    }

    /// Dataset-level attributes of the source store, plus `crs`.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn variable_attributes(&self) -> &Attributes {
        &self.variable_attributes
    }

    pub fn crs(&self) -> &'static str {
        CRS
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Why the fallback store was used, if it was.
    pub fn fallback_trigger(&self) -> Option<&FallbackTrigger> {
        self.fallback.as_ref()
    }

    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    pub fn resample(&self) -> Resample {
        self.resample
    }

    /// Stores the data will be read from, one per month on the primary path.
    pub fn sources(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.url.as_str()).collect()
    }

    /// Reads the selected chunks, masks missing values and reduces every
    /// time bucket.
    pub async fn collect(&self) -> Result<GridCube, Era5Error> {
        let mut blocks = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            blocks.push(part.read().await?);
        }
        let raw = match blocks.len() {
            0 => Array3::from_elem((0, self.lat.len(), self.lon.len()), f32::NAN),
            1 => blocks.remove(0),
            _ => {
                let views: Vec<ArrayView3<f32>> = blocks.iter().map(|b| b.view()).collect();
                concatenate(Axis(0), &views)?
            }
        };
        let values = reduce_buckets(raw.view(), &self.buckets, &self.reducer);
        Ok(GridCube {
            variable: self.variable,
            time: self.time.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            values,
            attributes: self.attributes.clone(),
            variable_attributes: self.variable_attributes.clone(),
        })
    }
}

impl std::fmt::Debug for Era5Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Era5Dataset")
            .field("variable", &self.variable)
            .field("dims", &self.dims())
            .field("backend", &self.backend)
            .field("crs", &CRS)
            .field("sources", &self.sources())
            .finish()
    }
}

/// A materialized dataset: values as a time × lat × lon cube.
#[derive(Debug, Clone)]
pub struct GridCube {
    variable: Era5Variable,
    time: Vec<NaiveDateTime>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    values: Array3<f32>,
    attributes: Attributes,
    variable_attributes: Attributes,
}

impl GridCube {
    pub fn variable(&self) -> Era5Variable {
        self.variable
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn values(&self) -> &Array3<f32> {
        &self.values
    }

    pub fn into_values(self) -> Array3<f32> {
        self.values
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn variable_attributes(&self) -> &Attributes {
        &self.variable_attributes
    }

    pub fn crs(&self) -> &'static str {
        CRS
    }

    /// Long-format frame with columns `time`, `lat`, `lon` and the variable
    /// name, one row per grid cell and time step.
    pub fn to_frame(&self) -> Result<DataFrame, Era5Error> {
        let (n_time, n_lat, n_lon) = self.values.dim();
        let rows = n_time * n_lat * n_lon;
        let mut time = Vec::with_capacity(rows);
        let mut lat = Vec::with_capacity(rows);
        let mut lon = Vec::with_capacity(rows);
        for t in &self.time {
            for y in &self.lat {
                for x in &self.lon {
                    time.push(*t);
                    lat.push(*y);
                    lon.push(*x);
                }
            }
        }
        // Standard layout, so iteration order matches the loops above
        let values: Vec<f32> = self.values.iter().copied().collect();
        let frame = polars::df!(
            "time" => time,
            "lat" => lat,
            "lon" => lon,
            self.variable.as_str() => values,
        )?;
        Ok(frame)
    }

    pub fn to_lazy_frame(&self) -> Result<LazyFrame, Era5Error> {
        Ok(self.to_frame()?.lazy())
    }
}
