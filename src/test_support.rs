//! Offline fixtures: a coarse global grid served from memory in both store layouts.

use crate::era5::Endpoints;
use crate::store::{Attributes, CoordinateValues, MemoryStore};
use crate::types::time::Month;
use crate::types::variable::Era5Variable;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::Array3;
use serde_json::json;

pub(crate) const MEM_PRIMARY_TEMPLATE: &str =
    "mem://era5-pds/{year}/{month}/data/{variable}.zarr";
pub(crate) const MEM_FALLBACK_URL: &str = "mem://arco/era5.zarr-v2";

pub(crate) fn endpoints() -> Endpoints {
    Endpoints {
        primary_template: MEM_PRIMARY_TEMPLATE.to_string(),
        fallback_url: MEM_FALLBACK_URL.to_string(),
    }
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

/// 90 down to -90 in 5° steps.
pub(crate) fn global_lat() -> Vec<f64> {
    (0..37).map(|i| 90.0 - i as f64 * 5.0).collect()
}

/// 0 up to 355 in 5° steps.
pub(crate) fn global_lon() -> Vec<f64> {
    (0..72).map(|i| i as f64 * 5.0).collect()
}

/// 6-hourly steps from `start` up to (excluding) `end`.
pub(crate) fn six_hourly(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
    let first = start.and_hms_opt(0, 0, 0).unwrap();
    let steps = (end - start).num_days() * 4;
    (0..steps).map(|i| first + Duration::hours(6 * i)).collect()
}

fn month_times(month: Month) -> Vec<NaiveDateTime> {
    six_hourly(month.first_day().unwrap(), month.next().first_day().unwrap())
}

/// Value at (time index, lat index, lon index) of the store.
pub(crate) type ValueFn = fn(usize, usize, usize) -> f32;

pub(crate) fn time_index(t: usize, _: usize, _: usize) -> f32 {
    t as f32
}

pub(crate) fn lon_index(_: usize, _: usize, x: usize) -> f32 {
    x as f32
}

fn variable_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("units".into(), json!("K"));
    attributes.insert("standard_name".into(), json!("air_temperature"));
    attributes
}

/// A per-month store of `variable` laid out along `time_dim`, `lat`, `lon`.
pub(crate) fn primary_store(
    variable: Era5Variable,
    month: Month,
    time_dim: &str,
    value: ValueFn,
) -> MemoryStore {
    let times = month_times(month);
    let (lat, lon) = (global_lat(), global_lon());
    let data = Array3::from_shape_fn((times.len(), lat.len(), lon.len()), |(t, y, x)| {
        value(t, y, x)
    });
    MemoryStore::new()
        .with_attribute("institution", "ECMWF")
        .with_attribute("source", "Reanalysis")
        .with_coordinate("lat", CoordinateValues::Numeric(lat))
        .with_coordinate("lon", CoordinateValues::Numeric(lon))
        .with_coordinate(time_dim, CoordinateValues::Time(times))
        .with_array_attributes(
            variable.as_str(),
            &[time_dim, "lat", "lon"],
            data.into_dyn(),
            variable_attributes(),
        )
}

pub(crate) fn primary_url(variable: Era5Variable, month: Month) -> String {
    endpoints().primary_url(variable, month)
}

/// The ARCO store covering `start..end` for `variable`.
pub(crate) fn fallback_store(
    variable: Era5Variable,
    start: NaiveDate,
    end: NaiveDate,
    value: ValueFn,
) -> MemoryStore {
    let times = six_hourly(start, end);
    let (lat, lon) = (global_lat(), global_lon());
    let data = Array3::from_shape_fn((times.len(), lat.len(), lon.len()), |(t, y, x)| {
        value(t, y, x)
    });
    MemoryStore::new()
        .with_attribute("title", "ARCO ERA5")
        .with_coordinate("latitude", CoordinateValues::Numeric(lat))
        .with_coordinate("longitude", CoordinateValues::Numeric(lon))
        .with_coordinate("time", CoordinateValues::Time(times))
        .with_array_attributes(
            variable.arco().as_str(),
            &["time", "latitude", "longitude"],
            data.into_dyn(),
            variable_attributes(),
        )
}
