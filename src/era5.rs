//! This module provides the main entry point of the crate, the [`Era5`] client.
//! It validates a request, then loads it from the per-month ERA5 stores,
//! switching once to the multi-decade ARCO store if a per-month store fails.

use crate::dataset::Era5Dataset;
use crate::error::Era5Error;
use crate::loader::{self, LoadRequest};
use crate::store::{StoreOpener, ZarrOpener};
use crate::types::extent::{BoundingBox, SpatialSelection};
use crate::types::frequency::Resample;
use crate::types::reducer::Reducer;
use crate::types::time::{Month, TimeSelection};
use crate::types::variable::Era5Variable;
use bon::{bon, Builder};
use std::sync::Arc;

/// Default locator template of the per-month stores.
pub const PRIMARY_TEMPLATE: &str =
    "https://era5-pds.s3.us-east-1.amazonaws.com/zarr/{year}/{month}/data/{variable}.zarr";

/// Default locator of the multi-decade ARCO store.
pub const FALLBACK_URL: &str =
    "https://storage.googleapis.com/gcp-public-data-arco-era5/ar/1959-2022-wb13-6h-0p25deg-chunk-1.zarr-v2";

/// Where the two store families live.
///
/// `primary_template` may contain the placeholders `{year}` (four digits),
/// `{month}` (two digits) and `{variable}` (the canonical variable token).
///
/// # Examples
///
/// ```
/// use era5::{Endpoints, Era5Variable, Month};
///
/// let endpoints = Endpoints::default();
/// assert_eq!(
///     endpoints.primary_url(Era5Variable::SurfacePressure, Month(2021, 6)),
///     "https://era5-pds.s3.us-east-1.amazonaws.com/zarr/2021/06/data/surface_pressure.zarr"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub primary_template: String,
    pub fallback_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            primary_template: PRIMARY_TEMPLATE.to_string(),
            fallback_url: FALLBACK_URL.to_string(),
        }
    }
}

impl Endpoints {
    pub fn primary_url(&self, variable: Era5Variable, month: Month) -> String {
        self.primary_template
            .replace("{year}", &format!("{:04}", month.year()))
            .replace("{month}", &format!("{:02}", month.month()))
            .replace("{variable}", variable.as_str())
    }
}

/// The client for loading regional ERA5 datasets.
///
/// Create one with [`Era5::new()`] to use the public stores over anonymous
/// HTTP, or with [`Era5::builder()`] to point it at other endpoints or serve
/// stores from somewhere else (such as a [`MemoryOpener`](crate::MemoryOpener)).
///
/// # Examples
///
/// ```rust
/// # use era5::{Era5, Era5Error};
/// # async fn run() -> Result<(), Era5Error> {
/// let era5 = Era5::new();
/// let dataset = era5
///     .load()
///     .variable("air_temperature_at_2_metres")
///     .lat((-10.0, 5.0))
///     .lon((20.0, 40.0))
///     .time(("2021-06-01", "2021-06-03"))
///     .call()
///     .await?;
/// let cube = dataset.collect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct Era5 {
    #[builder(default)]
    endpoints: Endpoints,
    #[builder(default = default_opener())]
    opener: Arc<dyn StoreOpener>,
}

fn default_opener() -> Arc<dyn StoreOpener> {
    Arc::new(ZarrOpener::new())
}

impl Default for Era5 {
    fn default() -> Self {
        Self::new()
    }
}

#[bon]
impl Era5 {
    /// A client for the public stores, opened over anonymous HTTP.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Loads one variable over a bounding box and a range of days.
    ///
    /// Nothing is read beyond store metadata and coordinates: the returned
    /// [`Era5Dataset`] is materialized with [`Era5Dataset::collect`].
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `variable` - One of the nine canonical variable tokens, see [`Era5Variable`].
    /// * `lat` - Latitude bounds in degrees, any order, within `[-90, 90]`.
    /// * `lon` - Longitude bounds in degrees, any order. A negative lower bound
    ///   selects the `[-180, 180)` convention.
    /// * `time` - Anything implementing [`TimeSelection`]; every day from the
    ///   earliest to the latest instant is included in full.
    /// * `reducer` - Optional. Aggregation per time bucket. Defaults to [`Reducer::Mean`].
    /// * `resample` - Optional. Bucket size such as `"6h"`, `"1D"` or `"MS"`.
    ///   Defaults to `"1D"`. Must not be coarser than one month.
    /// * `selection` - Optional. How the bounding box maps to grid points.
    ///   Defaults to [`SpatialSelection::Nearest`].
    ///
    /// # Errors
    ///
    /// Validation errors ([`Era5Error::UnknownVariable`], [`Era5Error::InvalidTime`],
    /// [`Era5Error::InvalidResample`], [`Era5Error::InvalidExtent`]) are returned
    /// before any store is opened. [`Era5Error::AmbiguousTimeDimension`] is
    /// returned if a per-month store has both time axes, and
    /// [`Era5Error::AllBackendsFailed`] if the fallback store fails too.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use era5::{Era5, Era5Error, Reducer, SpatialSelection};
    /// # async fn run() -> Result<(), Era5Error> {
    /// let era5 = Era5::new();
    /// let precipitation = era5
    ///     .load()
    ///     .variable("total_precipitation_6hr")
    ///     .lat((-35.0, -20.0))
    ///     .lon((-20.0, 10.0))
    ///     .time(["2019-01-15", "2019-02-20"])
    ///     .reducer(Reducer::Sum)
    ///     .resample("MS")
    ///     .selection(SpatialSelection::Within)
    ///     .call()
    ///     .await?;
    /// println!("{:?} from {}", precipitation.dims(), precipitation.backend());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn load<T: TimeSelection>(
        &self,
        variable: &str,
        lat: (f64, f64),
        lon: (f64, f64),
        time: T,
        reducer: Option<Reducer>,
        resample: Option<&str>,
        selection: Option<SpatialSelection>,
    ) -> Result<Era5Dataset, Era5Error> {
        let variable: Era5Variable = variable.parse()?;
        let bbox = BoundingBox::new(lat, lon)?;
        let days = time.day_range()?;
        let resample: Resample = match resample {
            Some(token) => token.parse()?,
            None => Resample::default(),
        };

        let request = LoadRequest {
            variable,
            bbox,
            days,
            reducer: reducer.unwrap_or_default(),
            resample,
            selection: selection.unwrap_or_default(),
        };
        loader::load(self.opener.as_ref(), &self.endpoints, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Backend;
    use crate::store::{MemoryOpener, StoreErrorKind};
    use crate::test_support::*;
    use serde_json::json;

    const T2M: Era5Variable = Era5Variable::AirTemperatureAt2Metres;

    fn client(opener: &Arc<MemoryOpener>) -> Era5 {
        Era5::builder()
            .endpoints(endpoints())
            .opener(opener.clone())
            .build()
    }

    fn june_opener(value: ValueFn) -> Arc<MemoryOpener> {
        Arc::new(MemoryOpener::new().with_store(
            primary_url(T2M, Month(2021, 6)),
            primary_store(T2M, Month(2021, 6), "time0", value),
        ))
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.primary_url(T2M, Month(2021, 6)),
            "https://era5-pds.s3.us-east-1.amazonaws.com/zarr/2021/06/data/air_temperature_at_2_metres.zarr"
        );
        assert_eq!(endpoints.fallback_url, FALLBACK_URL);
        assert_eq!(Era5::new().endpoints(), &endpoints);
    }

    #[tokio::test]
    async fn test_load_three_days_daily_mean() -> Result<(), Era5Error> {
        let opener = june_opener(time_index);
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((-10.0, 5.0))
            .lon((20.0, 40.0))
            .time(("2021-06-01", "2021-06-03"))
            .call()
            .await?;

        assert_eq!(dataset.backend(), Backend::Primary);
        assert!(dataset.fallback_trigger().is_none());
        assert_eq!(dataset.crs(), "EPSG:4326");
        assert_eq!(dataset.dims(), (3, 4, 5));
        assert_eq!(
            dataset.time(),
            &[at(2021, 6, 1, 0), at(2021, 6, 2, 0), at(2021, 6, 3, 0)]
        );
        assert_eq!(dataset.lat(), &[5.0, 0.0, -5.0, -10.0]);
        assert_eq!(dataset.lon(), &[20.0, 25.0, 30.0, 35.0, 40.0]);

        let cube = dataset.collect().await?;
        for (day, expected) in [1.5, 5.5, 9.5].into_iter().enumerate() {
            assert!(cube
                .values()
                .index_axis(ndarray::Axis(0), day)
                .iter()
                .all(|&v| v == expected));
        }

        let frame = cube.to_frame()?;
        assert_eq!(frame.height(), 60);
        assert_eq!(
            frame.get_column_names(),
            ["time", "lat", "lon", "air_temperature_at_2_metres"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_open() {
        let opener = june_opener(time_index);
        let era5 = client(&opener);

        let err = era5
            .load()
            .variable("dew_point_temperature_at_2_metres")
            .lat((-10.0, 5.0))
            .lon((20.0, 40.0))
            .time("2021-06-01")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, Era5Error::UnknownVariable { .. }));
        assert!(err.to_string().contains("air_temperature_at_2_metres"));

        let err = era5
            .load()
            .variable("surface_pressure")
            .lat((-10.0, 5.0))
            .lon((20.0, 40.0))
            .time("2021-06-01")
            .resample("1Y")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, Era5Error::InvalidResample { .. }));

        let err = era5
            .load()
            .variable("surface_pressure")
            .lat((-100.0, 5.0))
            .lon((20.0, 40.0))
            .time("2021-06-01")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, Era5Error::InvalidExtent(_)));

        let err = era5
            .load()
            .variable("surface_pressure")
            .lat((-10.0, 5.0))
            .lon((20.0, 40.0))
            .time("yesterday")
            .call()
            .await
            .unwrap_err();
        assert!(matches!(err, Era5Error::InvalidTime(_)));

        assert!(opener.opened_urls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_longitude_is_remapped() -> Result<(), Era5Error> {
        let opener = june_opener(lon_index);
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 0.0))
            .lon((-10.0, 10.0))
            .time("2021-06-01")
            .call()
            .await?;

        assert_eq!(dataset.lon(), &[-10.0, -5.0, 0.0, 5.0, 10.0]);
        let cube = dataset.collect().await?;
        let row: Vec<f32> = cube.values().iter().copied().collect();
        // Store longitudes 350, 355, 0, 5, 10
        assert_eq!(row, vec![70.0, 71.0, 0.0, 1.0, 2.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_months_are_concatenated_on_a_frozen_extent() -> Result<(), Era5Error> {
        let opener = Arc::new(
            MemoryOpener::new()
                .with_store(
                    primary_url(T2M, Month(2021, 6)),
                    primary_store(T2M, Month(2021, 6), "time0", time_index),
                )
                .with_store(
                    primary_url(T2M, Month(2021, 7)),
                    primary_store(T2M, Month(2021, 7), "time1", time_index),
                ),
        );
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((1.0, 9.0))
            .lon((101.0, 104.0))
            .time(["2021-06-30", "2021-07-01T18:00:00"])
            .call()
            .await?;

        assert_eq!(dataset.backend(), Backend::Primary);
        assert_eq!(dataset.sources().len(), 2);
        assert_eq!(dataset.time(), &[at(2021, 6, 30, 0), at(2021, 7, 1, 0)]);
        assert_eq!(dataset.lat(), &[10.0, 5.0, 0.0]);
        assert_eq!(dataset.lon(), &[100.0, 105.0]);

        let cube = dataset.collect().await?;
        // June 30 is the last day of June (indices 116..120), July 1 the first of July
        assert_eq!(cube.values()[[0, 0, 0]], 117.5);
        assert_eq!(cube.values()[[1, 2, 1]], 1.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_attributes_are_copied() -> Result<(), Era5Error> {
        let opener = june_opener(time_index);
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 10.0))
            .lon((0.0, 10.0))
            .time("2021-06-15")
            .call()
            .await?;

        assert_eq!(dataset.attributes()["institution"], json!("ECMWF"));
        assert_eq!(dataset.attributes()["crs"], json!("EPSG:4326"));
        assert_eq!(dataset.variable_attributes()["units"], json!("K"));
        let cube = dataset.collect().await?;
        assert_eq!(cube.attributes()["source"], json!("Reanalysis"));
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_when_primary_is_missing() -> Result<(), Era5Error> {
        let opener = Arc::new(MemoryOpener::new().with_store(
            MEM_FALLBACK_URL,
            fallback_store(T2M, date(2021, 5, 1), date(2021, 8, 1), time_index),
        ));
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((-10.0, 5.0))
            .lon((20.0, 40.0))
            .time(("2021-06-01", "2021-06-03"))
            .call()
            .await?;

        assert_eq!(dataset.backend(), Backend::Fallback);
        let trigger = dataset.fallback_trigger().unwrap();
        assert_eq!(trigger.kind(), StoreErrorKind::NotFound);
        assert_eq!(trigger.month(), Month(2021, 6));
        assert_eq!(
            opener.opened_urls(),
            vec![primary_url(T2M, Month(2021, 6)), MEM_FALLBACK_URL.to_string()]
        );
        assert_eq!(dataset.lat(), &[5.0, 0.0, -5.0, -10.0]);
        assert_eq!(dataset.lon(), &[20.0, 25.0, 30.0, 35.0, 40.0]);
        assert_eq!(dataset.attributes()["crs"], json!("EPSG:4326"));

        let cube = dataset.collect().await?;
        // 2021-06-01 00:00 is sample 124 of a store starting on May 1
        assert_eq!(cube.values()[[0, 0, 0]], 125.5);
        let frame = cube.to_frame()?;
        assert_eq!(
            frame.get_column_names(),
            ["time", "lat", "lon", "air_temperature_at_2_metres"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_reuses_extent_resolved_by_primary() -> Result<(), Era5Error> {
        let opener = Arc::new(
            MemoryOpener::new()
                .with_store(
                    primary_url(T2M, Month(2021, 6)),
                    primary_store(T2M, Month(2021, 6), "time0", time_index),
                )
                .with_failure(
                    primary_url(T2M, Month(2021, 7)),
                    StoreErrorKind::SchemaMismatch,
                )
                .with_store(
                    MEM_FALLBACK_URL,
                    fallback_store(T2M, date(2021, 6, 1), date(2021, 8, 1), lon_index),
                ),
        );
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 4.0))
            .lon((201.0, 219.0))
            .time(("2021-06-30", "2021-07-01"))
            .call()
            .await?;

        let trigger = dataset.fallback_trigger().unwrap();
        assert_eq!(trigger.kind(), StoreErrorKind::SchemaMismatch);
        assert_eq!(trigger.month(), Month(2021, 7));
        // Snapped to 200..220 against June, then expressed in [-180, 180)
        assert_eq!(dataset.lat(), &[5.0, 0.0]);
        assert_eq!(dataset.lon(), &[-160.0, -155.0, -150.0, -145.0, -140.0]);
        assert_eq!(dataset.time().len(), 2);

        let cube = dataset.collect().await?;
        assert_eq!(cube.values()[[0, 0, 0]], 40.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_both_backends_failing_reports_both() {
        let opener = Arc::new(
            MemoryOpener::new().with_failure(MEM_FALLBACK_URL, StoreErrorKind::Network),
        );
        let err = client(&opener)
            .load()
            .variable("surface_pressure")
            .lat((0.0, 1.0))
            .lon((0.0, 1.0))
            .time("2021-06-01")
            .call()
            .await
            .unwrap_err();

        match err {
            Era5Error::AllBackendsFailed { primary, source } => {
                assert_eq!(primary.kind(), StoreErrorKind::NotFound);
                assert_eq!(source.kind(), StoreErrorKind::Network);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(opener.opened_urls().len(), 2);
    }

    #[tokio::test]
    async fn test_two_time_dimensions_is_fatal() {
        let store = primary_store(T2M, Month(2021, 6), "time0", time_index).with_coordinate(
            "time1",
            crate::store::CoordinateValues::Time(vec![at(2021, 6, 1, 0)]),
        );
        let opener = Arc::new(
            MemoryOpener::new()
                .with_store(primary_url(T2M, Month(2021, 6)), store)
                .with_store(
                    MEM_FALLBACK_URL,
                    fallback_store(T2M, date(2021, 6, 1), date(2021, 7, 1), time_index),
                ),
        );
        let err = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 1.0))
            .lon((0.0, 1.0))
            .time("2021-06-01")
            .call()
            .await
            .unwrap_err();

        assert!(matches!(err, Era5Error::AmbiguousTimeDimension { .. }));
        assert_eq!(opener.opened_urls(), vec![primary_url(T2M, Month(2021, 6))]);
    }

    #[tokio::test]
    async fn test_within_selection_and_custom_resample() -> Result<(), Era5Error> {
        let opener = june_opener(time_index);
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((-9.0, 4.0))
            .lon((21.0, 39.0))
            .time("2021-06-01")
            .selection(SpatialSelection::Within)
            .reducer(Reducer::Max)
            .resample("12h")
            .call()
            .await?;

        assert_eq!(dataset.lat(), &[0.0, -5.0]);
        assert_eq!(dataset.lon(), &[25.0, 30.0, 35.0]);
        assert_eq!(dataset.time(), &[at(2021, 6, 1, 0), at(2021, 6, 1, 12)]);

        let cube = dataset.collect().await?;
        assert_eq!(cube.values()[[0, 0, 0]], 1.0);
        assert_eq!(cube.values()[[1, 1, 2]], 3.0);
        Ok(())
    }

    fn fallback_only(value: ValueFn) -> Arc<MemoryOpener> {
        Arc::new(MemoryOpener::new().with_store(
            MEM_FALLBACK_URL,
            fallback_store(T2M, date(2021, 6, 1), date(2021, 7, 1), value),
        ))
    }

    #[tokio::test]
    async fn test_fallback_only_across_the_seam() -> Result<(), Era5Error> {
        let opener = fallback_only(lon_index);
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 5.0))
            .lon((-10.0, 10.0))
            .time("2021-06-01")
            .call()
            .await?;

        assert_eq!(dataset.backend(), Backend::Fallback);
        assert_eq!(dataset.lon(), &[-10.0, -5.0, 0.0, 5.0, 10.0]);

        let cube = dataset.collect().await?;
        let row: Vec<f32> = (0..5).map(|x| cube.values()[[0, 0, x]]).collect();
        assert_eq!(row, [70.0, 71.0, 0.0, 1.0, 2.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_fallback_full_circle_requests() -> Result<(), Era5Error> {
        for lon in [(-180.0, 180.0), (0.0, 360.0)] {
            let opener = fallback_only(lon_index);
            let dataset = client(&opener)
                .load()
                .variable("air_temperature_at_2_metres")
                .lat((0.0, 5.0))
                .lon(lon)
                .time("2021-06-01")
                .call()
                .await?;

            assert_eq!(dataset.lon().len(), 72, "lon {lon:?}");
            assert_eq!(dataset.lon()[0], -180.0);
            assert_eq!(dataset.lon()[71], 175.0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_full_circle_extent_frozen_by_primary() -> Result<(), Era5Error> {
        let opener = Arc::new(
            MemoryOpener::new()
                .with_store(
                    primary_url(T2M, Month(2021, 6)),
                    primary_store(T2M, Month(2021, 6), "time0", time_index),
                )
                .with_failure(primary_url(T2M, Month(2021, 7)), StoreErrorKind::NotFound)
                .with_store(
                    MEM_FALLBACK_URL,
                    fallback_store(T2M, date(2021, 6, 1), date(2021, 8, 1), lon_index),
                ),
        );
        let dataset = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((0.0, 5.0))
            .lon((0.0, 360.0))
            .time(("2021-06-30", "2021-07-01"))
            .call()
            .await?;

        assert_eq!(dataset.backend(), Backend::Fallback);
        // Frozen as 0..355 on June, still the whole circle on the fallback
        assert_eq!(dataset.lon().len(), 72);
        assert_eq!(dataset.lon()[0], -180.0);

        let cube = dataset.collect().await?;
        assert_eq!(cube.values()[[0, 0, 0]], 36.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_grid_mismatch_between_months_falls_back() {
        let july = Month(2021, 7);
        let times = six_hourly(date(2021, 7, 1), date(2021, 8, 1));
        let shifted: Vec<f64> = (0..72).map(|i| i as f64 * 5.0 + 2.5).collect();
        let data = ndarray::Array3::<f32>::zeros((times.len(), 37, 72));
        let july_store = crate::store::MemoryStore::new()
            .with_coordinate("lat", crate::store::CoordinateValues::Numeric(global_lat()))
            .with_coordinate("lon", crate::store::CoordinateValues::Numeric(shifted))
            .with_coordinate("time0", crate::store::CoordinateValues::Time(times))
            .with_array(T2M.as_str(), &["time0", "lat", "lon"], data.into_dyn());
        let opener = Arc::new(
            MemoryOpener::new()
                .with_store(
                    primary_url(T2M, Month(2021, 6)),
                    primary_store(T2M, Month(2021, 6), "time0", time_index),
                )
                .with_store(primary_url(T2M, july), july_store),
        );
        let err = client(&opener)
            .load()
            .variable("air_temperature_at_2_metres")
            .lat((1.0, 9.0))
            .lon((101.0, 104.0))
            .time(("2021-06-30", "2021-07-01"))
            .call()
            .await
            .unwrap_err();

        match err {
            Era5Error::AllBackendsFailed { primary, source } => {
                assert_eq!(primary.kind(), StoreErrorKind::SchemaMismatch);
                assert!(matches!(
                    primary.error(),
                    crate::store::StoreError::GridMismatch { .. }
                ));
                assert_eq!(primary.month(), july);
                assert_eq!(source.kind(), StoreErrorKind::NotFound);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            opener.opened_urls(),
            vec![
                primary_url(T2M, Month(2021, 6)),
                primary_url(T2M, july),
                MEM_FALLBACK_URL.to_string(),
            ]
        );
    }
}
