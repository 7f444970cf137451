//! Serves both store families from memory, with the June per-month store
//! missing, to show a load switching to the fallback store.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use era5::{
    CoordinateValues, Endpoints, Era5, Era5Error, MemoryOpener, MemoryStore, Reducer,
};
use ndarray::Array3;
use std::sync::Arc;

fn arco_store() -> MemoryStore {
    let start = NaiveDate::from_ymd_opt(2021, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let times: Vec<NaiveDateTime> = (0..368).map(|i| start + Duration::hours(6 * i)).collect();
    let lat: Vec<f64> = (0..73).map(|i| 90.0 - i as f64 * 2.5).collect();
    let lon: Vec<f64> = (0..144).map(|i| i as f64 * 2.5).collect();
    let data = Array3::from_shape_fn((times.len(), lat.len(), lon.len()), |(t, y, _)| {
        let latitude = 90.0 - y as f32 * 2.5;
        300.0 - latitude.abs() * 0.5 + (t % 4) as f32
    });
    MemoryStore::new()
        .with_attribute("title", "ARCO ERA5 (in memory)")
        .with_coordinate("time", CoordinateValues::Time(times))
        .with_coordinate("latitude", CoordinateValues::Numeric(lat))
        .with_coordinate("longitude", CoordinateValues::Numeric(lon))
        .with_array(
            "2m_temperature",
            &["time", "latitude", "longitude"],
            data.into_dyn(),
        )
}

#[tokio::main]
async fn main() -> Result<(), Era5Error> {
    env_logger::init();

    let endpoints = Endpoints {
        primary_template: "mem://era5-pds/{year}/{month}/data/{variable}.zarr".to_string(),
        fallback_url: "mem://arco".to_string(),
    };
    let opener = MemoryOpener::new().with_store(endpoints.fallback_url.clone(), arco_store());
    let era5 = Era5::builder()
        .endpoints(endpoints)
        .opener(Arc::new(opener))
        .build();

    let dataset = era5
        .load()
        .variable("air_temperature_at_2_metres")
        .lat((40.0, 55.0))
        .lon((-10.0, 10.0))
        .time(["2021-06-10", "2021-06-20"])
        .reducer(Reducer::Max)
        .resample("2D")
        .call()
        .await?;

    println!("Backend: {}", dataset.backend());
    if let Some(trigger) = dataset.fallback_trigger() {
        println!("Trigger: {trigger}");
    }
    println!("Longitudes: {:?}", dataset.lon());

    let cube = dataset.collect().await?;
    println!("{}", cube.to_frame()?);
    Ok(())
}
