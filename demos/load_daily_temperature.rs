//! Loads three days of 2 m air temperature over central Africa from the
//! public stores and prints the daily means as a frame.
//!
//! Set RUST_LOG=info (or debug) to see which stores are opened.

use era5::{Era5, Era5Error};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Era5Error> {
    env_logger::init();
    configure_polars_display();

    let era5 = Era5::new();
    let dataset = era5
        .load()
        .variable("air_temperature_at_2_metres")
        .lat((-10.0, 5.0))
        .lon((20.0, 40.0))
        .time(("2021-06-01", "2021-06-03"))
        .call()
        .await?;

    println!("{dataset:?}");
    println!("Served by the {} store", dataset.backend());
    if let Some(trigger) = dataset.fallback_trigger() {
        println!("Fell back because of: {trigger}");
    }

    let cube = dataset.collect().await?;
    println!("{:#?}", cube.variable_attributes());
    println!("{}", cube.to_frame()?);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
