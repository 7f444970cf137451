//! Grid selection: longitude convention, nearest-point snapping and time windows.

use crate::store::StoreError;
use crate::types::extent::{BoundingBox, SpatialSelection};
use crate::types::time::DayRange;
use chrono::NaiveDateTime;
use log::warn;
use std::ops::Range;

const TOLERANCE: f64 = 1e-6;

/// Maps a longitude in any convention onto `[-180, 180)`.
pub(crate) fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// A coordinate axis as presented for selection, remembering the store index
/// behind every (possibly reordered) value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GridAxis {
    values: Vec<f64>,
    source: Vec<u64>,
}

impl GridAxis {
    /// The axis in store order.
    pub(crate) fn native(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
            source: (0..values.len() as u64).collect(),
        }
    }

    /// A longitude axis remapped to `[-180, 180)` and sorted ascending.
    pub(crate) fn wrapped(values: &[f64]) -> Self {
        let mut pairs: Vec<(f64, u64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (wrap_longitude(v), i as u64))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (values, source) = pairs.into_iter().unzip();
        Self { values, source }
    }

    /// Position of the value closest to `target`; ties go to the first one.
    fn nearest(&self, target: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (position, &value) in self.values.iter().enumerate() {
            let distance = (value - target).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((position, distance));
            }
        }
        best.map(|(position, _)| position)
    }

    /// Positions whose value lies in `[lo, hi]`, in axis order.
    fn positions_within(&self, lo: f64, hi: f64) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= lo - TOLERANCE && v <= hi + TOLERANCE)
            .map(|(position, _)| position)
            .collect()
    }

    fn bounds(&self) -> Option<(f64, f64)> {
        let min = self.values.iter().cloned().reduce(f64::min)?;
        let max = self.values.iter().cloned().reduce(f64::max)?;
        Some((min, max))
    }

    /// Smallest spacing between neighbouring values, 0 for fewer than two.
    fn step(&self) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| *d > TOLERANCE)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

/// Bounding box snapped to grid coordinates, as `(min, max)` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResolvedExtent {
    pub lat: (f64, f64),
    pub lon: (f64, f64),
}

impl ResolvedExtent {
    /// The same extent on a `[-180, 180)` longitude axis, see [`wrap_range`].
    pub(crate) fn wrapped(self, lon_axis: &GridAxis) -> Self {
        Self {
            lat: self.lat,
            lon: wrap_range(self.lon, lon_axis),
        }
    }
}

/// A longitude range moved onto the `[-180, 180)` axis `lon_axis`.
///
/// A range spanning the whole circle (up to one grid step short of 360°), or
/// one that would be split by the antimeridian, becomes the full axis.
pub(crate) fn wrap_range((lo, hi): (f64, f64), lon_axis: &GridAxis) -> (f64, f64) {
    let full = lon_axis.bounds().unwrap_or((-180.0, 180.0));
    if hi - lo >= 360.0 - lon_axis.step() - TOLERANCE {
        return full;
    }
    let (wrapped_lo, wrapped_hi) = (wrap_longitude(lo), wrap_longitude(hi));
    if wrapped_lo <= wrapped_hi {
        (wrapped_lo, wrapped_hi)
    } else {
        full
    }
}

pub(crate) fn resolve_extent(
    lat_axis: &GridAxis,
    lon_axis: &GridAxis,
    bbox: &BoundingBox,
    mode: SpatialSelection,
    url: &str,
) -> Result<ResolvedExtent, StoreError> {
    Ok(ResolvedExtent {
        lat: resolve_axis(lat_axis, bbox.lat, mode, "lat", url)?,
        lon: resolve_axis(lon_axis, bbox.lon, mode, "lon", url)?,
    })
}

fn resolve_axis(
    axis: &GridAxis,
    (lo, hi): (f64, f64),
    mode: SpatialSelection,
    name: &str,
    url: &str,
) -> Result<(f64, f64), StoreError> {
    let empty = || StoreError::EmptySelection {
        url: url.to_string(),
        axis: name.to_string(),
    };
    let (min, max) = axis.bounds().ok_or_else(empty)?;
    match mode {
        SpatialSelection::Nearest => {
            let a = axis.values[axis.nearest(lo).ok_or_else(empty)?];
            let b = axis.values[axis.nearest(hi).ok_or_else(empty)?];
            Ok((a.min(b), a.max(b)))
        }
        SpatialSelection::Within => {
            if lo < min - TOLERANCE || hi > max + TOLERANCE {
                warn!(
                    "Requested {name} range [{lo}, {hi}] leaves the grid coverage [{min}, {max}] of {url}"
                );
            }
            let inside = axis.positions_within(lo, hi);
            if inside.is_empty() {
                let a = axis.values[axis.nearest(lo).ok_or_else(empty)?];
                let b = axis.values[axis.nearest(hi).ok_or_else(empty)?];
                return Ok((a.min(b), a.max(b)));
            }
            let values: Vec<f64> = inside.iter().map(|&p| axis.values[p]).collect();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            Ok((min, max))
        }
    }
}

/// Store indices (and their coordinate values) of the axis points inside a
/// resolved range, in axis order.
pub(crate) fn select(
    axis: &GridAxis,
    (lo, hi): (f64, f64),
    name: &str,
    url: &str,
) -> Result<(Vec<u64>, Vec<f64>), StoreError> {
    let positions = axis.positions_within(lo, hi);
    if positions.is_empty() {
        return Err(StoreError::EmptySelection {
            url: url.to_string(),
            axis: name.to_string(),
        });
    }
    Ok(positions
        .into_iter()
        .map(|p| (axis.source[p], axis.values[p]))
        .unzip())
}

/// A run of consecutive store indices, placed at `position` in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexRun {
    pub position: usize,
    pub start: u64,
    pub len: u64,
}

/// Groups store indices into maximal ascending runs, so each run is one
/// contiguous read.
pub(crate) fn contiguous_runs(indices: &[u64]) -> Vec<IndexRun> {
    let mut runs: Vec<IndexRun> = Vec::new();
    for (position, &index) in indices.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.start + run.len == index => run.len += 1,
            _ => runs.push(IndexRun {
                position,
                start: index,
                len: 1,
            }),
        }
    }
    runs
}

/// Store index range of the samples falling inside the day range. Assumes an
/// ascending time axis.
pub(crate) fn time_window(times: &[NaiveDateTime], days: &DayRange) -> Range<usize> {
    let start = times.partition_point(|t| *t < days.start_datetime());
    let end = times.partition_point(|t| *t <= days.end_datetime());
    start..end.max(start)
}
