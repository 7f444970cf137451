//! Bucketing of the time axis and per-bucket reduction.

use crate::types::frequency::{MonthLabel, Resample};
use crate::types::reducer::Reducer;
use crate::types::time::Month;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use ndarray::{Array3, ArrayView3, Axis};

/// One output time step: its label and the samples (positions within the
/// selected time window) it reduces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bucket {
    pub label: NaiveDateTime,
    pub samples: Vec<usize>,
}

/// Splits sample times into resample buckets.
///
/// Hour and day bins are anchored at midnight of the earliest sample's day,
/// month bins at its month. Empty bins between the earliest and latest sample
/// are kept, so labels are evenly spaced. Samples need not be in order.
pub(crate) fn plan_buckets(times: &[NaiveDateTime], resample: Resample) -> Vec<Bucket> {
    let Some(earliest) = times.iter().min() else {
        return Vec::new();
    };
    let anchor = earliest.date().and_time(NaiveTime::default());
    let first_month = Month::of(earliest.date());

    let key_of = |t: &NaiveDateTime| -> i64 {
        match resample {
            Resample::Hours(n) => (*t - anchor).num_seconds().div_euclid(i64::from(n) * 3_600),
            Resample::Days(n) => (*t - anchor).num_seconds().div_euclid(i64::from(n) * 86_400),
            Resample::Months(_) => Month::of(t.date()).index() - first_month.index(),
        }
    };
    let label_of = |key: i64| -> NaiveDateTime {
        match resample {
            Resample::Hours(n) => anchor + Duration::hours(key * i64::from(n)),
            Resample::Days(n) => anchor + Duration::days(key * i64::from(n)),
            Resample::Months(label) => {
                let month = Month::from_index(first_month.index() + key);
                let day = match label {
                    MonthLabel::Start => month.first_day(),
                    MonthLabel::End => month.last_day(),
                };
                day.map(|d| d.and_time(NaiveTime::default()))
                    .unwrap_or(anchor)
            }
        }
    };

    // Keys are never negative: every sample is at or after the anchor
    let keys: Vec<i64> = times.iter().map(key_of).collect();
    let last = keys.iter().copied().max().unwrap_or(0);
    let mut buckets: Vec<Bucket> = (0..=last)
        .map(|key| Bucket {
            label: label_of(key),
            samples: Vec::new(),
        })
        .collect();
    for (position, key) in keys.into_iter().enumerate() {
        if let Some(bucket) = buckets.get_mut(key as usize) {
            bucket.samples.push(position);
        }
    }
    buckets
}

/// Reduces `values` (time × lat × lon) bucket by bucket.
pub(crate) fn reduce_buckets(
    values: ArrayView3<f32>,
    buckets: &[Bucket],
    reducer: &Reducer,
) -> Array3<f32> {
    let (_, n_lat, n_lon) = values.dim();
    let mut out = Array3::<f32>::from_elem((buckets.len(), n_lat, n_lon), f32::NAN);
    for (i, bucket) in buckets.iter().enumerate() {
        let mut slot = out.index_axis_mut(Axis(0), i);
        if bucket.samples.is_empty() {
            slot.fill(reducer.reduce(&[]));
            continue;
        }
        let samples = values.select(Axis(0), &bucket.samples);
        let reduced = samples.map_axis(Axis(0), |lane| reducer.reduce(&lane.to_vec()));
        slot.assign(&reduced);
    }
    out
}
