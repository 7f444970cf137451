use std::fmt;
use std::sync::Arc;

/// Aggregation applied to the samples falling into one resample bucket.
///
/// Every built-in reducer except [`Reducer::Count`] propagates NaN: a single
/// missing sample makes the bucket NaN. Empty buckets give NaN, except for
/// `Sum` and `Count`, which give 0.
///
/// # Examples
///
/// ```
/// use era5::Reducer;
///
/// assert_eq!(Reducer::Mean.reduce(&[1.0, 2.0, 6.0]), 3.0);
/// assert_eq!(Reducer::Count.reduce(&[1.0, f32::NAN]), 1.0);
/// assert!(Reducer::Max.reduce(&[1.0, f32::NAN]).is_nan());
///
/// let range = Reducer::custom(|v| {
///     let max = v.iter().cloned().fold(f32::MIN, f32::max);
///     let min = v.iter().cloned().fold(f32::MAX, f32::min);
///     max - min
/// });
/// assert_eq!(range.reduce(&[1.0, 4.0]), 3.0);
/// ```
#[derive(Clone, Default)]
pub enum Reducer {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
    Median,
    /// Population standard deviation.
    Std,
    /// Number of non-NaN samples.
    Count,
    Custom(Arc<dyn Fn(&[f32]) -> f32 + Send + Sync>),
}

impl Reducer {
    pub fn custom(f: impl Fn(&[f32]) -> f32 + Send + Sync + 'static) -> Self {
        Reducer::Custom(Arc::new(f))
    }

    pub fn reduce(&self, values: &[f32]) -> f32 {
        let has_nan = values.iter().any(|v| v.is_nan());
        match self {
            Reducer::Count => values.iter().filter(|v| !v.is_nan()).count() as f32,
            Reducer::Sum if values.is_empty() => 0.0,
            Reducer::Custom(f) => f(values),
            _ if values.is_empty() || has_nan => f32::NAN,
            Reducer::Sum => values.iter().map(|&v| f64::from(v)).sum::<f64>() as f32,
            Reducer::Mean => mean(values) as f32,
            Reducer::Min => values.iter().cloned().fold(f32::INFINITY, f32::min),
            Reducer::Max => values.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
            Reducer::Median => median(values) as f32,
            Reducer::Std => {
                let mean = mean(values);
                let variance = values
                    .iter()
                    .map(|&v| (f64::from(v) - mean).powi(2))
                    .sum::<f64>()
                    / values.len() as f64;
                variance.sqrt() as f32
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Sum => "sum",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Median => "median",
            Reducer::Std => "std",
            Reducer::Count => "count",
            Reducer::Custom(_) => "custom",
        }
    }
}

fn mean(values: &[f32]) -> f64 {
    values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
}

fn median(values: &[f32]) -> f64 {
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reducer::{}", self.name())
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_reducers() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(Reducer::Mean.reduce(&values), 5.0);
        assert_eq!(Reducer::Sum.reduce(&values), 40.0);
        assert_eq!(Reducer::Min.reduce(&values), 2.0);
        assert_eq!(Reducer::Max.reduce(&values), 9.0);
        assert_eq!(Reducer::Median.reduce(&values), 4.5);
        assert_eq!(Reducer::Std.reduce(&values), 2.0);
        assert_eq!(Reducer::Count.reduce(&values), 8.0);
        assert_eq!(Reducer::Median.reduce(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_nan_propagates() {
        let values = [1.0, f32::NAN, 3.0];
        for reducer in [
            Reducer::Mean,
            Reducer::Sum,
            Reducer::Min,
            Reducer::Max,
            Reducer::Median,
            Reducer::Std,
        ] {
            assert!(reducer.reduce(&values).is_nan(), "{reducer} ignored NaN");
        }
        assert_eq!(Reducer::Count.reduce(&values), 2.0);
    }

    #[test]
    fn test_empty_bucket() {
        assert!(Reducer::Mean.reduce(&[]).is_nan());
        assert!(Reducer::Median.reduce(&[]).is_nan());
        assert_eq!(Reducer::Sum.reduce(&[]), 0.0);
        assert_eq!(Reducer::Count.reduce(&[]), 0.0);
    }

    #[test]
    fn test_custom_reducer() {
        let first = Reducer::custom(|v| v.first().copied().unwrap_or(f32::NAN));
        assert_eq!(first.reduce(&[7.0, 1.0]), 7.0);
        assert_eq!(format!("{first:?}"), "Reducer::custom");
    }
}
