//! Turns a validated request into an [`Era5Dataset`]: per-month primary
//! stores first, the multi-decade fallback store if any of them fails.

mod fallback;
mod primary;
pub(crate) mod resample;
pub(crate) mod selection;

use crate::dataset::{DatasetPart, Era5Dataset};
use crate::era5::Endpoints;
use crate::error::Era5Error;
use crate::store::{Attributes, StoreDataset, StoreError, StoreErrorKind, StoreOpener};
use crate::types::extent::{BoundingBox, SpatialSelection};
use crate::types::frequency::Resample;
use crate::types::reducer::Reducer;
use crate::types::time::{DayRange, Month};
use crate::types::variable::Era5Variable;
use chrono::NaiveDateTime;
use log::{info, warn};
use primary::PrimaryFailure;
use resample::plan_buckets;
use selection::{select, time_window, GridAxis, ResolvedExtent};
use std::fmt;

/// Which store family produced a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The per-month stores.
    Primary,
    /// The multi-decade ARCO store.
    Fallback,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Primary => "primary",
            Backend::Fallback => "fallback",
        })
    }
}

/// The primary-store failure that made a load switch to the fallback store.
#[derive(Debug)]
pub struct FallbackTrigger {
    month: Month,
    url: String,
    error: StoreError,
}

impl FallbackTrigger {
    pub(crate) fn new(month: Month, url: impl Into<String>, error: StoreError) -> Self {
        Self {
            month,
            url: url.into(),
            error,
        }
    }

    /// The month whose store failed.
    pub fn month(&self) -> Month {
        self.month
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn error(&self) -> &StoreError {
        &self.error
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for FallbackTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error for {}: {}", self.kind(), self.month, self.error)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LoadRequest {
    pub variable: Era5Variable,
    pub bbox: BoundingBox,
    pub days: DayRange,
    pub reducer: Reducer,
    pub resample: Resample,
    pub selection: SpatialSelection,
}

/// Coordinate names of one store layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisNames<'a> {
    pub time: &'a str,
    pub lat: &'a str,
    pub lon: &'a str,
}

/// Everything read or derived from one opened store.
pub(crate) struct PartPlan {
    pub part: DatasetPart,
    pub times: Vec<NaiveDateTime>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub attributes: Attributes,
    pub variable_attributes: Attributes,
}

pub(crate) async fn load(
    opener: &dyn StoreOpener,
    endpoints: &Endpoints,
    request: LoadRequest,
) -> Result<Era5Dataset, Era5Error> {
    info!(
        "Loading {} for {} over {} (resample {}, reducer {})",
        request.variable, request.bbox, request.days, request.resample, request.reducer
    );
    let (trigger, frozen) = match primary::load(opener, endpoints, &request).await {
        Ok(plans) => return compose(plans, Backend::Primary, None, &request),
        Err(PrimaryFailure::Fatal(e)) => return Err(e),
        Err(PrimaryFailure::Store { trigger, frozen }) => (trigger, frozen),
    };

    warn!(
        "Primary store failed ({trigger}), switching to fallback store {}",
        endpoints.fallback_url
    );
    match fallback::load(opener, endpoints, &request, frozen).await {
        Ok(plan) => compose(vec![plan], Backend::Fallback, Some(trigger), &request),
        Err(source) => Err(Era5Error::AllBackendsFailed {
            primary: Box::new(trigger),
            source,
        }),
    }
}

fn compose(
    plans: Vec<PartPlan>,
    backend: Backend,
    trigger: Option<FallbackTrigger>,
    request: &LoadRequest,
) -> Result<Era5Dataset, Era5Error> {
    let mut plans = plans.into_iter();
    let Some(first) = plans.next() else {
        return Err(Era5Error::NothingPlanned { days: request.days });
    };
    let PartPlan {
        part,
        mut times,
        lat,
        lon,
        attributes,
        variable_attributes,
    } = first;
    let mut parts = vec![part];
    for plan in plans {
        times.extend(plan.times);
        parts.push(plan.part);
    }
    let buckets = plan_buckets(&times, request.resample);
    Ok(Era5Dataset::new(
        request.variable,
        lat,
        lon,
        attributes,
        variable_attributes,
        backend,
        trigger,
        request.reducer.clone(),
        request.resample,
        buckets,
        parts,
    ))
}

/// Plans the read of `array_name` from an opened store over the resolved
/// extent and the requested days.
pub(crate) fn plan_part(
    store: &StoreDataset,
    array_name: &str,
    names: AxisNames,
    lat_axis: &GridAxis,
    lon_axis: &GridAxis,
    extent: ResolvedExtent,
    request: &LoadRequest,
) -> Result<PartPlan, StoreError> {
    let url = store.url();
    let info = store.array(array_name)?;
    let unexpected = || StoreError::UnexpectedDimensions {
        url: url.to_string(),
        array: array_name.to_string(),
        dims: info.dims.clone(),
    };
    if info.dims.len() != 3 {
        return Err(unexpected());
    }
    let axes = [
        info.axis(names.time).ok_or_else(unexpected)?,
        info.axis(names.lat).ok_or_else(unexpected)?,
        info.axis(names.lon).ok_or_else(unexpected)?,
    ];

    let all_times = store.time_coordinate(names.time)?;
    let window = time_window(all_times, &request.days);
    let times = all_times[window.clone()].to_vec();
    let (lat_indices, lat) = select(lat_axis, extent.lat, names.lat, url)?;
    let (lon_indices, lon) = select(lon_axis, extent.lon, names.lon, url)?;

    let mut variable_attributes = info.attributes.clone();
    variable_attributes.remove("_ARRAY_DIMENSIONS");

    Ok(PartPlan {
        part: DatasetPart {
            reader: store.reader(),
            url: url.to_string(),
            array: array_name.to_string(),
            axes,
            time_window: window.start as u64..window.end as u64,
            lat_indices,
            lon_indices,
            missing_values: info.missing_values(),
        },
        times,
        lat,
        lon,
        attributes: store.attributes().clone(),
        variable_attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::date;

    fn request() -> LoadRequest {
        LoadRequest {
            variable: Era5Variable::SurfacePressure,
            bbox: BoundingBox::new((0.0, 10.0), (0.0, 10.0)).unwrap(),
            days: DayRange::new(date(2021, 6, 1), date(2021, 6, 3)),
            reducer: Reducer::Mean,
            resample: Resample::default(),
            selection: SpatialSelection::Nearest,
        }
    }

    #[test]
    fn test_compose_without_plans() {
        let err = compose(Vec::new(), Backend::Primary, None, &request()).unwrap_err();
        assert!(matches!(err, Era5Error::NothingPlanned { .. }));
        assert!(err.to_string().contains("2021-06-01..=2021-06-03"));
    }

    #[test]
    fn test_trigger_display() {
        let trigger = FallbackTrigger::new(
            Month(2021, 7),
            "mem://x",
            StoreError::NotFound("mem://x".to_string()),
        );
        assert_eq!(trigger.kind(), StoreErrorKind::NotFound);
        assert_eq!(
            trigger.to_string(),
            "not-found error for 2021-07: No store found at mem://x"
        );
    }
}
