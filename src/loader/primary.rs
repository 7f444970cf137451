//! The per-month store family: one store per variable, year and month, with
//! `lat`/`lon` coordinates and a `time0` or `time1` time axis.

use crate::era5::Endpoints;
use crate::error::Era5Error;
use crate::loader::selection::{resolve_extent, GridAxis, ResolvedExtent};
use crate::loader::{plan_part, AxisNames, FallbackTrigger, LoadRequest, PartPlan};
use crate::store::{StoreDataset, StoreError, StoreOpener};
use log::debug;

const TIME_DIMS: [&str; 2] = ["time0", "time1"];

pub(crate) enum PrimaryFailure {
    /// A store-level failure; the caller should switch to the fallback store.
    /// Carries the extent resolved so far, if any.
    Store {
        trigger: FallbackTrigger,
        frozen: Option<ResolvedExtent>,
    },
    Fatal(Era5Error),
}

enum MonthFailure {
    Store(StoreError),
    Fatal(Era5Error),
}

impl From<StoreError> for MonthFailure {
    fn from(e: StoreError) -> Self {
        MonthFailure::Store(e)
    }
}

/// Plans every month of the request, in order.
pub(crate) async fn load(
    opener: &dyn StoreOpener,
    endpoints: &Endpoints,
    request: &LoadRequest,
) -> Result<Vec<PartPlan>, PrimaryFailure> {
    let mut frozen: Option<ResolvedExtent> = None;
    let mut plans: Vec<PartPlan> = Vec::new();
    for month in request.days.months() {
        let url = endpoints.primary_url(request.variable, month);
        debug!("Opening primary store for {month}: {url}");
        match load_month(opener, &url, request, &mut frozen, plans.first()).await {
            Ok(plan) => plans.push(plan),
            Err(MonthFailure::Fatal(e)) => return Err(PrimaryFailure::Fatal(e)),
            Err(MonthFailure::Store(error)) => {
                return Err(PrimaryFailure::Store {
                    trigger: FallbackTrigger::new(month, url, error),
                    frozen,
                })
            }
        }
    }
    Ok(plans)
}

async fn load_month(
    opener: &dyn StoreOpener,
    url: &str,
    request: &LoadRequest,
    frozen: &mut Option<ResolvedExtent>,
    first: Option<&PartPlan>,
) -> Result<PartPlan, MonthFailure> {
    let store = opener.open(url).await?;
    let lat_axis = GridAxis::native(store.numeric_coordinate("lat")?);
    let lon_values = store.numeric_coordinate("lon")?;
    let lon_axis = if request.bbox.uses_signed_longitude() {
        GridAxis::wrapped(lon_values)
    } else {
        GridAxis::native(lon_values)
    };

    let extent = match *frozen {
        Some(extent) => extent,
        None => {
            let extent = resolve_extent(
                &lat_axis,
                &lon_axis,
                &request.bbox,
                request.selection,
                url,
            )?;
            debug!(
                "Resolved {} to lat {:?}, lon {:?}",
                request.bbox, extent.lat, extent.lon
            );
            *frozen = Some(extent);
            extent
        }
    };

    let time = time_dimension(&store)?;
    let names = AxisNames {
        time,
        lat: "lat",
        lon: "lon",
    };
    let plan = plan_part(
        &store,
        request.variable.as_str(),
        names,
        &lat_axis,
        &lon_axis,
        extent,
        request,
    )?;
    if let Some(first) = first {
        if first.lat != plan.lat || first.lon != plan.lon {
            return Err(StoreError::GridMismatch {
                url: url.to_string(),
            }
            .into());
        }
    }
    Ok(plan)
}

fn time_dimension(store: &StoreDataset) -> Result<&'static str, MonthFailure> {
    let present: Vec<&'static str> = TIME_DIMS
        .into_iter()
        .filter(|dim| store.has_dimension(dim))
        .collect();
    match present.as_slice() {
        [dim] => Ok(*dim),
        [] => Err(StoreError::MissingDimension {
            url: store.url().to_string(),
            expected: TIME_DIMS.join(", "),
        }
        .into()),
        _ => Err(MonthFailure::Fatal(Era5Error::AmbiguousTimeDimension {
            url: store.url().to_string(),
        })),
    }
}
