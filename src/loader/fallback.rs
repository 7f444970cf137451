//! The multi-decade ARCO store: one store for every variable and month, with
//! `latitude`/`longitude`/`time` coordinates and longitudes in `[0, 360)`.

use crate::era5::Endpoints;
use crate::loader::selection::{resolve_extent, wrap_range, GridAxis, ResolvedExtent};
use crate::loader::{plan_part, AxisNames, LoadRequest, PartPlan};
use crate::store::{StoreError, StoreOpener};
use crate::types::extent::BoundingBox;
use log::{debug, info};

const NAMES: AxisNames<'static> = AxisNames {
    time: "time",
    lat: "latitude",
    lon: "longitude",
};

/// Plans the whole request from the fallback store. `frozen` is the extent
/// already resolved against a primary store, if any.
pub(crate) async fn load(
    opener: &dyn StoreOpener,
    endpoints: &Endpoints,
    request: &LoadRequest,
    frozen: Option<ResolvedExtent>,
) -> Result<PartPlan, StoreError> {
    let url = endpoints.fallback_url.as_str();
    let store = opener.open(url).await?;
    let array = request.variable.arco();
    info!("Reading {} as '{array}' from {url}", request.variable);

    let lat_axis = GridAxis::native(store.numeric_coordinate(NAMES.lat)?);
    // Always presented in [-180, 180)
    let lon_axis = GridAxis::wrapped(store.numeric_coordinate(NAMES.lon)?);

    let extent = match frozen {
        Some(extent) => extent.wrapped(&lon_axis),
        None => {
            let bbox = BoundingBox {
                lat: request.bbox.lat,
                lon: wrap_range(request.bbox.lon, &lon_axis),
            };
            resolve_extent(&lat_axis, &lon_axis, &bbox, request.selection, url)?
        }
    };
    debug!("Fallback extent: lat {:?}, lon {:?}", extent.lat, extent.lon);

    plan_part(
        &store,
        array.as_str(),
        NAMES,
        &lat_axis,
        &lon_axis,
        extent,
        request,
    )
}
