use crate::error::Era5Error;
use std::fmt;

/// A latitude/longitude bounding box in degrees.
///
/// Each pair may be given in any order; it is stored as `(min, max)`.
/// Longitude may be expressed either in `[0, 360)` or `[-180, 180)`: a
/// negative lower longitude bound makes the primary store switch its
/// longitude axis to the `[-180, 180)` convention before selection.
///
/// # Examples
///
/// ```
/// use era5::BoundingBox;
///
/// let bbox = BoundingBox::new((5.0, -10.0), (20.0, 40.0)).unwrap();
/// assert_eq!(bbox.lat, (-10.0, 5.0));
/// assert!(BoundingBox::new((-95.0, 0.0), (0.0, 1.0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat: (f64, f64),
    pub lon: (f64, f64),
}

impl BoundingBox {
    pub fn new(lat: (f64, f64), lon: (f64, f64)) -> Result<Self, Era5Error> {
        for (name, value) in [("lat", lat.0), ("lat", lat.1), ("lon", lon.0), ("lon", lon.1)] {
            if !value.is_finite() {
                return Err(Era5Error::InvalidExtent(format!(
                    "{name} bound {value} is not a finite number"
                )));
            }
        }
        let lat = ordered(lat);
        if lat.0 < -90.0 || lat.1 > 90.0 {
            return Err(Era5Error::InvalidExtent(format!(
                "lat range ({}, {}) leaves [-90, 90]",
                lat.0, lat.1
            )));
        }
        Ok(Self {
            lat,
            lon: ordered(lon),
        })
    }

    /// Whether the request is expressed in the `[-180, 180)` longitude convention.
    pub fn uses_signed_longitude(&self) -> bool {
        self.lon.0 < 0.0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat [{}, {}], lon [{}, {}]",
            self.lat.0, self.lat.1, self.lon.0, self.lon.1
        )
    }
}

fn ordered(pair: (f64, f64)) -> (f64, f64) {
    if pair.0 <= pair.1 {
        pair
    } else {
        (pair.1, pair.0)
    }
}

/// How a [`BoundingBox`] is turned into grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialSelection {
    /// Snap each boundary to its nearest grid point and take everything in
    /// between. Always selects at least one point per axis.
    #[default]
    Nearest,
    /// Take the grid points lying inside the box. An axis with no point
    /// inside falls back to the point nearest to the box.
    Within,
}
