//! The closed set of ERA5 variables this crate can load, and their names in
//! the fallback (ARCO) store.

use crate::error::Era5Error;
use std::fmt;
use std::str::FromStr;

/// An ERA5 variable, named by its canonical token in the per-month store.
///
/// Parse one from a string with [`str::parse`]; unknown tokens fail with
/// [`Era5Error::UnknownVariable`], listing every valid token.
///
/// # Examples
///
/// ```
/// use era5::Era5Variable;
///
/// let var: Era5Variable = "air_temperature_at_2_metres".parse().unwrap();
/// assert_eq!(var, Era5Variable::AirTemperatureAt2Metres);
/// assert_eq!(var.to_string(), "air_temperature_at_2_metres");
/// assert!("dew_point".parse::<Era5Variable>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era5Variable {
    /// Air pressure reduced to mean sea level (Pa).
    AirPressureAtMeanSeaLevel,
    /// Air temperature 2 m above the surface (K).
    AirTemperatureAt2Metres,
    /// Eastward (u) wind component 10 m above the surface (m/s).
    EastwardWindAt10Metres,
    /// Northward (v) wind component 10 m above the surface (m/s).
    NorthwardWindAt10Metres,
    /// Precipitation accumulated over 6 hours (m).
    TotalPrecipitation6hr,
    /// Precipitation accumulated over 12 hours (m).
    TotalPrecipitation12hr,
    /// Precipitation accumulated over 24 hours (m).
    TotalPrecipitation24hr,
    /// Sea surface temperature (K). Missing over land.
    SeaSurfaceTemperature,
    /// Pressure at the surface (Pa).
    SurfacePressure,
}

impl Era5Variable {
    /// Every supported variable, in allow-list order.
    pub const ALL: [Era5Variable; 9] = [
        Era5Variable::AirPressureAtMeanSeaLevel,
        Era5Variable::AirTemperatureAt2Metres,
        Era5Variable::EastwardWindAt10Metres,
        Era5Variable::NorthwardWindAt10Metres,
        Era5Variable::TotalPrecipitation6hr,
        Era5Variable::TotalPrecipitation12hr,
        Era5Variable::TotalPrecipitation24hr,
        Era5Variable::SeaSurfaceTemperature,
        Era5Variable::SurfacePressure,
    ];

    /// The canonical token, which is also the array name in the per-month store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Era5Variable::AirPressureAtMeanSeaLevel => "air_pressure_at_mean_sea_level",
            Era5Variable::AirTemperatureAt2Metres => "air_temperature_at_2_metres",
            Era5Variable::EastwardWindAt10Metres => "eastward_wind_at_10_metres",
            Era5Variable::NorthwardWindAt10Metres => "northward_wind_at_10_metres",
            Era5Variable::TotalPrecipitation6hr => "total_precipitation_6hr",
            Era5Variable::TotalPrecipitation12hr => "total_precipitation_12hr",
            Era5Variable::TotalPrecipitation24hr => "total_precipitation_24hr",
            Era5Variable::SeaSurfaceTemperature => "sea_surface_temperature",
            Era5Variable::SurfacePressure => "surface_pressure",
        }
    }

    /// The same quantity in the fallback store's vocabulary.
    pub fn arco(&self) -> ArcoVariable {
        ArcoVariable::from(*self)
    }

    pub(crate) fn valid_tokens() -> String {
        Self::ALL
            .iter()
            .map(Era5Variable::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Era5Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Era5Variable {
    type Err = Era5Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|var| var.as_str() == s)
            .ok_or_else(|| Era5Error::UnknownVariable {
                given: s.to_string(),
                valid: Self::valid_tokens(),
            })
    }
}

/// Variable names used by the ARCO multi-decade store (1959-2022).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcoVariable {
    MeanSeaLevelPressure,
    Temperature2m,
    UComponentOfWind10m,
    VComponentOfWind10m,
    TotalPrecipitation6hr,
    TotalPrecipitation12hr,
    TotalPrecipitation24hr,
    SeaSurfaceTemperature,
    SurfacePressure,
}

impl ArcoVariable {
    /// Array name inside the ARCO store.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArcoVariable::MeanSeaLevelPressure => "mean_sea_level_pressure",
            ArcoVariable::Temperature2m => "2m_temperature",
            ArcoVariable::UComponentOfWind10m => "10m_u_component_of_wind",
            ArcoVariable::VComponentOfWind10m => "10m_v_component_of_wind",
            ArcoVariable::TotalPrecipitation6hr => "total_precipitation_6hr",
            ArcoVariable::TotalPrecipitation12hr => "total_precipitation_12hr",
            ArcoVariable::TotalPrecipitation24hr => "total_precipitation_24hr",
            ArcoVariable::SeaSurfaceTemperature => "sea_surface_temperature",
            ArcoVariable::SurfacePressure => "surface_pressure",
        }
    }
}

impl fmt::Display for ArcoVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Era5Variable> for ArcoVariable {
    fn from(var: Era5Variable) -> Self {
        match var {
            Era5Variable::AirPressureAtMeanSeaLevel => ArcoVariable::MeanSeaLevelPressure,
            Era5Variable::AirTemperatureAt2Metres => ArcoVariable::Temperature2m,
            Era5Variable::EastwardWindAt10Metres => ArcoVariable::UComponentOfWind10m,
            Era5Variable::NorthwardWindAt10Metres => ArcoVariable::VComponentOfWind10m,
            Era5Variable::TotalPrecipitation6hr => ArcoVariable::TotalPrecipitation6hr,
            Era5Variable::TotalPrecipitation12hr => ArcoVariable::TotalPrecipitation12hr,
            Era5Variable::TotalPrecipitation24hr => ArcoVariable::TotalPrecipitation24hr,
            Era5Variable::SeaSurfaceTemperature => ArcoVariable::SeaSurfaceTemperature,
            Era5Variable::SurfacePressure => ArcoVariable::SurfacePressure,
        }
    }
}

impl From<ArcoVariable> for Era5Variable {
    fn from(var: ArcoVariable) -> Self {
        match var {
            ArcoVariable::MeanSeaLevelPressure => Era5Variable::AirPressureAtMeanSeaLevel,
            ArcoVariable::Temperature2m => Era5Variable::AirTemperatureAt2Metres,
            ArcoVariable::UComponentOfWind10m => Era5Variable::EastwardWindAt10Metres,
            ArcoVariable::VComponentOfWind10m => Era5Variable::NorthwardWindAt10Metres,
            ArcoVariable::TotalPrecipitation6hr => Era5Variable::TotalPrecipitation6hr,
            ArcoVariable::TotalPrecipitation12hr => Era5Variable::TotalPrecipitation12hr,
            ArcoVariable::TotalPrecipitation24hr => Era5Variable::TotalPrecipitation24hr,
            ArcoVariable::SeaSurfaceTemperature => Era5Variable::SeaSurfaceTemperature,
            ArcoVariable::SurfacePressure => Era5Variable::SurfacePressure,
        }
    }
}
