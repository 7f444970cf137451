//! Decoding of CF-convention time coordinates (`"<unit> since <epoch>"`).

use chrono::{Duration, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CfTimeUnits {
    millis_per_unit: f64,
    epoch: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parses a `units` attribute such as `"hours since 1900-01-01 00:00:00.0"`.
    /// Returns `None` when the attribute is not a CF time unit.
    pub(crate) fn parse(units: &str) -> Option<Self> {
        let (unit, epoch) = units.split_once(" since ")?;
        let millis_per_unit = match unit.trim().to_lowercase().as_str() {
            "milliseconds" | "millisecond" | "ms" => 1.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1_000.0,
            "minutes" | "minute" | "mins" | "min" => 60_000.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000.0,
            "days" | "day" | "d" => 86_400_000.0,
            _ => return None,
        };
        Some(Self {
            millis_per_unit,
            epoch: parse_epoch(epoch)?,
        })
    }

    pub(crate) fn decode(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.millis_per_unit).round();
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }
}

fn parse_epoch(epoch: &str) -> Option<NaiveDateTime> {
    let epoch = epoch
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(epoch, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(epoch, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
