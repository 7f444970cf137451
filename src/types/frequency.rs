use crate::error::Era5Error;
use std::fmt;
use std::str::FromStr;

/// Which day labels a monthly bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthLabel {
    /// First day of the month (`MS`).
    Start,
    /// Last day of the month (`M`, `ME`).
    End,
}

/// Target resolution of the time axis, parsed from a pandas-style token.
///
/// Accepted tokens are `<n>H`/`<n>h`, `<n>D`/`<n>d`, `M`/`ME`/`MS` with an
/// optional leading count (defaults to 1). Bins are never coarser than one
/// calendar month.
///
/// # Examples
///
/// ```
/// use era5::{MonthLabel, Resample};
///
/// assert_eq!("1D".parse::<Resample>().unwrap(), Resample::Days(1));
/// assert_eq!("6h".parse::<Resample>().unwrap(), Resample::Hours(6));
/// assert_eq!("MS".parse::<Resample>().unwrap(), Resample::Months(MonthLabel::Start));
/// assert!("1Y".parse::<Resample>().is_err());
/// assert!("2M".parse::<Resample>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resample {
    Hours(u32),
    Days(u32),
    Months(MonthLabel),
}

const MAX_HOURS: u32 = 31 * 24;
const MAX_DAYS: u32 = 31;

impl Default for Resample {
    fn default() -> Self {
        Resample::Days(1)
    }
}

impl FromStr for Resample {
    type Err = Era5Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let invalid = |reason: &str| Era5Error::InvalidResample {
            token: s.to_string(),
            reason: reason.to_string(),
        };
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| invalid("missing unit"))?;
        let (count, unit) = token.split_at(split);
        let count: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| invalid("count is not a number"))?
        };
        if count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        match unit {
            "H" | "h" => {
                if count > MAX_HOURS {
                    return Err(invalid("coarser than one month"));
                }
                Ok(Resample::Hours(count))
            }
            "D" | "d" => {
                if count > MAX_DAYS {
                    return Err(invalid("coarser than one month"));
                }
                Ok(Resample::Days(count))
            }
            "M" | "ME" | "MS" => {
                if count > 1 {
                    return Err(invalid("coarser than one month"));
                }
                Ok(Resample::Months(if unit == "MS" {
                    MonthLabel::Start
                } else {
                    MonthLabel::End
                }))
            }
            "W" | "Q" | "QS" | "QE" | "Y" | "YS" | "YE" | "A" | "AS" => {
                Err(invalid("coarser than one month"))
            }
            _ => Err(invalid("unknown unit, expected one of H, D, M, ME, MS")),
        }
    }
}

impl fmt::Display for Resample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resample::Hours(n) => write!(f, "{n}h"),
            Resample::Days(n) => write!(f, "{n}D"),
            Resample::Months(MonthLabel::Start) => write!(f, "MS"),
            Resample::Months(MonthLabel::End) => write!(f, "ME"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!("D".parse::<Resample>().unwrap(), Resample::Days(1));
        assert_eq!("7d".parse::<Resample>().unwrap(), Resample::Days(7));
        assert_eq!("12H".parse::<Resample>().unwrap(), Resample::Hours(12));
        assert_eq!(
            "1M".parse::<Resample>().unwrap(),
            Resample::Months(MonthLabel::End)
        );
        assert_eq!(
            "ME".parse::<Resample>().unwrap(),
            Resample::Months(MonthLabel::End)
        );
    }

    #[test]
    fn test_reject_bad_tokens() {
        for token in ["", "0D", "D1", "1Y", "1W", "3M", "32D", "745h", "1.5D", "1X"] {
            assert!(
                matches!(
                    token.parse::<Resample>(),
                    Err(Era5Error::InvalidResample { .. })
                ),
                "{token} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_parses_back() {
        for resample in [
            Resample::Hours(3),
            Resample::Days(2),
            Resample::Months(MonthLabel::Start),
            Resample::Months(MonthLabel::End),
        ] {
            assert_eq!(resample.to_string().parse::<Resample>().unwrap(), resample);
        }
    }
}
