//! Resolving the caller's time argument into an inclusive whole-day range,
//! and the calendar-month type used to address the per-month store.

use crate::error::Era5Error;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month, `Month(year, month)` with `month` in `1..=12`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.year(), date.month())
    }

    /// Months since year 0, used for month arithmetic.
    pub(crate) fn index(self) -> i64 {
        i64::from(self.0) * 12 + i64::from(self.1) - 1
    }

    pub(crate) fn from_index(index: i64) -> Self {
        Self(index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, self.1, 1)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, self.1, days_in_month(self.0, self.1)?)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_day_of_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1)?;
    let last_day_of_current_month = first_day_of_next_month - Duration::days(1);
    Some(last_day_of_current_month.day())
}

/// An inclusive range of whole days.
///
/// The range always covers `start 00:00` up to and including the last
/// microsecond of `end`, whatever the precision of the input it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    /// Builds a range from two dates given in any order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::default())
    }

    /// The last representable instant of the end day (23:59:59.999999).
    pub fn end_datetime(&self) -> NaiveDateTime {
        self.end
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::default()))
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start_datetime() && instant <= self.end_datetime()
    }

    /// Every calendar month touched by the range, in order.
    pub fn months(&self) -> impl Iterator<Item = Month> {
        let first = Month::of(self.start).index();
        let last = Month::of(self.end).index();
        (first..=last).map(Month::from_index)
    }
}

impl Display for DayRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Anything that can stand in for the `time` argument of a load: a single
/// instant, or a collection of instants whose minimum and maximum bound the
/// request.
///
/// # Examples
///
/// ```
/// use era5::TimeSelection;
/// use chrono::NaiveDate;
///
/// let range = ("2020-01-17 18:00:00", "2020-01-15").day_range().unwrap();
/// assert_eq!(range.start, NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
/// assert_eq!(range.end, NaiveDate::from_ymd_opt(2020, 1, 17).unwrap());
///
/// let single = "2021-06-01".day_range().unwrap();
/// assert_eq!(single.start, single.end);
/// ```
pub trait TimeSelection {
    /// All instants in the selection, as naive UTC datetimes.
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error>;

    /// The inclusive whole-day range `[floor_to_day(min), floor_to_day(max)]`.
    fn day_range(self) -> Result<DayRange, Era5Error>
    where
        Self: Sized,
    {
        let instants = self.instants()?;
        let min = instants.iter().min().copied();
        let max = instants.iter().max().copied();
        match (min, max) {
            (Some(min), Some(max)) => Ok(DayRange::new(min.date(), max.date())),
            _ => Err(Era5Error::InvalidTime(
                "time selection contains no instants".to_string(),
            )),
        }
    }
}

impl TimeSelection for NaiveDateTime {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        Ok(vec![self])
    }
}

impl TimeSelection for NaiveDate {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        Ok(vec![self.and_time(NaiveTime::default())])
    }
}

impl TimeSelection for DateTime<Utc> {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        Ok(vec![self.naive_utc()])
    }
}

impl TimeSelection for DateTime<FixedOffset> {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        Ok(vec![self.naive_utc()])
    }
}

impl TimeSelection for &str {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        parse_instant(self).map(|instant| vec![instant])
    }
}

impl TimeSelection for String {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        self.as_str().instants()
    }
}

impl<A: TimeSelection, B: TimeSelection> TimeSelection for (A, B) {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        let mut instants = self.0.instants()?;
        instants.extend(self.1.instants()?);
        Ok(instants)
    }
}

impl<T: TimeSelection, const N: usize> TimeSelection for [T; N] {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        collect_instants(self)
    }
}

impl<T: TimeSelection> TimeSelection for Vec<T> {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        collect_instants(self)
    }
}

impl<T: TimeSelection + Clone> TimeSelection for &[T] {
    fn instants(self) -> Result<Vec<NaiveDateTime>, Era5Error> {
        collect_instants(self.iter().cloned())
    }
}

fn collect_instants<T: TimeSelection>(
    items: impl IntoIterator<Item = T>,
) -> Result<Vec<NaiveDateTime>, Era5Error> {
    let mut instants = Vec::new();
    for item in items {
        instants.extend(item.instants()?);
    }
    Ok(instants)
}

fn parse_instant(s: &str) -> Result<NaiveDateTime, Era5Error> {
    let trimmed = s.trim();
    // Offset-aware input is converted to UTC first
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive_dt);
        }
    }
    if let Ok(naive_date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(naive_date.and_time(NaiveTime::default()));
    }
    // Year-month only, as in "2021-06"
    if let Ok(naive_date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
        return Ok(naive_date.and_time(NaiveTime::default()));
    }
    Err(Era5Error::InvalidTime(format!(
        "could not parse '{s}' as a date or datetime"
    )))
}
