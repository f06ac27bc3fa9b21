//! Possibly-imprecise points in time.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How much of a date an instant specifies.
///
/// Ordered from coarse to fine, so `max` picks the finer of two precisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Year,
    Month,
    Day,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year => write!(f, "year"),
            Self::Month => write!(f, "month"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// A point in time known to year, month or day precision, or one of the two
/// sentinels standing for negative and positive infinity.
///
/// `PartialEq` is structural: `1950` and `1950-03` are different values.
/// The coarse "missing field compares equal" relation lives in
/// [`TimeInstant::approx_cmp`] and [`TimeInstant::about_the_same`].
///
/// # Examples
///
/// ```
/// use tempora::TimeInstant;
///
/// let coarse = TimeInstant::year(1950).unwrap();
/// let fine = TimeInstant::new(1950, Some(3), Some(7)).unwrap();
/// assert_ne!(coarse, fine);
/// assert!(coarse.about_the_same(&fine));
/// assert_eq!(fine.canonical_key(), "1950-03-07");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeInstant {
    /// Negative infinity.
    Origin,
    /// A calendar date, possibly missing month and day.
    Date {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
    },
    /// Positive infinity.
    EndOfTime,
}

impl TimeInstant {
    /// Creates a dated instant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimeInstant` if the month is outside
    /// `1..=12`, a day is given without a month, or the date does not exist.
    pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidTimeInstant { reason };

        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(invalid(format!("year {year} is out of range")));
        }
        match (month, day) {
            (None, Some(d)) => return Err(invalid(format!("day {d} given without a month"))),
            (Some(m), _) if !(1..=12).contains(&m) => {
                return Err(invalid(format!("month {m} is outside 1..=12")));
            }
            (Some(m), Some(d)) if NaiveDate::from_ymd_opt(year, m, d).is_none() => {
                return Err(invalid(format!("{year}-{m:02}-{d:02} is not a calendar date")));
            }
            _ => {}
        }
        Ok(Self::Date { year, month, day })
    }

    /// Creates an instant known to year precision.
    ///
    /// # Errors
    ///
    /// See [`TimeInstant::new`].
    pub fn year(year: i32) -> Result<Self, ValidationError> {
        Self::new(year, None, None)
    }

    /// Creates an instant known to month precision.
    ///
    /// # Errors
    ///
    /// See [`TimeInstant::new`].
    pub fn year_month(year: i32, month: u32) -> Result<Self, ValidationError> {
        Self::new(year, Some(month), None)
    }

    /// Creates an instant known to day precision.
    ///
    /// # Errors
    ///
    /// See [`TimeInstant::new`].
    pub fn ymd(year: i32, month: u32, day: u32) -> Result<Self, ValidationError> {
        Self::new(year, Some(month), Some(day))
    }

    /// Today's date (UTC) at day precision.
    #[must_use]
    pub fn today() -> Self {
        Self::from_date(Utc::now().date_naive(), Precision::Day)
    }

    /// The negative-infinity sentinel.
    #[must_use]
    pub const fn origin() -> Self {
        Self::Origin
    }

    /// The positive-infinity sentinel.
    #[must_use]
    pub const fn end_of_time() -> Self {
        Self::EndOfTime
    }

    /// Truncates a calendar date to the given precision.
    #[must_use]
    pub fn from_date(date: NaiveDate, precision: Precision) -> Self {
        let year = date.year();
        match precision {
            Precision::Year => Self::Date { year, month: None, day: None },
            Precision::Month => Self::Date {
                year,
                month: Some(date.month()),
                day: None,
            },
            Precision::Day => Self::Date {
                year,
                month: Some(date.month()),
                day: Some(date.day()),
            },
        }
    }

    /// Returns true for the two infinity sentinels.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Origin | Self::EndOfTime)
    }

    /// The precision of a dated instant; `None` for sentinels.
    #[must_use]
    pub const fn precision(&self) -> Option<Precision> {
        match self {
            Self::Date { day: Some(_), .. } => Some(Precision::Day),
            Self::Date { month: Some(_), .. } => Some(Precision::Month),
            Self::Date { .. } => Some(Precision::Year),
            Self::Origin | Self::EndOfTime => None,
        }
    }

    #[must_use]
    pub const fn year_value(&self) -> Option<i32> {
        match self {
            Self::Date { year, .. } => Some(*year),
            _ => None,
        }
    }

    #[must_use]
    pub const fn month_value(&self) -> Option<u32> {
        match self {
            Self::Date { month, .. } => *month,
            _ => None,
        }
    }

    #[must_use]
    pub const fn day_value(&self) -> Option<u32> {
        match self {
            Self::Date { day, .. } => *day,
            _ => None,
        }
    }

    /// The first calendar day covered by a dated instant.
    #[must_use]
    pub fn first_day(&self) -> Option<NaiveDate> {
        match self {
            Self::Date { year, month, day } => {
                NaiveDate::from_ymd_opt(*year, month.unwrap_or(1), day.unwrap_or(1))
            }
            Self::Origin | Self::EndOfTime => None,
        }
    }

    /// Half-open day-number range `[lower, upper)` covered by this instant.
    ///
    /// Sentinels map to the extremes of `i64`.
    pub(crate) fn day_range(&self) -> (i64, i64) {
        match self {
            Self::Origin => (i64::MIN, i64::MIN + 1),
            Self::EndOfTime => (i64::MAX - 1, i64::MAX),
            Self::Date { .. } => {
                let Some(first) = self.first_day() else {
                    return (i64::MAX - 1, i64::MAX);
                };
                let next = match self.precision() {
                    Some(Precision::Year) => first.checked_add_months(Months::new(12)),
                    Some(Precision::Month) => first.checked_add_months(Months::new(1)),
                    _ => first.succ_opt(),
                };
                (day_number(first), next.map_or(i64::MAX, day_number))
            }
        }
    }

    /// Coarse ordering: compares year, then month, then day, treating a field
    /// missing on either side as equal at that level.
    ///
    /// Consistent for sorting instants of one precision; not transitive across
    /// mixed precisions (`1950-01 ~ 1950 ~ 1950-12` but `1950-01 < 1950-12`).
    #[must_use]
    pub fn approx_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Origin, Self::Origin) | (Self::EndOfTime, Self::EndOfTime) => Ordering::Equal,
            (Self::Origin, _) | (_, Self::EndOfTime) => Ordering::Less,
            (_, Self::Origin) | (Self::EndOfTime, _) => Ordering::Greater,
            (
                Self::Date { year: y1, month: m1, day: d1 },
                Self::Date { year: y2, month: m2, day: d2 },
            ) => y1.cmp(y2).then_with(|| match (m1, m2) {
                (Some(m1), Some(m2)) => m1.cmp(m2).then_with(|| match (d1, d2) {
                    (Some(d1), Some(d2)) => d1.cmp(d2),
                    _ => Ordering::Equal,
                }),
                _ => Ordering::Equal,
            }),
        }
    }

    /// [`TimeInstant::approx_cmp`] as `-1`, `0` or `1`.
    #[must_use]
    pub fn compare_to(&self, other: &Self) -> i8 {
        match self.approx_cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// True if both instants agree down to the shallower precision of the two,
    /// e.g. `300-03-18` is about the same as `300`.
    #[must_use]
    pub fn about_the_same(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Date { year: y1, month: m1, day: d1 },
                Self::Date { year: y2, month: m2, day: d2 },
            ) => {
                if y1 != y2 {
                    return false;
                }
                match (m1, m2) {
                    (Some(m1), Some(m2)) if m1 == m2 => match (d1, d2) {
                        (Some(d1), Some(d2)) => d1 == d2,
                        _ => true,
                    },
                    (Some(_), Some(_)) => false,
                    _ => true,
                }
            }
            _ => self == other,
        }
    }

    /// Fixed string encoding with omitted fields elided.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Origin => "origin".to_string(),
            Self::EndOfTime => "end-of-time".to_string(),
            Self::Date { year, month: None, .. } => format!("{year:04}"),
            Self::Date { year, month: Some(m), day: None } => format!("{year:04}-{m:02}"),
            Self::Date { year, month: Some(m), day: Some(d) } => format!("{year:04}-{m:02}-{d:02}"),
        }
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

impl FromStr for TimeInstant {
    type Err = ValidationError;

    /// Parses the [`TimeInstant::canonical_key`] encoding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTimeInstant {
            reason: format!("cannot parse {s:?}"),
        };
        match s {
            "origin" => return Ok(Self::Origin),
            "end-of-time" => return Ok(Self::EndOfTime),
            _ => {}
        }

        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s),
        };
        let mut parts = body.split('-');
        let year: i32 = parts.next().and_then(|y| y.parse().ok()).ok_or_else(invalid)?;
        let month = parts.next().map(str::parse::<u32>).transpose().map_err(|_| invalid())?;
        let day = parts.next().map(str::parse::<u32>).transpose().map_err(|_| invalid())?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::new(sign * year, month, day)
    }
}

pub(crate) fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ti(y: i32, m: Option<u32>, d: Option<u32>) -> TimeInstant {
        TimeInstant::new(y, m, d).unwrap()
    }

    #[test]
    fn rejects_malformed_instants() {
        assert!(TimeInstant::new(1950, Some(13), None).is_err());
        assert!(TimeInstant::new(1950, Some(0), None).is_err());
        assert!(TimeInstant::new(1950, None, Some(3)).is_err());
        assert!(TimeInstant::new(1950, Some(2), Some(30)).is_err());
        assert!(TimeInstant::new(2000, Some(2), Some(29)).is_ok());
    }

    #[test]
    fn precision_follows_fields() {
        assert_eq!(ti(1950, None, None).precision(), Some(Precision::Year));
        assert_eq!(ti(1950, Some(3), None).precision(), Some(Precision::Month));
        assert_eq!(ti(1950, Some(3), Some(1)).precision(), Some(Precision::Day));
        assert_eq!(TimeInstant::origin().precision(), None);
    }

    #[test]
    fn approx_cmp_treats_missing_fields_as_equal() {
        let y = ti(1950, None, None);
        let jan = ti(1950, Some(1), None);
        let dec = ti(1950, Some(12), Some(31));
        assert_eq!(y.approx_cmp(&jan), Ordering::Equal);
        assert_eq!(y.approx_cmp(&dec), Ordering::Equal);
        assert_eq!(jan.approx_cmp(&dec), Ordering::Less);
        assert_eq!(ti(1949, Some(12), None).compare_to(&y), -1);
        assert_eq!(ti(1951, None, None).compare_to(&dec), 1);
    }

    #[test]
    fn sentinels_bound_everything() {
        let y = ti(-500, None, None);
        assert_eq!(TimeInstant::origin().approx_cmp(&y), Ordering::Less);
        assert_eq!(TimeInstant::end_of_time().approx_cmp(&y), Ordering::Greater);
        assert_eq!(
            TimeInstant::origin().approx_cmp(&TimeInstant::end_of_time()),
            Ordering::Less
        );
    }

    #[test]
    fn about_the_same_stops_at_shallower_precision() {
        assert!(ti(300, Some(3), Some(18)).about_the_same(&ti(300, None, None)));
        assert!(ti(300, Some(3), Some(18)).about_the_same(&ti(300, Some(3), None)));
        assert!(!ti(300, Some(3), Some(18)).about_the_same(&ti(300, Some(4), None)));
        assert!(!ti(300, Some(3), Some(18)).about_the_same(&ti(300, Some(3), Some(19))));
        assert!(!ti(300, None, None).about_the_same(&ti(301, None, None)));
    }

    #[test]
    fn canonical_key_elides_missing_fields() {
        assert_eq!(ti(1950, None, None).canonical_key(), "1950");
        assert_eq!(ti(1950, Some(3), None).canonical_key(), "1950-03");
        assert_eq!(ti(87, Some(3), Some(9)).canonical_key(), "0087-03-09");
        assert_eq!(TimeInstant::end_of_time().to_string(), "end-of-time");
    }

    #[test]
    fn parses_canonical_keys() {
        for key in ["1950", "1950-03", "0087-03-09", "origin", "end-of-time"] {
            let parsed: TimeInstant = key.parse().unwrap();
            assert_eq!(parsed.canonical_key(), key);
        }
        assert_eq!("-0044-03-15".parse::<TimeInstant>().unwrap(), ti(-44, Some(3), Some(15)));
        assert!("1950-13".parse::<TimeInstant>().is_err());
        assert!("1950-01-01-01".parse::<TimeInstant>().is_err());
        assert!("nineteen-fifty".parse::<TimeInstant>().is_err());
    }

    #[test]
    fn day_range_covers_whole_unit() {
        let (lo, hi) = ti(2001, None, None).day_range();
        assert_eq!(hi - lo, 365);
        let (lo, hi) = ti(2000, Some(2), None).day_range();
        assert_eq!(hi - lo, 29);
        let (lo, hi) = ti(2000, Some(2), Some(3)).day_range();
        assert_eq!(hi - lo, 1);
    }
}
