//! Intervals of validity.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::instant::{day_number, Precision, TimeInstant};
use super::Temporal;
use crate::error::ValidationError;

/// A fixed duration given as calendar offsets from a span's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpanDuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl SpanDuration {
    #[must_use]
    pub const fn new(years: Option<u32>, months: Option<u32>, days: Option<u32>) -> Self {
        Self { years, months, days }
    }

    #[must_use]
    pub const fn years(n: u32) -> Self {
        Self::new(Some(n), None, None)
    }

    #[must_use]
    pub const fn months(n: u32) -> Self {
        Self::new(None, Some(n), None)
    }

    #[must_use]
    pub const fn days(n: u32) -> Self {
        Self::new(None, None, Some(n))
    }

    /// Years and months folded into a month count.
    #[must_use]
    pub fn total_months(&self) -> u32 {
        self.years
            .unwrap_or(0)
            .saturating_mul(12)
            .saturating_add(self.months.unwrap_or(0))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total_months() == 0 && self.days.unwrap_or(0) == 0
    }

    /// Greedy calendar difference: whole months first, then remaining days.
    fn between(start: NaiveDate, end: NaiveDate) -> Self {
        let mut months = (end.year() - start.year()) * 12
            + (i32::try_from(end.month()).unwrap_or(0) - i32::try_from(start.month()).unwrap_or(0));
        if end.day() < start.day() {
            months -= 1;
        }
        let months = u32::try_from(months.max(0)).unwrap_or(0);
        let anchor = start
            .checked_add_months(Months::new(months))
            .unwrap_or(start);
        let days = u32::try_from((end - anchor).num_days().max(0)).unwrap_or(0);

        let nonzero = |n: u32| (n > 0).then_some(n);
        Self {
            years: nonzero(months / 12),
            months: nonzero(months % 12),
            days: nonzero(days),
        }
    }

    fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.checked_add_months(Months::new(self.total_months()))?
            .checked_add_days(chrono::Days::new(u64::from(self.days.unwrap_or(0))))
    }
}

impl fmt::Display for SpanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if let Some(y) = self.years.filter(|n| *n > 0) {
            write!(f, "{y}Y")?;
        }
        if let Some(m) = self.months.filter(|n| *n > 0) {
            write!(f, "{m}M")?;
        }
        if let Some(d) = self.days.filter(|n| *n > 0) {
            write!(f, "{d}D")?;
        }
        if self.is_zero() {
            write!(f, "0D")?;
        }
        Ok(())
    }
}

/// How a span ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extent {
    /// Valid from the start onward, end unknown.
    Unbounded,
    /// Valid until (exclusive) an explicit end instant.
    Until { end: TimeInstant },
    /// Valid for a fixed duration after the start.
    Lasting { duration: SpanDuration },
}

/// A start instant plus an optional end, given either explicitly or as a
/// duration.
///
/// Spans are half-open: `[start, end)`. The canonical form (see
/// [`TimeSpan::canonicalize`]) expresses every bounded span with a dated start
/// as a normalized duration, so spans describing the same interval share a
/// storage key.
///
/// # Examples
///
/// ```
/// use tempora::{SpanDuration, TimeInstant, TimeSpan};
///
/// let start = TimeInstant::year(1950).unwrap();
/// let by_end = TimeSpan::between(start, TimeInstant::year(1960).unwrap()).unwrap();
/// let by_duration = TimeSpan::lasting(start, SpanDuration::months(120)).unwrap();
/// assert_eq!(by_end.canonical_key(), by_duration.canonical_key());
/// assert!(by_end.contains(TimeInstant::year(1955).unwrap()));
/// assert!(!by_end.contains(TimeInstant::year(1960).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    start: TimeInstant,
    extent: Extent,
}

impl TimeSpan {
    /// The universal span: from the origin, never ending.
    #[must_use]
    pub const fn existence() -> Self {
        Self {
            start: TimeInstant::Origin,
            extent: Extent::Unbounded,
        }
    }

    /// A span valid from `start` onward.
    #[must_use]
    pub const fn starting_at(start: TimeInstant) -> Self {
        Self {
            start,
            extent: Extent::Unbounded,
        }
    }

    /// A span valid from `start` until (exclusive) `end`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimeSpan` if `end` does not come after
    /// `start` or `start` is the end-of-time sentinel.
    pub fn between(start: TimeInstant, end: TimeInstant) -> Result<Self, ValidationError> {
        let (start_lo, _) = start.day_range();
        let (end_lo, _) = end.day_range();
        if start == TimeInstant::EndOfTime || end_lo <= start_lo {
            return Err(ValidationError::InvalidTimeSpan {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start,
            extent: Extent::Until { end },
        })
    }

    /// A span valid for `duration` after a dated `start`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimeSpan` if `start` is a sentinel,
    /// the duration is zero, or the end falls past the last representable date.
    pub fn lasting(start: TimeInstant, duration: SpanDuration) -> Result<Self, ValidationError> {
        let end_in_range = start.first_day().and_then(|first| duration.add_to(first)).is_some();
        if start.is_sentinel() || duration.is_zero() || !end_in_range {
            return Err(ValidationError::InvalidTimeSpan {
                start: start.to_string(),
                end: duration.to_string(),
            });
        }
        Ok(Self {
            start,
            extent: Extent::Lasting { duration },
        })
    }

    #[must_use]
    pub const fn start(&self) -> TimeInstant {
        self.start
    }

    #[must_use]
    pub const fn extent(&self) -> Extent {
        self.extent
    }

    /// True for the universal "existence" span (also in non-canonical shape).
    #[must_use]
    pub fn is_existence(&self) -> bool {
        self.start == TimeInstant::Origin && self.end().is_none()
    }

    /// True if the span has a known end.
    #[must_use]
    pub fn has_fixed_duration(&self) -> bool {
        self.end().is_some()
    }

    /// The exclusive end instant, computed from the duration when needed.
    ///
    /// `None` for open-ended spans (including an explicit end-of-time end).
    /// A deserialized duration reaching past the calendar range also yields
    /// `None`; [`TimeSpan::lasting`] refuses to build such spans.
    #[must_use]
    pub fn end(&self) -> Option<TimeInstant> {
        match self.extent {
            Extent::Unbounded | Extent::Until { end: TimeInstant::EndOfTime } => None,
            Extent::Until { end } => Some(end),
            Extent::Lasting { duration } => {
                let start_precision = self.start.precision()?;
                let needed = if duration.days.unwrap_or(0) > 0 {
                    Precision::Day
                } else if duration.total_months() % 12 != 0 {
                    Precision::Month
                } else {
                    Precision::Year
                };
                // Out of range saturates to open-ended.
                let date = duration.add_to(self.start.first_day()?)?;
                Some(TimeInstant::from_date(date, start_precision.max(needed)))
            }
        }
    }

    /// The span's duration as calendar offsets.
    ///
    /// `None` for open-ended spans and for spans starting at the origin.
    #[must_use]
    pub fn duration(&self) -> Option<SpanDuration> {
        match self.extent {
            Extent::Lasting { duration } => Some(duration),
            Extent::Until { .. } => {
                let start = self.start.first_day()?;
                let end = self.end()?.first_day()?;
                Some(SpanDuration::between(start, end))
            }
            Extent::Unbounded => None,
        }
    }

    /// Normalizes to the storage-key form. Idempotent.
    ///
    /// - an end-of-time end becomes `Unbounded`;
    /// - bounded spans with a dated start become `Lasting` with a greedy
    ///   (months, then days) duration, years folded out of months;
    /// - spans starting at the origin keep their explicit end.
    #[must_use]
    pub fn canonicalize(&self) -> Self {
        let Some(end) = self.end() else {
            return Self::starting_at(self.start);
        };
        if self.start == TimeInstant::Origin {
            return Self {
                start: self.start,
                extent: Extent::Until { end },
            };
        }
        match (self.start.first_day(), end.first_day()) {
            (Some(start), Some(end)) => Self {
                start: self.start,
                extent: Extent::Lasting {
                    duration: SpanDuration::between(start, end),
                },
            },
            _ => Self::starting_at(self.start),
        }
    }

    /// The canonical storage key, e.g. `1950_P10Y` or `1950-03`.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        let canonical = self.canonicalize();
        match canonical.extent {
            Extent::Unbounded => canonical.start.canonical_key(),
            Extent::Lasting { duration } => format!("{}_{duration}", canonical.start),
            Extent::Until { end } => format!("{}_{end}", canonical.start),
        }
    }

    /// Day-number bounds `[lower, upper)`; `None` upper means unbounded.
    pub(crate) fn day_bounds(&self) -> (i64, Option<i64>) {
        let (lower, _) = self.start.day_range();
        let upper = self.end().map(|end| end.day_range().0);
        (lower, upper)
    }

    /// True iff every instant describable by `inner`, at `inner`'s precision,
    /// is also describable by this span.
    ///
    /// An imprecise instant is contained when its unit overlaps the span, so
    /// `1955` is contained in a span starting `1955-06`.
    #[must_use]
    pub fn contains(&self, inner: impl Into<Temporal>) -> bool {
        if self.is_existence() {
            return true;
        }
        let (lower, upper) = self.day_bounds();
        let upper = upper.unwrap_or(i64::MAX);
        match inner.into() {
            Temporal::Instant(instant) => {
                let (lo, hi) = instant.day_range();
                lo < upper && hi > lower
            }
            Temporal::Span(span) => {
                let (lo, hi) = span.day_bounds();
                lo >= lower && hi.unwrap_or(i64::MAX) <= upper
            }
        }
    }

    /// True if the two spans share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let (a_lo, a_hi) = self.day_bounds();
        let (b_lo, b_hi) = other.day_bounds();
        a_lo < b_hi.unwrap_or(i64::MAX) && b_lo < a_hi.unwrap_or(i64::MAX)
    }

    /// The days both spans cover, bounded by the later start and the earlier
    /// end. `None` when they do not overlap.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = if self.start.day_range().0 >= other.start.day_range().0 {
            self.start
        } else {
            other.start
        };
        let end = match (self.end(), other.end()) {
            (Some(a), Some(b)) if a.day_range().0 <= b.day_range().0 => Some(a),
            (Some(_), Some(b)) | (None, Some(b)) => Some(b),
            (Some(a), None) => Some(a),
            (None, None) => None,
        };
        match end {
            Some(end) => Self::between(start, end).ok(),
            None => Some(Self::starting_at(start)),
        }
    }
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self::existence()
    }
}

impl From<TimeInstant> for TimeSpan {
    /// An open-ended span beginning at the instant.
    fn from(start: TimeInstant) -> Self {
        Self::starting_at(start)
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_existence() {
            return write!(f, "[existence]");
        }
        match self.end() {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}
