//! Temporal types for time-scoped statements.
//!
//! Historical data is rarely known to the day. Tempora therefore works with
//! instants that may stop at year or month precision, and with spans whose
//! end is given either as an instant or as a calendar duration:
//! - [`TimeInstant`]: an optionally-imprecise point, plus the origin and
//!   end-of-time sentinels
//! - [`TimeSpan`]: a half-open interval with a canonical storage key
//! - [`Temporal`]: either of the two, where an operation accepts both

mod instant;
mod span;

use serde::{Deserialize, Serialize};

use crate::error::{TemporaError, TemporaResult};

pub use instant::{Precision, TimeInstant};
pub use span::{Extent, SpanDuration, TimeSpan};

/// A point or an interval.
///
/// Instants are not zero-length spans: asking one for its duration is an
/// `InvalidOperation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Temporal {
    Instant(TimeInstant),
    Span(TimeSpan),
}

impl Temporal {
    /// The instant itself, or the span's start.
    #[must_use]
    pub const fn start(&self) -> TimeInstant {
        match self {
            Self::Instant(instant) => *instant,
            Self::Span(span) => span.start(),
        }
    }

    /// The span's duration (`None` when open-ended).
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for instants.
    pub fn duration(&self) -> TemporaResult<Option<SpanDuration>> {
        match self {
            Self::Instant(instant) => Err(no_duration(instant)),
            Self::Span(span) => Ok(span.duration()),
        }
    }

    /// Whether the span has a known end.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for instants.
    pub fn has_fixed_duration(&self) -> TemporaResult<bool> {
        match self {
            Self::Instant(instant) => Err(no_duration(instant)),
            Self::Span(span) => Ok(span.has_fixed_duration()),
        }
    }

    #[must_use]
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant(_))
    }
}

fn no_duration(instant: &TimeInstant) -> TemporaError {
    TemporaError::invalid_operation(format!("time instant {instant} does not have a duration"))
}

impl From<TimeInstant> for Temporal {
    fn from(instant: TimeInstant) -> Self {
        Self::Instant(instant)
    }
}

impl From<TimeSpan> for Temporal {
    fn from(span: TimeSpan) -> Self {
        Self::Span(span)
    }
}

impl From<&TimeSpan> for Temporal {
    fn from(span: &TimeSpan) -> Self {
        Self::Span(*span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_duration_is_invalid_operation() {
        let t: Temporal = TimeInstant::year(1950).unwrap().into();
        let err = t.duration().unwrap_err();
        assert!(err.is_usage_error());
        assert!(t.has_fixed_duration().is_err());
        assert!(t.is_instant());
    }

    #[test]
    fn span_duration_passes_through() {
        let span = TimeSpan::lasting(TimeInstant::year(1950).unwrap(), SpanDuration::years(3)).unwrap();
        let t = Temporal::from(span);
        assert_eq!(t.duration().unwrap(), Some(SpanDuration::years(3)));
        assert!(t.has_fixed_duration().unwrap());
        assert_eq!(t.start(), TimeInstant::year(1950).unwrap());
    }

    #[test]
    fn open_span_has_no_duration() {
        let t = Temporal::from(TimeSpan::starting_at(TimeInstant::year(1950).unwrap()));
        assert_eq!(t.duration().unwrap(), None);
        assert!(!t.has_fixed_duration().unwrap());
    }
}
