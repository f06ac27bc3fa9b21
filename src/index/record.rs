//! Encoding of partition metadata records.
//!
//! A record is a handful of statements whose subject is the partition id. It
//! is the only description of a partition's span that survives in the
//! statement store, so it must decode back to the same canonical span.

use std::collections::BTreeMap;

use crate::error::{TemporaError, TemporaResult};
use crate::statement::{Statement, Term};
use crate::storage::ContainerId;
use crate::time::{Extent, Precision, TimeInstant, TimeSpan};
use crate::vocab::meta;

/// Statements describing `span` (canonicalized first) for `partition`.
pub(crate) fn encode(partition: &ContainerId, span: &TimeSpan) -> Vec<Statement> {
    let span = span.canonicalize();
    let subject = Term::iri(partition.as_str());
    let int = |predicate: &str, value: i64| Statement::new(subject.clone(), predicate, Term::integer(value));

    let mut out = vec![Statement::type_assertion(partition.as_str(), meta::PARTITION)];
    let start = span.start();
    let unit = match start.precision() {
        Some(Precision::Year) => meta::UNIT_YEAR,
        Some(Precision::Month) => meta::UNIT_MONTH,
        Some(Precision::Day) => meta::UNIT_DAY,
        None => meta::UNIT_ORIGIN,
    };
    out.push(Statement::new(subject.clone(), meta::UNIT_TYPE, Term::iri(unit)));
    push_fields(&mut out, &int, start, [meta::YEAR, meta::MONTH, meta::DAY]);

    match span.extent() {
        Extent::Unbounded => {}
        Extent::Lasting { duration } => {
            for (predicate, value) in [
                (meta::DURATION_YEARS, duration.years),
                (meta::DURATION_MONTHS, duration.months),
                (meta::DURATION_DAYS, duration.days),
            ] {
                if let Some(value) = value {
                    out.push(int(predicate, i64::from(value)));
                }
            }
        }
        Extent::Until { end } => {
            push_fields(&mut out, &int, end, [meta::END_YEAR, meta::END_MONTH, meta::END_DAY]);
        }
    }
    out
}

fn push_fields(
    out: &mut Vec<Statement>,
    int: &impl Fn(&str, i64) -> Statement,
    instant: TimeInstant,
    [year, month, day]: [&str; 3],
) {
    if let Some(y) = instant.year_value() {
        out.push(int(year, i64::from(y)));
    }
    if let Some(m) = instant.month_value() {
        out.push(int(month, i64::from(m)));
    }
    if let Some(d) = instant.day_value() {
        out.push(int(day, i64::from(d)));
    }
}

/// Decodes every partition record found among `statements`.
///
/// # Errors
///
/// Returns `IncoherentData` for a record with a missing or malformed field.
pub(crate) fn decode_all(
    statements: impl IntoIterator<Item = Statement>,
    metadata: &ContainerId,
) -> TemporaResult<Vec<(ContainerId, TimeSpan)>> {
    let mut by_subject: BTreeMap<String, Vec<Statement>> = BTreeMap::new();
    for stmt in statements {
        if let Some(subject) = stmt.subject_iri() {
            by_subject.entry(subject.to_string()).or_default().push(stmt);
        }
    }

    let mut out = Vec::new();
    for (subject, stmts) in by_subject {
        let is_partition = stmts
            .iter()
            .any(|s| s.is_type_assertion() && s.object.as_iri() == Some(meta::PARTITION));
        if !is_partition {
            continue;
        }
        let span = decode_one(&subject, &stmts, metadata)?;
        out.push((ContainerId::new(subject), span));
    }
    Ok(out)
}

fn decode_one(subject: &str, stmts: &[Statement], metadata: &ContainerId) -> TemporaResult<TimeSpan> {
    let incoherent = |reason: String| TemporaError::incoherent(subject, reason, vec![metadata.to_string()]);

    let field = |predicate: &str| -> TemporaResult<Option<i64>> {
        let mut values = stmts.iter().filter(|s| s.predicate == predicate);
        let Some(first) = values.next() else {
            return Ok(None);
        };
        if values.next().is_some() {
            return Err(incoherent(format!("more than one {predicate}")));
        }
        first
            .object
            .as_literal()
            .and_then(|l| l.lexical.trim().parse().ok())
            .map(Some)
            .ok_or_else(|| incoherent(format!("{predicate} is not an integer")))
    };
    let instant = |[year, month, day]: [&str; 3]| -> TemporaResult<Option<TimeInstant>> {
        let Some(y) = field(year)? else {
            return Ok(None);
        };
        let to_i32 = |v: i64| i32::try_from(v).map_err(|_| incoherent(format!("{v} is out of range")));
        let to_u32 = |v: i64| u32::try_from(v).map_err(|_| incoherent(format!("{v} is out of range")));
        let m = field(month)?.map(to_u32).transpose()?;
        let d = field(day)?.map(to_u32).transpose()?;
        TimeInstant::new(to_i32(y)?, m, d)
            .map(Some)
            .map_err(|e| incoherent(e.to_string()))
    };

    let unit = stmts
        .iter()
        .find(|s| s.predicate == meta::UNIT_TYPE)
        .and_then(|s| s.object.as_iri())
        .ok_or_else(|| incoherent("missing unit type".to_string()))?;

    if unit == meta::UNIT_ORIGIN {
        let end = instant([meta::END_YEAR, meta::END_MONTH, meta::END_DAY])?
            .ok_or_else(|| incoherent("origin-start record without an end".to_string()))?;
        return TimeSpan::between(TimeInstant::origin(), end).map_err(|e| incoherent(e.to_string()));
    }

    let start = instant([meta::YEAR, meta::MONTH, meta::DAY])?
        .ok_or_else(|| incoherent("missing start year".to_string()))?;
    let expected = match unit {
        meta::UNIT_YEAR => Precision::Year,
        meta::UNIT_MONTH => Precision::Month,
        meta::UNIT_DAY => Precision::Day,
        other => return Err(incoherent(format!("unknown unit type {other}"))),
    };
    if start.precision() != Some(expected) {
        return Err(incoherent(format!("start {start} does not have {expected} precision")));
    }

    let to_u32 = |v: i64| u32::try_from(v).map_err(|_| incoherent(format!("{v} is out of range")));
    let years = field(meta::DURATION_YEARS)?.map(to_u32).transpose()?;
    let months = field(meta::DURATION_MONTHS)?.map(to_u32).transpose()?;
    let days = field(meta::DURATION_DAYS)?.map(to_u32).transpose()?;
    if years.is_none() && months.is_none() && days.is_none() {
        return Ok(TimeSpan::starting_at(start));
    }
    TimeSpan::lasting(start, crate::time::SpanDuration::new(years, months, days))
        .map_err(|e| incoherent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::time::SpanDuration;

    fn meta_id() -> ContainerId {
        ContainerId::new("meta")
    }

    #[test]
    fn decodes_what_it_encodes() {
        let spans = [
            TimeSpan::between(TimeInstant::year(1950).unwrap(), TimeInstant::year(1960).unwrap()).unwrap(),
            TimeSpan::starting_at(TimeInstant::year_month(1950, 3).unwrap()),
            TimeSpan::lasting(TimeInstant::ymd(1950, 1, 31).unwrap(), SpanDuration::new(None, Some(1), Some(2))).unwrap(),
            TimeSpan::between(TimeInstant::origin(), TimeInstant::year(1800).unwrap()).unwrap(),
        ];
        let mut statements = Vec::new();
        for (i, span) in spans.iter().enumerate() {
            statements.extend(encode(&ContainerId::new(format!("p{i}")), span));
        }
        let decoded = decode_all(statements, &meta_id()).unwrap();
        assert_eq!(decoded.len(), spans.len());
        for (i, span) in spans.iter().enumerate() {
            let (id, got) = &decoded[i];
            assert_eq!(id.as_str(), format!("p{i}"));
            assert_eq!(got.canonicalize(), span.canonicalize());
        }
    }

    #[test]
    fn duration_fields_only_for_fixed_spans() {
        let open = encode(&ContainerId::new("p"), &TimeSpan::starting_at(TimeInstant::year(1950).unwrap()));
        assert!(open.iter().all(|s| s.predicate != meta::DURATION_YEARS));
        assert!(open.iter().any(|s| s.object == Term::iri(meta::UNIT_YEAR)));
    }

    #[test]
    fn malformed_record_is_incoherent() {
        let p = ContainerId::new("p");
        let mut statements = encode(&p, &TimeSpan::starting_at(TimeInstant::year(1950).unwrap()));
        statements.retain(|s| s.predicate != meta::YEAR);
        let err = decode_all(statements, &meta_id()).unwrap_err();
        assert!(err.is_incoherent());
    }

    #[test]
    fn unrelated_subjects_are_ignored() {
        let stray = Statement::new("http://x", "http://p", Term::literal("v"));
        assert!(decode_all(vec![stray], &meta_id()).unwrap().is_empty());
    }
}
