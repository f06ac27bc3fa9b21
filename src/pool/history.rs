//! Entities whose property values change over their lifetime.
//!
//! A [`TimeBasedEntity`] keeps, per slot, an ordered list of assignments, each
//! valid during a span inside the entity's lifetime. A later assignment
//! overrides earlier ones where their spans overlap, so a building named A for
//! its whole life and B during one decade reads as A, then B, then A again.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{TemporaError, TemporaResult};
use crate::pool::entity::{Entity, Link};
use crate::time::{TimeInstant, TimeSpan};
use crate::value::Value;

/// One value held by a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    Literal(Value),
    /// Key of the referenced resource.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Assignment {
    span: TimeSpan,
    slot: String,
    values: Vec<SlotValue>,
}

/// The state of a time-based entity during one stretch of its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityVersion {
    span: TimeSpan,
    entity: Entity,
}

impl EntityVersion {
    /// The canonical span this version is valid for.
    #[must_use]
    pub const fn span(&self) -> &TimeSpan {
        &self.span
    }

    #[must_use]
    pub const fn entity(&self) -> &Entity {
        &self.entity
    }

    #[must_use]
    pub fn into_entity(self) -> Entity {
        self.entity
    }
}

/// An entity with a lifetime and a value history per slot.
///
/// # Examples
///
/// ```
/// use tempora::{SpanDuration, TimeBasedEntity, TimeInstant, TimeSpan, Value};
///
/// let year = |y| TimeInstant::year(y).unwrap();
/// let life = TimeSpan::lasting(year(500), SpanDuration::years(500)).unwrap();
/// let mut hall = TimeBasedEntity::new("http://ex/hall", "http://ex/Building", life);
/// hall.set_literal("name", "Old Hall");
/// hall.set_literal_during(TimeSpan::between(year(700), year(900)).unwrap(), "name", "New Hall")
///     .unwrap();
///
/// let at = |y| hall.entity_at(year(y)).unwrap().literal("name").cloned();
/// assert_eq!(at(600), Some(Value::from("Old Hall")));
/// assert_eq!(at(800), Some(Value::from("New Hall")));
/// assert_eq!(at(950), Some(Value::from("Old Hall")));
/// assert_eq!(hall.versions().len(), 3);
/// assert!(hall.entity_at(year(1100)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedEntity {
    uri: String,
    type_iri: String,
    lifetime: TimeSpan,
    assignments: Vec<Assignment>,
}

impl TimeBasedEntity {
    #[must_use]
    pub fn new(uri: impl Into<String>, type_iri: impl Into<String>, lifetime: TimeSpan) -> Self {
        Self {
            uri: uri.into(),
            type_iri: type_iri.into(),
            lifetime,
            assignments: Vec::new(),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn type_iri(&self) -> &str {
        &self.type_iri
    }

    #[must_use]
    pub const fn lifetime(&self) -> &TimeSpan {
        &self.lifetime
    }

    /// Sets `slot` to `value` for the whole lifetime.
    pub fn set_literal(&mut self, slot: impl Into<String>, value: impl Into<Value>) {
        let span = self.lifetime;
        self.push(span, slot.into(), vec![SlotValue::Literal(value.into())]);
    }

    /// Points `slot` at `target` for the whole lifetime.
    pub fn set_reference(&mut self, slot: impl Into<String>, target: impl Into<String>) {
        let span = self.lifetime;
        self.push(span, slot.into(), vec![SlotValue::Reference(target.into())]);
    }

    /// Sets `slot` to `value` during `span`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `span` is not inside the lifetime.
    pub fn set_literal_during(
        &mut self,
        span: TimeSpan,
        slot: impl Into<String>,
        value: impl Into<Value>,
    ) -> TemporaResult<()> {
        self.assign(span, slot.into(), vec![SlotValue::Literal(value.into())])
    }

    /// Points `slot` at `target` during `span`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `span` is not inside the lifetime.
    pub fn set_reference_during(
        &mut self,
        span: TimeSpan,
        slot: impl Into<String>,
        target: impl Into<String>,
    ) -> TemporaResult<()> {
        self.assign(span, slot.into(), vec![SlotValue::Reference(target.into())])
    }

    /// Slots with at least one assignment, sorted.
    #[must_use]
    pub fn slots(&self) -> BTreeSet<&str> {
        self.assignments.iter().map(|a| a.slot.as_str()).collect()
    }

    /// Assignments to `slot` in the order they were made, each with its span.
    pub fn history<'a>(&'a self, slot: &'a str) -> impl Iterator<Item = (&'a TimeSpan, &'a [SlotValue])> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.slot == slot)
            .map(|a| (&a.span, a.values.as_slice()))
    }

    /// The entity as it was at `instant`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `instant` lies outside the lifetime.
    pub fn entity_at(&self, instant: TimeInstant) -> TemporaResult<Entity> {
        if !self.lifetime.contains(instant) {
            return Err(TemporaError::invalid_operation(format!(
                "{instant} is outside the lifetime {} of {}",
                self.lifetime, self.uri
            )));
        }
        Ok(self.build(&self.current(|span| span.contains(instant))))
    }

    /// Chronologically ordered, non-overlapping versions covering the whole
    /// lifetime. Adjacent stretches with identical values form one version.
    #[must_use]
    pub fn versions(&self) -> Vec<EntityVersion> {
        let boundaries = self.boundaries();
        let mut stretches: Vec<TimeSpan> = boundaries
            .windows(2)
            .filter_map(|pair| TimeSpan::between(pair[0], pair[1]).ok())
            .collect();
        if self.lifetime.end().is_none() {
            if let Some(last) = boundaries.last() {
                stretches.push(TimeSpan::starting_at(*last));
            }
        }

        let mut merged: Vec<(TimeSpan, BTreeMap<&str, &[SlotValue]>)> = Vec::new();
        for stretch in stretches {
            let values = self.current(|span| span.contains(stretch));
            match merged.last_mut() {
                Some((span, previous)) if *previous == values => {
                    *span = match stretch.end() {
                        Some(end) => TimeSpan::between(span.start(), end).unwrap_or(*span),
                        None => TimeSpan::starting_at(span.start()),
                    };
                }
                _ => merged.push((stretch, values)),
            }
        }

        merged
            .into_iter()
            .map(|(span, values)| EntityVersion {
                span: span.canonicalize(),
                entity: self.build(&values),
            })
            .collect()
    }

    pub(crate) fn assign(&mut self, span: TimeSpan, slot: String, values: Vec<SlotValue>) -> TemporaResult<()> {
        if !self.lifetime.contains(span) {
            return Err(TemporaError::invalid_operation(format!(
                "{span} is outside the lifetime {} of {}",
                self.lifetime, self.uri
            )));
        }
        self.push(span, slot, values);
        Ok(())
    }

    /// Records every slot of a materialized fragment as valid during `span`.
    pub(crate) fn assign_fragment(&mut self, span: TimeSpan, fragment: &Entity) -> TemporaResult<()> {
        for slot in fragment.literal_slots() {
            let values = fragment.literals(slot).iter().cloned().map(SlotValue::Literal).collect();
            self.assign(span, slot.to_string(), values)?;
        }
        for slot in fragment.reference_slots() {
            let values = fragment
                .reference_targets(slot)
                .into_iter()
                .map(|target| SlotValue::Reference(target.to_string()))
                .collect();
            self.assign(span, slot.to_string(), values)?;
        }
        Ok(())
    }

    fn push(&mut self, span: TimeSpan, slot: String, values: Vec<SlotValue>) {
        self.assignments.push(Assignment { span, slot, values });
    }

    /// Per slot, the values of the latest assignment whose span passes `holds`.
    fn current(&self, holds: impl Fn(&TimeSpan) -> bool) -> BTreeMap<&str, &[SlotValue]> {
        let mut values = BTreeMap::new();
        for assignment in self.assignments.iter().filter(|a| holds(&a.span)) {
            values.insert(assignment.slot.as_str(), assignment.values.as_slice());
        }
        values
    }

    /// Lifetime start, every assignment start and end, and the lifetime end,
    /// ordered and deduplicated by first day.
    fn boundaries(&self) -> Vec<TimeInstant> {
        let mut instants = vec![self.lifetime.start()];
        instants.extend(self.lifetime.end());
        for assignment in &self.assignments {
            instants.push(assignment.span.start());
            instants.extend(assignment.span.end());
        }
        instants.sort_by_key(|instant| instant.day_range().0);
        instants.dedup_by_key(|instant| instant.day_range().0);
        instants
    }

    fn build(&self, values: &BTreeMap<&str, &[SlotValue]>) -> Entity {
        let mut entity = Entity::new(self.uri.clone(), self.type_iri.clone());
        for (slot, slot_values) in values {
            for value in *slot_values {
                match value {
                    SlotValue::Literal(value) => entity.push_literal((*slot).to_string(), value.clone()),
                    SlotValue::Reference(target) => {
                        entity.push_link((*slot).to_string(), Link::new(*slot, target.clone()));
                    }
                }
            }
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::time::SpanDuration;

    const BUILDING: &str = "http://ex/Building";

    fn year(y: i32) -> TimeInstant {
        TimeInstant::year(y).unwrap()
    }

    fn span(from: i32, to: i32) -> TimeSpan {
        TimeSpan::between(year(from), year(to)).unwrap()
    }

    fn name_at(entity: &TimeBasedEntity, y: i32) -> Option<Value> {
        entity.entity_at(year(y)).unwrap().literal("name").cloned()
    }

    fn renamed_hall() -> TimeBasedEntity {
        let lifetime = TimeSpan::lasting(year(500), SpanDuration::new(Some(500), Some(10), Some(10))).unwrap();
        let mut hall = TimeBasedEntity::new("http://ex/hall", BUILDING, lifetime);
        hall.set_literal("name", "This is a nice building");
        hall.set_literal_during(span(700, 900), "name", "but not from 700-900")
            .unwrap();
        hall
    }

    #[test]
    fn later_assignments_override_inside_their_span() {
        let hall = renamed_hall();
        assert_eq!(name_at(&hall, 600), Some(Value::from("This is a nice building")));
        assert_eq!(name_at(&hall, 800), Some(Value::from("but not from 700-900")));
        assert_eq!(name_at(&hall, 950), Some(Value::from("This is a nice building")));
        assert_eq!(hall.history("name").count(), 2);
    }

    #[test]
    fn instants_outside_the_lifetime_are_rejected() {
        let hall = renamed_hall();
        assert!(hall.entity_at(year(1100)).is_err());
        assert!(hall.entity_at(year(400)).is_err());
    }

    #[test]
    fn assignments_must_fit_the_lifetime() {
        let lifetime = TimeSpan::lasting(
            TimeInstant::ymd(100, 10, 2).unwrap(),
            SpanDuration::new(Some(10), Some(10), Some(10)),
        )
        .unwrap();
        let mut entity = TimeBasedEntity::new("http://ex/e", BUILDING, lifetime);
        assert!(entity.set_literal_during(TimeSpan::starting_at(year(600)), "name", "lila").is_err());
        let open_ended = TimeSpan::starting_at(TimeInstant::ymd(100, 11, 2).unwrap());
        assert!(entity.set_literal_during(open_ended, "name", "lila").is_err());
        assert!(entity.slots().is_empty());
    }

    #[test]
    fn versions_are_ascending_and_cover_the_lifetime() {
        let hall = renamed_hall();
        let versions = hall.versions();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].span().start(), year(500));
        assert_eq!(versions[1].span().start(), year(700));
        assert_eq!(versions[2].span().start(), year(900));
        assert_eq!(versions[2].span().end(), hall.lifetime().end());
        for pair in versions.windows(2) {
            assert_eq!(pair[0].span().end(), Some(pair[1].span().start()));
            assert!(!pair[0].span().overlaps(pair[1].span()));
        }
        assert_eq!(
            versions[1].entity().literal("name"),
            Some(&Value::from("but not from 700-900"))
        );
    }

    #[test]
    fn a_single_assignment_gives_one_version_spanning_the_lifetime() {
        let lifetime = TimeSpan::between(TimeInstant::ymd(0, 4, 2).unwrap(), TimeInstant::ymd(1637, 9, 28).unwrap())
            .unwrap();
        let mut entity = TimeBasedEntity::new("http://ex/e", BUILDING, lifetime);
        entity.set_literal("name", "only");
        let versions = entity.versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(*versions[0].span(), lifetime.canonicalize());
    }

    #[test]
    fn identical_neighbours_merge_and_open_lifetimes_stay_open() {
        let mut entity = TimeBasedEntity::new("http://ex/e", BUILDING, TimeSpan::starting_at(year(1900)));
        entity.set_reference("architect", "http://ex/a");
        entity
            .set_reference_during(span(1950, 1960), "architect", "http://ex/a")
            .unwrap();
        let versions = entity.versions();
        assert_eq!(versions.len(), 1);
        assert_eq!(*versions[0].span(), TimeSpan::starting_at(year(1900)));
        assert_eq!(versions[0].entity().reference_targets("architect"), vec!["http://ex/a"]);
    }
}
