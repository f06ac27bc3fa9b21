//! Time dimension index over partition metadata.
//!
//! The indexer answers "which partitions are valid at instant T". It is built
//! from the metadata container with one scan and then kept current by the
//! store, which calls [`TimeDimensionIndexer::add`] for every partition it
//! creates.

mod interval;
pub(crate) mod record;

use tracing::debug;

use crate::error::{ExecutionError, TemporaResult};
use crate::statement::StatementPattern;
use crate::storage::{ContainerId, StatementStore};
use crate::time::{TimeInstant, TimeSpan};

pub use interval::IntervalIndex;

use interval::UNBOUNDED;

#[derive(Debug, Clone, Default)]
enum IndexState {
    #[default]
    Uninitialized,
    Built(IntervalIndex),
}

/// Interval index from partition id to its day-number bounds.
///
/// Starts `Uninitialized`; [`build`](Self::build) or the first
/// [`add`](Self::add) moves it to `Built`, after which it stays built.
///
/// # Examples
///
/// ```
/// use tempora::{ContainerId, TimeDimensionIndexer, TimeInstant, TimeSpan};
///
/// let mut index = TimeDimensionIndexer::new();
/// assert!(index.graphs_for_instant(&TimeInstant::year(1955).unwrap()).is_err());
///
/// let fifties = TimeSpan::between(TimeInstant::year(1950).unwrap(), TimeInstant::year(1960).unwrap()).unwrap();
/// index.add(ContainerId::new("g-50s"), &fifties);
/// let hits = index.graphs_for_instant(&TimeInstant::year(1955).unwrap()).unwrap();
/// assert_eq!(hits, vec![ContainerId::new("g-50s")]);
/// assert!(index.graphs_for_instant(&TimeInstant::year(1970).unwrap()).unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimeDimensionIndexer {
    state: IndexState,
}

impl TimeDimensionIndexer {
    /// Create an uninitialized indexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_built(&self) -> bool {
        matches!(self.state, IndexState::Built(_))
    }

    /// Number of indexed partitions (zero when uninitialized).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.state {
            IndexState::Built(index) => index.len(),
            IndexState::Uninitialized => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scans every metadata record in `metadata` and replaces the index.
    ///
    /// Returns the number of indexed partitions.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, and `IncoherentData` for malformed records.
    pub fn build(&mut self, store: &dyn StatementStore, metadata: &ContainerId) -> TemporaResult<usize> {
        let statements = store
            .match_statements(Some(metadata), &StatementPattern::any())?
            .into_iter()
            .map(|quad| quad.statement);
        let records = record::decode_all(statements, metadata)?;
        self.build_from(records.iter().map(|(id, span)| (id.clone(), span)));
        let count = self.len();
        debug!(partitions = count, metadata = %metadata, "time dimension index built");
        Ok(count)
    }

    /// Replaces the index with the given partitions.
    pub fn build_from<'a>(&mut self, partitions: impl IntoIterator<Item = (ContainerId, &'a TimeSpan)>) {
        let index = IntervalIndex::from_entries(partitions.into_iter().map(|(id, span)| {
            let (lower, upper) = bounds(span);
            (id, lower, upper)
        }));
        self.state = IndexState::Built(index);
    }

    /// Incorporates one partition. Initializes an empty index first if needed.
    pub fn add(&mut self, partition: ContainerId, span: &TimeSpan) {
        let (lower, upper) = bounds(span);
        if let IndexState::Uninitialized = self.state {
            self.state = IndexState::Built(IntervalIndex::new());
        }
        if let IndexState::Built(index) = &mut self.state {
            index.insert(partition, lower, upper);
        }
    }

    /// Partitions whose span contains `instant`.
    ///
    /// An empty result means nothing is recorded for that time.
    ///
    /// # Errors
    ///
    /// Returns `NoIndexAvailable` before the index has been built.
    pub fn graphs_for_instant(&self, instant: &TimeInstant) -> TemporaResult<Vec<ContainerId>> {
        let index = self.built()?;
        let (lower, upper) = instant.day_range();
        Ok(index.overlapping(lower, upper))
    }

    /// Partitions whose span overlaps `span`.
    ///
    /// # Errors
    ///
    /// Returns `NoIndexAvailable` before the index has been built.
    pub fn graphs_overlapping(&self, span: &TimeSpan) -> TemporaResult<Vec<ContainerId>> {
        let index = self.built()?;
        let (lower, upper) = bounds(span);
        Ok(index.overlapping(lower, upper))
    }

    fn built(&self) -> TemporaResult<&IntervalIndex> {
        match &self.state {
            IndexState::Built(index) => Ok(index),
            IndexState::Uninitialized => Err(ExecutionError::NoIndexAvailable.into()),
        }
    }
}

fn bounds(span: &TimeSpan) -> (i64, i64) {
    let (lower, upper) = span.day_bounds();
    (lower, upper.unwrap_or(UNBOUNDED))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::InMemoryStatementStore;
    use crate::time::SpanDuration;

    fn year(y: i32) -> TimeInstant {
        TimeInstant::year(y).unwrap()
    }

    #[test]
    fn query_before_build_is_a_usage_error() {
        let index = TimeDimensionIndexer::new();
        let err = index.graphs_for_instant(&year(1955)).unwrap_err();
        assert!(err.is_usage_error());
        assert!(!index.is_built());
    }

    #[test]
    fn built_but_empty_is_not_an_error() {
        let store = InMemoryStatementStore::new();
        let meta = ContainerId::new("meta");
        store.create_container(&meta).unwrap();

        let mut index = TimeDimensionIndexer::new();
        assert_eq!(index.build(&store, &meta).unwrap(), 0);
        assert!(index.is_built());
        assert!(index.graphs_for_instant(&year(1955)).unwrap().is_empty());
    }

    #[test]
    fn build_reads_metadata_records() {
        let store = InMemoryStatementStore::new();
        let meta = ContainerId::new("meta");
        store.create_container(&meta).unwrap();

        let fifties = TimeSpan::lasting(year(1950), SpanDuration::years(10)).unwrap();
        let from_1955 = TimeSpan::starting_at(TimeInstant::year_month(1955, 6).unwrap());
        for (id, span) in [("g-50s", &fifties), ("g-55", &from_1955)] {
            for stmt in record::encode(&ContainerId::new(id), span) {
                store.insert(&meta, stmt).unwrap();
            }
        }

        let mut index = TimeDimensionIndexer::new();
        assert_eq!(index.build(&store, &meta).unwrap(), 2);
        assert_eq!(
            index.graphs_for_instant(&year(1955)).unwrap(),
            vec![ContainerId::new("g-50s"), ContainerId::new("g-55")]
        );
        assert_eq!(
            index.graphs_for_instant(&TimeInstant::ymd(1955, 1, 1).unwrap()).unwrap(),
            vec![ContainerId::new("g-50s")]
        );
        assert_eq!(index.graphs_for_instant(&year(2020)).unwrap(), vec![ContainerId::new("g-55")]);
        assert!(index.graphs_for_instant(&year(1949)).unwrap().is_empty());
    }

    #[test]
    fn add_initializes_and_updates_in_place() {
        let mut index = TimeDimensionIndexer::new();
        let until_1800 = TimeSpan::between(TimeInstant::origin(), year(1800)).unwrap();
        index.add(ContainerId::new("old"), &until_1800);
        assert!(index.is_built());
        assert_eq!(index.graphs_for_instant(&year(1200)).unwrap(), vec![ContainerId::new("old")]);
        assert!(index.graphs_for_instant(&year(1800)).unwrap().is_empty());

        index.add(ContainerId::new("new"), &TimeSpan::starting_at(year(1790)));
        assert_eq!(index.len(), 2);
        assert_eq!(index.graphs_for_instant(&year(1795)).unwrap().len(), 2);
    }
}
