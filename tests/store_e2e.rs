use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tempora::{
    ContainerId, EntitySchema, InMemoryStatementStore, LiteralKind, SchemaRegistry, SpanDuration, Statement,
    StatementPattern, StatementStore, StoreConfig, TemporalStore, Term, TimeBasedEntity, TimeInstant, TimeSpan,
    Value,
};

const BUILDING: &str = "http://ex/Building";
const TITLE: &str = "http://purl.org/dc/terms/title";
const HEIGHT: &str = "http://ex/height";

fn span(start: i32, end: i32) -> TimeSpan {
    TimeSpan::between(TimeInstant::year(start).unwrap(), TimeInstant::year(end).unwrap()).unwrap()
}

#[test]
fn old_hall_is_visible_only_in_its_decade() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let typed = Statement::type_assertion("http://ex/x", BUILDING);
    let titled = Statement::new("http://ex/x", TITLE, Term::literal("Old Hall"));

    store.add(Some(&span(1950, 1960)), typed.clone()).unwrap();
    store.add(Some(&TimeSpan::existence()), titled.clone()).unwrap();

    let in_1955 = store.snapshot_at(&TimeInstant::year(1955).unwrap()).unwrap();
    assert!(in_1955.contains(&typed));
    assert!(in_1955.contains(&titled));
    assert_eq!(in_1955.len(), 2);

    let in_1970 = store.snapshot_at(&TimeInstant::year(1970).unwrap()).unwrap();
    assert!(!in_1970.contains(&typed));
    assert!(in_1970.contains(&titled));
    assert_eq!(in_1970.len(), 1);

    assert_eq!(store.partitions().unwrap().len(), 1);
}

#[test]
fn new_partitions_are_indexed_immediately() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let decade = span(1950, 1960);
    let id = store
        .add(Some(&decade), Statement::new("http://ex/x", HEIGHT, Term::integer(30)))
        .unwrap()
        .expect("dated span goes to a partition");

    assert_eq!(store.partition_id(&decade), Some(id.clone()));
    assert!(store.partition(&decade).unwrap().is_some());
    for instant in [
        TimeInstant::year(1950).unwrap(),
        TimeInstant::year_month(1954, 6).unwrap(),
        TimeInstant::ymd(1959, 12, 31).unwrap(),
    ] {
        assert!(store.graphs_for_instant(&instant).unwrap().contains(&id), "{instant}");
    }
    assert!(store.graphs_for_instant(&TimeInstant::year(1960).unwrap()).unwrap().is_empty());
}

#[test]
fn existence_span_never_creates_a_partition() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    assert_eq!(
        store
            .add(Some(&TimeSpan::existence()), Statement::new("http://ex/x", TITLE, Term::literal("A")))
            .unwrap(),
        None
    );
    assert_eq!(store.add(None, Statement::new("http://ex/y", TITLE, Term::literal("B"))).unwrap(), None);
    assert!(store.partitions().unwrap().is_empty());
    assert!(store.graphs_for_instant(&TimeInstant::year(2000).unwrap()).unwrap().is_empty());
    assert_eq!(store.snapshot_at(&TimeInstant::year(2000).unwrap()).unwrap().len(), 2);
}

#[test]
fn purge_removes_the_subject_from_every_container() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    store.add(Some(&span(1950, 1960)), Statement::type_assertion("http://ex/x", BUILDING)).unwrap();
    store
        .add(Some(&span(1950, 1960)), Statement::new("http://ex/x", HEIGHT, Term::integer(30)))
        .unwrap();
    store
        .add(Some(&span(1970, 1980)), Statement::new("http://ex/x", HEIGHT, Term::integer(45)))
        .unwrap();
    store.add_global(Statement::new("http://ex/x", TITLE, Term::literal("Old Hall"))).unwrap();
    store
        .add_global(Statement::new("http://ex/y", TITLE, Term::literal("Kept")))
        .unwrap();

    assert_eq!(store.purge("http://ex/x").unwrap(), 4);
    assert!(!store.contains_entity("http://ex/x").unwrap());

    let everything = store.snapshot_all().unwrap();
    let pattern = StatementPattern::any().subject("http://ex/x");
    assert_eq!(everything.match_statements(&pattern).count(), 0);
    assert_eq!(everything.len(), 1);

    assert!(store.purge("http://ex/x").unwrap_err().is_not_found());
}

#[test]
fn removing_from_a_missing_partition_is_a_no_op() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let stmt = Statement::new("http://ex/x", HEIGHT, Term::integer(1));
    assert!(!store.remove(Some(&span(1800, 1810)), &stmt).unwrap());
    assert!(store.partitions().unwrap().is_empty());
}

#[test]
fn reopening_rebuilds_partitions_from_metadata() {
    let backend: Arc<dyn StatementStore> = Arc::new(InMemoryStatementStore::new());
    let first = TemporalStore::open(StoreConfig::default(), Arc::clone(&backend)).unwrap();
    let id = first
        .add(Some(&span(1950, 1960)), Statement::type_assertion("http://ex/x", BUILDING))
        .unwrap()
        .unwrap();
    drop(first);

    let reopened = TemporalStore::open(StoreConfig::default(), backend).unwrap();
    assert_eq!(reopened.graphs_for_instant(&TimeInstant::year(1951).unwrap()).unwrap(), vec![id]);
    assert_eq!(reopened.entity_lifetime("http://ex/x").unwrap(), span(1950, 1960).canonicalize());
}

#[test]
fn explicit_container_snapshots() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let fifties = store
        .add(Some(&span(1950, 1960)), Statement::type_assertion("http://ex/a", BUILDING))
        .unwrap()
        .unwrap();
    store
        .add(Some(&span(1970, 1980)), Statement::type_assertion("http://ex/b", BUILDING))
        .unwrap();

    let snapshot = store.snapshot_of(&[fifties.clone(), store.global_container().clone()]).unwrap();
    assert_eq!(snapshot.partitions(), &[fifties]);
    assert_eq!(snapshot.resources_of_type(BUILDING), vec!["http://ex/a".to_string()]);
    assert!(store
        .snapshot_of(&[ContainerId::new("http://nowhere/tg-1")])
        .is_err());
}

#[test]
fn snapshots_never_observe_half_a_mutation() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::Acquire) {
                    let snapshot = store.snapshot_all().unwrap();
                    assert_eq!(snapshot.len() % 2, 0, "snapshot split a pair");
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for i in 0..200 {
        let subject = format!("http://ex/item{i}");
        let decade = span(1900 + (i % 10) * 10, 1910 + (i % 10) * 10);
        store
            .add_all(
                Some(&decade),
                vec![
                    Statement::type_assertion(subject.clone(), BUILDING),
                    Statement::new(subject, HEIGHT, Term::integer(i64::from(i))),
                ],
            )
            .unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.snapshot_all().unwrap().len(), 400);
    assert_eq!(store.partitions().unwrap().len(), 10);
}

fn renamed_hall() -> (TimeBasedEntity, Arc<SchemaRegistry>) {
    let schema = SchemaRegistry::new().with(EntitySchema::new(BUILDING).literal("name", TITLE, LiteralKind::String));
    let lifetime = TimeSpan::lasting(
        TimeInstant::year(500).unwrap(),
        SpanDuration::new(Some(500), Some(10), Some(10)),
    )
    .unwrap();
    let mut hall = TimeBasedEntity::new("http://ex/hall", BUILDING, lifetime);
    hall.set_literal("name", "This is a nice building");
    hall.set_literal_during(span(700, 900), "name", "but not from 700-900")
        .unwrap();
    (hall, Arc::new(schema))
}

#[test]
fn time_based_entity_round_trips_through_partitions() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let (hall, schema) = renamed_hall();
    store.add_entity_over_time(&hall, &schema).unwrap();
    assert!(store.add_entity_over_time(&hall, &schema).is_err());
    // Lifetime plus three versions.
    assert_eq!(store.partitions().unwrap().len(), 4);

    let loaded = store.entity_over_time("http://ex/hall", &schema).unwrap();
    assert_eq!(loaded.lifetime(), &hall.lifetime().canonicalize());
    assert_eq!(loaded.type_iri(), BUILDING);
    let name_at = |y| {
        loaded
            .entity_at(TimeInstant::year(y).unwrap())
            .unwrap()
            .literal("name")
            .cloned()
    };
    assert_eq!(name_at(600), Some(Value::from("This is a nice building")));
    assert_eq!(name_at(800), Some(Value::from("but not from 700-900")));
    assert_eq!(name_at(950), Some(Value::from("This is a nice building")));
    assert!(loaded.entity_at(TimeInstant::year(1100).unwrap()).is_err());
    assert_eq!(loaded.versions().len(), 3);

    let at_800 = store
        .entity_at("http://ex/hall", &TimeInstant::year(800).unwrap(), Arc::clone(&schema))
        .unwrap();
    assert_eq!(at_800.literal("name"), Some(&Value::from("but not from 700-900")));
    assert!(store
        .entity_at("http://ex/hall", &TimeInstant::year(1100).unwrap(), Arc::clone(&schema))
        .unwrap_err()
        .is_not_found());
    assert!(store.entity_over_time("http://ex/missing", &schema).unwrap_err().is_not_found());
}

#[test]
fn changing_a_time_based_entity_replaces_its_history() {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    let (hall, schema) = renamed_hall();
    store.add_entity_over_time(&hall, &schema).unwrap();

    let mut plain = TimeBasedEntity::new("http://ex/hall", BUILDING, *hall.lifetime());
    plain.set_literal("name", "Hall");
    store.change_entity_over_time(&plain, &schema).unwrap();

    let loaded = store.entity_over_time("http://ex/hall", &schema).unwrap();
    assert_eq!(loaded.versions().len(), 1);
    let at_800 = loaded.entity_at(TimeInstant::year(800).unwrap()).unwrap();
    assert_eq!(at_800.literals("name"), &[Value::from("Hall")]);
}
