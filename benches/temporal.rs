use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use tempora::{
    ContainerId, IntervalIndex, PoolConfig, Statement, StoreConfig, TemporalStore, Term, TimeInstant, TimeSpan,
};

fn decade_store(partitions: i32, per_partition: i32) -> TemporalStore {
    let store = TemporalStore::in_memory(StoreConfig::default()).unwrap();
    for p in 0..partitions {
        let start = 1000 + p * 5;
        let span = TimeSpan::between(TimeInstant::year(start).unwrap(), TimeInstant::year(start + 10).unwrap()).unwrap();
        let statements = (0..per_partition)
            .flat_map(|i| {
                let subject = format!("http://bench/p{p}/e{i}");
                let next = format!("http://bench/p{p}/e{}", (i + 1) % per_partition);
                [
                    Statement::type_assertion(subject.clone(), "http://bench/Node"),
                    Statement::new(subject, "http://bench/next", Term::iri(next)),
                ]
            })
            .collect();
        store.add_all(Some(&span), statements).unwrap();
    }
    store
}

fn bench_interval_index(c: &mut Criterion) {
    let index = IntervalIndex::from_entries((0..10_000u32).map(|i| {
        let lower = i64::from(i) * 37 % 100_000;
        (ContainerId::new(format!("g{i}")), lower, lower + 365 * 10)
    }));

    let mut group = c.benchmark_group("interval_index");
    group.throughput(Throughput::Elements(1));
    group.bench_function("overlapping_point_10k", |b| {
        b.iter(|| index.overlapping(black_box(50_000), black_box(50_001)));
    });
    group.finish();
}

fn bench_snapshot_and_pool(c: &mut Criterion) {
    let store = decade_store(200, 50);
    let instant = TimeInstant::year(1500).unwrap();

    let mut group = c.benchmark_group("temporal_store");
    group.bench_function("snapshot_at", |b| {
        b.iter(|| store.snapshot_at(black_box(&instant)).unwrap());
    });

    let snapshot = store.snapshot_at(&instant).unwrap();
    group.throughput(Throughput::Elements(snapshot.resources_of_type("http://bench/Node").len() as u64));
    group.bench_function("build_pool", |b| {
        b.iter(|| snapshot.build_pool(&PoolConfig::new()).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_interval_index, bench_snapshot_and_pool);
criterion_main!(benches);
