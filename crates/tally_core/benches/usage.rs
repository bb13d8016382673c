use std::{collections::BTreeSet, hint::black_box};

use criterion::{Criterion, criterion_group, criterion_main};
use tally_chainbase::Database;
use tally_core::{
    name::Name,
    resource::ResourceLimitsConfig,
    resource_limits::ResourceLimitsManager,
    utils::{UsageAccumulator, decay},
};

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("decay 1M idle slots", |b| {
        b.iter(|| decay(black_box(123_456_789), black_box(1_000_000), black_box(172_800)))
    });

    c.bench_function("accumulator add", |b| {
        let mut accumulator = UsageAccumulator::default();
        let mut slot = 0u32;
        b.iter(|| {
            slot += 1;
            accumulator.add(black_box(1_000), slot, 172_800).unwrap()
        })
    });

    let dir = tempfile::tempdir().unwrap();
    let db = Database::temporary(dir.path()).unwrap();
    let mut session = db.undo_session().unwrap();
    let manager =
        ResourceLimitsManager::initialize_database(&mut session, ResourceLimitsConfig::default())
            .unwrap();
    let accounts: BTreeSet<Name> = (1..=4).map(Name::new).collect();
    for account in &accounts {
        manager.initialize_account(&mut session, account).unwrap();
    }
    let mut slot = 0u32;
    c.bench_function("charge and finalize", |b| {
        b.iter(|| {
            manager
                .charge_transaction_usage(&mut session, &accounts, 100, 100, slot)
                .unwrap();
            manager.finalize_block(&mut session, slot).unwrap();
            slot += 1;
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
