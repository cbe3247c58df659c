use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};

use stockbook_core::{CostLayerId, ItemId};
use stockbook_inventory::{CostLayer, consume_fifo, valuation};

fn seed_layers(n: i64) -> Vec<CostLayer> {
    let item_id = ItemId::new();
    let base = Utc::now();
    (0..n)
        .map(|i| {
            CostLayer::new(
                CostLayerId::new(),
                item_id,
                10 + (i % 7),
                5.0 + (i % 13) as f64,
                base + Duration::seconds(i),
            )
        })
        .collect()
}

fn bench_consume(c: &mut Criterion) {
    c.bench_function("consume_fifo_1000_layers", |b| {
        b.iter_batched(
            || seed_layers(1000),
            |mut layers| consume_fifo(&mut layers, 5_000, None),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_valuation(c: &mut Criterion) {
    let layers = seed_layers(1000);
    c.bench_function("valuation_1000_layers", |b| b.iter(|| valuation(&layers)));
}

criterion_group!(benches, bench_consume, bench_valuation);
criterion_main!(benches);
