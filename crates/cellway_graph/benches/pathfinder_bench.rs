use std::hint::black_box;

use cellway_core::BoundingBox;
use cellway_graph::{
    grid::synthetic_grid,
    pathfinder::{find_path, find_path_with_signals, node_signals},
};
use cellway_towers::tower_store::generate_mock_towers;
use criterion::{Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::SmallRng};

fn pathfinder_benchmark(c: &mut Criterion) {
    let bbox = BoundingBox::new(42.20, -71.20, 42.46, -70.95);
    let graph = synthetic_grid(&bbox, 80, 80);
    let towers = generate_mock_towers(&bbox, &mut SmallRng::seed_from_u64(42));
    let signals = node_signals(&graph, &towers);
    let end = graph.node_count() - 1;

    c.bench_function("node signals 80x80", |b| {
        b.iter(|| node_signals(black_box(&graph), black_box(&towers)))
    });

    for signal_weight in [0.0, 0.25, 1.0] {
        c.bench_function(&format!("search 80x80 w={signal_weight}"), |b| {
            b.iter(|| {
                find_path_with_signals(
                    black_box(&graph),
                    0,
                    end,
                    black_box(&signals),
                    signal_weight,
                )
            })
        });
    }

    c.bench_function("find path 80x80 balanced", |b| {
        b.iter(|| find_path(black_box(&graph), 0, end, black_box(&towers), 0.25))
    });
}

criterion_group!(benches, pathfinder_benchmark);
criterion_main!(benches);
