use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::Simulation;
use sim_types::WorldConfig;

fn stable_perf_config() -> WorldConfig {
    WorldConfig {
        field_size: 256,
        bots_num: 2_000,
        food_limit: 8_000,
        poison_limit: 2_000,
        food_generation: 2,
        max_generations: u32::MAX,
        steps_per_second: 30,
        survivors: 20,
        mutation_events: 1,
        mutation_genes: 2,
    }
}

fn bench_1000_ticks(c: &mut Criterion) {
    let config = stable_perf_config();
    c.bench_function(
        "tick throughput / 1000 ticks (stable workload, seed 42)",
        |b| {
            b.iter_batched(
                || Simulation::new(config.clone(), 42).expect("simulation init"),
                |mut sim| black_box(sim.step_n(1000)),
                criterion::BatchSize::SmallInput,
            );
        },
    );
}

criterion_group!(benches, bench_1000_ticks);
criterion_main!(benches);
