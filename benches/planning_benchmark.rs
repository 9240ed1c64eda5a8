use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridmind::agent::{Agent, PolicyIterationAgent, ValueIterationAgent};
use gridmind::environment::{Environment, GridWorld};

/// Grid with a wall across the middle row, open at the right edge.
fn walled_grid(size: usize) -> GridWorld {
    let mut env = GridWorld::new(size);
    for x in 0..size - 1 {
        env.toggle_obstacle(x, size / 2);
    }
    env
}

fn bench_planners(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning");
    for size in [8, 16, 32] {
        let env = walled_grid(size);
        group.bench_with_input(BenchmarkId::new("value_iteration", size), &env, |b, env| {
            let mut agent = ValueIterationAgent::default();
            b.iter(|| agent.attach_model(black_box(env)));
        });
        group.bench_with_input(BenchmarkId::new("policy_iteration", size), &env, |b, env| {
            let mut agent = PolicyIterationAgent::default();
            b.iter(|| agent.attach_model(black_box(env)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_planners);
criterion_main!(benches);
