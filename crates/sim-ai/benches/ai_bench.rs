use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_ai::{run_session, Autopilot};
use sim_runtime::Engine;

fn bench_autopilot(c: &mut Criterion) {
    let engine = Engine::default();
    let pilot = Autopilot::default();
    let initial = engine.create_initial_state();

    c.bench_function("autopilot choose", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| black_box(pilot.choose(&initial, engine.tunables(), &mut rng)))
    });

    c.bench_function("autopilot 100 turns", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| {
            let summary = run_session(&engine, &pilot, initial.clone(), 100, &mut rng);
            black_box(summary.final_net_worth)
        })
    });
}

criterion_group!(benches, bench_autopilot);
criterion_main!(benches);
