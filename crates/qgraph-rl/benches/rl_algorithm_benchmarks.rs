//! RL Algorithm Benchmarks
//!
//! Benchmarks for the tabular learning engine:
//! - Training episodes over grid graphs of increasing size
//! - Policy extraction (full table rescan)
//! - Outcome sampling by probability
//! - max Q lookups
//!
//! ## Hot Paths Identified
//! 1. LearningEngine::run_training() - one backup per step
//! 2. LearningEngine::max_q() - called once per backup
//! 3. Action::pick_outcome_index() - called once per step
//! 4. LearningEngine::extract_policy() - called on demand after training

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use qgraph_rl::{Action, ActionOutcome, LearningEngine, State, TrainingParams};

/// Square grid with four moves per cell; the far corner is terminal.
fn create_grid_engine(size: i32, episodes: u64) -> LearningEngine {
    let mut engine = LearningEngine::with_params(
        TrainingParams::default()
            .with_episodes(episodes)
            .with_warnings(false),
    );
    let goal = format!("{},{}", size - 1, size - 1);

    for x in 0..size {
        for y in 0..size {
            let name = format!("{x},{y}");
            let mut state = State::new(name.clone());
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let nx = (x + dx).clamp(0, size - 1);
                let ny = (y + dy).clamp(0, size - 1);
                let target = format!("{nx},{ny}");
                let reward = if target == goal { 100.0 } else { -1.0 };
                state.add_action(
                    Action::from_to(name.clone(), target.clone())
                        .with_outcome(ActionOutcome::new(target.clone(), 0.9, reward))
                        .with_outcome(ActionOutcome::new(name.clone(), 0.1, -1.0)),
                );
            }
            engine.add_state(state).expect("grid state names are unique");
        }
    }
    engine.add_terminal_state(goal);
    engine
}

fn create_wide_action(outcomes: usize) -> Action {
    let probability = 1.0 / outcomes as f64;
    let mut action = Action::new("S", "wide");
    for i in 0..outcomes {
        action.add_outcome(ActionOutcome::new(format!("T{i}"), probability, 0.0));
    }
    action
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(20);

    for size in [4, 8, 16] {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::new("grid_100_episodes", size), &size, |b, &size| {
            b.iter_batched(
                || create_grid_engine(size, 100),
                |mut engine| {
                    let mut rng = StdRng::seed_from_u64(42);
                    black_box(engine.run_training(&mut rng).expect("valid grid"))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy");

    for size in [8, 16, 32] {
        let mut engine = create_grid_engine(size, 200);
        let mut rng = StdRng::seed_from_u64(7);
        engine.run_training(&mut rng).expect("valid grid");

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("extract_policy", size), &engine, |b, engine| {
            b.iter(|| black_box(engine.extract_policy()));
        });
    }

    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");

    for outcomes in [2, 8, 32] {
        let action = create_wide_action(outcomes);
        let mut rng = StdRng::seed_from_u64(1);
        group.bench_with_input(
            BenchmarkId::new("pick_outcome_index", outcomes),
            &action,
            |b, action| {
                b.iter(|| {
                    let draw: f64 = rng.gen();
                    black_box(action.pick_outcome_index(draw).expect("non-empty"))
                });
            },
        );
    }

    group.finish();
}

fn bench_max_q(c: &mut Criterion) {
    let engine = create_grid_engine(16, 0);

    c.bench_function("max_q_registered", |b| {
        b.iter(|| black_box(engine.max_q(black_box("7,7"))));
    });
    c.bench_function("max_q_unregistered", |b| {
        b.iter(|| black_box(engine.max_q(black_box("missing"))));
    });
}

criterion_group!(benches, bench_training, bench_policy, bench_sampling, bench_max_q);
criterion_main!(benches);
