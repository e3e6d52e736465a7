//! Benchmarks for neat-ledger.

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use neat_ledger::{
    AddConnectionParams, AddNodeParams, Agent, EvolutionConfig, GenerationManager, Genome,
    InnovationLedger, WeightMutationParams,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn grown_genome(rounds: usize) -> (Genome, InnovationLedger, ChaCha8Rng) {
    let mut ledger = InnovationLedger::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut genome = Genome::new(1, 4, 3, true, &mut ledger);
    let connect = AddConnectionParams {
        rate: 1.0,
        ..AddConnectionParams::default()
    };
    let split = AddNodeParams {
        rate: 1.0,
        ..AddNodeParams::default()
    };
    for _ in 0..rounds {
        genome.add_connection(&connect, &mut ledger, &mut rng);
        let _ = genome.add_node(&split, &mut ledger, &mut rng);
    }
    (genome, ledger, rng)
}

fn bench_genome_creation(c: &mut Criterion) {
    let mut ledger = InnovationLedger::new();

    c.bench_function("genome_new", |b| {
        b.iter(|| {
            black_box(Genome::new(1, 4, 3, true, &mut ledger));
        });
    });
}

fn bench_structural_mutation(c: &mut Criterion) {
    let (genome, ledger, mut rng) = grown_genome(20);
    let connect = AddConnectionParams::default();
    let split = AddNodeParams::default();

    c.bench_function("structural_mutation", |b| {
        b.iter(|| {
            let mut g = genome.clone();
            let mut l = ledger.clone();
            g.add_connection(&connect, &mut l, &mut rng);
            let _ = g.add_node(&split, &mut l, &mut rng);
            black_box(&g);
        });
    });
}

fn bench_weight_mutation(c: &mut Criterion) {
    let (mut genome, _, mut rng) = grown_genome(20);
    let params = WeightMutationParams {
        rate: 0.0,
        ..WeightMutationParams::default()
    };

    c.bench_function("weight_mutation", |b| {
        b.iter(|| {
            genome.mutate_weights(&params, &mut rng);
            black_box(&genome);
        });
    });
}

fn bench_evaluation(c: &mut Criterion) {
    let (mut small, _, _) = grown_genome(5);
    let (mut large, _, _) = grown_genome(50);
    let inputs = [0.5, -0.5, 0.25, 1.0];

    c.bench_function("evaluate_small", |b| {
        b.iter(|| {
            black_box(small.evaluate(black_box(&inputs)));
        });
    });

    c.bench_function("evaluate_large", |b| {
        b.iter(|| {
            black_box(large.evaluate(black_box(&inputs)));
        });
    });
}

#[derive(Clone, Default)]
struct Idle;

impl Agent for Idle {
    fn sense(&self) -> Vec<f32> {
        vec![0.0; 4]
    }

    fn act(&mut self, _outputs: &[f32]) {}

    fn fitness_metric(&self) -> f32 {
        1.0
    }

    fn death_metric(&self) -> f32 {
        0.0
    }

    fn reset(&mut self) {}
}

fn bench_generation(c: &mut Criterion) {
    let config = EvolutionConfig {
        population_size: 50,
        time_limit_secs: 1.0,
        ..EvolutionConfig::default()
    };
    let mut manager =
        GenerationManager::new(config, Idle, ChaCha8Rng::seed_from_u64(42), Duration::ZERO)
            .expect("valid config");
    let mut now = Duration::ZERO;

    c.bench_function("generation_tick_and_reproduce", |b| {
        b.iter(|| {
            manager.control();
            now += Duration::from_secs(1);
            black_box(manager.tick(now));
        });
    });
}

criterion_group!(
    benches,
    bench_genome_creation,
    bench_structural_mutation,
    bench_weight_mutation,
    bench_evaluation,
    bench_generation,
);
criterion_main!(benches);
