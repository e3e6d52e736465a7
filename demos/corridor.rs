//! Corridor runner evolved with the generation manager.
//!
//! Each runner lives on a one-dimensional track with a pit in the middle. It
//! senses its position, its speed, whether it is airborne and the distance to
//! the pit, and drives three outputs: push left, push right and jump. Fitness
//! is the distance covered; a runner that falls into the pit scores zero.
//!
//! The clock is simulated, so the demo runs as fast as the machine allows.
//!
//! Run with: `RUST_LOG=info cargo run --example corridor`

use std::time::Duration;

use neat_ledger::{Agent, EvolutionConfig, GenerationManager};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

const STEP: Duration = Duration::from_millis(50);
const PIT_START: f32 = 12.0;
const PIT_END: f32 = 14.0;
const GRAVITY: f32 = 0.4;

#[derive(Debug, Clone, Default)]
struct Runner {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

impl Runner {
    fn over_pit(&self) -> bool {
        (PIT_START..PIT_END).contains(&self.x)
    }
}

impl Agent for Runner {
    fn sense(&self) -> Vec<f32> {
        let airborne = if self.y > 0.0 { 1.0 } else { 0.0 };
        vec![self.x / 20.0, self.vx, airborne, (PIT_START - self.x) / 20.0]
    }

    fn act(&mut self, outputs: &[f32]) {
        // A runner below the floor is stuck in the pit.
        if self.y < 0.0 {
            self.vy -= GRAVITY;
            self.y += self.vy;
            return;
        }

        self.vx = (self.vx + 0.2 * (outputs[1] - outputs[0])).clamp(-1.0, 1.0);
        if self.y == 0.0 && outputs[2] > 0.5 {
            self.vy = 1.2;
        }

        self.x += self.vx * 0.5;
        self.y += self.vy;
        self.vy -= GRAVITY;

        if self.y <= 0.0 && !self.over_pit() {
            self.y = 0.0;
            self.vy = 0.0;
        }
    }

    fn fitness_metric(&self) -> f32 {
        self.x
    }

    fn death_metric(&self) -> f32 {
        self.y
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EvolutionConfig {
        population_size: 20,
        ..EvolutionConfig::default()
    };
    info!(?config, "starting corridor run");

    let mut manager = GenerationManager::new(
        config,
        Runner::default(),
        ChaCha8Rng::seed_from_u64(42),
        Duration::ZERO,
    )
    .expect("demo configuration is valid");

    let generations = 30;
    let mut now = Duration::ZERO;
    while manager.generation() <= generations {
        manager.control();
        now += STEP;
        manager.tick(now);
    }

    let Some(champion) = manager.best() else {
        return;
    };
    println!();
    println!("Champion after {generations} generations:");
    println!("Fitness: {:.3}", champion.genome.fitness());
    println!("Layers: {}", champion.genome.num_layers());
    println!("Enabled connections: {}", champion.genome.num_enabled_connections());
    println!();
    println!("{}", champion.genome);
    println!("Innovation history: {} records", manager.ledger().len());
}
