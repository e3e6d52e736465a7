//! Tick-driven generation management.
//!
//! A [`GenerationManager`] owns the population, the innovation ledger and the
//! random source. The host calls [`control`](GenerationManager::control) to let
//! every running individual sense and act, and [`tick`](GenerationManager::tick)
//! with the current clock reading to advance the evaluation lifecycle:
//!
//! 1. **Running**: individuals act until their time limit expires.
//! 2. **Finalizing**: an expired individual's fitness is read from its agent
//!    and frozen.
//! 3. **Reproducing**: once every fitness is frozen, the bottom half is
//!    discarded and each survivor contributes one mutated offspring.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::genome::{AddConnectionParams, AddNodeParams, Genome, WeightMutationParams};
use crate::innovation::InnovationLedger;

/// The body a genome controls.
///
/// Survivors clone their agent to give each offspring its own.
pub trait Agent: Clone {
    /// Current sensor readings, one per genome input.
    fn sense(&self) -> Vec<f32>;

    /// Apply the network outputs.
    fn act(&mut self, outputs: &[f32]);

    /// Fitness reported when the individual's time runs out.
    fn fitness_metric(&self) -> f32;

    /// A value that marks the individual as dead when it falls below the
    /// configured threshold.
    fn death_metric(&self) -> f32;

    /// Return to the starting state for a new generation.
    fn reset(&mut self);
}

/// Errors from building a [`GenerationManager`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvolutionError {
    /// Truncation selection halves the population, so it must be even.
    #[error("population size must be even and at least 2, got {0}")]
    InvalidPopulationSize(usize),
    /// Genomes need at least one input node.
    #[error("genomes need at least one input")]
    NoInputs,
    /// Genomes need at least one output node.
    #[error("genomes need at least one output")]
    NoOutputs,
    /// Individuals would never expire.
    #[error("time limit must be a positive, representable number of seconds, got {0}")]
    InvalidTimeLimit(f64),
    /// A mutation rate or probability outside `[0, 1]`, or a non-finite weight
    /// limit.
    #[error("mutation parameter {name} is out of range: {value}")]
    InvalidMutationParameter {
        /// Dotted path of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
}

/// Mutations applied to every offspring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Add-connection operator parameters.
    pub add_connection: AddConnectionParams,
    /// Add-node operator parameters.
    pub add_node: AddNodeParams,
    /// Weight mutation, applied after the structural operators when set.
    pub weights: Option<WeightMutationParams>,
}

impl ReproductionConfig {
    /// Check every operator parameter.
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::InvalidMutationParameter`] for the first rate
    /// or probability outside `[0, 1]` or non-finite weight limit.
    pub fn validate(&self) -> Result<(), EvolutionError> {
        let connect = &self.add_connection;
        unit_interval("add_connection.rate", connect.rate)?;
        unit_interval("add_connection.chance_looped", connect.chance_looped)?;
        finite("add_connection.weight_limit", connect.weight_limit)?;
        unit_interval("add_node.rate", self.add_node.rate)?;

        if let Some(weights) = &self.weights {
            unit_interval("weights.rate", weights.rate)?;
            unit_interval("weights.chance_new_weight", weights.chance_new_weight)?;
            finite("weights.max_weight", weights.max_weight)?;
            finite("weights.max_perturbation", weights.max_perturbation)?;
        }
        Ok(())
    }
}

fn unit_interval(name: &'static str, value: f32) -> Result<(), EvolutionError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvolutionError::InvalidMutationParameter { name, value })
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), EvolutionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EvolutionError::InvalidMutationParameter { name, value })
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Input nodes per genome.
    pub num_inputs: usize,
    /// Output nodes per genome.
    pub num_outputs: usize,
    /// Whether genomes carry a bias node.
    pub has_bias: bool,
    /// Seconds each individual runs before its fitness is frozen.
    pub time_limit_secs: f64,
    /// Individuals whose death metric falls below this score zero.
    pub death_threshold: f32,
    /// Offspring mutation settings.
    pub reproduction: ReproductionConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            num_inputs: 4,
            num_outputs: 3,
            has_bias: true,
            time_limit_secs: 10.0,
            death_threshold: -5.0,
            reproduction: ReproductionConfig::default(),
        }
    }
}

impl EvolutionConfig {
    /// Check that a manager can be built from this configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`EvolutionError`] found.
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.population_size < 2 || self.population_size % 2 != 0 {
            return Err(EvolutionError::InvalidPopulationSize(self.population_size));
        }
        if self.num_inputs == 0 {
            return Err(EvolutionError::NoInputs);
        }
        if self.num_outputs == 0 {
            return Err(EvolutionError::NoOutputs);
        }
        match Duration::try_from_secs_f64(self.time_limit_secs) {
            Ok(limit) if !limit.is_zero() => {}
            _ => return Err(EvolutionError::InvalidTimeLimit(self.time_limit_secs)),
        }
        self.reproduction.validate()
    }

    /// The time limit as a [`Duration`].
    ///
    /// Limits too large to represent saturate to [`Duration::MAX`]; invalid
    /// ones become zero. [`validate`](Self::validate) rejects both.
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        if self.time_limit_secs.is_nan() || self.time_limit_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX)
    }
}

/// One member of the population.
#[derive(Debug, Clone)]
pub struct Individual<A> {
    /// The controlling network.
    pub genome: Genome,
    /// The controlled body.
    pub agent: A,
    started_at: Option<Duration>,
}

impl<A> Individual<A> {
    /// When this individual's current run started, or `None` once its fitness
    /// has been frozen.
    #[must_use]
    pub const fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// Whether the fitness for this generation is frozen.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.started_at.is_none()
    }
}

/// What a call to [`GenerationManager::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No individual expired.
    Running,
    /// Some individuals had their fitness frozen; others are still running.
    Finalizing,
    /// Every fitness was frozen and a new generation was bred.
    Reproducing,
}

/// Drives evaluation, selection and reproduction of a population.
#[derive(Debug)]
pub struct GenerationManager<A, R> {
    config: EvolutionConfig,
    ledger: InnovationLedger,
    population: Vec<Individual<A>>,
    rng: R,
    generation: u32,
    next_genome_id: u32,
    phase: Phase,
    best_id: Option<u32>,
}

impl<A: Agent, R: Rng> GenerationManager<A, R> {
    /// Build the first generation.
    ///
    /// Every individual gets a fresh minimal genome (ids from 1) and a clone of
    /// `prototype`, and starts its run at `now`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvolutionError`] if `config` fails validation.
    pub fn new(
        config: EvolutionConfig,
        prototype: A,
        rng: R,
        now: Duration,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;

        let mut ledger = InnovationLedger::new();
        let mut next_genome_id = 1;
        let population = (0..config.population_size)
            .map(|_| {
                let genome = Genome::new(
                    next_genome_id,
                    config.num_inputs,
                    config.num_outputs,
                    config.has_bias,
                    &mut ledger,
                );
                next_genome_id += 1;
                Individual {
                    genome,
                    agent: prototype.clone(),
                    started_at: Some(now),
                }
            })
            .collect();

        Ok(Self {
            config,
            ledger,
            population,
            rng,
            generation: 1,
            next_genome_id,
            phase: Phase::Running,
            best_id: None,
        })
    }

    /// Let every running individual sense, think and act once.
    ///
    /// An individual whose agent senses the wrong number of inputs is logged
    /// and skipped for this tick.
    pub fn control(&mut self) {
        for individual in self.population.iter_mut().filter(|i| !i.is_finished()) {
            let inputs = individual.agent.sense();
            match individual.genome.try_evaluate(&inputs) {
                Ok(outputs) => individual.agent.act(&outputs),
                Err(err) => error!(genome = individual.genome.id(), %err, "evaluation skipped"),
            }
        }
    }

    /// Advance the lifecycle to `now`.
    ///
    /// Freezes the fitness of every individual whose time limit has elapsed,
    /// and breeds the next generation once all of them are frozen.
    pub fn tick(&mut self, now: Duration) -> Phase {
        let finalized = self.finalize_expired(now);

        self.phase = if self.population.iter().all(Individual::is_finished) {
            self.reproduce(now);
            Phase::Reproducing
        } else if finalized > 0 {
            Phase::Finalizing
        } else {
            Phase::Running
        };
        self.phase
    }

    fn finalize_expired(&mut self, now: Duration) -> usize {
        let limit = self.config.time_limit();
        let death_threshold = self.config.death_threshold;
        let mut finalized = 0;

        for individual in &mut self.population {
            let Some(started) = individual.started_at else {
                continue;
            };
            if now.saturating_sub(started) < limit {
                continue;
            }

            individual.started_at = None;
            let fitness = if individual.agent.death_metric() < death_threshold {
                0.0
            } else {
                individual.agent.fitness_metric()
            };
            individual.genome.set_fitness(fitness);
            individual.genome.adjust_fitnesses();
            finalized += 1;
        }
        finalized
    }

    fn reproduce(&mut self, now: Duration) {
        // Stable, so equal fitnesses keep their population order.
        self.population
            .sort_by(|a, b| b.genome.compare(&a.genome));

        let best = self.population.first().map(|i| i.genome.adjusted_fitness());
        let worst = self.population.last().map(|i| i.genome.adjusted_fitness());
        info!(
            generation = self.generation,
            best = ?best,
            worst = ?worst,
            "generation complete"
        );
        self.best_id = self.population.first().map(|i| i.genome.id());

        let survivors = self.config.population_size / 2;
        self.population.truncate(survivors);

        let reproduction = self.config.reproduction;
        for index in 0..survivors {
            let mut genome = self.population[index].genome.clone();
            genome.set_id(self.next_genome_id);
            self.next_genome_id += 1;

            genome.add_connection(&reproduction.add_connection, &mut self.ledger, &mut self.rng);
            if let Err(err) = genome.add_node(&reproduction.add_node, &mut self.ledger, &mut self.rng) {
                error!(genome = genome.id(), %err, "add_node aborted");
            }
            if let Some(weights) = &reproduction.weights {
                genome.mutate_weights(weights, &mut self.rng);
            }

            let agent = self.population[index].agent.clone();
            self.population.push(Individual {
                genome,
                agent,
                started_at: None,
            });
        }

        for individual in &mut self.population {
            individual.started_at = Some(now);
            individual.agent.reset();
        }
        self.generation += 1;
    }

    /// Current population, best first after a reproduction.
    #[must_use]
    pub fn individuals(&self) -> &[Individual<A>] {
        &self.population
    }

    /// Mutable access to the population, e.g. to step agents in a simulation.
    pub fn individuals_mut(&mut self) -> &mut [Individual<A>] {
        &mut self.population
    }

    /// The run's innovation history.
    #[must_use]
    pub const fn ledger(&self) -> &InnovationLedger {
        &self.ledger
    }

    /// The current generation, starting at 1.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// What the last tick did.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// The top individual of the last completed generation.
    #[must_use]
    pub fn best(&self) -> Option<&Individual<A>> {
        self.best_id.and_then(|id| self.individual_by_genome_id(id))
    }

    /// Find an individual by its genome id.
    #[must_use]
    pub fn individual_by_genome_id(&self, id: u32) -> Option<&Individual<A>> {
        self.population.iter().find(|i| i.genome.id() == id)
    }

    /// Find a genome by id.
    #[must_use]
    pub fn genome_by_id(&self, id: u32) -> Option<&Genome> {
        self.individual_by_genome_id(id).map(|i| &i.genome)
    }
}
