//! # NEAT Ledger
//!
//! A `NeuroEvolution` of Augmenting Topologies (NEAT) engine built around a
//! run-scoped innovation ledger and a tick-driven generation manager.
//!
//! ## Features
//!
//! - **Innovation Ledger**: Every structural mutation is recorded once, so
//!   genomes that make the same mutation independently share its ids
//! - **Arena-Graph Model**: `SlotMap` storage for nodes and connections
//! - **Layered Evaluation**: Nodes track their longest forward distance from the
//!   inputs; recurrent connections carry state between evaluations
//! - **Generation Manager**: Time-limited evaluation, truncation selection and
//!   mutated offspring for any [`Agent`]
//!
//! ## Quick Start
//!
//! ```rust
//! use neat_ledger::{AddConnectionParams, AddNodeParams, Genome, InnovationLedger};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut ledger = InnovationLedger::new();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut genome = Genome::new(1, 2, 1, true, &mut ledger);
//!
//! let connect = AddConnectionParams { rate: 1.0, ..AddConnectionParams::default() };
//! for _ in 0..10 {
//!     genome.add_connection(&connect, &mut ledger, &mut rng);
//!     genome.add_node(&AddNodeParams::default(), &mut ledger, &mut rng).unwrap();
//! }
//!
//! let output = genome.evaluate(&[0.5, -0.5]);
//! assert_eq!(output.len(), 1);
//! println!("{genome}");
//! ```
//!
//! ## Architecture
//!
//! ### Innovation Ledger
//!
//! The [`InnovationLedger`] is an explicit value passed by `&mut` to every
//! structural mutation. A lookup and the insert that may follow it always happen
//! under one exclusive borrow, so ids are never handed out twice.
//!
//! - **Connections** are keyed by `(in_node, out_node)`, direction included.
//! - **Nodes** created by a split are keyed by the endpoints of the split
//!   connection; the node id is reused unless the genome already holds it.
//!
//! ### Layers
//!
//! Inputs and the bias sit in layer 0, hidden nodes at their longest forward
//! distance from layer 0, and outputs one layer past the deepest hidden node. A
//! connection whose target is not in a later layer than its source is recurrent.
//!
//! ### Reproduction
//!
//! Offspring are deep copies of their parent: cloning a [`Genome`] copies both
//! arenas, and a child's mutations never reach its parent.

pub mod activation;
pub mod evaluator;
pub mod gene;
pub mod generation;
pub mod genome;
pub mod innovation;
pub mod topology;

// Re-exports for convenience
pub use activation::bipolar_logistic;
pub use evaluator::EvaluatorError;
pub use gene::{ConnectionGene, ConnectionId, NodeGene, NodeId, NodeType};
pub use generation::{
    Agent, EvolutionConfig, EvolutionError, GenerationManager, Individual, Phase,
    ReproductionConfig,
};
pub use genome::{AddConnectionParams, AddNodeParams, Genome, GenomeError, WeightMutationParams};
pub use innovation::{Innovation, InnovationKind, InnovationLedger};
