//! NEAT genome implementation with arena-allocated graph topology.
//!
//! A [`Genome`] stores its nodes and connections in `SlotMap` arenas.
//! Connections address their endpoints by key, so cloning a genome is a deep
//! copy and no reference cycles exist. Nothing is ever removed from either
//! arena, which keeps iteration in creation order.
//!
//! Structural mutations consult the shared [`InnovationLedger`] so that two
//! genomes making the same mutation end up with the same innovation ids.

use std::cmp::Ordering;
use std::fmt;

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gene::{ConnectionGene, ConnectionId, NodeGene, NodeId, NodeType};
use crate::innovation::{InnovationKind, InnovationLedger};
use crate::topology::{propagate_locations, update_output_locations};

/// Hidden-node allowance below which `add_node` prefers older connections.
const SMALL_GENOME_HIDDEN_NODES: usize = 5;

/// Parameters of the weight mutation operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightMutationParams {
    /// Gate threshold. The operator runs only when its gate draw is **not**
    /// below this value.
    pub rate: f32,
    /// Probability of replacing a weight instead of perturbing it.
    pub chance_new_weight: f32,
    /// Replacement weights are drawn from `[-max_weight, max_weight]`.
    pub max_weight: f32,
    /// Perturbations are drawn from `[-max_perturbation, max_perturbation]`.
    pub max_perturbation: f32,
}

impl Default for WeightMutationParams {
    fn default() -> Self {
        Self {
            rate: 0.2,
            chance_new_weight: 0.1,
            max_weight: 1.0,
            max_perturbation: 0.5,
        }
    }
}

/// Parameters of the add-connection operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddConnectionParams {
    /// The operator runs only when its gate draw does not exceed this value.
    pub rate: f32,
    /// Probability of trying for a self-loop instead of a node pair.
    pub chance_looped: f32,
    /// New weights are drawn from `[-weight_limit, weight_limit]`.
    pub weight_limit: f32,
    /// Attempts at finding a node that can take a self-loop.
    pub tries_loop: usize,
    /// Attempts at finding an unconnected node pair.
    pub tries_pair: usize,
}

impl Default for AddConnectionParams {
    fn default() -> Self {
        Self {
            rate: 0.7,
            chance_looped: 0.1,
            weight_limit: 1.0,
            tries_loop: 20,
            tries_pair: 20,
        }
    }
}

/// Parameters of the add-node operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddNodeParams {
    /// The operator runs only when its gate draw does not exceed this value.
    pub rate: f32,
    /// Attempts at finding an old connection to split in small genomes.
    pub tries_old_connection: usize,
}

impl Default for AddNodeParams {
    fn default() -> Self {
        Self {
            rate: 0.7,
            tries_old_connection: 20,
        }
    }
}

/// Errors raised by structural mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    /// The connection key does not belong to this genome.
    #[error("connection is not part of genome {genome}")]
    UnknownConnection {
        /// The genome that was asked.
        genome: u32,
    },
    /// Only enabled, non-recurrent connections can be split.
    #[error("connection {innovation} is disabled or recurrent and cannot be split")]
    UnsplittableConnection {
        /// Innovation of the rejected connection.
        innovation: u32,
    },
    /// The ledger knows the node created by splitting `in_node -> out_node`
    /// but not the two connections that must have been created with it.
    #[error(
        "ledger records node {node} for split {in_node}->{out_node} but not its flanking connections"
    )]
    MissingSplitHistory {
        /// Source of the split connection.
        in_node: u32,
        /// Target of the split connection.
        out_node: u32,
        /// Node id recorded for the split.
        node: u32,
    },
}

/// A NEAT genome: a candidate network topology and weight set.
#[derive(Debug, Clone)]
pub struct Genome {
    pub(crate) id: u32,
    pub(crate) nodes: SlotMap<NodeId, NodeGene>,
    pub(crate) connections: SlotMap<ConnectionId, ConnectionGene>,
    pub(crate) input_ids: Vec<NodeId>,
    pub(crate) output_ids: Vec<NodeId>,
    pub(crate) bias_id: Option<NodeId>,
    num_inputs: usize,
    num_outputs: usize,
    num_layers: u32,
    fitness: f32,
    adjusted_fitness: f32,
}

impl Genome {
    /// Create a genome holding only its input, bias and output nodes.
    ///
    /// Node ids are assigned locally from 0: inputs first, then the bias node
    /// if requested, then outputs. The ledger's starting-node records are
    /// seeded the first time any genome is built against it.
    pub fn new(
        id: u32,
        num_inputs: usize,
        num_outputs: usize,
        has_bias: bool,
        ledger: &mut InnovationLedger,
    ) -> Self {
        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let mut next_id = 0u32;
        let mut take_id = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let input_ids: Vec<NodeId> = (0..num_inputs)
            .map(|_| nodes.insert(NodeGene::input(take_id())))
            .collect();
        let bias_id = has_bias.then(|| nodes.insert(NodeGene::bias(take_id())));
        let output_ids: Vec<NodeId> = (0..num_outputs)
            .map(|_| nodes.insert(NodeGene::output(take_id())))
            .collect();

        let starting_nodes = nodes.len();
        if ledger.has_starting_nodes() {
            let seeded = ledger.starting_node_count();
            if seeded != starting_nodes {
                warn!(
                    genome = id,
                    seeded,
                    starting_nodes,
                    "ledger was seeded for a different genome shape"
                );
            }
        } else {
            ledger.create_starting_node_innovations(starting_nodes);
        }

        let num_layers = update_output_locations(&mut nodes);

        Self {
            id,
            nodes,
            connections: SlotMap::with_key(),
            input_ids,
            output_ids,
            bias_id,
            num_inputs,
            num_outputs,
            num_layers,
            fitness: 0.0,
            adjusted_fitness: 0.0,
        }
    }

    /// Mutate the weight of every enabled connection.
    ///
    /// A single gate draw decides whether the operator runs at all, and it
    /// runs only when that draw is not below `params.rate`. Each enabled
    /// connection then either receives a fresh weight or a perturbation.
    ///
    /// Returns whether the operator ran.
    pub fn mutate_weights<R: Rng>(&mut self, params: &WeightMutationParams, rng: &mut R) -> bool {
        if rng.random::<f32>() < params.rate {
            return false;
        }

        for conn in self.connections.values_mut().filter(|c| c.enabled) {
            if rng.random::<f32>() < params.chance_new_weight {
                conn.weight = symmetric_uniform(rng, params.max_weight);
            } else {
                conn.weight += symmetric_uniform(rng, params.max_perturbation);
            }
        }
        true
    }

    /// Try to add a random new connection.
    ///
    /// With probability `chance_looped` a self-loop is attempted on a node that
    /// is neither input nor bias and has no self-loop yet; otherwise a pair of
    /// distinct nodes with no connection in that direction is searched for.
    /// Both searches give up after their retry budget, which is a normal
    /// outcome and returns `None`.
    pub fn add_connection<R: Rng>(
        &mut self,
        params: &AddConnectionParams,
        ledger: &mut InnovationLedger,
        rng: &mut R,
    ) -> Option<ConnectionId> {
        if rng.random::<f32>() > params.rate {
            return None;
        }

        let endpoints = if rng.random::<f32>() < params.chance_looped {
            self.find_loop_candidate(params.tries_loop, rng)
        } else {
            self.find_pair_candidate(params.tries_pair, rng)
        };

        let Some((input, output)) = endpoints else {
            debug!(genome = self.id, "add_connection found no candidate");
            return None;
        };

        let weight = symmetric_uniform(rng, params.weight_limit);
        self.connect_nodes(input, output, weight, ledger)
    }

    /// Connect `input` to `output` with the given weight.
    ///
    /// Returns `None` if either node is unknown, if `output` is an input or
    /// bias node, or if this ordered pair is already connected. The connection
    /// is recurrent when it is a self-loop or when `output` does not sit in a
    /// later layer than `input`; a self-loop also marks its node recurrent.
    pub fn connect_nodes(
        &mut self,
        input: NodeId,
        output: NodeId,
        weight: f32,
        ledger: &mut InnovationLedger,
    ) -> Option<ConnectionId> {
        let in_node = self.nodes.get(input)?;
        let out_node = self.nodes.get(output)?;
        if out_node.node_type.is_sensor() || self.has_connection(input, output) {
            return None;
        }

        let (in_id, out_id) = (in_node.id, out_node.id);
        let self_loop = input == output;
        let recurrent = self_loop || out_node.location <= in_node.location;
        let innovation = ledger.connection_innovation(in_id, out_id);

        let conn_id = self.connections.insert(ConnectionGene::new(
            innovation, input, output, weight, recurrent,
        ));

        if self_loop {
            self.nodes[input].recurrent = true;
        }

        if !recurrent {
            self.nodes[input].add_forward(output);

            let next_location = self.nodes[input].location + 1;
            if self.nodes[output].location < next_location {
                self.nodes[output].location = next_location;
                propagate_locations(&mut self.nodes, output);
            }
            self.num_layers = update_output_locations(&mut self.nodes);
        }

        debug!(
            genome = self.id,
            innovation,
            in_node = in_id,
            out_node = out_id,
            recurrent,
            "added connection"
        );
        Some(conn_id)
    }

    /// Try to add a node by splitting a random connection.
    ///
    /// Small genomes (fewer than `inputs + outputs + 5` nodes) favour older
    /// connections: up to `tries_old_connection` draws skip the most recent
    /// `floor(sqrt(connection_count))` connections. Larger genomes choose
    /// uniformly among every splittable connection. A connection qualifies when
    /// it is enabled, not recurrent and not fed by the bias node.
    ///
    /// # Errors
    ///
    /// Propagates [`GenomeError::MissingSplitHistory`] from
    /// [`split_connection`](Self::split_connection); the genome is unchanged
    /// in that case.
    pub fn add_node<R: Rng>(
        &mut self,
        params: &AddNodeParams,
        ledger: &mut InnovationLedger,
        rng: &mut R,
    ) -> Result<Option<NodeId>, GenomeError> {
        if self.connections.is_empty() {
            return Ok(None);
        }
        if rng.random::<f32>() > params.rate {
            return Ok(None);
        }

        let size_threshold = self.num_inputs + self.num_outputs + SMALL_GENOME_HIDDEN_NODES;
        let candidate = if self.nodes.len() < size_threshold {
            self.find_old_connection(params.tries_old_connection, rng)
        } else {
            self.connections
                .iter()
                .filter(|(_, c)| self.is_splittable(c))
                .map(|(id, _)| id)
                .choose(rng)
        };

        let Some(conn_id) = candidate else {
            debug!(genome = self.id, "add_node found no connection to split");
            return Ok(None);
        };

        self.split_connection(conn_id, ledger).map(Some)
    }

    /// Split a connection `A -> B` into `A -> N -> B`.
    ///
    /// The old connection is disabled but kept. `A -> N` gets weight 1.0 and
    /// `N -> B` inherits the old weight. If the ledger already knows the node
    /// created by splitting `A -> B` and this genome does not contain it yet,
    /// that node id and its connection innovations are reused; otherwise a new
    /// node id is allocated.
    ///
    /// # Errors
    ///
    /// - [`GenomeError::UnknownConnection`] for a key from another genome.
    /// - [`GenomeError::UnsplittableConnection`] for a disabled or recurrent
    ///   connection.
    /// - [`GenomeError::MissingSplitHistory`] if a reused node's flanking
    ///   connections are absent from the ledger. Nothing is modified.
    pub fn split_connection(
        &mut self,
        conn_id: ConnectionId,
        ledger: &mut InnovationLedger,
    ) -> Result<NodeId, GenomeError> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(GenomeError::UnknownConnection { genome: self.id })?;
        if !conn.enabled || conn.recurrent {
            return Err(GenomeError::UnsplittableConnection {
                innovation: conn.innovation,
            });
        }

        let (input, output, weight) = (conn.input, conn.output, conn.weight);
        let in_id = self.nodes[input].id;
        let out_id = self.nodes[output].id;

        // A connection can be re-enabled and split again, so a historical
        // node already present here must not be reused.
        let historical = ledger
            .check_innovation(Some(in_id), Some(out_id), InnovationKind::NewNode)
            .filter(|&node| !self.has_node_id(node));

        let (node_id, first, second) = match historical {
            Some(node) => {
                let first = ledger.check_innovation(
                    Some(in_id),
                    Some(node),
                    InnovationKind::NewConnection,
                );
                let second = ledger.check_innovation(
                    Some(node),
                    Some(out_id),
                    InnovationKind::NewConnection,
                );
                match (first, second) {
                    (Some(first), Some(second)) => (node, first, second),
                    _ => {
                        return Err(GenomeError::MissingSplitHistory {
                            in_node: in_id,
                            out_node: out_id,
                            node,
                        })
                    }
                }
            }
            None => {
                let node = ledger.create_node_innovation(in_id, out_id);
                let first = ledger.connection_innovation(in_id, node);
                let second = ledger.connection_innovation(node, out_id);
                (node, first, second)
            }
        };

        self.connections[conn_id].enabled = false;

        let new_node = self.nodes.insert(NodeGene::hidden(node_id));
        self.connections
            .insert(ConnectionGene::new(first, input, new_node, 1.0, false));
        self.connections
            .insert(ConnectionGene::new(second, new_node, output, weight, false));

        self.nodes[input].add_forward(new_node);
        self.nodes[new_node].add_forward(output);
        propagate_locations(&mut self.nodes, input);
        propagate_locations(&mut self.nodes, new_node);
        self.num_layers = update_output_locations(&mut self.nodes);

        debug!(
            genome = self.id,
            node = node_id,
            in_node = in_id,
            out_node = out_id,
            reused = historical.is_some(),
            "split connection"
        );
        Ok(new_node)
    }

    /// Copy the raw fitness into the adjusted fitness.
    ///
    /// No speciation is performed, so no fitness sharing applies.
    pub fn adjust_fitnesses(&mut self) {
        self.adjusted_fitness = self.fitness;
    }

    /// Order two genomes by adjusted fitness, ascending.
    ///
    /// Values that cannot be compared (NaN) are treated as equal.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.adjusted_fitness
            .partial_cmp(&other.adjusted_fitness)
            .unwrap_or(Ordering::Equal)
    }

    /// Combine two parents into a child.
    ///
    /// Not implemented as a gene-aligning crossover: the child is a copy of
    /// the fitter parent, unchanged. A real implementation would align genes
    /// by innovation id.
    #[must_use]
    pub fn crossover(_id: u32, fitter: &Self, _less_fit: &Self) -> Self {
        fitter.clone()
    }

    /// Genome id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Give this genome a new id (used when a copy becomes an offspring).
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// Raw fitness.
    #[must_use]
    pub const fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Set the raw fitness.
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Ranking fitness.
    #[must_use]
    pub const fn adjusted_fitness(&self) -> f32 {
        self.adjusted_fitness
    }

    /// Node arena.
    #[must_use]
    pub const fn nodes(&self) -> &SlotMap<NodeId, NodeGene> {
        &self.nodes
    }

    /// Connection arena.
    #[must_use]
    pub const fn connections(&self) -> &SlotMap<ConnectionId, ConnectionGene> {
        &self.connections
    }

    /// Look up a node by key.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(id)
    }

    /// Look up a connection by key.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&ConnectionGene> {
        self.connections.get(id)
    }

    /// Input node keys, in id order.
    #[must_use]
    pub fn input_ids(&self) -> &[NodeId] {
        &self.input_ids
    }

    /// Output node keys, in id order.
    #[must_use]
    pub fn output_ids(&self) -> &[NodeId] {
        &self.output_ids
    }

    /// Bias node key, if the genome has one.
    #[must_use]
    pub const fn bias_id(&self) -> Option<NodeId> {
        self.bias_id
    }

    /// Number of input nodes.
    #[must_use]
    pub const fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Number of output nodes.
    #[must_use]
    pub const fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Number of layers, output layer included.
    #[must_use]
    pub const fn num_layers(&self) -> u32 {
        self.num_layers
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of connections, disabled ones included.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of enabled connections.
    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    /// Find a node by its id.
    #[must_use]
    pub fn find_node_by_id(&self, node_id: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.id == node_id)
            .map(|(id, _)| id)
    }

    /// Find a connection by its innovation number.
    #[must_use]
    pub fn find_connection_by_innovation(&self, innovation: u32) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, c)| c.innovation == innovation)
            .map(|(id, _)| id)
    }

    /// Whether a node with this id exists in the genome.
    #[must_use]
    pub fn has_node_id(&self, node_id: u32) -> bool {
        self.nodes.values().any(|n| n.id == node_id)
    }

    fn has_connection(&self, input: NodeId, output: NodeId) -> bool {
        self.connections
            .values()
            .any(|c| c.input == input && c.output == output)
    }

    fn is_splittable(&self, conn: &ConnectionGene) -> bool {
        conn.enabled
            && !conn.recurrent
            && self
                .nodes
                .get(conn.input)
                .is_some_and(|n| n.node_type != NodeType::Bias)
    }

    fn find_loop_candidate<R: Rng>(&self, tries: usize, rng: &mut R) -> Option<(NodeId, NodeId)> {
        let count = self.nodes.len();
        if count == 0 {
            return None;
        }

        for _ in 0..tries {
            let (id, node) = self.nodes.iter().nth(rng.random_range(0..count))?;
            if !node.node_type.is_sensor() && !node.recurrent {
                return Some((id, id));
            }
        }
        None
    }

    fn find_pair_candidate<R: Rng>(&self, tries: usize, rng: &mut R) -> Option<(NodeId, NodeId)> {
        let count = self.nodes.len();
        if count < 2 {
            return None;
        }

        for _ in 0..tries {
            let in_index = rng.random_range(0..count);
            // A non-zero offset guarantees two distinct nodes.
            let out_index = (in_index + rng.random_range(1..count)) % count;

            let (input, _) = self.nodes.iter().nth(in_index)?;
            let (output, out_node) = self.nodes.iter().nth(out_index)?;

            if out_node.node_type.is_sensor() || self.has_connection(input, output) {
                continue;
            }
            return Some((input, output));
        }
        None
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn find_old_connection<R: Rng>(&self, tries: usize, rng: &mut R) -> Option<ConnectionId> {
        let count = self.connections.len();
        let recent = (count as f64).sqrt() as usize;
        let upper = count.saturating_sub(recent).max(1);

        for _ in 0..tries {
            let (id, conn) = self.connections.iter().nth(rng.random_range(0..upper))?;
            if self.is_splittable(conn) {
                return Some(id);
            }
        }
        None
    }
}

/// Uniform draw from `[-limit, limit]`. Zero and non-finite limits yield 0.
fn symmetric_uniform<R: Rng>(rng: &mut R, limit: f32) -> f32 {
    if limit == 0.0 || !limit.is_finite() {
        return 0.0;
    }
    // Scaling a unit draw keeps the range finite even near `f32::MAX`.
    rng.random_range(-1.0..=1.0_f32) * limit.abs()
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes:")?;
        for node in self.nodes.values() {
            writeln!(f, "{node}")?;
        }

        writeln!(f)?;
        writeln!(f, "Connections:")?;
        for conn in self.connections.values() {
            writeln!(
                f,
                "InNode: {} | OutNode: {} | Weight: {} | Enabled: {} | Innovation: {} | Recurrent: {}",
                self.nodes[conn.input],
                self.nodes[conn.output],
                conn.weight,
                conn.enabled,
                conn.innovation,
                conn.recurrent
            )?;
        }
        Ok(())
    }
}
