//! Gene types for NEAT genomes.
//!
//! This module defines the fundamental building blocks of NEAT networks:
//! - [`NodeGene`]: Represents neurons in the network
//! - [`ConnectionGene`]: Represents weighted connections between nodes
//!
//! Connections refer to their endpoints by arena key rather than by owning
//! references, so a genome's graph never forms an ownership cycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Arena key of a node within one genome.
    pub struct NodeId;

    /// Arena key of a connection within one genome.
    pub struct ConnectionId;
}

/// The type/role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Input node - receives external values, no activation applied.
    Input,
    /// Bias node - always outputs 1.0.
    Bias,
    /// Hidden node - internal processing node added through mutation.
    Hidden,
    /// Output node - produces final network output.
    Output,
}

impl NodeType {
    /// Input and bias nodes sit in layer 0 and never receive connections.
    #[must_use]
    pub const fn is_sensor(self) -> bool {
        matches!(self, Self::Input | Self::Bias)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "INPUT",
            Self::Bias => "BIAS",
            Self::Hidden => "HIDDEN",
            Self::Output => "OUTPUT",
        };
        f.write_str(name)
    }
}

/// A node gene representing a neuron in the NEAT network.
#[derive(Debug, Clone)]
pub struct NodeGene {
    /// Node id, unique within a genome and shared across genomes through the
    /// innovation ledger.
    pub id: u32,
    /// The type/role of this node in the network.
    pub node_type: NodeType,
    /// Layer index: the longest forward distance from the input layer.
    pub location: u32,
    /// Set once this node has a connection to itself.
    pub recurrent: bool,
    /// Activation from the most recent evaluation.
    pub output: f32,
    /// Nodes reached from here by non-recurrent connections, in insertion order
    /// and without duplicates. Only used for layer propagation.
    pub forward: Vec<NodeId>,
}

impl NodeGene {
    /// Create a node of the given type at layer 0.
    #[must_use]
    pub const fn new(node_type: NodeType, id: u32) -> Self {
        Self {
            id,
            node_type,
            location: 0,
            recurrent: false,
            output: 0.0,
            forward: Vec::new(),
        }
    }

    /// Create a new input node.
    #[must_use]
    pub const fn input(id: u32) -> Self {
        Self::new(NodeType::Input, id)
    }

    /// Create a bias node that always outputs 1.0.
    #[must_use]
    pub const fn bias(id: u32) -> Self {
        Self::new(NodeType::Bias, id)
    }

    /// Create a new hidden node.
    #[must_use]
    pub const fn hidden(id: u32) -> Self {
        Self::new(NodeType::Hidden, id)
    }

    /// Create a new output node.
    #[must_use]
    pub const fn output(id: u32) -> Self {
        Self::new(NodeType::Output, id)
    }

    /// Record a forward neighbour, ignoring duplicates.
    pub fn add_forward(&mut self, node: NodeId) {
        if !self.forward.contains(&node) {
            self.forward.push(node);
        }
    }
}

impl PartialEq for NodeGene {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeGene {}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.node_type, self.id, self.location)
    }
}

/// A connection gene representing a weighted link between two nodes.
#[derive(Debug, Clone)]
pub struct ConnectionGene {
    /// Innovation number shared by every genome that made this same connection.
    pub innovation: u32,
    /// The source node of this connection.
    pub input: NodeId,
    /// The target node of this connection.
    pub output: NodeId,
    /// The connection weight.
    pub weight: f32,
    /// Whether this connection is active.
    /// Disabled connections are skipped during evaluation but never removed.
    pub enabled: bool,
    /// Fixed at creation: the target was not in a later layer than the source.
    pub recurrent: bool,
}

impl ConnectionGene {
    /// Create a new enabled connection.
    #[must_use]
    pub const fn new(
        innovation: u32,
        input: NodeId,
        output: NodeId,
        weight: f32,
        recurrent: bool,
    ) -> Self {
        Self {
            innovation,
            input,
            output,
            weight,
            enabled: true,
            recurrent,
        }
    }
}

impl PartialEq for ConnectionGene {
    fn eq(&self, other: &Self) -> bool {
        self.innovation == other.innovation
    }
}

impl Eq for ConnectionGene {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_gene_creation() {
        let input = NodeGene::input(0);
        assert_eq!(input.node_type, NodeType::Input);
        assert_eq!(input.location, 0);
        assert!(!input.recurrent);

        let bias = NodeGene::bias(1);
        assert_eq!(bias.node_type, NodeType::Bias);
        assert!(bias.node_type.is_sensor());

        let hidden = NodeGene::hidden(7);
        assert_eq!(hidden.node_type, NodeType::Hidden);
        assert!(!hidden.node_type.is_sensor());

        let output = NodeGene::output(2);
        assert_eq!(output.node_type, NodeType::Output);
    }

    #[test]
    fn test_node_equality_is_by_id() {
        let mut a = NodeGene::hidden(5);
        a.location = 3;
        let b = NodeGene::output(5);
        assert_eq!(a, b);
        assert_ne!(a, NodeGene::hidden(6));
    }

    #[test]
    fn test_forward_neighbours_are_a_set() {
        use slotmap::SlotMap;

        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let n1 = nodes.insert(NodeGene::input(0));
        let n2 = nodes.insert(NodeGene::output(1));

        nodes[n1].add_forward(n2);
        nodes[n1].add_forward(n2);
        assert_eq!(nodes[n1].forward, vec![n2]);
    }

    #[test]
    fn test_connection_gene_creation() {
        use slotmap::SlotMap;

        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let n1 = nodes.insert(NodeGene::input(0));
        let n2 = nodes.insert(NodeGene::output(1));

        let conn = ConnectionGene::new(100, n1, n2, 0.5, false);
        assert_eq!(conn.input, n1);
        assert_eq!(conn.output, n2);
        assert!((conn.weight - 0.5).abs() < 1e-6);
        assert!(conn.enabled);
        assert!(!conn.recurrent);

        let other = ConnectionGene::new(100, n2, n1, -1.0, true);
        assert_eq!(conn, other, "connections compare by innovation");
    }

    #[test]
    fn test_node_display() {
        let mut node = NodeGene::hidden(9);
        node.location = 2;
        assert_eq!(node.to_string(), "HIDDEN 9 2");
    }
}
