//! Run-scoped innovation history for NEAT.
//!
//! Every structural mutation (a new node splitting a connection, or a new
//! connection between two nodes) is recorded once in an [`InnovationLedger`].
//! Genomes that independently make the same mutation look it up here and
//! receive the same innovation id, which is what keeps them comparable.
//!
//! The ledger is an ordinary owned value. Mutation operators borrow it
//! mutably, so check-then-insert is always a single exclusive region.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of structural mutation an [`Innovation`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InnovationKind {
    /// A node was created, either a starting node or by splitting a connection.
    NewNode,
    /// A connection was created between two nodes.
    NewConnection,
}

impl fmt::Display for InnovationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewNode => f.write_str("NEW_NODE"),
            Self::NewConnection => f.write_str("NEW_CONNECTION"),
        }
    }
}

/// A single entry of the innovation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Innovation {
    /// Globally unique innovation number.
    pub id: u32,
    /// What kind of mutation this was.
    pub kind: InnovationKind,
    /// Node id allocated for a [`InnovationKind::NewNode`] record.
    pub node: Option<u32>,
    /// Node id at the start of the mutated connection.
    /// `None` for the seeded input, bias and output nodes.
    pub in_node: Option<u32>,
    /// Node id at the end of the mutated connection.
    /// `None` for the seeded input, bias and output nodes.
    pub out_node: Option<u32>,
}

impl fmt::Display for Innovation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Id: {} | InNode: {} | OutNode: {} | Node: {} | Type: {}",
            self.id,
            DisplayId(self.in_node),
            DisplayId(self.out_node),
            DisplayId(self.node),
            self.kind
        )
    }
}

/// Renders a missing id as `-1` in diagnostic dumps.
struct DisplayId(Option<u32>);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("-1"),
        }
    }
}

/// History of every structural mutation created during a run.
///
/// Grows monotonically and is never pruned. Lookups are a linear scan, which
/// is bounded by the structural diversity of the whole run rather than by the
/// per-generation workload.
#[derive(Debug, Clone, Default)]
pub struct InnovationLedger {
    records: Vec<Innovation>,
    next_innovation: u32,
    next_node: u32,
}

impl InnovationLedger {
    /// Create an empty ledger with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing innovation.
    ///
    /// Returns the allocated node id for [`InnovationKind::NewNode`] records and
    /// the innovation id for [`InnovationKind::NewConnection`] records, or
    /// `None` if this exact mutation has never happened.
    #[must_use]
    pub fn check_innovation(
        &self,
        in_node: Option<u32>,
        out_node: Option<u32>,
        kind: InnovationKind,
    ) -> Option<u32> {
        self.records
            .iter()
            .find(|r| r.in_node == in_node && r.out_node == out_node && r.kind == kind)
            .and_then(|r| match kind {
                InnovationKind::NewNode => r.node,
                InnovationKind::NewConnection => Some(r.id),
            })
    }

    /// Append a new innovation, allocating the next innovation id and, for
    /// node innovations, the next node id.
    pub fn create_new_innovation(
        &mut self,
        in_node: Option<u32>,
        out_node: Option<u32>,
        kind: InnovationKind,
    ) -> Innovation {
        let node = match kind {
            InnovationKind::NewNode => Some(self.allocate_node()),
            InnovationKind::NewConnection => None,
        };
        self.push(kind, node, in_node, out_node)
    }

    /// Record a node created by splitting `in_node -> out_node` and return the
    /// freshly allocated node id.
    pub fn create_node_innovation(&mut self, in_node: u32, out_node: u32) -> u32 {
        let node = self.allocate_node();
        self.push(
            InnovationKind::NewNode,
            Some(node),
            Some(in_node),
            Some(out_node),
        );
        node
    }

    /// Seed node records for the initial input, bias and output nodes.
    ///
    /// Genomes call this only when no starting-node record exists yet, so it
    /// runs once per ledger.
    pub fn create_starting_node_innovations(&mut self, count: usize) {
        for _ in 0..count {
            self.create_new_innovation(None, None, InnovationKind::NewNode);
        }
    }

    /// Return the innovation id for a connection `in_node -> out_node`,
    /// recording it first if this is the first time anyone made it.
    pub fn connection_innovation(&mut self, in_node: u32, out_node: u32) -> u32 {
        self.check_innovation(Some(in_node), Some(out_node), InnovationKind::NewConnection)
            .unwrap_or_else(|| {
                self.create_new_innovation(
                    Some(in_node),
                    Some(out_node),
                    InnovationKind::NewConnection,
                )
                .id
            })
    }

    /// Whether starting-node records have been seeded.
    #[must_use]
    pub fn has_starting_nodes(&self) -> bool {
        self.check_innovation(None, None, InnovationKind::NewNode)
            .is_some()
    }

    /// Number of seeded starting-node records.
    #[must_use]
    pub fn starting_node_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == InnovationKind::NewNode && r.in_node.is_none())
            .count()
    }

    /// All records in creation order.
    #[must_use]
    pub fn records(&self) -> &[Innovation] {
        &self.records
    }

    /// Number of recorded innovations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The innovation id the next record will receive.
    #[must_use]
    pub const fn next_innovation_id(&self) -> u32 {
        self.next_innovation
    }

    /// The node id the next node record will receive.
    #[must_use]
    pub const fn next_node_id(&self) -> u32 {
        self.next_node
    }

    fn push(
        &mut self,
        kind: InnovationKind,
        node: Option<u32>,
        in_node: Option<u32>,
        out_node: Option<u32>,
    ) -> Innovation {
        let record = Innovation {
            id: self.allocate_innovation(),
            kind,
            node,
            in_node,
            out_node,
        };
        self.records.push(record);
        record
    }

    fn allocate_innovation(&mut self) -> u32 {
        let id = self.next_innovation;
        self.next_innovation += 1;
        id
    }

    fn allocate_node(&mut self) -> u32 {
        let id = self.next_node;
        self.next_node += 1;
        id
    }
}

impl fmt::Display for InnovationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}
