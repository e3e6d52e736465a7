//! Layer bookkeeping for genome graphs.
//!
//! Every node carries a `location`: its longest forward distance from the
//! input layer. Locations only ever grow. After any structural change the
//! genome pushes new locations forward along non-recurrent adjacency with
//! [`propagate_locations`] and then pins the output layer with
//! [`update_output_locations`].
//!
//! ## Termination
//!
//! A forward edge `u -> v` is only recorded while `location(v) > location(u)`,
//! and propagation preserves that inequality, so forward adjacency is always a
//! DAG. The worklist below therefore reaches a fixed point without recursion,
//! however long the chains get.

use std::cmp::Ordering;

use slotmap::SlotMap;

use crate::gene::{NodeGene, NodeId, NodeType};

/// Advance every node reachable from `start` by forward adjacency until each
/// non-output neighbour sits at least one layer past its predecessor.
///
/// Output nodes are left alone; [`update_output_locations`] places them.
pub fn propagate_locations(nodes: &mut SlotMap<NodeId, NodeGene>, start: NodeId) {
    let mut worklist = vec![start];

    while let Some(current) = worklist.pop() {
        let Some(node) = nodes.get(current) else {
            continue;
        };
        let next_location = node.location + 1;
        let neighbours = node.forward.clone();

        for neighbour_id in neighbours {
            let Some(neighbour) = nodes.get_mut(neighbour_id) else {
                continue;
            };
            if neighbour.node_type == NodeType::Output {
                continue;
            }
            if next_location > neighbour.location {
                neighbour.location = next_location;
                worklist.push(neighbour_id);
            }
        }
    }
}

/// Pin every output node one layer past the deepest non-output node.
///
/// Returns the resulting number of layers (`max_location + 2`).
pub fn update_output_locations(nodes: &mut SlotMap<NodeId, NodeGene>) -> u32 {
    let max_location = nodes
        .values()
        .filter(|n| n.node_type != NodeType::Output)
        .map(|n| n.location)
        .max()
        .unwrap_or(0);

    let num_layers = max_location + 2;
    for node in nodes.values_mut() {
        if node.node_type == NodeType::Output {
            node.location = num_layers - 1;
        }
    }
    num_layers
}

/// Nodes ordered by `(location, id)`: a total order consistent with layering.
#[must_use]
pub fn evaluation_order(nodes: &SlotMap<NodeId, NodeGene>) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = nodes.keys().collect();
    order.sort_by(|&a, &b| compare_layered(&nodes[a], &nodes[b]));
    order
}

fn compare_layered(a: &NodeGene, b: &NodeGene) -> Ordering {
    a.location
        .cmp(&b.location)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// input(0) -> h1 -> h2 -> h3 plus an output.
    fn chain(len: u32) -> (SlotMap<NodeId, NodeGene>, Vec<NodeId>, NodeId) {
        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let mut ids = vec![nodes.insert(NodeGene::input(0))];
        for i in 0..len {
            ids.push(nodes.insert(NodeGene::hidden(10 + i)));
        }
        let out = nodes.insert(NodeGene::output(1));
        for pair in ids.windows(2) {
            nodes[pair[0]].add_forward(pair[1]);
        }
        let last = *ids.last().unwrap_or(&ids[0]);
        nodes[last].add_forward(out);
        (nodes, ids, out)
    }

    #[test]
    fn test_propagation_along_chain() {
        let (mut nodes, ids, out) = chain(3);
        propagate_locations(&mut nodes, ids[0]);

        for (depth, id) in ids.iter().enumerate() {
            assert_eq!(nodes[*id].location, depth as u32);
        }
        // Outputs are never advanced by propagation.
        assert_eq!(nodes[out].location, 0);

        let layers = update_output_locations(&mut nodes);
        assert_eq!(layers, 5);
        assert_eq!(nodes[out].location, 4);
    }

    #[test]
    fn test_propagation_is_iterative() {
        let (mut nodes, ids, _) = chain(50_000);
        propagate_locations(&mut nodes, ids[0]);
        assert_eq!(nodes[ids[50_000]].location, 50_000);
    }

    #[test]
    fn test_propagation_never_lowers_locations() {
        let (mut nodes, ids, _) = chain(2);
        nodes[ids[2]].location = 9;
        propagate_locations(&mut nodes, ids[0]);
        assert_eq!(nodes[ids[1]].location, 1);
        assert_eq!(nodes[ids[2]].location, 9);
    }

    #[test]
    fn test_self_recurrent_neighbours_still_advance() {
        let (mut nodes, ids, _) = chain(2);
        nodes[ids[2]].recurrent = true;
        propagate_locations(&mut nodes, ids[0]);
        assert_eq!(nodes[ids[2]].location, 2);
    }

    #[test]
    fn test_output_pinning_without_hidden_nodes() {
        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        nodes.insert(NodeGene::input(0));
        let out = nodes.insert(NodeGene::output(1));
        assert_eq!(update_output_locations(&mut nodes), 2);
        assert_eq!(nodes[out].location, 1);
    }

    #[test]
    fn test_evaluation_order_by_location_then_id() {
        let mut nodes: SlotMap<NodeId, NodeGene> = SlotMap::with_key();
        let out = nodes.insert(NodeGene::output(2));
        let hidden_b = nodes.insert(NodeGene::hidden(9));
        let hidden_a = nodes.insert(NodeGene::hidden(5));
        let input = nodes.insert(NodeGene::input(0));
        nodes[out].location = 2;
        nodes[hidden_a].location = 1;
        nodes[hidden_b].location = 1;

        assert_eq!(
            evaluation_order(&nodes),
            vec![input, hidden_a, hidden_b, out]
        );
    }
}
