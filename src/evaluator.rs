//! Forward evaluation of a [`Genome`].
//!
//! Nodes are visited once per call in `(location, id)` order. Recurrent
//! connections read whatever their source produced most recently, which may be
//! the previous call's value, so node outputs are the network's memory and
//! persist until [`Genome::reset_outputs`].

use thiserror::Error;

use crate::activation::bipolar_logistic;
use crate::gene::NodeType;
use crate::genome::Genome;
use crate::topology::evaluation_order;

/// Error type for evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    /// The input slice does not match the genome's input count.
    #[error("input length mismatch: expected {expected}, got {actual}")]
    InputLengthMismatch {
        /// Number of input nodes.
        expected: usize,
        /// Length of the provided slice.
        actual: usize,
    },
}

impl Genome {
    /// Run one forward pass and return the output activations.
    ///
    /// # Panics
    ///
    /// Panics if `inputs.len()` differs from the number of input nodes. Use
    /// [`try_evaluate`](Self::try_evaluate) for a non-panicking call.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.try_evaluate(inputs)
            .expect("input length must match the genome's input count")
    }

    /// Run one forward pass and return the output activations.
    ///
    /// Input nodes take `inputs` in order and the bias node emits `1.0`. Every
    /// other node sums `weight * source.output` over its enabled incoming
    /// connections and applies [`bipolar_logistic`]. Outputs are returned in
    /// traversal order, which is id order since they share one layer.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::InputLengthMismatch`] if `inputs` has the wrong
    /// length. No node is touched in that case.
    pub fn try_evaluate(&mut self, inputs: &[f32]) -> Result<Vec<f32>, EvaluatorError> {
        if inputs.len() != self.input_ids.len() {
            return Err(EvaluatorError::InputLengthMismatch {
                expected: self.input_ids.len(),
                actual: inputs.len(),
            });
        }

        for (&id, &value) in self.input_ids.iter().zip(inputs) {
            self.nodes[id].output = value;
        }
        if let Some(bias) = self.bias_id {
            self.nodes[bias].output = 1.0;
        }

        let mut outputs = Vec::with_capacity(self.output_ids.len());
        for id in evaluation_order(&self.nodes) {
            let node_type = self.nodes[id].node_type;
            if node_type.is_sensor() {
                continue;
            }

            let sum: f32 = self
                .connections
                .values()
                .filter(|c| c.enabled && c.output == id)
                .map(|c| c.weight * self.nodes[c.input].output)
                .sum();
            let value = bipolar_logistic(sum);
            self.nodes[id].output = value;

            if node_type == NodeType::Output {
                outputs.push(value);
            }
        }
        Ok(outputs)
    }

    /// Clear every node's stored activation, forgetting recurrent state.
    pub fn reset_outputs(&mut self) {
        for node in self.nodes.values_mut() {
            node.output = 0.0;
        }
    }
}
