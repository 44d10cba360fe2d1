//! Storage of the domain-randomization parameter vector.
use super::field::FieldBuffer;
use anyhow::Result;
use ndarray::{Array3, ArrayView1};

/// One field holding the domain-randomization vector active during an
/// episode.
///
/// The vector is pushed once per step at the same cadence as the step
/// fields, so its slot layout matches [`StepRecordBuffer`](super::StepRecordBuffer)
/// and the shared batch-index set applies directly.
#[derive(Debug, Clone)]
pub struct DomainParameterBuffer {
    field: FieldBuffer,
}

impl DomainParameterBuffer {
    /// Creates the field. `sequence_len` is the episode length in recurrent
    /// mode and 1 otherwise.
    pub fn new(capacity: usize, sequence_len: usize, domain_parameter_dim: usize) -> Self {
        Self {
            field: FieldBuffer::new(capacity, sequence_len, domain_parameter_dim),
        }
    }

    /// Pushes the episode's parameter vector for one step.
    pub fn push(&mut self, parameter: ArrayView1<f32>, step: usize) -> Result<()> {
        self.field.push(parameter, step)
    }

    /// Number of committed episodes/slots.
    pub fn len(&self) -> usize {
        self.field.len()
    }

    /// Whether no episode has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    /// Resets the field.
    pub fn clear(&mut self) {
        self.field.clear();
    }

    /// Sequence-layout sample, `[batch, sequence_len, domain_parameter_dim]`.
    ///
    /// Non-recurrent storage uses `sequence_len == 1`; the flattening to
    /// `[batch, domain_parameter_dim]` happens when the composite batch is
    /// converted to its step layout.
    pub fn sample(&self, indices: &[usize]) -> Result<Array3<f32>> {
        self.field.sample(indices)
    }
}
