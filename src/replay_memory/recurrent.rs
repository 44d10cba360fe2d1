//! Episode-boundary recurrent-state storage.
//!
//! A recurrent policy's hidden state is a function of the whole episode
//! prefix, so only the boundary snapshots (the state entering the episode
//! and the state at its end) are stored per episode; the per-step trace is
//! recomputed by unrolling at training time. What is stored per step is the
//! previous action, which the recurrent policy consumes as part of its
//! input.
use super::batch::squeeze_sequence;
use super::field::FieldBuffer;
use crate::error::ReplayMemoryError;
use anyhow::Result;
use ndarray::{Array1, Array2, Array3};

/// A hidden/cell pair for one episode, as captured from the policy.
#[derive(Clone, Debug, PartialEq)]
pub struct HiddenState {
    /// Hidden vector, length `hidden_dim`.
    pub hidden: Array1<f32>,
    /// Cell vector, length `hidden_dim`.
    pub cell: Array1<f32>,
}

/// The recurrent payload attached to one pushed step.
///
/// `last_action` is consumed at every step; the snapshot pairs only at
/// step 0 of an episode.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrentTrace {
    /// Action taken at the previous step, length `action_dim`.
    pub last_action: Array1<f32>,
    /// Recurrent state entering the episode.
    pub hidden_in: HiddenState,
    /// Recurrent state at the end of the episode.
    pub hidden_out: HiddenState,
}

/// A batched hidden/cell pair, each array `[batch, hidden_dim]`, ready for
/// a recurrent layer's initial-state argument.
#[derive(Clone, Debug)]
pub struct HiddenStatePair {
    /// Hidden vectors.
    pub hidden: Array2<f32>,
    /// Cell vectors.
    pub cell: Array2<f32>,
}

/// The sampled recurrent bundle.
#[derive(Clone, Debug)]
pub struct RecurrentTraceBatch {
    /// Last-action sequences, `[batch, sequence_len, action_dim]`.
    pub last_action: Array3<f32>,
    /// Episode-entry snapshots.
    pub hidden_in: HiddenStatePair,
    /// Episode-end snapshots.
    pub hidden_out: HiddenStatePair,
}

/// Storage for the items a recurrent learner needs: a per-step last-action
/// sequence plus four once-per-episode snapshot fields.
///
/// The snapshot values arriving at step 0 are staged in a preallocated
/// scratch block and appended to their rings only when the last-action
/// sequence commits, so all five rings fill and evict in lock-step. Were a
/// snapshot committed at step 0 directly, a full buffer would evict the
/// oldest episode's snapshot one episode ahead of its step data and
/// misalign the slots. Snapshot values carried by pushes at `step > 0`
/// leave the staged episode snapshot untouched.
#[derive(Debug, Clone)]
pub struct RecurrentTraceBuffer {
    last_action: FieldBuffer,
    hidden_in: FieldBuffer,
    hidden_out: FieldBuffer,
    cell_in: FieldBuffer,
    cell_out: FieldBuffer,
    /// Step-0 snapshots of the in-progress episode, shape `[hidden_dim]`.
    staged_hidden_in: Array1<f32>,
    staged_cell_in: Array1<f32>,
    staged_hidden_out: Array1<f32>,
    staged_cell_out: Array1<f32>,
    sequence_len: usize,
    hidden_dim: usize,
}

impl RecurrentTraceBuffer {
    /// Creates the five fields with a shared slot count.
    pub fn new(capacity: usize, sequence_len: usize, action_dim: usize, hidden_dim: usize) -> Self {
        Self {
            last_action: FieldBuffer::new(capacity, sequence_len, action_dim),
            hidden_in: FieldBuffer::new(capacity, 1, hidden_dim),
            hidden_out: FieldBuffer::new(capacity, 1, hidden_dim),
            cell_in: FieldBuffer::new(capacity, 1, hidden_dim),
            cell_out: FieldBuffer::new(capacity, 1, hidden_dim),
            staged_hidden_in: Array1::zeros(hidden_dim),
            staged_cell_in: Array1::zeros(hidden_dim),
            staged_hidden_out: Array1::zeros(hidden_dim),
            staged_cell_out: Array1::zeros(hidden_dim),
            sequence_len,
            hidden_dim,
        }
    }

    /// Pushes one step's recurrent payload.
    ///
    /// The last action is appended at every step. The hidden/cell snapshots
    /// are captured only when `step == 0` and committed together with the
    /// last-action sequence once the episode completes.
    pub fn push(&mut self, trace: &RecurrentTrace, step: usize) -> Result<()> {
        if step == 0 {
            for snapshot in [&trace.hidden_in, &trace.hidden_out].iter() {
                for vector in [&snapshot.hidden, &snapshot.cell].iter() {
                    if vector.len() != self.hidden_dim {
                        return Err(ReplayMemoryError::ShapeMismatch {
                            expected: vec![self.hidden_dim],
                            got: vec![vector.len()],
                        }
                        .into());
                    }
                }
            }
        }
        self.last_action.push(trace.last_action.view(), step)?;
        if step == 0 {
            self.staged_hidden_in.assign(&trace.hidden_in.hidden);
            self.staged_cell_in.assign(&trace.hidden_in.cell);
            self.staged_hidden_out.assign(&trace.hidden_out.hidden);
            self.staged_cell_out.assign(&trace.hidden_out.cell);
        }
        if step + 1 == self.sequence_len {
            self.hidden_in.push(self.staged_hidden_in.view(), 0)?;
            self.cell_in.push(self.staged_cell_in.view(), 0)?;
            self.hidden_out.push(self.staged_hidden_out.view(), 0)?;
            self.cell_out.push(self.staged_cell_out.view(), 0)?;
        }
        Ok(())
    }

    /// Number of committed episodes.
    pub fn len(&self) -> usize {
        self.last_action.len()
    }

    /// Whether no episode has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.last_action.is_empty()
    }

    /// Resets all five fields.
    pub fn clear(&mut self) {
        self.last_action.clear();
        self.hidden_in.clear();
        self.hidden_out.clear();
        self.cell_in.clear();
        self.cell_out.clear();
    }

    /// Samples the five-way bundle at one shared logical index set.
    pub fn sample(&self, indices: &[usize]) -> Result<RecurrentTraceBatch> {
        Ok(RecurrentTraceBatch {
            last_action: self.last_action.sample(indices)?,
            hidden_in: HiddenStatePair {
                hidden: squeeze_sequence(self.hidden_in.sample(indices)?),
                cell: squeeze_sequence(self.cell_in.sample(indices)?),
            },
            hidden_out: HiddenStatePair {
                hidden: squeeze_sequence(self.hidden_out.sample(indices)?),
                cell: squeeze_sequence(self.cell_out.sample(indices)?),
            },
        })
    }
}
