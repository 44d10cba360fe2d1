//! Lock-step storage of the six per-step transition fields.
use super::batch::SequenceBatch;
use super::field::FieldBuffer;
use anyhow::Result;
use ndarray::{aview1, ArrayView1};

/// One observed transition, borrowed for the duration of a push.
#[derive(Clone, Copy, Debug)]
pub struct StepRecord<'a> {
    /// State before the action.
    pub state: ArrayView1<'a, f32>,
    /// Action taken; a single index for discrete action spaces.
    pub action: ArrayView1<'a, f32>,
    /// Scalar reward.
    pub reward: f32,
    /// State after the action.
    pub next_state: ArrayView1<'a, f32>,
    /// Whether the episode terminated at this step.
    pub done: bool,
    /// Auxiliary caller-supplied debug scalar.
    pub debug: f32,
}

/// Six [`FieldBuffer`]s (state, action, reward, next_state, done, debug)
/// sharing one slot count and one sequence length.
///
/// A push fans one record out to all six fields with the same step index and
/// a sample applies one shared index set to all six, so the returned arrays
/// describe the same underlying transitions in the same order.
#[derive(Debug, Clone)]
pub struct StepRecordBuffer {
    state: FieldBuffer,
    action: FieldBuffer,
    reward: FieldBuffer,
    next_state: FieldBuffer,
    done: FieldBuffer,
    debug: FieldBuffer,
}

impl StepRecordBuffer {
    /// Creates the six fields. `action_dim` is the *storage* width: 1 for
    /// discrete action spaces, the action dimension otherwise.
    pub fn new(capacity: usize, sequence_len: usize, state_dim: usize, action_dim: usize) -> Self {
        Self {
            state: FieldBuffer::new(capacity, sequence_len, state_dim),
            action: FieldBuffer::new(capacity, sequence_len, action_dim),
            reward: FieldBuffer::new(capacity, sequence_len, 1),
            next_state: FieldBuffer::new(capacity, sequence_len, state_dim),
            done: FieldBuffer::new(capacity, sequence_len, 1),
            debug: FieldBuffer::new(capacity, sequence_len, 1),
        }
    }

    /// Fans one record out to all six fields under the same step index.
    pub fn push(&mut self, record: &StepRecord, step: usize) -> Result<()> {
        self.state.push(record.state, step)?;
        self.action.push(record.action, step)?;
        self.reward.push(aview1(&[record.reward]), step)?;
        self.next_state.push(record.next_state, step)?;
        let done = if record.done { 1.0 } else { 0.0 };
        self.done.push(aview1(&[done]), step)?;
        self.debug.push(aview1(&[record.debug]), step)?;
        Ok(())
    }

    /// Number of committed episodes/slots.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether no episode has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Steps per committed slot.
    pub fn sequence_len(&self) -> usize {
        self.state.sequence_len()
    }

    /// Resets all six fields.
    pub fn clear(&mut self) {
        self.state.clear();
        self.action.clear();
        self.reward.clear();
        self.next_state.clear();
        self.done.clear();
        self.debug.clear();
    }

    /// Samples all six fields at one shared logical index set.
    ///
    /// Returns a sequence-layout batch with the recurrent-trace and
    /// domain-parameter slots unset; the composite buffer fills those in.
    pub fn sample(&self, indices: &[usize], include_debug: bool) -> Result<SequenceBatch> {
        let debug = if include_debug {
            Some(self.debug.sample(indices)?)
        } else {
            None
        };
        Ok(SequenceBatch {
            state: self.state.sample(indices)?,
            action: self.action.sample(indices)?,
            reward: self.reward.sample(indices)?,
            next_state: self.next_state.sample(indices)?,
            done: self.done.sample(indices)?,
            trace: None,
            domain_parameter: None,
            debug,
        })
    }
}
