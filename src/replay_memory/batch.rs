//! Typed sampling surface of the replay memory.
use super::recurrent::RecurrentTraceBatch;
use crate::error::ReplayMemoryError;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How [`ReplayBuffer::sample`](super::ReplayBuffer::sample) resolves the
/// shared batch-index set.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum SamplingMode {
    /// Indices drawn uniformly with replacement from the committed range.
    Random,
    /// The most recently committed slots, in chronological order.
    Last,
    /// Every committed slot, oldest first. The requested batch size must
    /// equal the buffer length; used for full dumps.
    All,
}

impl FromStr for SamplingMode {
    type Err = ReplayMemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SamplingMode::Random),
            "last" => Ok(SamplingMode::Last),
            "all" => Ok(SamplingMode::All),
            _ => Err(ReplayMemoryError::InvalidSamplingMode(s.to_string())),
        }
    }
}

/// A minibatch of single-step transitions, unit sequence axis removed.
///
/// Every array is `[batch, dim]`; scalar fields (reward, done, debug) have
/// `dim == 1`. Entries at the same batch position originate from the same
/// pushed transition across all fields.
#[derive(Clone, Debug)]
pub struct StepBatch {
    /// States, `[batch, state_dim]`.
    pub state: Array2<f32>,
    /// Actions, `[batch, 1]` for discrete action spaces, `[batch, action_dim]` otherwise.
    pub action: Array2<f32>,
    /// Rewards, `[batch, 1]`.
    pub reward: Array2<f32>,
    /// Next states, `[batch, state_dim]`.
    pub next_state: Array2<f32>,
    /// Terminal flags as 0.0/1.0, `[batch, 1]`.
    pub done: Array2<f32>,
    /// Domain-randomization vectors, `[batch, domain_parameter_dim]`, when
    /// domain randomization is configured.
    pub domain_parameter: Option<Array2<f32>>,
    /// Auxiliary debug scalars, `[batch, 1]`, when requested.
    pub debug: Option<Array2<f32>>,
}

impl StepBatch {
    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.state.nrows()
    }

    /// Whether the batch holds no transition.
    pub fn is_empty(&self) -> bool {
        self.state.nrows() == 0
    }
}

/// A minibatch of fixed-length episode sequences.
///
/// Per-step arrays are `[batch, sequence_len, dim]`. Batch positions are
/// aligned across all fields, including the recurrent trace and the domain
/// parameters when present.
#[derive(Clone, Debug)]
pub struct SequenceBatch {
    /// State sequences, `[batch, sequence_len, state_dim]`.
    pub state: Array3<f32>,
    /// Action sequences.
    pub action: Array3<f32>,
    /// Reward sequences, `[batch, sequence_len, 1]`.
    pub reward: Array3<f32>,
    /// Next-state sequences.
    pub next_state: Array3<f32>,
    /// Terminal-flag sequences as 0.0/1.0.
    pub done: Array3<f32>,
    /// Recurrent trace bundle, when recurrent mode is configured.
    pub trace: Option<RecurrentTraceBatch>,
    /// Domain-randomization sequences, when domain randomization is
    /// configured.
    pub domain_parameter: Option<Array3<f32>>,
    /// Auxiliary debug sequences, when requested.
    pub debug: Option<Array3<f32>>,
}

impl SequenceBatch {
    /// Number of episode sequences in the batch.
    pub fn len(&self) -> usize {
        self.state.shape()[0]
    }

    /// Whether the batch holds no sequence.
    pub fn is_empty(&self) -> bool {
        self.state.shape()[0] == 0
    }

    /// Steps per sequence.
    pub fn sequence_len(&self) -> usize {
        self.state.shape()[1]
    }

    /// Collapses the unit sequence axis into a flat per-step batch.
    ///
    /// Only meaningful for non-recurrent storage, where every sequence
    /// holds exactly one step.
    pub(crate) fn into_steps(self) -> StepBatch {
        debug_assert_eq!(self.state.shape()[1], 1);
        StepBatch {
            state: squeeze_sequence(self.state),
            action: squeeze_sequence(self.action),
            reward: squeeze_sequence(self.reward),
            next_state: squeeze_sequence(self.next_state),
            done: squeeze_sequence(self.done),
            domain_parameter: self.domain_parameter.map(squeeze_sequence),
            debug: self.debug.map(squeeze_sequence),
        }
    }
}

/// The aligned bundle returned by a `sample` call.
///
/// The variant follows the buffer's configured mode, not the shape of a
/// particular draw: non-recurrent buffers always yield [`Minibatch::Steps`],
/// recurrent buffers always yield [`Minibatch::Sequences`]. Callers match
/// once instead of guessing at residual axes.
#[derive(Clone, Debug)]
pub enum Minibatch {
    /// Flat per-step transitions from a non-recurrent buffer.
    Steps(StepBatch),
    /// Fixed-length episode sequences from a recurrent buffer.
    Sequences(SequenceBatch),
}

impl Minibatch {
    /// Number of sampled slots in the batch.
    pub fn len(&self) -> usize {
        match self {
            Minibatch::Steps(b) => b.len(),
            Minibatch::Sequences(b) => b.len(),
        }
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the unit sequence axis of a `[batch, 1, dim]` array.
pub(crate) fn squeeze_sequence(a: Array3<f32>) -> Array2<f32> {
    a.index_axis_move(Axis(1), 0)
}

#[cfg(test)]
mod tests {
    use super::SamplingMode;
    use crate::error::ReplayMemoryError;
    use ndarray::Array3;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("random".parse::<SamplingMode>().unwrap(), SamplingMode::Random);
        assert_eq!("last".parse::<SamplingMode>().unwrap(), SamplingMode::Last);
        assert_eq!("all".parse::<SamplingMode>().unwrap(), SamplingMode::All);
        assert_eq!(
            "latest".parse::<SamplingMode>().unwrap_err(),
            ReplayMemoryError::InvalidSamplingMode("latest".into())
        );
    }

    #[test]
    fn test_squeeze_sequence() {
        let a = Array3::from_shape_fn((2, 1, 3), |(i, _, j)| (i * 3 + j) as f32);
        let b = super::squeeze_sequence(a);
        assert_eq!(b.shape(), &[2, 3]);
        assert_eq!(b[[1, 2]], 5.0);
    }
}
