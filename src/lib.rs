#![warn(missing_docs)]
//! Experience replay memory for reinforcement learning.
//!
//! This crate stores sequential interaction records (state, action, reward,
//! next state, terminal flag and an auxiliary debug scalar) produced by one
//! or more acting agents, optionally augmented with recurrent hidden-state
//! snapshots and domain-randomization parameters, and serves randomized or
//! deterministic minibatches back to a learner.
//!
//! Storage is a set of parallel fixed-capacity ring buffers, one per data
//! field, that stay index-aligned under overwrite-oldest eviction and under
//! two temporal granularities: single steps (one slot per transition) and
//! fixed-length episode sequences (one slot per episode, for recurrent
//! learners). Insertion and eviction are O(1) and allocation-free in steady
//! state; sampling allocates only the output batch.
//!
//! # Example
//!
//! ```rust
//! use episodic_replay::{Minibatch, ReplayBuffer, ReplayMemoryConfig, SamplingMode, Transition};
//! use ndarray::array;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ReplayMemoryConfig::default()
//!     .state_dim(3)
//!     .action_dim(1)
//!     .memory_size(1000);
//! let mut buffer = ReplayBuffer::build(&config)?;
//!
//! buffer.push(
//!     Transition::new(array![0.0, 0.1, 0.2], array![0.5], 1.0, array![0.1, 0.2, 0.3], false)
//!         .step(0),
//! )?;
//!
//! match buffer.sample(4, SamplingMode::Random, false)? {
//!     Minibatch::Steps(batch) => assert_eq!(batch.state.shape(), &[4, 3]),
//!     Minibatch::Sequences(_) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The buffer itself holds no locks: with several parallel actors, keep one
//! buffer per actor and fold them into the learner-side buffer with
//! [`ReplayBuffer::merge`].
pub mod error;
pub mod replay_memory;

pub use error::ReplayMemoryError;
pub use replay_memory::{
    DomainParameterBuffer, FieldBuffer, HiddenState, HiddenStatePair, Minibatch, RecurrentTrace,
    RecurrentTraceBatch, RecurrentTraceBuffer, ReplayBuffer, ReplayMemoryConfig, RingStore,
    SamplingMode, SequenceBatch, StepBatch, StepRecord, StepRecordBuffer, Transition,
};
