//! Replay memory for sequential interaction records.
//!
//! This module implements a fixed-capacity, overwrite-oldest experience
//! replay memory that keeps several parallel per-field stores index-aligned
//! under eviction and under two temporal granularities: single steps and
//! fixed-length episode sequences.
//!
//! # Key components
//!
//! - [`RingStore`]: preallocated circular storage of committed sequence slots
//! - [`FieldBuffer`]: per-field episode accumulation on top of a [`RingStore`]
//! - [`StepRecordBuffer`]: the six lock-step transition fields
//! - [`RecurrentTraceBuffer`]: last-action sequences and episode-boundary
//!   hidden/cell snapshots for recurrent learners
//! - [`DomainParameterBuffer`]: the domain-randomization vector active during
//!   an episode
//! - [`ReplayBuffer`]: the composite owning all of the above, exposing
//!   `push`, `sample`, `clear` and `merge`
//!
//! Every `sample` call resolves one shared batch-index set and applies it to
//! every active sub-buffer, so the returned arrays describe the same
//! underlying transitions at every batch position.

mod base;
mod batch;
mod config;
mod domain;
mod field;
mod recurrent;
mod ring_store;
mod step;

pub use base::{ReplayBuffer, Transition};
pub use batch::{Minibatch, SamplingMode, SequenceBatch, StepBatch};
pub use config::ReplayMemoryConfig;
pub use domain::DomainParameterBuffer;
pub use field::FieldBuffer;
pub use recurrent::{
    HiddenState, HiddenStatePair, RecurrentTrace, RecurrentTraceBatch, RecurrentTraceBuffer,
};
pub use ring_store::RingStore;
pub use step::{StepRecord, StepRecordBuffer};
