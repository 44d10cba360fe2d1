//! Errors in the library.
use thiserror::Error;

/// Errors raised by the replay memory.
///
/// All of these are synchronous, caller-triggered conditions. None are
/// transient, so none warrant a retry: a violated episode boundary would
/// silently desynchronize the parallel field buffers, so the memory fails
/// fast instead of attempting partial recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayMemoryError {
    /// A pushed step index does not match the next position in the
    /// in-progress episode (a skipped or duplicated step).
    #[error("sequence order violation: expected step {expected}, got step {got}")]
    SequenceOrderViolation {
        /// The step index the in-progress episode expects next.
        expected: usize,
        /// The step index the caller supplied.
        got: usize,
    },

    /// A sample was requested before any episode was committed.
    #[error("sample requested from an empty replay memory")]
    EmptyBuffer,

    /// `push` was invoked without an explicit step index.
    #[error("push requires an explicit step index")]
    MissingStepIndex,

    /// An unrecognized sampling mode string.
    #[error("invalid sampling mode: {0:?} (expected \"random\", \"last\" or \"all\")")]
    InvalidSamplingMode(String),

    /// A pushed value's shape disagrees with the field's configured
    /// per-step shape.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The shape the field was configured with.
        expected: Vec<usize>,
        /// The shape of the value the caller supplied.
        got: Vec<usize>,
    },

    /// A direct index lookup beyond the number of committed slots.
    #[error("index {index} out of range for replay memory of length {len}")]
    IndexOutOfRange {
        /// The offending logical index.
        index: usize,
        /// The number of committed slots.
        len: usize,
    },

    /// A batch size incompatible with the sampling mode: larger than the
    /// committed length for `Last`, or different from it for `All`.
    #[error("invalid batch size: requested {requested}, {available} slots committed")]
    InvalidBatchSize {
        /// The requested batch size.
        requested: usize,
        /// The number of committed slots.
        available: usize,
    },

    /// Recurrent mode is configured but the pushed transition carries no
    /// recurrent trace.
    #[error("recurrent mode is enabled but the transition has no recurrent trace")]
    MissingRecurrentTrace,

    /// Domain randomization is configured but the pushed transition carries
    /// no domain parameter vector.
    #[error("domain randomization is enabled but the transition has no domain parameter")]
    MissingDomainParameter,

    /// Two buffers with incompatible storage layouts were merged.
    #[error("incompatible replay memories: {0}")]
    ConfigMismatch(String),

    /// A configuration that cannot produce a usable replay memory.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
