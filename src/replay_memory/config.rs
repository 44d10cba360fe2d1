//! Configuration of the replay memory.
use crate::error::ReplayMemoryError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ReplayBuffer`](super::ReplayBuffer).
///
/// The configuration is immutable for the lifetime of the buffer: it is
/// passed to [`ReplayBuffer::build`](super::ReplayBuffer::build) once and
/// captured by value; no component mutates it afterwards.
///
/// The storage budget is given in *steps* (`memory_size`). In recurrent mode
/// a slot holds a whole episode sequence, so the slot capacity becomes
/// `memory_size / max_episode_length`; otherwise a slot holds a single step.
///
/// # Examples
///
/// ```rust
/// use episodic_replay::ReplayMemoryConfig;
///
/// let config = ReplayMemoryConfig::default()
///     .state_dim(17)
///     .action_dim(6)
///     .max_episode_length(200)
///     .memory_size(100_000)
///     .recurrent(true)
///     .hidden_dim(256);
/// assert_eq!(config.slot_capacity(), 500);
/// assert_eq!(config.sequence_len(), 200);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayMemoryConfig {
    /// Dimension of the state (and next-state) vector.
    pub state_dim: usize,

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Upper bound on the number of steps per episode. In recurrent mode
    /// this is also the stored sequence length.
    pub max_episode_length: usize,

    /// Dimension of the domain-randomization parameter vector.
    pub domain_parameter_dim: usize,

    /// Total storage budget in steps.
    pub memory_size: usize,

    /// Whether episodes are stored as fixed-length sequences for a
    /// recurrent learner.
    pub recurrent: bool,

    /// Whether a domain-randomization parameter vector is stored alongside
    /// each transition.
    pub domain_randomization: bool,

    /// Whether the action space is discrete. Discrete actions are stored as
    /// a single index; continuous actions as an `action_dim` vector.
    pub discrete_action: bool,

    /// Width of the recurrent hidden/cell state snapshots.
    pub hidden_dim: usize,

    /// Compute device the training loop expects sampled arrays on. Opaque
    /// to the replay memory; it only carries the value through.
    pub device: String,

    /// Random seed used for sampling.
    pub seed: u64,
}

impl Default for ReplayMemoryConfig {
    fn default() -> Self {
        Self {
            state_dim: 1,
            action_dim: 1,
            max_episode_length: 200,
            domain_parameter_dim: 1,
            memory_size: 100_000,
            recurrent: false,
            domain_randomization: false,
            discrete_action: false,
            hidden_dim: 64,
            device: "cpu".into(),
            seed: 42,
        }
    }
}

impl ReplayMemoryConfig {
    /// Sets the state dimension.
    pub fn state_dim(mut self, state_dim: usize) -> Self {
        self.state_dim = state_dim;
        self
    }

    /// Sets the action dimension.
    pub fn action_dim(mut self, action_dim: usize) -> Self {
        self.action_dim = action_dim;
        self
    }

    /// Sets the maximum episode length.
    pub fn max_episode_length(mut self, max_episode_length: usize) -> Self {
        self.max_episode_length = max_episode_length;
        self
    }

    /// Sets the domain parameter dimension.
    pub fn domain_parameter_dim(mut self, domain_parameter_dim: usize) -> Self {
        self.domain_parameter_dim = domain_parameter_dim;
        self
    }

    /// Sets the storage budget in steps.
    pub fn memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Enables or disables recurrent (sequence) storage.
    pub fn recurrent(mut self, recurrent: bool) -> Self {
        self.recurrent = recurrent;
        self
    }

    /// Enables or disables domain parameter storage.
    pub fn domain_randomization(mut self, domain_randomization: bool) -> Self {
        self.domain_randomization = domain_randomization;
        self
    }

    /// Marks the action space as discrete or continuous.
    pub fn discrete_action(mut self, discrete_action: bool) -> Self {
        self.discrete_action = discrete_action;
        self
    }

    /// Sets the recurrent hidden-state width.
    pub fn hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    /// Sets the pass-through device name.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Sets the sampling seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of steps stored per slot: the full episode length in recurrent
    /// mode, one otherwise.
    pub fn sequence_len(&self) -> usize {
        if self.recurrent {
            self.max_episode_length
        } else {
            1
        }
    }

    /// Number of slots the step budget converts to.
    pub fn slot_capacity(&self) -> usize {
        if self.recurrent {
            self.memory_size / self.max_episode_length
        } else {
            self.memory_size
        }
    }

    /// Per-step storage width of actions: a single index for discrete
    /// action spaces, the action vector otherwise.
    pub fn action_storage_dim(&self) -> usize {
        if self.discrete_action {
            1
        } else {
            self.action_dim
        }
    }

    /// Checks that the configuration can produce a usable replay memory.
    pub fn validate(&self) -> Result<()> {
        if self.state_dim == 0 {
            return Err(ReplayMemoryError::InvalidConfig("state_dim must be nonzero".into()).into());
        }
        if self.action_dim == 0 {
            return Err(
                ReplayMemoryError::InvalidConfig("action_dim must be nonzero".into()).into(),
            );
        }
        if self.max_episode_length == 0 {
            return Err(ReplayMemoryError::InvalidConfig(
                "max_episode_length must be nonzero".into(),
            )
            .into());
        }
        if self.slot_capacity() == 0 {
            return Err(ReplayMemoryError::InvalidConfig(format!(
                "memory_size {} is below one slot of {} steps",
                self.memory_size,
                self.sequence_len()
            ))
            .into());
        }
        if self.recurrent && self.hidden_dim == 0 {
            return Err(ReplayMemoryError::InvalidConfig(
                "hidden_dim must be nonzero in recurrent mode".into(),
            )
            .into());
        }
        if self.domain_randomization && self.domain_parameter_dim == 0 {
            return Err(ReplayMemoryError::InvalidConfig(
                "domain_parameter_dim must be nonzero with domain randomization".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
