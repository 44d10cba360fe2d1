//! The composite replay buffer.
use super::batch::{Minibatch, SamplingMode, SequenceBatch};
use super::config::ReplayMemoryConfig;
use super::domain::DomainParameterBuffer;
use super::recurrent::{HiddenState, RecurrentTrace, RecurrentTraceBuffer};
use super::step::{StepRecord, StepRecordBuffer};
use crate::error::ReplayMemoryError;
use anyhow::Result;
use log::{debug, info, trace};
use ndarray::{s, Array1};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// One environment step handed to [`ReplayBuffer::push`].
///
/// The step index must be set explicitly with [`step`](Transition::step);
/// a push without it fails with
/// [`MissingStepIndex`](crate::ReplayMemoryError::MissingStepIndex). The
/// debug scalar defaults to `-1.0` and is stored as given, independent of
/// the terminal flag.
#[derive(Clone, Debug)]
pub struct Transition {
    state: Array1<f32>,
    action: Array1<f32>,
    reward: f32,
    next_state: Array1<f32>,
    done: bool,
    debug: f32,
    step: Option<usize>,
    recurrent: Option<RecurrentTrace>,
    domain_parameter: Option<Array1<f32>>,
}

impl Transition {
    /// Creates a transition from the five mandatory fields.
    pub fn new(
        state: Array1<f32>,
        action: Array1<f32>,
        reward: f32,
        next_state: Array1<f32>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
            debug: -1.0,
            step: None,
            recurrent: None,
            domain_parameter: None,
        }
    }

    /// Sets the zero-based step index within the current episode.
    pub fn step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the auxiliary debug scalar.
    pub fn debug(mut self, debug: f32) -> Self {
        self.debug = debug;
        self
    }

    /// Attaches the recurrent payload. Required when recurrent mode is
    /// configured.
    pub fn recurrent(mut self, trace: RecurrentTrace) -> Self {
        self.recurrent = Some(trace);
        self
    }

    /// Attaches the episode's domain-randomization vector. Required when
    /// domain randomization is configured.
    pub fn domain_parameter(mut self, domain_parameter: Array1<f32>) -> Self {
        self.domain_parameter = Some(domain_parameter);
        self
    }
}

/// Fixed-capacity experience replay memory.
///
/// Owns a [`StepRecordBuffer`] always, plus a [`RecurrentTraceBuffer`]
/// and/or a [`DomainParameterBuffer`] when the configuration enables them.
/// A push fans one step out to every active sub-buffer; a sample resolves
/// one shared batch-index set and applies it to every active sub-buffer, so
/// the returned bundle is aligned sample for sample.
///
/// All storage is preallocated at build time: `push` is O(1) and
/// allocation-free in steady state, `sample` allocates only the output
/// batch. The buffer is single-threaded; callers with several actors keep
/// one buffer per actor and fold them together with [`merge`](Self::merge).
pub struct ReplayBuffer {
    config: ReplayMemoryConfig,
    steps: StepRecordBuffer,
    recurrent: Option<RecurrentTraceBuffer>,
    domain: Option<DomainParameterBuffer>,
    rng: StdRng,
}

impl ReplayBuffer {
    /// Builds an empty buffer from the configuration.
    pub fn build(config: &ReplayMemoryConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.slot_capacity();
        let sequence_len = config.sequence_len();
        let steps = StepRecordBuffer::new(
            capacity,
            sequence_len,
            config.state_dim,
            config.action_storage_dim(),
        );
        let recurrent = if config.recurrent {
            Some(RecurrentTraceBuffer::new(
                capacity,
                sequence_len,
                config.action_dim,
                config.hidden_dim,
            ))
        } else {
            None
        };
        let domain = if config.domain_randomization {
            Some(DomainParameterBuffer::new(
                capacity,
                sequence_len,
                config.domain_parameter_dim,
            ))
        } else {
            None
        };
        info!(
            "replay memory: {} slots of {} steps each",
            capacity, sequence_len
        );
        Ok(Self {
            config: config.clone(),
            steps,
            recurrent,
            domain,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// The configuration the buffer was built from.
    pub fn config(&self) -> &ReplayMemoryConfig {
        &self.config
    }

    /// The pass-through device name the training loop expects sampled
    /// arrays on. Never interpreted by the buffer itself.
    pub fn device(&self) -> &str {
        &self.config.device
    }

    /// Number of committed episodes/slots.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no episode has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Pushes one environment step into every active sub-buffer.
    ///
    /// The transition is validated in full (step index present, required
    /// payloads present, every vector at its configured width) before any
    /// sub-buffer is touched, so a rejected push leaves the memory
    /// unchanged.
    pub fn push(&mut self, transition: Transition) -> Result<()> {
        let step = transition
            .step
            .ok_or(ReplayMemoryError::MissingStepIndex)?;
        self.validate(&transition)?;

        // In non-recurrent storage every slot holds a single step, so the
        // caller's per-episode step index collapses to position 0.
        let slot_step = if self.config.recurrent { step } else { 0 };

        let record = StepRecord {
            state: transition.state.view(),
            action: transition.action.view(),
            reward: transition.reward,
            next_state: transition.next_state.view(),
            done: transition.done,
            debug: transition.debug,
        };
        self.steps.push(&record, slot_step)?;
        if let Some(buffer) = &mut self.recurrent {
            // Presence was validated above.
            if let Some(trace) = &transition.recurrent {
                buffer.push(trace, slot_step)?;
            }
        }
        if let Some(buffer) = &mut self.domain {
            if let Some(parameter) = &transition.domain_parameter {
                buffer.push(parameter.view(), slot_step)?;
            }
        }
        if slot_step + 1 == self.config.sequence_len() {
            trace!("episode committed, {} slots stored", self.len());
        }
        Ok(())
    }

    fn validate(&self, transition: &Transition) -> Result<()> {
        let check = |len: usize, expected: usize| -> Result<()> {
            if len != expected {
                return Err(ReplayMemoryError::ShapeMismatch {
                    expected: vec![expected],
                    got: vec![len],
                }
                .into());
            }
            Ok(())
        };
        check(transition.state.len(), self.config.state_dim)?;
        check(transition.next_state.len(), self.config.state_dim)?;
        check(transition.action.len(), self.config.action_storage_dim())?;
        if self.recurrent.is_some() {
            let trace = transition
                .recurrent
                .as_ref()
                .ok_or(ReplayMemoryError::MissingRecurrentTrace)?;
            check(trace.last_action.len(), self.config.action_dim)?;
            for snapshot in [&trace.hidden_in, &trace.hidden_out].iter() {
                check(snapshot.hidden.len(), self.config.hidden_dim)?;
                check(snapshot.cell.len(), self.config.hidden_dim)?;
            }
        }
        if self.domain.is_some() {
            let parameter = transition
                .domain_parameter
                .as_ref()
                .ok_or(ReplayMemoryError::MissingDomainParameter)?;
            check(parameter.len(), self.config.domain_parameter_dim)?;
        }
        Ok(())
    }

    /// Samples an aligned minibatch.
    ///
    /// Resolves one shared index set according to `mode` and applies it to
    /// every active sub-buffer. Non-recurrent buffers return
    /// [`Minibatch::Steps`], recurrent buffers [`Minibatch::Sequences`].
    /// The debug field is included only when `include_debug` is set.
    pub fn sample(
        &mut self,
        batch_size: usize,
        mode: SamplingMode,
        include_debug: bool,
    ) -> Result<Minibatch> {
        let len = self.len();
        if len == 0 {
            return Err(ReplayMemoryError::EmptyBuffer.into());
        }
        let indices = self.resolve_indices(batch_size, mode, len)?;
        let sequences = self.sample_sequences(&indices, include_debug)?;
        if self.config.recurrent {
            Ok(Minibatch::Sequences(sequences))
        } else {
            Ok(Minibatch::Steps(sequences.into_steps()))
        }
    }

    fn resolve_indices(
        &mut self,
        batch_size: usize,
        mode: SamplingMode,
        len: usize,
    ) -> Result<Vec<usize>> {
        match mode {
            SamplingMode::Random => Ok((0..batch_size)
                .map(|_| self.rng.gen_range(0..len))
                .collect()),
            SamplingMode::Last => {
                if batch_size > len {
                    return Err(ReplayMemoryError::InvalidBatchSize {
                        requested: batch_size,
                        available: len,
                    }
                    .into());
                }
                Ok((len - batch_size..len).collect())
            }
            SamplingMode::All => {
                if batch_size != len {
                    return Err(ReplayMemoryError::InvalidBatchSize {
                        requested: batch_size,
                        available: len,
                    }
                    .into());
                }
                Ok((0..len).collect())
            }
        }
    }

    /// Sequence-layout fetch shared by `sample` and `merge`.
    fn sample_sequences(&self, indices: &[usize], include_debug: bool) -> Result<SequenceBatch> {
        let mut batch = self.steps.sample(indices, include_debug)?;
        if let Some(buffer) = &self.recurrent {
            batch.trace = Some(buffer.sample(indices)?);
        }
        if let Some(buffer) = &self.domain {
            batch.domain_parameter = Some(buffer.sample(indices)?);
        }
        Ok(batch)
    }

    /// Resets every sub-buffer without reallocating storage.
    pub fn clear(&mut self) {
        self.steps.clear();
        if let Some(buffer) = &mut self.recurrent {
            buffer.clear();
        }
        if let Some(buffer) = &mut self.domain {
            buffer.clear();
        }
        debug!("replay memory cleared");
    }

    /// Clears this buffer, then folds the contents of `sources` into it.
    ///
    /// Each source is dumped in full and every contained step is replayed
    /// through [`push`](Self::push) in original order with its original
    /// per-episode step index. Replaying rather than copying memory
    /// re-derives slot boundaries and revalidates the ordering invariants,
    /// so sources may have any capacity or fill state as long as their
    /// storage layout matches this buffer's.
    pub fn merge(&mut self, sources: &[ReplayBuffer]) -> Result<()> {
        for source in sources {
            self.check_compatible(source)?;
        }
        self.clear();
        for source in sources {
            if source.is_empty() {
                continue;
            }
            let indices: Vec<usize> = (0..source.len()).collect();
            let dump = source.sample_sequences(&indices, true)?;
            self.replay(&dump)?;
        }
        info!(
            "merged {} source buffers, {} slots stored",
            sources.len(),
            self.len()
        );
        Ok(())
    }

    fn check_compatible(&self, other: &ReplayBuffer) -> Result<()> {
        let a = &self.config;
        let b = &other.config;
        let mismatch = |what: &str| -> Result<()> {
            Err(ReplayMemoryError::ConfigMismatch(format!("{} differs", what)).into())
        };
        if a.state_dim != b.state_dim {
            return mismatch("state_dim");
        }
        if a.action_dim != b.action_dim {
            return mismatch("action_dim");
        }
        if a.max_episode_length != b.max_episode_length {
            return mismatch("max_episode_length");
        }
        if a.recurrent != b.recurrent {
            return mismatch("recurrent");
        }
        if a.domain_randomization != b.domain_randomization {
            return mismatch("domain_randomization");
        }
        if a.discrete_action != b.discrete_action {
            return mismatch("discrete_action");
        }
        if a.recurrent && a.hidden_dim != b.hidden_dim {
            return mismatch("hidden_dim");
        }
        if a.domain_randomization && a.domain_parameter_dim != b.domain_parameter_dim {
            return mismatch("domain_parameter_dim");
        }
        Ok(())
    }

    /// Replays a full sequence-layout dump step by step.
    fn replay(&mut self, dump: &SequenceBatch) -> Result<()> {
        let slots = dump.len();
        let sequence_len = dump.sequence_len();
        for slot in 0..slots {
            for step in 0..sequence_len {
                let mut transition = Transition::new(
                    dump.state.slice(s![slot, step, ..]).to_owned(),
                    dump.action.slice(s![slot, step, ..]).to_owned(),
                    dump.reward[[slot, step, 0]],
                    dump.next_state.slice(s![slot, step, ..]).to_owned(),
                    dump.done[[slot, step, 0]] > 0.5,
                )
                .step(step);
                if let Some(dbg) = &dump.debug {
                    transition = transition.debug(dbg[[slot, step, 0]]);
                }
                if let Some(trace) = &dump.trace {
                    transition = transition.recurrent(RecurrentTrace {
                        last_action: trace.last_action.slice(s![slot, step, ..]).to_owned(),
                        hidden_in: HiddenState {
                            hidden: trace.hidden_in.hidden.row(slot).to_owned(),
                            cell: trace.hidden_in.cell.row(slot).to_owned(),
                        },
                        hidden_out: HiddenState {
                            hidden: trace.hidden_out.hidden.row(slot).to_owned(),
                            cell: trace.hidden_out.cell.row(slot).to_owned(),
                        },
                    });
                }
                if let Some(parameter) = &dump.domain_parameter {
                    transition = transition
                        .domain_parameter(parameter.slice(s![slot, step, ..]).to_owned());
                }
                self.push(transition)?;
            }
        }
        Ok(())
    }
}
