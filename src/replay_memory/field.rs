//! Per-field episode accumulation on top of a ring store.
use super::ring_store::RingStore;
use crate::error::ReplayMemoryError;
use anyhow::Result;
use ndarray::{Array2, Array3, ArrayView1};
use rand::Rng;

/// One field's storage: a [`RingStore`] of committed sequences plus the
/// in-progress episode.
///
/// Steps of one episode must arrive in strict order 0, 1, 2, …; a gap or a
/// repeat is a contract violation on the caller's side and is rejected
/// before any state changes. Once the pending block fills to the configured
/// sequence length it commits atomically as one ring slot and the pending
/// state resets, so an episode is either entirely committed or entirely
/// absent from sampling.
#[derive(Debug, Clone)]
pub struct FieldBuffer {
    ring: RingStore,
    /// In-progress episode, shape `[sequence_len, dim]`.
    pending: Array2<f32>,
    pending_len: usize,
    sequence_len: usize,
    dim: usize,
}

impl FieldBuffer {
    /// Creates a field of `capacity` slots, each holding `sequence_len`
    /// steps of width `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, as [`RingStore::new`] does.
    pub fn new(capacity: usize, sequence_len: usize, dim: usize) -> Self {
        Self {
            ring: RingStore::new(capacity, sequence_len, dim),
            pending: Array2::zeros((sequence_len, dim)),
            pending_len: 0,
            sequence_len,
            dim,
        }
    }

    /// Appends one per-step value to the in-progress episode.
    ///
    /// `step` must equal the number of steps already pending; the value must
    /// have the configured per-step width. Filling the last step commits the
    /// whole sequence as one ring slot.
    pub fn push(&mut self, value: ArrayView1<f32>, step: usize) -> Result<()> {
        if step != self.pending_len {
            return Err(ReplayMemoryError::SequenceOrderViolation {
                expected: self.pending_len,
                got: step,
            }
            .into());
        }
        if value.len() != self.dim {
            return Err(ReplayMemoryError::ShapeMismatch {
                expected: vec![self.dim],
                got: value.shape().to_vec(),
            }
            .into());
        }
        self.pending.row_mut(step).assign(&value);
        self.pending_len += 1;
        if self.pending_len == self.sequence_len {
            self.ring.append(self.pending.view())?;
            self.pending_len = 0;
        }
        Ok(())
    }

    /// Number of committed episodes/slots (pending steps do not count).
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether no episode has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Steps per committed slot.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Drops committed and pending data, keeping the allocation.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.pending_len = 0;
    }

    /// Committed sequences at the given logical indices, shape
    /// `[batch, sequence_len, dim]`.
    pub fn sample(&self, indices: &[usize]) -> Result<Array3<f32>> {
        self.ring.take(indices)
    }

    /// The `n` most recently committed sequences in chronological order.
    pub fn sample_last(&self, n: usize) -> Result<Array3<f32>> {
        self.ring.take_last(n)
    }

    /// `n` committed sequences drawn uniformly with replacement.
    pub fn sample_random<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Array3<f32>> {
        self.ring.take_random(n, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::FieldBuffer;
    use crate::error::ReplayMemoryError;
    use ndarray::aview1;

    #[test]
    fn test_commit_on_full_sequence() {
        let mut field = FieldBuffer::new(4, 2, 1);
        field.push(aview1(&[1.0]), 0).unwrap();
        assert_eq!(field.len(), 0); // not committed yet
        field.push(aview1(&[2.0]), 1).unwrap();
        assert_eq!(field.len(), 1);

        let batch = field.sample(&[0]).unwrap();
        assert_eq!(batch[[0, 0, 0]], 1.0);
        assert_eq!(batch[[0, 1, 0]], 2.0);
    }

    #[test]
    fn test_unit_sequence_commits_immediately() {
        let mut field = FieldBuffer::new(4, 1, 2);
        field.push(aview1(&[1.0, 2.0]), 0).unwrap();
        assert_eq!(field.len(), 1);
        field.push(aview1(&[3.0, 4.0]), 0).unwrap();
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn test_out_of_order_step_rejected() {
        let mut field = FieldBuffer::new(4, 3, 1);
        let err = field.push(aview1(&[1.0]), 1).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::SequenceOrderViolation {
                expected: 0,
                got: 1,
            }
        );

        // A duplicated step is caught as well.
        field.push(aview1(&[1.0]), 0).unwrap();
        let err = field.push(aview1(&[1.0]), 0).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::SequenceOrderViolation {
                expected: 1,
                got: 0,
            }
        );
    }

    #[test]
    fn test_wrong_width_rejected() {
        let mut field = FieldBuffer::new(4, 1, 2);
        let err = field.push(aview1(&[1.0]), 0).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::ShapeMismatch {
                expected: vec![2],
                got: vec![1],
            }
        );
    }

    #[test]
    fn test_last_and_random_sampling() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut field = FieldBuffer::new(4, 1, 1);
        for v in 1..=3 {
            field.push(aview1(&[v as f32]), 0).unwrap();
        }

        let last = field.sample_last(2).unwrap();
        assert_eq!(last[[0, 0, 0]], 2.0);
        assert_eq!(last[[1, 0, 0]], 3.0);

        let mut rng = StdRng::seed_from_u64(1);
        let random = field.sample_random(8, &mut rng).unwrap();
        assert_eq!(random.shape(), &[8, 1, 1]);
    }

    #[test]
    fn test_clear_resets_pending() {
        let mut field = FieldBuffer::new(4, 2, 1);
        field.push(aview1(&[1.0]), 0).unwrap();
        field.clear();

        // A fresh episode restarts at step 0.
        field.push(aview1(&[5.0]), 0).unwrap();
        field.push(aview1(&[6.0]), 1).unwrap();
        assert_eq!(field.len(), 1);
        assert_eq!(field.sample(&[0]).unwrap()[[0, 0, 0]], 5.0);
    }
}
