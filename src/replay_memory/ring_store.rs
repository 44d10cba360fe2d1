//! Fixed-capacity circular storage of committed sequence slots.
use crate::error::ReplayMemoryError;
use anyhow::Result;
use ndarray::{Array3, ArrayView2, Axis};
use rand::Rng;

/// Preallocated circular storage of fixed-shape sequence blocks.
///
/// The backing array has shape `[capacity, sequence_len, dim]` and is
/// allocated once at construction. `append` is O(1) and allocation-free: it
/// writes at the cursor slot, advances the cursor modulo the capacity and
/// saturates the logical size, so that once the store is full every append
/// evicts exactly the oldest surviving slot.
///
/// Reads address slots by *logical* index, where 0 is the oldest surviving
/// slot. This keeps full dumps and `take_last` windows chronological even
/// after the cursor has wrapped.
#[derive(Debug, Clone)]
pub struct RingStore {
    /// Backing storage, shape `[capacity, sequence_len, dim]`.
    data: Array3<f32>,
    capacity: usize,
    sequence_len: usize,
    dim: usize,
    /// Next slot to overwrite.
    cursor: usize,
    /// Number of committed slots, saturates at `capacity`.
    size: usize,
}

impl RingStore {
    /// Creates a store of `capacity` slots, each a `[sequence_len, dim]`
    /// block.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; the cursor arithmetic needs at least
    /// one slot.
    pub fn new(capacity: usize, sequence_len: usize, dim: usize) -> Self {
        assert!(capacity > 0, "ring store capacity must be nonzero");
        Self {
            data: Array3::zeros((capacity, sequence_len, dim)),
            capacity,
            sequence_len,
            dim,
            cursor: 0,
            size: 0,
        }
    }

    /// Number of committed slots.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether no slot has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Steps per slot.
    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    /// Per-step width.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Resets cursor and logical size without touching the allocation.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.size = 0;
    }

    /// Commits one sequence block, evicting the oldest slot once full.
    pub fn append(&mut self, block: ArrayView2<f32>) -> Result<()> {
        if block.shape() != [self.sequence_len, self.dim] {
            return Err(ReplayMemoryError::ShapeMismatch {
                expected: vec![self.sequence_len, self.dim],
                got: block.shape().to_vec(),
            }
            .into());
        }
        self.data.index_axis_mut(Axis(0), self.cursor).assign(&block);
        self.cursor = (self.cursor + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
        Ok(())
    }

    /// Maps a logical index (0 = oldest surviving slot) to its physical slot.
    fn physical(&self, logical: usize) -> usize {
        (self.cursor + self.capacity - self.size + logical) % self.capacity
    }

    /// Fetches slots by logical index, in the order given.
    ///
    /// The result has shape `[indices.len(), sequence_len, dim]`.
    pub fn take(&self, indices: &[usize]) -> Result<Array3<f32>> {
        if self.size == 0 {
            return Err(ReplayMemoryError::EmptyBuffer.into());
        }
        let mut physical = Vec::with_capacity(indices.len());
        for &ix in indices {
            if ix >= self.size {
                return Err(ReplayMemoryError::IndexOutOfRange {
                    index: ix,
                    len: self.size,
                }
                .into());
            }
            physical.push(self.physical(ix));
        }
        Ok(self.data.select(Axis(0), &physical))
    }

    /// The `n` most-recently-committed slots in chronological order.
    ///
    /// Reads the logical window `[size - n, size)`, which splices the tail
    /// of the backing array with its head when the window straddles the
    /// wraparound point.
    pub fn take_last(&self, n: usize) -> Result<Array3<f32>> {
        if self.size == 0 {
            return Err(ReplayMemoryError::EmptyBuffer.into());
        }
        if n > self.size {
            return Err(ReplayMemoryError::InvalidBatchSize {
                requested: n,
                available: self.size,
            }
            .into());
        }
        let indices: Vec<usize> = (self.size - n..self.size).collect();
        self.take(&indices)
    }

    /// `n` slots drawn independently and uniformly with replacement from
    /// the committed range.
    pub fn take_random<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Array3<f32>> {
        if self.size == 0 {
            return Err(ReplayMemoryError::EmptyBuffer.into());
        }
        let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..self.size)).collect();
        self.take(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::RingStore;
    use crate::error::ReplayMemoryError;
    use ndarray::Array2;
    use rand::{rngs::StdRng, SeedableRng};

    fn block(v: f32, sequence_len: usize, dim: usize) -> Array2<f32> {
        Array2::from_elem((sequence_len, dim), v)
    }

    fn slot_values(a: &ndarray::Array3<f32>) -> Vec<f32> {
        (0..a.shape()[0]).map(|i| a[[i, 0, 0]]).collect()
    }

    #[test]
    fn test_append_and_take_in_order() {
        let mut store = RingStore::new(4, 2, 3);
        for v in 1..=3 {
            store.append(block(v as f32, 2, 3).view()).unwrap();
        }
        assert_eq!(store.len(), 3);

        let all = store.take(&[0, 1, 2]).unwrap();
        assert_eq!(all.shape(), &[3, 2, 3]);
        assert_eq!(slot_values(&all), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_overwrite_evicts_oldest() {
        let mut store = RingStore::new(3, 1, 1);
        for v in 1..=5 {
            store.append(block(v as f32, 1, 1).view()).unwrap();
        }
        assert_eq!(store.len(), 3);

        // Oldest-first logical order after two evictions.
        let all = store.take(&[0, 1, 2]).unwrap();
        assert_eq!(slot_values(&all), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_take_last_across_wraparound() {
        let mut store = RingStore::new(3, 1, 1);
        for v in 1..=4 {
            store.append(block(v as f32, 1, 1).view()).unwrap();
        }
        // Cursor is back at slot 1; the window [2, 4] straddles index 0.
        let last = store.take_last(2).unwrap();
        assert_eq!(slot_values(&last), vec![3.0, 4.0]);

        let last = store.take_last(3).unwrap();
        assert_eq!(slot_values(&last), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_take_random_within_committed_range() {
        let mut store = RingStore::new(8, 1, 1);
        for v in 1..=3 {
            store.append(block(v as f32, 1, 1).view()).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(0);
        let sampled = store.take_random(64, &mut rng).unwrap();
        assert_eq!(sampled.shape(), &[64, 1, 1]);
        assert!(slot_values(&sampled).iter().all(|&v| (1.0..=3.0).contains(&v)));
    }

    #[test]
    fn test_empty_store_fails() {
        let store = RingStore::new(3, 1, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let err = store.take_last(1).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::EmptyBuffer
        );
        let err = store.take_random(1, &mut rng).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::EmptyBuffer
        );
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut store = RingStore::new(3, 2, 3);
        let err = store.append(block(1.0, 1, 3).view()).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::ShapeMismatch {
                expected: vec![2, 3],
                got: vec![1, 3],
            }
        );
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut store = RingStore::new(3, 1, 1);
        store.append(block(1.0, 1, 1).view()).unwrap();
        let err = store.take(&[1]).unwrap_err();
        assert_eq!(
            err.downcast::<ReplayMemoryError>().unwrap(),
            ReplayMemoryError::IndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut store = RingStore::new(3, 1, 1);
        for v in 1..=3 {
            store.append(block(v as f32, 1, 1).view()).unwrap();
        }
        store.clear();
        assert!(store.is_empty());

        store.append(block(7.0, 1, 1).view()).unwrap();
        assert_eq!(slot_values(&store.take(&[0]).unwrap()), vec![7.0]);
    }

    #[test]
    #[should_panic(expected = "capacity must be nonzero")]
    fn test_zero_capacity_rejected() {
        let _ = RingStore::new(0, 1, 1);
    }
}
