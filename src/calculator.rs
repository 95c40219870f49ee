//! Per job bundles of user code and scratch state, executed batch wise by the parallel engine.
//!
//! A calculator knows how many row operations its job spans, prepares per batch state in
//! `init`, computes one contiguous row range per `do_part` call and folds the per batch
//! results into the final value in `finish`. `do_part` runs concurrently for disjoint ranges;
//! everything else runs on the calling thread.

use std::{ops::Range, sync::Mutex};

pub(crate) mod apply;
pub(crate) mod reduce;

/// Contract between the parallel executor and one unit of work.
pub(crate) trait Calculator: Sync {
    type Output;

    /// Total number of row operations, i.e. the upper bound of the range split into batches.
    fn operation_count(&self) -> usize;

    /// Prepares state for `batches` batches. Called exactly once, before any `do_part`.
    fn init(&mut self, batches: usize);

    /// Computes the rows in `range`. Ranges of distinct calls are disjoint and cover the whole
    /// operation count; calls may happen concurrently on worker threads.
    fn do_part(&self, range: Range<usize>, batch_index: usize);

    /// Folds the per batch results, ascending by batch index. Called once, after all parts.
    fn finish(self) -> Self::Output;
}

/// Slot per batch, written once by the batch's `do_part` and drained in batch order by
/// `finish`. The mutexes are uncontended; they only make the disjoint writes safe to perform
/// through a shared reference.
#[derive(Debug)]
pub(crate) struct PartResults<A> {
    slots: Vec<Mutex<Option<A>>>,
}

impl<A> PartResults<A> {
    pub fn empty() -> Self {
        PartResults { slots: Vec::new() }
    }

    pub fn init(&mut self, batches: usize) {
        self.slots = (0..batches).map(|_| Mutex::new(None)).collect();
    }

    pub fn put(&self, batch_index: usize, value: A) {
        *self.slots[batch_index].lock().unwrap() = Some(value)
    }

    /// Results in batch order. Slots without a result are skipped.
    pub fn into_ordered(self) -> impl Iterator<Item = A> {
        self.slots
            .into_iter()
            .filter_map(|slot| slot.into_inner().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_drain_in_batch_order() {
        let mut parts = PartResults::empty();
        parts.init(3);
        parts.put(2, "c");
        parts.put(0, "a");
        parts.put(1, "b");
        let ordered: Vec<_> = parts.into_ordered().collect();
        assert_eq!(vec!["a", "b", "c"], ordered);
    }
}
