//! Batch wise parallel execution of calculators.
//!
//! The executor splits the operation range of a calculator into contiguous batches, lets a
//! small crew of scoped worker threads pull batch indices from a shared counter and folds the
//! per batch results on the calling thread. The batch size follows the workload hint: the
//! lighter the per row work, the larger the batches, so the per batch overhead stays amortized.
//!
//! User code runs on the worker threads. A panic raised there is caught per batch, the
//! remaining batches are abandoned and the first observed payload is re-raised on the calling
//! thread, so user errors surface exactly as if the computation had run inline. Cancellation is
//! cooperative: it is checked between batches, never inside one.

use std::{
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};

use log::debug;

use crate::{calculator::Calculator, Error};

/// Smallest number of rows worth scheduling as an own batch.
const MIN_BATCH_SIZE: usize = 64;
/// Largest batch; bounds the latency of the cancellation check.
const MAX_BATCH_SIZE: usize = 1 << 20;

/// Coarse hint how expensive the per row work of an operation is. Light work favors few large
/// batches, heavy work favors many small ones so the worker crew stays balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workload {
    /// Trivial per row work, e.g. summing values.
    Small,
    #[default]
    Default,
    /// Noticeable per row work, e.g. string formatting.
    Large,
    /// Expensive per row work dominating all scheduling overhead.
    Huge,
}

impl Workload {
    /// Divides the per worker share of rows into batches. Heavier workloads split finer.
    fn batch_divisor(self) -> usize {
        match self {
            Workload::Small => 1,
            Workload::Default => 4,
            Workload::Large => 16,
            Workload::Huge => 64,
        }
    }
}

/// Execution environment handed to every transformation: the degree of parallelism and a
/// cooperative cancellation flag. Cloning is cheap and clones share the cancellation flag, so
/// a context can be cancelled from another thread.
#[derive(Debug, Clone)]
pub struct Context {
    parallelism: usize,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Context using all available hardware parallelism.
    pub fn new() -> Self {
        let parallelism = thread::available_parallelism().map_or(1, |count| count.get());
        Self::with_parallelism(parallelism)
    }

    /// Context using at most `parallelism` worker threads (at least one).
    pub fn with_parallelism(parallelism: usize) -> Self {
        Context {
            parallelism: parallelism.max(1),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Asks running computations to stop. Batches already in flight run to completion; the
    /// blocking execute call then reports [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `calculator` to completion, splitting its operation range according to `workload` and
/// `context`.
///
/// # Panics
///
/// Re-raises the first panic observed in user code on a worker thread.
pub(crate) fn execute<C>(
    mut calculator: C,
    workload: Workload,
    context: &Context,
) -> Result<C::Output, Error>
where
    C: Calculator,
{
    let operations = calculator.operation_count();
    let parallelism = context.parallelism();
    let batch_size = (operations / (parallelism * workload.batch_divisor()).max(1))
        .clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
    let batches = operations.div_ceil(batch_size);
    calculator.init(batches);
    debug!(
        "Dividing {operations} operations into {batches} batches of up to {batch_size} rows \
        ({workload:?} workload, parallelism {parallelism})."
    );

    if batches <= 1 {
        // Nothing to gain from worker threads; run on the calling thread. With zero batches
        // there is nothing to cancel either, the result falls straight out of `finish`.
        if batches == 1 {
            if context.is_cancelled() {
                debug!("Computation cancelled before the first batch.");
                return Err(Error::Cancelled);
            }
            calculator.do_part(0..operations, 0);
        }
        return Ok(calculator.finish());
    }

    let next_batch = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let cancelled = AtomicBool::new(false);
    let panic_payload = Mutex::new(None);
    let workers = parallelism.min(batches);
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let batch_index = next_batch.fetch_add(1, Ordering::Relaxed);
                if batch_index >= batches || abort.load(Ordering::Relaxed) {
                    break;
                }
                if context.is_cancelled() {
                    // There is an unstarted batch left, so this run is genuinely incomplete.
                    cancelled.store(true, Ordering::Relaxed);
                    break;
                }
                let from = batch_index * batch_size;
                let to = operations.min(from + batch_size);
                let outcome =
                    catch_unwind(AssertUnwindSafe(|| calculator.do_part(from..to, batch_index)));
                if let Err(payload) = outcome {
                    let mut slot = panic_payload.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some(payload);
                    }
                    abort.store(true, Ordering::Relaxed);
                    break;
                }
            });
        }
    });

    if let Some(payload) = panic_payload.into_inner().unwrap() {
        resume_unwind(payload);
    }
    if cancelled.load(Ordering::Relaxed) {
        debug!("Computation cancelled after {} claimed batches.", next_batch.load(Ordering::Relaxed));
        return Err(Error::Cancelled);
    }
    Ok(calculator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Range;

    /// Records every batch it is handed, so tests can inspect the batch layout.
    struct RangeRecorder {
        operations: usize,
        parts: Mutex<Vec<(Range<usize>, usize)>>,
    }

    impl Calculator for RangeRecorder {
        type Output = Vec<(Range<usize>, usize)>;

        fn operation_count(&self) -> usize {
            self.operations
        }

        fn init(&mut self, _batches: usize) {}

        fn do_part(&self, range: Range<usize>, batch_index: usize) {
            self.parts.lock().unwrap().push((range, batch_index));
        }

        fn finish(self) -> Self::Output {
            let mut parts = self.parts.into_inner().unwrap();
            parts.sort_by_key(|(range, _)| range.start);
            parts
        }
    }

    #[test]
    fn batches_are_disjoint_and_cover_the_range() {
        let context = Context::with_parallelism(4);
        let parts = execute(
            RangeRecorder {
                operations: 1000,
                parts: Mutex::new(Vec::new()),
            },
            Workload::Huge,
            &context,
        )
        .unwrap();
        assert!(parts.len() > 1);
        let mut expected_start = 0;
        for (index, (range, _batch)) in parts.iter().enumerate() {
            assert_eq!(expected_start, range.start);
            expected_start = range.end;
            // Batch indices follow the range order.
            assert_eq!(index, parts[index].1);
        }
        assert_eq!(1000, expected_start);
    }

    #[test]
    fn zero_operations_skip_straight_to_finish() {
        let context = Context::with_parallelism(2);
        let parts = execute(
            RangeRecorder {
                operations: 0,
                parts: Mutex::new(Vec::new()),
            },
            Workload::Default,
            &context,
        )
        .unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn zero_operations_finish_even_on_a_cancelled_context() {
        // With nothing to compute there is nothing to cancel; the empty result must still
        // materialize.
        let context = Context::with_parallelism(2);
        context.cancel();
        let parts = execute(
            RangeRecorder {
                operations: 0,
                parts: Mutex::new(Vec::new()),
            },
            Workload::Default,
            &context,
        )
        .unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn cancelled_context_aborts_before_work() {
        let context = Context::with_parallelism(2);
        context.cancel();
        let result = execute(
            RangeRecorder {
                operations: 1000,
                parts: Mutex::new(Vec::new()),
            },
            Workload::Default,
            &context,
        );
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn worker_panics_reach_the_caller() {
        struct Exploding;

        impl Calculator for Exploding {
            type Output = ();

            fn operation_count(&self) -> usize {
                1000
            }

            fn init(&mut self, _batches: usize) {}

            fn do_part(&self, range: Range<usize>, _batch_index: usize) {
                if range.start == 0 {
                    panic!("boom");
                }
            }

            fn finish(self) {}
        }

        let context = Context::with_parallelism(4);
        let _ = execute(Exploding, Workload::Huge, &context);
    }

    #[test]
    fn clones_share_the_cancellation_flag() {
        let context = Context::with_parallelism(1);
        let clone = context.clone();
        clone.cancel();
        assert!(context.is_cancelled());
    }
}
