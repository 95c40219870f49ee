//! User facing entry points for transforming and reducing columns.
//!
//! Transformers carry no logic of their own: they validate their inputs, pick the matching
//! calculator and hand it to the parallel executor. All capability and argument validation
//! happens here, before any worker thread is involved.
//!
//! The user supplied closures run on worker threads. A supplier is invoked once per batch, a
//! reducer only ever sees the accumulator of its own batch and combiners run sequentially on
//! the calling thread, ascending by batch index. Combiners must be associative for the result
//! to be independent of the batch layout.

use crate::{
    calculator::{
        apply::{
            GeneralRowApplier, NumericApplier, NumericRowApplier, NumericToFreeApplier,
            ObjectToFreeApplier,
        },
        reduce::{
            AccumulatorReducer, CategoricalIndexReducer, CategoricalRowReducer, GeneralRowReducer,
            NumericReducer, NumericRowReducer,
        },
    },
    columns::{Capabilities, Category, Column, ColumnType},
    execution::{execute, Context, Workload},
    reader::{CategoricalRowReader, GeneralRowReader, NumericRowReader},
    Error,
};

impl Column {
    /// Starts a transformation over this column.
    pub fn transform(&self) -> Transformer<'_> {
        Transformer::new(self)
    }
}

/// Transformation over a single column.
///
/// ```
/// use coltable::{buffers::RealBuffer, ColumnType, Context, Workload};
///
/// let mut buffer = RealBuffer::new(4);
/// for row in 0..4 {
///     buffer.set(row, row as f64);
/// }
/// let column = buffer.to_column(ColumnType::Real)?;
/// let sum = column
///     .transform()
///     .workload(Workload::Small)
///     .reduce(0.0, |a, b| a + b, &Context::new())?;
/// assert_eq!(6.0, sum);
/// # Ok::<_, coltable::Error>(())
/// ```
pub struct Transformer<'c> {
    column: &'c Column,
    workload: Workload,
}

impl<'c> Transformer<'c> {
    pub fn new(column: &'c Column) -> Self {
        Transformer {
            column,
            workload: Workload::Default,
        }
    }

    /// Declares how expensive the per row work of the following operation is, tuning the batch
    /// sizes of the executor.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    fn require(&self, required: Capabilities) -> Result<(), Error> {
        if self.column.capabilities().contains(required) {
            Ok(())
        } else {
            Err(Error::MissingCapability { required })
        }
    }

    fn require_categorical(&self) -> Result<(), Error> {
        if self.column.category() == Category::Categorical {
            Ok(())
        } else {
            Err(Error::NotCategorical)
        }
    }

    /// Folds the numeric view of the column, starting from `identity`. Partial results of
    /// different batches are folded with the reducer itself, which must therefore be
    /// associative with `identity` as unit.
    pub fn reduce<F>(&self, identity: f64, reducer: F, context: &Context) -> Result<f64, Error>
    where
        F: Fn(f64, f64) -> f64 + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericReducer::new(self.column, identity, &reducer, &reducer),
            self.workload,
            context,
        )
    }

    /// Like [`Self::reduce`], but folds partial results with a dedicated combiner.
    pub fn reduce_with_combiner<F, G>(
        &self,
        identity: f64,
        reducer: F,
        combiner: G,
        context: &Context,
    ) -> Result<f64, Error>
    where
        F: Fn(f64, f64) -> f64 + Sync,
        G: Fn(f64, f64) -> f64 + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericReducer::new(self.column, identity, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Folds the numeric view of the column into a mutable accumulator. The supplier creates
    /// one accumulator per batch, the combiner merges the right accumulator into the left one.
    pub fn reduce_to<A, S, R, C>(
        &self,
        supplier: S,
        reducer: R,
        combiner: C,
        context: &Context,
    ) -> Result<A, Error>
    where
        A: Send,
        S: Fn() -> A + Sync,
        R: Fn(&mut A, f64) + Sync,
        C: Fn(&mut A, A) + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            AccumulatorReducer::new(self.column, supplier, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Folds the raw dictionary indices of a categorical column, starting from `identity`.
    /// Partial results are folded with the reducer itself.
    pub fn reduce_categorical<F>(
        &self,
        identity: i32,
        reducer: F,
        context: &Context,
    ) -> Result<i32, Error>
    where
        F: Fn(i32, i32) -> i32 + Sync,
    {
        self.require_categorical()?;
        execute(
            CategoricalIndexReducer::new(self.column, identity, &reducer, &reducer),
            self.workload,
            context,
        )
    }

    /// Like [`Self::reduce_categorical`], but folds partial results with a dedicated combiner.
    pub fn reduce_categorical_with_combiner<F, G>(
        &self,
        identity: i32,
        reducer: F,
        combiner: G,
        context: &Context,
    ) -> Result<i32, Error>
    where
        F: Fn(i32, i32) -> i32 + Sync,
        G: Fn(i32, i32) -> i32 + Sync,
    {
        self.require_categorical()?;
        execute(
            CategoricalIndexReducer::new(self.column, identity, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Maps the numeric view of the column into a new real column of the same height.
    pub fn apply_to_real<F>(&self, operation: F, context: &Context) -> Result<Column, Error>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericApplier::new(self.column, ColumnType::Real, operation),
            self.workload,
            context,
        )
    }

    /// Maps the numeric view of the column into a new integer column, rounding each mapped
    /// value half-up.
    pub fn apply_to_integer<F>(&self, operation: F, context: &Context) -> Result<Column, Error>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericApplier::new(self.column, ColumnType::Integer, operation),
            self.workload,
            context,
        )
    }

    /// Maps the numeric view of the column into a free column of `T` values. `None` results
    /// become missing rows.
    pub fn apply_to_free<T, F>(&self, operation: F, context: &Context) -> Result<Column, Error>
    where
        T: Send + Sync + std::fmt::Debug + 'static,
        F: Fn(f64) -> Option<T> + Sync,
    {
        self.require(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericToFreeApplier::new(self.column, operation),
            self.workload,
            context,
        )
    }

    /// Maps the object view of the column into a free column of `U` values. The operation
    /// receives the element downcast to `T`; missing rows and rows of a different element type
    /// arrive as `None`.
    pub fn apply_object_to_free<T, U, F>(
        &self,
        operation: F,
        context: &Context,
    ) -> Result<Column, Error>
    where
        T: Send + Sync + 'static,
        U: Send + Sync + std::fmt::Debug + 'static,
        F: Fn(Option<&T>) -> Option<U> + Sync,
    {
        self.require(Capabilities::OBJECT_READABLE)?;
        execute(
            ObjectToFreeApplier::new(self.column, operation),
            self.workload,
            context,
        )
    }
}

/// Transformation over several columns at once, reading row wise.
pub struct MultiTransformer<'c> {
    columns: Vec<&'c Column>,
    workload: Workload,
}

impl<'c> MultiTransformer<'c> {
    /// Starts a transformation over the given columns.
    ///
    /// Fails if no column is given. All columns must share one height.
    pub fn new(columns: Vec<&'c Column>) -> Result<Self, Error> {
        if columns.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(MultiTransformer {
            columns,
            workload: Workload::Default,
        })
    }

    /// Declares how expensive the per row work of the following operation is.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    fn require_all(&self, required: Capabilities) -> Result<(), Error> {
        if self
            .columns
            .iter()
            .all(|column| column.capabilities().contains(required))
        {
            Ok(())
        } else {
            Err(Error::MissingCapability { required })
        }
    }

    fn require_all_categorical(&self) -> Result<(), Error> {
        if self
            .columns
            .iter()
            .all(|column| column.category() == Category::Categorical)
        {
            Ok(())
        } else {
            Err(Error::NotCategorical)
        }
    }

    /// Folds numeric rows into a mutable accumulator. The reducer receives the row reader
    /// positioned on the current row.
    pub fn reduce<A, S, R, C>(
        &self,
        supplier: S,
        reducer: R,
        combiner: C,
        context: &Context,
    ) -> Result<A, Error>
    where
        A: Send,
        S: Fn() -> A + Sync,
        R: for<'r> Fn(&mut A, &'r NumericRowReader<'c>) + Sync,
        C: Fn(&mut A, A) + Sync,
    {
        self.require_all(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericRowReducer::new(self.columns.clone(), supplier, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Folds categorical index rows into a mutable accumulator. All columns must be
    /// categorical.
    pub fn reduce_categorical<A, S, R, C>(
        &self,
        supplier: S,
        reducer: R,
        combiner: C,
        context: &Context,
    ) -> Result<A, Error>
    where
        A: Send,
        S: Fn() -> A + Sync,
        R: for<'r> Fn(&mut A, &'r CategoricalRowReader<'c>) + Sync,
        C: Fn(&mut A, A) + Sync,
    {
        self.require_all_categorical()?;
        execute(
            CategoricalRowReducer::new(self.columns.clone(), supplier, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Folds general rows of mixed column types into a mutable accumulator. Views a column
    /// does not support read as their documented defaults (`NaN`, index `0`, no object).
    pub fn reduce_general<A, S, R, C>(
        &self,
        supplier: S,
        reducer: R,
        combiner: C,
        context: &Context,
    ) -> Result<A, Error>
    where
        A: Send,
        S: Fn() -> A + Sync,
        R: for<'r> Fn(&mut A, &'r GeneralRowReader<'c>) + Sync,
        C: Fn(&mut A, A) + Sync,
    {
        execute(
            GeneralRowReducer::new(self.columns.clone(), supplier, reducer, combiner),
            self.workload,
            context,
        )
    }

    /// Maps numeric rows into a new real column of the same height.
    pub fn apply_to_real<F>(&self, operation: F, context: &Context) -> Result<Column, Error>
    where
        F: for<'r> Fn(&'r NumericRowReader<'c>) -> f64 + Sync,
    {
        self.require_all(Capabilities::NUMERIC_READABLE)?;
        execute(
            NumericRowApplier::new(self.columns.clone(), operation),
            self.workload,
            context,
        )
    }

    /// Maps general rows into a free column of `T` values. `None` results become missing rows.
    pub fn apply_to_free<T, F>(&self, operation: F, context: &Context) -> Result<Column, Error>
    where
        T: Send + Sync + std::fmt::Debug + 'static,
        F: for<'r> Fn(&'r GeneralRowReader<'c>) -> Option<T> + Sync,
    {
        execute(
            GeneralRowApplier::new(self.columns.clone(), operation),
            self.workload,
            context,
        )
    }
}
