use std::ops::Range;

use crate::{
    calculator::{Calculator, PartResults},
    columns::Column,
    reader::{CategoricalReader, CategoricalRowReader, GeneralRowReader, NumericReader, NumericRowReader},
};

/// Folds the numeric view of one column into a single `f64`. Every batch folds its rows into
/// an accumulator seeded with the identity; the combiner then folds the per batch results in
/// ascending batch order. The combiner must be associative with the identity as unit for the
/// result to be independent of the batch layout.
pub(crate) struct NumericReducer<'c, F, G> {
    column: &'c Column,
    identity: f64,
    reducer: F,
    combiner: G,
    parts: PartResults<f64>,
}

impl<'c, F, G> NumericReducer<'c, F, G>
where
    F: Fn(f64, f64) -> f64 + Sync,
    G: Fn(f64, f64) -> f64 + Sync,
{
    pub fn new(column: &'c Column, identity: f64, reducer: F, combiner: G) -> Self {
        NumericReducer {
            column,
            identity,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<F, G> Calculator for NumericReducer<'_, F, G>
where
    F: Fn(f64, f64) -> f64 + Sync,
    G: Fn(f64, f64) -> f64 + Sync,
{
    type Output = f64;

    fn operation_count(&self) -> usize {
        self.column.len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = NumericReader::new(self.column)
            .expect("column capabilities are validated before execution");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = self.identity;
        for _ in range {
            accumulator = (self.reducer)(accumulator, reader.read());
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> f64 {
        let mut parts = self.parts.into_ordered();
        let first = parts.next().unwrap_or(self.identity);
        parts.fold(first, |left, right| (self.combiner)(left, right))
    }
}

/// Folds the raw dictionary indices of one categorical column into a single `i32`. With a
/// single batch the combiner is never consulted.
pub(crate) struct CategoricalIndexReducer<'c, F, G> {
    column: &'c Column,
    identity: i32,
    reducer: F,
    combiner: G,
    parts: PartResults<i32>,
}

impl<'c, F, G> CategoricalIndexReducer<'c, F, G>
where
    F: Fn(i32, i32) -> i32 + Sync,
    G: Fn(i32, i32) -> i32 + Sync,
{
    pub fn new(column: &'c Column, identity: i32, reducer: F, combiner: G) -> Self {
        CategoricalIndexReducer {
            column,
            identity,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<F, G> Calculator for CategoricalIndexReducer<'_, F, G>
where
    F: Fn(i32, i32) -> i32 + Sync,
    G: Fn(i32, i32) -> i32 + Sync,
{
    type Output = i32;

    fn operation_count(&self) -> usize {
        self.column.len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = CategoricalReader::new(self.column)
            .expect("column category is validated before execution");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = self.identity;
        for _ in range {
            accumulator = (self.reducer)(accumulator, reader.read() as i32);
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> i32 {
        let mut parts = self.parts.into_ordered();
        let first = parts.next().unwrap_or(self.identity);
        parts.fold(first, |left, right| (self.combiner)(left, right))
    }
}

/// Folds the numeric view of one column into a mutable accumulator of type `A`. The supplier
/// runs once per batch, the reducer mutates the batch's own accumulator and the combiner
/// merges the right accumulator into the left one, ascending by batch index.
pub(crate) struct AccumulatorReducer<'c, A, S, R, C> {
    column: &'c Column,
    supplier: S,
    reducer: R,
    combiner: C,
    parts: PartResults<A>,
}

impl<'c, A, S, R, C> AccumulatorReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: Fn(&mut A, f64) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    pub fn new(column: &'c Column, supplier: S, reducer: R, combiner: C) -> Self {
        AccumulatorReducer {
            column,
            supplier,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<A, S, R, C> Calculator for AccumulatorReducer<'_, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: Fn(&mut A, f64) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    type Output = A;

    fn operation_count(&self) -> usize {
        self.column.len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = NumericReader::new(self.column)
            .expect("column capabilities are validated before execution");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = (self.supplier)();
        for _ in range {
            (self.reducer)(&mut accumulator, reader.read());
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> A {
        let mut parts = self.parts.into_ordered();
        let mut result = match parts.next() {
            Some(first) => first,
            // Zero batches happen for empty columns; the result is a fresh accumulator.
            None => (self.supplier)(),
        };
        for right in parts {
            (self.combiner)(&mut result, right);
        }
        result
    }
}

/// Folds numeric rows over several columns into a mutable accumulator.
pub(crate) struct NumericRowReducer<'c, A, S, R, C> {
    columns: Vec<&'c Column>,
    supplier: S,
    reducer: R,
    combiner: C,
    parts: PartResults<A>,
}

impl<'c, A, S, R, C> NumericRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r NumericRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    pub fn new(columns: Vec<&'c Column>, supplier: S, reducer: R, combiner: C) -> Self {
        NumericRowReducer {
            columns,
            supplier,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<'c, A, S, R, C> Calculator for NumericRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r NumericRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    type Output = A;

    fn operation_count(&self) -> usize {
        self.columns[0].len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = NumericRowReader::new(&self.columns)
            .expect("column capabilities are validated before execution");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = (self.supplier)();
        for _ in range {
            reader.move_next();
            (self.reducer)(&mut accumulator, &reader);
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> A {
        let mut parts = self.parts.into_ordered();
        let mut result = match parts.next() {
            Some(first) => first,
            None => (self.supplier)(),
        };
        for right in parts {
            (self.combiner)(&mut result, right);
        }
        result
    }
}

/// Folds categorical index rows over several columns into a mutable accumulator.
pub(crate) struct CategoricalRowReducer<'c, A, S, R, C> {
    columns: Vec<&'c Column>,
    supplier: S,
    reducer: R,
    combiner: C,
    parts: PartResults<A>,
}

impl<'c, A, S, R, C> CategoricalRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r CategoricalRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    pub fn new(columns: Vec<&'c Column>, supplier: S, reducer: R, combiner: C) -> Self {
        CategoricalRowReducer {
            columns,
            supplier,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<'c, A, S, R, C> Calculator for CategoricalRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r CategoricalRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    type Output = A;

    fn operation_count(&self) -> usize {
        self.columns[0].len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = CategoricalRowReader::new(&self.columns)
            .expect("column category is validated before execution");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = (self.supplier)();
        for _ in range {
            reader.move_next();
            (self.reducer)(&mut accumulator, &reader);
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> A {
        let mut parts = self.parts.into_ordered();
        let mut result = match parts.next() {
            Some(first) => first,
            None => (self.supplier)(),
        };
        for right in parts {
            (self.combiner)(&mut result, right);
        }
        result
    }
}

/// Folds general rows over several columns of mixed types into a mutable accumulator.
pub(crate) struct GeneralRowReducer<'c, A, S, R, C> {
    columns: Vec<&'c Column>,
    supplier: S,
    reducer: R,
    combiner: C,
    parts: PartResults<A>,
}

impl<'c, A, S, R, C> GeneralRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r GeneralRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    pub fn new(columns: Vec<&'c Column>, supplier: S, reducer: R, combiner: C) -> Self {
        GeneralRowReducer {
            columns,
            supplier,
            reducer,
            combiner,
            parts: PartResults::empty(),
        }
    }
}

impl<'c, A, S, R, C> Calculator for GeneralRowReducer<'c, A, S, R, C>
where
    A: Send,
    S: Fn() -> A + Sync,
    R: for<'r> Fn(&mut A, &'r GeneralRowReader<'c>) + Sync,
    C: Fn(&mut A, A) + Sync,
{
    type Output = A;

    fn operation_count(&self) -> usize {
        self.columns[0].len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = GeneralRowReader::new(&self.columns)
            .expect("a general row reader accepts any column mix");
        reader.set_position(range.start as i64 - 1);
        let mut accumulator = (self.supplier)();
        for _ in range {
            reader.move_next();
            (self.reducer)(&mut accumulator, &reader);
        }
        self.parts.put(batch_index, accumulator);
    }

    fn finish(self) -> A {
        let mut parts = self.parts.into_ordered();
        let mut result = match parts.next() {
            Some(first) => first,
            None => (self.supplier)(),
        };
        for right in parts {
            (self.combiner)(&mut result, right);
        }
        result
    }
}
