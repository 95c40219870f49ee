use std::{ops::Range, sync::Arc};

use crate::{
    buffers::round_half_up,
    calculator::{Calculator, PartResults},
    columns::{free_objects, Column, ColumnType, FreeColumn, NumericColumn},
    reader::{GeneralRowReader, NumericReader, NumericRowReader, ObjectReader},
};

/// Maps the numeric view of one column row by row into a new numeric column. Each batch
/// produces its own chunk of the output; `finish` stitches the chunks together in batch order,
/// so no two batches ever write to shared storage.
pub(crate) struct NumericApplier<'c, F> {
    column: &'c Column,
    operation: F,
    target: ColumnType,
    parts: PartResults<Vec<f64>>,
}

impl<'c, F> NumericApplier<'c, F>
where
    F: Fn(f64) -> f64 + Sync,
{
    pub fn new(column: &'c Column, target: ColumnType, operation: F) -> Self {
        NumericApplier {
            column,
            operation,
            target,
            parts: PartResults::empty(),
        }
    }
}

impl<F> Calculator for NumericApplier<'_, F>
where
    F: Fn(f64) -> f64 + Sync,
{
    type Output = Column;

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
        let rounds = self.target == ColumnType::Integer;
        let chunk: Vec<f64> = range
            .map(|_| {
                let mapped = (self.operation)(reader.read());
                if rounds {
                    round_half_up(mapped)
                } else {
                    mapped
                }
            })
            .collect();
        self.parts.put(batch_index, chunk);
    }

    fn finish(self) -> Column {
        let mut data = Vec::with_capacity(self.column.len());
        for chunk in self.parts.into_ordered() {
            data.extend(chunk);
        }
        Column::Numeric(NumericColumn::new(data, self.target))
    }
}

/// Maps the numeric view of one column into a free column of `T` values.
pub(crate) struct NumericToFreeApplier<'c, T, F> {
    column: &'c Column,
    operation: F,
    parts: PartResults<Vec<Option<Arc<T>>>>,
}

impl<'c, T, F> NumericToFreeApplier<'c, T, F>
where
    F: Fn(f64) -> Option<T> + Sync,
{
    pub fn new(column: &'c Column, operation: F) -> Self {
        NumericToFreeApplier {
            column,
            operation,
            parts: PartResults::empty(),
        }
    }
}

impl<T, F> Calculator for NumericToFreeApplier<'_, T, F>
where
    T: Send + Sync + std::fmt::Debug + 'static,
    F: Fn(f64) -> Option<T> + Sync,
{
    type Output = Column;

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
        let chunk: Vec<Option<Arc<T>>> = range
            .map(|_| (self.operation)(reader.read()).map(Arc::new))
            .collect();
        self.parts.put(batch_index, chunk);
    }

    fn finish(self) -> Column {
        let mut values = Vec::with_capacity(self.column.len());
        for chunk in self.parts.into_ordered() {
            values.extend(chunk);
        }
        Column::Free(FreeColumn::new(free_objects(values)))
    }
}

/// Maps the object view of one column into a free column of `U` values. The operation receives
/// the value downcast to the source element type `T`.
pub(crate) struct ObjectToFreeApplier<'c, T, U, F> {
    column: &'c Column,
    operation: F,
    parts: PartResults<Vec<Option<Arc<U>>>>,
    _element: std::marker::PhantomData<fn(&T)>,
}

impl<'c, T, U, F> ObjectToFreeApplier<'c, T, U, F>
where
    F: Fn(Option<&T>) -> Option<U> + Sync,
{
    pub fn new(column: &'c Column, operation: F) -> Self {
        ObjectToFreeApplier {
            column,
            operation,
            parts: PartResults::empty(),
            _element: std::marker::PhantomData,
        }
    }
}

impl<T, U, F> Calculator for ObjectToFreeApplier<'_, T, U, F>
where
    T: Send + Sync + 'static,
    U: Send + Sync + std::fmt::Debug + 'static,
    F: Fn(Option<&T>) -> Option<U> + Sync,
{
    type Output = Column;

    fn operation_count(&self) -> usize {
        self.column.len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = ObjectReader::new(self.column)
            .expect("column capabilities are validated before execution");
        reader.set_position(range.start as i64 - 1);
        let chunk: Vec<Option<Arc<U>>> = range
            .map(|_| {
                let value = reader.read();
                let typed = value.as_ref().and_then(|handle| handle.downcast_ref::<T>());
                (self.operation)(typed).map(Arc::new)
            })
            .collect();
        self.parts.put(batch_index, chunk);
    }

    fn finish(self) -> Column {
        let mut values = Vec::with_capacity(self.column.len());
        for chunk in self.parts.into_ordered() {
            values.extend(chunk);
        }
        Column::Free(FreeColumn::new(free_objects(values)))
    }
}

/// Maps numeric rows over several columns into a new real column.
pub(crate) struct NumericRowApplier<'c, F> {
    columns: Vec<&'c Column>,
    operation: F,
    parts: PartResults<Vec<f64>>,
}

impl<'c, F> NumericRowApplier<'c, F>
where
    F: for<'r> Fn(&'r NumericRowReader<'c>) -> f64 + Sync,
{
    pub fn new(columns: Vec<&'c Column>, operation: F) -> Self {
        NumericRowApplier {
            columns,
            operation,
            parts: PartResults::empty(),
        }
    }
}

impl<'c, F> Calculator for NumericRowApplier<'c, F>
where
    F: for<'r> Fn(&'r NumericRowReader<'c>) -> f64 + Sync,
{
    type Output = Column;

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
        let chunk: Vec<f64> = range
            .map(|_| {
                reader.move_next();
                (self.operation)(&reader)
            })
            .collect();
        self.parts.put(batch_index, chunk);
    }

    fn finish(self) -> Column {
        let mut data = Vec::with_capacity(self.columns[0].len());
        for chunk in self.parts.into_ordered() {
            data.extend(chunk);
        }
        Column::Numeric(NumericColumn::new(data, ColumnType::Real))
    }
}

/// Maps general rows over several columns into a free column of `T` values.
pub(crate) struct GeneralRowApplier<'c, T, F> {
    columns: Vec<&'c Column>,
    operation: F,
    parts: PartResults<Vec<Option<Arc<T>>>>,
}

impl<'c, T, F> GeneralRowApplier<'c, T, F>
where
    F: for<'r> Fn(&'r GeneralRowReader<'c>) -> Option<T> + Sync,
{
    pub fn new(columns: Vec<&'c Column>, operation: F) -> Self {
        GeneralRowApplier {
            columns,
            operation,
            parts: PartResults::empty(),
        }
    }
}

impl<'c, T, F> Calculator for GeneralRowApplier<'c, T, F>
where
    T: Send + Sync + std::fmt::Debug + 'static,
    F: for<'r> Fn(&'r GeneralRowReader<'c>) -> Option<T> + Sync,
{
    type Output = Column;

    fn operation_count(&self) -> usize {
        self.columns[0].len()
    }

    fn init(&mut self, batches: usize) {
        self.parts.init(batches);
    }

    fn do_part(&self, range: Range<usize>, batch_index: usize) {
        let mut reader = GeneralRowReader::new(&self.columns)
            .expect("column capabilities are validated before execution");
        reader.set_position(range.start as i64 - 1);
        let chunk: Vec<Option<Arc<T>>> = range
            .map(|_| {
                reader.move_next();
                (self.operation)(&reader).map(Arc::new)
            })
            .collect();
        self.parts.put(batch_index, chunk);
    }

    fn finish(self) -> Column {
        let mut values = Vec::with_capacity(self.columns[0].len());
        for chunk in self.parts.into_ordered() {
            values.extend(chunk);
        }
        Column::Free(FreeColumn::new(free_objects(values)))
    }
}
