//! Immutable, typed, bulk readable column storage.
//!
//! A [`Column`] is the read side of the engine. It is created by sealing a buffer (see
//! [`crate::buffers`]) and never changes afterwards, which makes it safe to share between any
//! number of concurrent readers. Columns are a tagged variant over the storage families: dense
//! numeric data, dictionary coded categorical data, boxed object data and the two temporal
//! layouts. All bulk access goes through the `fill_*` family of methods which copy a range of
//! rows into a caller provided slice.

use std::{any::Any, sync::Arc};

use bitflags::bitflags;

use crate::Error;

mod categorical;
mod dictionary;
mod free;
mod numeric;
mod temporal;

pub use self::{
    categorical::CategoricalColumn,
    dictionary::Dictionary,
    free::FreeColumn,
    numeric::NumericColumn,
    temporal::{DateTimeColumn, TimeColumn},
};

pub(crate) use self::{
    dictionary::DictionaryLookup,
    free::{free_objects, ObjectArray},
    temporal::{nanos_to_time, time_to_nanos, MISSING_INSTANT},
};

/// Shared handle to a dynamically typed element value. Object views of columns hand out cheap
/// clones of these handles. Use [`std::sync::Arc::downcast`] to recover the concrete element
/// type.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

bitflags! {
    /// Views a column supports. Operations validate the capabilities of their input columns
    /// before any work is scheduled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// The column can fill `f64` slices with its numeric view.
        const NUMERIC_READABLE = 0b0000_0001;
        /// The column can fill object slices with its element values.
        const OBJECT_READABLE = 0b0000_0010;
        /// The column's values have a total order.
        const SORTABLE = 0b0000_0100;
    }
}

/// Storage family of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Dense 64 bit floating point storage.
    Numeric,
    /// Packed dictionary indices plus a dictionary.
    Categorical,
    /// Boxed element values.
    Free,
}

/// Declared type of a column. The type refines the [`Category`]: `Real` and `Integer` columns
/// share the numeric layout and differ only in how their values came to be (integer buffers
/// round on write) and how they are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Real,
    Integer,
    Categorical,
    Free,
    DateTime,
    Time,
}

impl ColumnType {
    /// Storage family this type belongs to.
    pub fn category(self) -> Category {
        match self {
            ColumnType::Real | ColumnType::Integer => Category::Numeric,
            ColumnType::Categorical => Category::Categorical,
            ColumnType::Free | ColumnType::DateTime | ColumnType::Time => Category::Free,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            ColumnType::Real => "Real",
            ColumnType::Integer => "Integer",
            ColumnType::Categorical => "Categorical",
            ColumnType::Free => "Free",
            ColumnType::DateTime => "Date-Time",
            ColumnType::Time => "Time",
        }
    }
}

/// An immutable column of a table.
#[derive(Debug, Clone)]
pub enum Column {
    Numeric(NumericColumn),
    Categorical(CategoricalColumn),
    Free(FreeColumn),
    DateTime(DateTimeColumn),
    Time(TimeColumn),
}

impl Column {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(column) => column.len(),
            Column::Categorical(column) => column.len(),
            Column::Free(column) => column.len(),
            Column::DateTime(column) => column.len(),
            Column::Time(column) => column.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared type of this column.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Numeric(column) => column.column_type(),
            Column::Categorical(_) => ColumnType::Categorical,
            Column::Free(_) => ColumnType::Free,
            Column::DateTime(_) => ColumnType::DateTime,
            Column::Time(_) => ColumnType::Time,
        }
    }

    /// Storage family of this column.
    pub fn category(&self) -> Category {
        self.column_type().category()
    }

    /// Views supported by this column.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Column::Numeric(_) => Capabilities::NUMERIC_READABLE | Capabilities::SORTABLE,
            Column::Categorical(_) => {
                Capabilities::NUMERIC_READABLE
                    | Capabilities::OBJECT_READABLE
                    | Capabilities::SORTABLE
            }
            Column::Free(_) => Capabilities::OBJECT_READABLE,
            Column::DateTime(_) => Capabilities::OBJECT_READABLE | Capabilities::SORTABLE,
            Column::Time(_) => {
                Capabilities::NUMERIC_READABLE
                    | Capabilities::OBJECT_READABLE
                    | Capabilities::SORTABLE
            }
        }
    }

    /// Bulk copies the numeric view of consecutive rows starting at `start_row` into `dst`.
    /// Values are written to `dst[offset]`, `dst[offset + stride]`, and so on. The copy stops at
    /// the end of the column or the end of the slice, whichever comes first; slots not written
    /// to keep their previous content.
    ///
    /// The numeric view of a categorical row is its dictionary index as a float, with `NaN` for
    /// the missing index `0`. Missing numeric and time values also read as `NaN`.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn fill_numeric(
        &self,
        dst: &mut [f64],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) -> Result<(), Error> {
        assert!(stride > 0, "Fill stride must be at least one.");
        match self {
            Column::Numeric(column) => {
                column.fill_numeric(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Categorical(column) => {
                column.fill_numeric(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Time(column) => {
                column.fill_numeric(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Free(_) | Column::DateTime(_) => Err(Error::MissingCapability {
                required: Capabilities::NUMERIC_READABLE,
            }),
        }
    }

    /// Bulk copies the object view of consecutive rows into `dst`, following the same addressing
    /// scheme as [`Self::fill_numeric`]. Missing values are written as `None`.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn fill_objects(
        &self,
        dst: &mut [Option<AnyValue>],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) -> Result<(), Error> {
        assert!(stride > 0, "Fill stride must be at least one.");
        match self {
            Column::Categorical(column) => {
                column.fill_objects(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Free(column) => {
                column.fill_objects(dst, start_row, offset, stride);
                Ok(())
            }
            Column::DateTime(column) => {
                column.fill_objects(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Time(column) => {
                column.fill_objects(dst, start_row, offset, stride);
                Ok(())
            }
            Column::Numeric(_) => Err(Error::MissingCapability {
                required: Capabilities::OBJECT_READABLE,
            }),
        }
    }

    /// Bulk copies the dictionary index view of consecutive rows into `dst`. For non-categorical
    /// columns the index view is all zeros.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn fill_indices(&self, dst: &mut [u32], start_row: usize, offset: usize, stride: usize) {
        assert!(stride > 0, "Fill stride must be at least one.");
        match self {
            Column::Categorical(column) => column.fill_indices(dst, start_row, offset, stride),
            _ => {
                for (target, _row) in fill_positions(dst.len(), self.len(), start_row, offset, stride)
                {
                    dst[target] = 0;
                }
            }
        }
    }

    /// The dictionary of a categorical column as a list of typed values. Slot `0` is always
    /// `None`, denoting the missing value.
    ///
    /// Fails with [`Error::NotCategorical`] for other column categories and with
    /// [`Error::ElementTypeMismatch`] if the dictionary stores a different element type than
    /// `T`.
    pub fn get_dictionary<T>(&self) -> Result<Vec<Option<Arc<T>>>, Error>
    where
        T: Send + Sync + 'static,
    {
        match self {
            Column::Categorical(column) => column.typed_dictionary::<T>(),
            _ => Err(Error::NotCategorical),
        }
    }

    /// The unpacked dictionary index stream of a categorical column.
    ///
    /// Fails with [`Error::NotCategorical`] for other column categories.
    pub fn index_data(&self) -> Result<Vec<i32>, Error> {
        match self {
            Column::Categorical(column) => Ok(column.index_data()),
            _ => Err(Error::NotCategorical),
        }
    }
}

/// Pairs of (slice index, row index) addressed by a fill with the given geometry. Ends at the
/// column end or the slice end, whichever comes first.
pub(crate) fn fill_positions(
    dst_len: usize,
    column_len: usize,
    start_row: usize,
    offset: usize,
    stride: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (0..)
        .map(move |step| (offset + step * stride, start_row + step))
        .take_while(move |&(target, row)| target < dst_len && row < column_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_positions_stop_at_slice_end() {
        let positions: Vec<_> = fill_positions(4, 100, 10, 0, 1).collect();
        assert_eq!(vec![(0, 10), (1, 11), (2, 12), (3, 13)], positions);
    }

    #[test]
    fn fill_positions_stop_at_column_end() {
        let positions: Vec<_> = fill_positions(10, 12, 10, 0, 1).collect();
        assert_eq!(vec![(0, 10), (1, 11)], positions);
    }

    #[test]
    fn fill_positions_apply_offset_and_stride() {
        let positions: Vec<_> = fill_positions(7, 100, 5, 1, 3).collect();
        assert_eq!(vec![(1, 5), (4, 6)], positions);
    }

    #[test]
    fn categories_follow_types() {
        assert_eq!(Category::Numeric, ColumnType::Real.category());
        assert_eq!(Category::Numeric, ColumnType::Integer.category());
        assert_eq!(Category::Categorical, ColumnType::Categorical.category());
        assert_eq!(Category::Free, ColumnType::Free.category());
        assert_eq!(Category::Free, ColumnType::DateTime.category());
        assert_eq!(Category::Free, ColumnType::Time.category());
    }
}
