//! Buffered cursors over one or many columns.
//!
//! Readers amortize the per row cost of the `fill_*` calls by copying a whole chunk of rows
//! into an internal buffer and serving individual reads from there. For a sweep over `n` rows
//! with a chunk of `b` rows a column is asked to fill exactly `ceil(n / b)` times.
//!
//! Readers are cheap to create and strictly single threaded; the parallel engine creates one
//! reader per batch instead of sharing readers across threads. They borrow their columns, so a
//! reader can never outlive the data it reads.

mod rows;
mod single;

pub use self::{
    rows::{CategoricalRowReader, GeneralRowReader, NumericRowReader},
    single::{CategoricalReader, NumericReader, ObjectReader},
};

/// Cursor position before the first row. The only legal negative position.
pub const BEFORE_FIRST: i64 = -1;

/// Default number of rows a reader buffers per chunk. Multi column readers split this budget
/// over their columns.
pub(crate) const SMALL_BUFFER_SIZE: usize = 512;
