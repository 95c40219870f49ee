//! # About
//!
//! `coltable` is an in-memory columnar table engine for analytical workloads. A [`Table`] is a
//! list of labelled, immutable, typed [`Column`]s of one shared height. Columns are created by
//! filling a mutable buffer (see [`buffers`]) and sealing it; once sealed they never change,
//! which makes them safe to share between any number of concurrent readers.
//!
//! Work over columns runs through transformers: [`Table::transform`] and
//! [`Table::transform_multi`] hand out entry points for mapping columns into new columns
//! (`apply_*`) and folding them into scalars or accumulators (`reduce*`). The engine splits
//! the row range into batches and runs them on worker threads; the [`Workload`] hint tunes the
//! batch sizes and the [`Context`] provides parallelism and cooperative cancellation.
//!
//! ```
//! use coltable::{buffers::IntegerBuffer, Context, Table, Workload};
//!
//! let mut values = IntegerBuffer::new(100);
//! for row in 0..100 {
//!     values.set(row, row as f64);
//! }
//! let table = Table::builder(100).add("value", values)?.build();
//! let sum = table
//!     .transform("value")?
//!     .workload(Workload::Small)
//!     .reduce(0.0, |a, b| a + b, &Context::new())?;
//! assert_eq!(4950.0, sum);
//! # Ok::<_, coltable::Error>(())
//! ```

mod calculator;
mod error;
mod execution;
mod table;
mod transform;

pub mod buffers;
pub mod columns;
pub mod format;
pub mod reader;

pub use self::{
    columns::{AnyValue, Capabilities, Category, Column, ColumnType},
    error::Error,
    execution::{Context, Workload},
    format::IntegerFormat,
    reader::BEFORE_FIRST,
    table::{Table, TableBuilder},
    transform::{MultiTransformer, Transformer},
};
