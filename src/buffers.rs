//! Mutable, typed write side storage which freezes into columns.
//!
//! Buffers are the only way to create columns. A buffer starts out open, accepts writes (and
//! for the growing flavors resizes), and is then sealed into an immutable [`crate::Column`]
//! with `to_column`, which transfers ownership of the backing store to the new column. An
//! explicit [`freeze`] leaves the buffer inert: every later mutation is a programming error and
//! panics.
//!
//! Flavors:
//!
//! * [`RealBuffer`] / [`IntegerBuffer`]: fixed length dense `f64` storage. The integer flavor
//!   rounds values half-up on write.
//! * [`GrowingRealBuffer`] / [`GrowingIntegerBuffer`]: same layouts, but resizable while open.
//! * [`CategoricalBuffer`]: dictionary coded storage, generic over the element type and the
//!   index width. Use [`AnyCategoricalBuffer`] to pick the width from an
//!   [`crate::IntegerFormat`] at runtime.
//! * [`FreeBuffer`]: boxed element values of one declared type.
//! * [`TimeBuffer`] / [`DateTimeBuffer`]: dense temporal storage.
//!
//! [`freeze`]: RealBuffer::freeze

use std::fmt;

mod categorical;
mod free;
mod numeric;
mod temporal;

pub use self::{
    categorical::{
        AnyCategoricalBuffer, CategoricalBuffer, Int32CategoricalBuffer, UInt16CategoricalBuffer,
        UInt8CategoricalBuffer,
    },
    free::FreeBuffer,
    numeric::{GrowingIntegerBuffer, GrowingRealBuffer, IntegerBuffer, RealBuffer},
    temporal::{DateTimeBuffer, TimeBuffer},
};

pub(crate) const FROZEN_BUFFER: &str =
    "The buffer is frozen. Mutating a buffer is illegal after freeze.";

/// Rounding applied by the integer flavored buffers: half-up, `round(0.5) == 1.0`,
/// `round(-0.5) == 0.0`. `NaN` marks a missing value and is preserved.
pub(crate) fn round_half_up(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        (value + 0.5).floor()
    }
}

/// Renders a floating point value the way buffers display their numeric content: three
/// fractional digits, `?` for missing, spelled out infinities.
pub(crate) fn display_real(value: f64) -> String {
    if value.is_nan() {
        "?".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{value:.3}")
    }
}

/// Like [`display_real`], but renders whole numbers without fractional digits.
pub(crate) fn display_integer(value: f64) -> String {
    if value.is_nan() {
        "?".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{}", value as i64)
    }
}

/// Longest run of values a buffer prints in full. Beyond this the display elides everything
/// between the 31st and the last value.
const MAX_DISPLAY_ELEMENTS: usize = 32;

/// Writes the standard buffer display: `<flavor> Buffer (<n>)` followed by the parenthesized
/// value list.
pub(crate) fn fmt_buffer(
    f: &mut fmt::Formatter<'_>,
    flavor: &str,
    len: usize,
    mut element: impl FnMut(usize) -> String,
) -> fmt::Result {
    writeln!(f, "{flavor} Buffer ({len})")?;
    write!(f, "(")?;
    if len > MAX_DISPLAY_ELEMENTS {
        for row in 0..MAX_DISPLAY_ELEMENTS - 1 {
            if row > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", element(row))?;
        }
        write!(f, ", ..., {}", element(len - 1))?;
    } else {
        for row in 0..len {
            if row > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", element(row))?;
        }
    }
    write!(f, ")")
}

// Every buffer flavor has exactly one natural column type, so sealing through `From` cannot
// fail. The table builder accepts `impl Into<Column>` on the strength of these conversions.

impl From<RealBuffer> for crate::Column {
    fn from(buffer: RealBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::Real)
            .expect("a real buffer seals into a real column")
    }
}

impl From<GrowingRealBuffer> for crate::Column {
    fn from(buffer: GrowingRealBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::Real)
            .expect("a real buffer seals into a real column")
    }
}

impl From<IntegerBuffer> for crate::Column {
    fn from(buffer: IntegerBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::Integer)
            .expect("an integer buffer seals into an integer column")
    }
}

impl From<GrowingIntegerBuffer> for crate::Column {
    fn from(buffer: GrowingIntegerBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::Integer)
            .expect("an integer buffer seals into an integer column")
    }
}

impl<T, S> From<CategoricalBuffer<T, S>> for crate::Column
where
    T: Eq + std::hash::Hash + Clone + Send + Sync + fmt::Debug + 'static,
    S: crate::format::IndexStorage,
{
    fn from(buffer: CategoricalBuffer<T, S>) -> Self {
        buffer
            .to_column(crate::ColumnType::Categorical)
            .expect("a categorical buffer seals into a categorical column")
    }
}

impl<T> From<AnyCategoricalBuffer<T>> for crate::Column
where
    T: Eq + std::hash::Hash + Clone + Send + Sync + fmt::Debug + 'static,
{
    fn from(buffer: AnyCategoricalBuffer<T>) -> Self {
        buffer
            .to_column(crate::ColumnType::Categorical)
            .expect("a categorical buffer seals into a categorical column")
    }
}

impl<T> From<FreeBuffer<T>> for crate::Column
where
    T: Send + Sync + fmt::Debug + 'static,
{
    fn from(buffer: FreeBuffer<T>) -> Self {
        buffer
            .to_column(crate::ColumnType::Free)
            .expect("a free buffer seals into a free column")
    }
}

impl From<TimeBuffer> for crate::Column {
    fn from(buffer: TimeBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::Time)
            .expect("a time buffer seals into a time column")
    }
}

impl From<DateTimeBuffer> for crate::Column {
    fn from(buffer: DateTimeBuffer) -> Self {
        buffer
            .to_column(crate::ColumnType::DateTime)
            .expect("a date-time buffer seals into a date-time column")
    }
}
