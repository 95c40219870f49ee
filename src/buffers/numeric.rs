use std::fmt;

use crate::{
    buffers::{display_integer, display_real, fmt_buffer, round_half_up, FROZEN_BUFFER},
    columns::{Category, Column, ColumnType, NumericColumn},
    Error,
};

/// Fixed length buffer of 64 bit floating point values. Freshly created buffers are zero
/// initialized; write `NaN` to mark a value as missing.
#[derive(Debug)]
pub struct RealBuffer {
    data: Vec<f64>,
    frozen: bool,
}

impl RealBuffer {
    pub fn new(len: usize) -> Self {
        RealBuffer {
            data: vec![0.0; len],
            frozen: false,
        }
    }

    pub(crate) fn from_data(data: Vec<f64>) -> Self {
        RealBuffer {
            data,
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize) -> f64 {
        self.data[row]
    }

    /// Writes `value` to `row`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: f64) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data[row] = value;
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a column of the given type, transferring ownership of the backing
    /// store. The type must belong to the numeric category.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        seal_numeric(self.data, column_type, "Real")
    }
}

impl fmt::Display for RealBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Real", self.data.len(), |row| display_real(self.data[row]))
    }
}

/// Fixed length buffer for whole numbers, stored as 64 bit floats. Writes round half-up, so
/// `set(row, 0.5)` stores `1.0` and `set(row, -0.5)` stores `0.0`. `NaN` passes through
/// unrounded as the missing value.
#[derive(Debug)]
pub struct IntegerBuffer {
    data: Vec<f64>,
    frozen: bool,
}

impl IntegerBuffer {
    pub fn new(len: usize) -> Self {
        IntegerBuffer {
            data: vec![0.0; len],
            frozen: false,
        }
    }

    pub(crate) fn from_data(data: Vec<f64>) -> Self {
        IntegerBuffer {
            data: data.into_iter().map(round_half_up).collect(),
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize) -> f64 {
        self.data[row]
    }

    /// Writes `value` rounded half-up to `row`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: f64) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data[row] = round_half_up(value);
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a column of the given type. The type must belong to the numeric
    /// category.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        seal_numeric(self.data, column_type, "Integer")
    }
}

impl fmt::Display for IntegerBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Integer", self.data.len(), |row| {
            display_integer(self.data[row])
        })
    }
}

/// Like [`RealBuffer`], but resizable while open. Growing the buffer zero-extends, shrinking
/// truncates; both are amortized constant time per element.
#[derive(Debug)]
pub struct GrowingRealBuffer {
    data: Vec<f64>,
    frozen: bool,
}

impl GrowingRealBuffer {
    pub fn new(len: usize) -> Self {
        GrowingRealBuffer {
            data: vec![0.0; len],
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize) -> f64 {
        self.data[row]
    }

    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: f64) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data[row] = value;
    }

    /// Truncates or zero-extends the buffer to `len` rows.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen.
    pub fn resize(&mut self, len: usize) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data.resize(len, 0.0);
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        seal_numeric(self.data, column_type, "Real")
    }
}

impl fmt::Display for GrowingRealBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Real", self.data.len(), |row| display_real(self.data[row]))
    }
}

/// Like [`IntegerBuffer`], but resizable while open.
#[derive(Debug)]
pub struct GrowingIntegerBuffer {
    data: Vec<f64>,
    frozen: bool,
}

impl GrowingIntegerBuffer {
    pub fn new(len: usize) -> Self {
        GrowingIntegerBuffer {
            data: vec![0.0; len],
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize) -> f64 {
        self.data[row]
    }

    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: f64) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data[row] = round_half_up(value);
    }

    /// Truncates or zero-extends the buffer to `len` rows.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen.
    pub fn resize(&mut self, len: usize) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.data.resize(len, 0.0);
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        seal_numeric(self.data, column_type, "Integer")
    }
}

impl fmt::Display for GrowingIntegerBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Integer", self.data.len(), |row| {
            display_integer(self.data[row])
        })
    }
}

fn seal_numeric(data: Vec<f64>, column_type: ColumnType, flavor: &'static str) -> Result<Column, Error> {
    if column_type.category() != Category::Numeric {
        return Err(Error::TypeMismatch {
            flavor,
            requested: column_type.name(),
        });
    }
    Ok(Column::Numeric(NumericColumn::new(data, column_type)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_buffer_rounds_on_write() {
        let mut buffer = IntegerBuffer::new(4);
        buffer.set(0, 0.5);
        buffer.set(1, -0.5);
        buffer.set(2, 1.4);
        buffer.set(3, f64::NAN);
        assert_eq!(1.0, buffer.get(0));
        assert_eq!(0.0, buffer.get(1));
        assert_eq!(1.0, buffer.get(2));
        assert!(buffer.get(3).is_nan());
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn writing_to_frozen_buffer_panics() {
        let mut buffer = RealBuffer::new(3);
        buffer.freeze();
        buffer.freeze(); // Freezing twice is a no-op.
        buffer.set(0, 1.0);
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn resizing_frozen_buffer_panics() {
        let mut buffer = GrowingRealBuffer::new(3);
        buffer.freeze();
        buffer.resize(5);
    }

    #[test]
    fn growing_buffer_truncates_and_zero_extends() {
        let mut buffer = GrowingIntegerBuffer::new(2);
        buffer.set(0, 1.0);
        buffer.set(1, 2.0);
        buffer.resize(4);
        assert_eq!(4, buffer.len());
        assert_eq!(0.0, buffer.get(2));
        buffer.resize(1);
        assert_eq!(1, buffer.len());
        assert_eq!(1.0, buffer.get(0));
    }

    #[test]
    fn seal_rejects_foreign_category() {
        let buffer = RealBuffer::new(3);
        assert!(matches!(
            buffer.to_column(ColumnType::Categorical),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn display_shows_all_values_of_short_buffers() {
        let mut buffer = RealBuffer::new(3);
        buffer.set(0, 1.0);
        buffer.set(1, f64::NAN);
        buffer.set(2, f64::INFINITY);
        assert_eq!("Real Buffer (3)\n(1.000, ?, Infinity)", buffer.to_string());
    }

    #[test]
    fn display_elides_middle_of_long_buffers() {
        let mut buffer = RealBuffer::new(33);
        for row in 0..33 {
            buffer.set(row, row as f64);
        }
        buffer.set(32, 100.0);
        let rendered = buffer.to_string();
        assert!(rendered.starts_with("Real Buffer (33)\n(0.000, 1.000,"));
        assert!(rendered.ends_with(", 30.000, ..., 100.000)"));
    }

    #[test]
    fn zero_length_buffer_is_legal() {
        let buffer = IntegerBuffer::new(0);
        assert_eq!(0, buffer.len());
        assert_eq!("Integer Buffer (0)\n()", buffer.to_string());
    }
}
