use crate::{
    columns::{AnyValue, Capabilities, Category, Column},
    reader::{BEFORE_FIRST, SMALL_BUFFER_SIZE},
    Error,
};

/// Position bookkeeping shared by the single column readers: the row served by the next `read`
/// and the chunk of rows currently buffered.
#[derive(Debug)]
struct ReadCursor {
    height: usize,
    next_row: usize,
    chunk_start: usize,
    chunk_valid: usize,
    refills: usize,
}

impl ReadCursor {
    fn new(height: usize) -> Self {
        ReadCursor {
            height,
            next_row: 0,
            chunk_start: 0,
            chunk_valid: 0,
            refills: 0,
        }
    }

    fn position(&self) -> i64 {
        self.next_row as i64 - 1
    }

    fn remaining(&self) -> usize {
        self.height.saturating_sub(self.next_row)
    }

    fn set_position(&mut self, position: i64) {
        assert!(
            position >= BEFORE_FIRST,
            "Reader positions start at BEFORE_FIRST (-1). Got {position}."
        );
        self.next_row = (position + 1) as usize;
    }

    /// Advances the cursor and reports the chunk slot of the row to read. `Some(start)` in the
    /// second tuple field asks the caller to refill its chunk starting at that row first.
    fn advance(&mut self, chunk_rows: usize) -> (usize, Option<usize>) {
        let row = self.next_row;
        assert!(
            row < self.height,
            "Read past the end of the column ({} rows).",
            self.height
        );
        let refill = if row < self.chunk_start || row >= self.chunk_start + self.chunk_valid {
            self.chunk_start = row;
            self.chunk_valid = chunk_rows.min(self.height - row);
            self.refills += 1;
            Some(row)
        } else {
            None
        };
        self.next_row = row + 1;
        (row - self.chunk_start, refill)
    }
}

/// Buffered cursor over the numeric view of a single column.
#[derive(Debug)]
pub struct NumericReader<'c> {
    column: &'c Column,
    chunk: Vec<f64>,
    cursor: ReadCursor,
}

impl<'c> NumericReader<'c> {
    /// Creates a reader with the default chunk size.
    ///
    /// Fails if the column is not numeric readable.
    pub fn new(column: &'c Column) -> Result<Self, Error> {
        Self::with_buffer_size(column, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering `buffer_size` rows per chunk (at least one).
    pub fn with_buffer_size(column: &'c Column, buffer_size: usize) -> Result<Self, Error> {
        if !column
            .capabilities()
            .contains(Capabilities::NUMERIC_READABLE)
        {
            return Err(Error::MissingCapability {
                required: Capabilities::NUMERIC_READABLE,
            });
        }
        Ok(NumericReader {
            column,
            chunk: vec![0.0; buffer_size.max(1)],
            cursor: ReadCursor::new(column.len()),
        })
    }

    /// Value at the row after the current position; advances the position.
    ///
    /// # Panics
    ///
    /// Panics when reading past the end of the column.
    pub fn read(&mut self) -> f64 {
        let (slot, refill) = self.cursor.advance(self.chunk.len());
        if let Some(start_row) = refill {
            self.column
                .fill_numeric(&mut self.chunk, start_row, 0, 1)
                .expect("numeric readability is checked on reader construction");
        }
        self.chunk[slot]
    }

    /// Row index of the last read value, [`BEFORE_FIRST`] initially.
    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    /// Moves the cursor so the next [`Self::read`] returns the row after `position`.
    ///
    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        self.cursor.set_position(position);
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    #[cfg(test)]
    pub(crate) fn refills(&self) -> usize {
        self.cursor.refills
    }
}

/// Buffered cursor over the object view of a single column. Yields shared handles to the
/// element values, `None` for missing rows.
pub struct ObjectReader<'c> {
    column: &'c Column,
    chunk: Vec<Option<AnyValue>>,
    cursor: ReadCursor,
}

impl<'c> ObjectReader<'c> {
    /// Creates a reader with the default chunk size.
    ///
    /// Fails if the column is not object readable.
    pub fn new(column: &'c Column) -> Result<Self, Error> {
        Self::with_buffer_size(column, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering `buffer_size` rows per chunk (at least one).
    pub fn with_buffer_size(column: &'c Column, buffer_size: usize) -> Result<Self, Error> {
        if !column.capabilities().contains(Capabilities::OBJECT_READABLE) {
            return Err(Error::MissingCapability {
                required: Capabilities::OBJECT_READABLE,
            });
        }
        Ok(ObjectReader {
            column,
            chunk: vec![None; buffer_size.max(1)],
            cursor: ReadCursor::new(column.len()),
        })
    }

    /// Value at the row after the current position; advances the position.
    ///
    /// # Panics
    ///
    /// Panics when reading past the end of the column.
    pub fn read(&mut self) -> Option<AnyValue> {
        let (slot, refill) = self.cursor.advance(self.chunk.len());
        if let Some(start_row) = refill {
            self.column
                .fill_objects(&mut self.chunk, start_row, 0, 1)
                .expect("object readability is checked on reader construction");
        }
        self.chunk[slot].clone()
    }

    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        self.cursor.set_position(position);
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }
}

/// Buffered cursor over the raw dictionary indices of a categorical column.
#[derive(Debug)]
pub struct CategoricalReader<'c> {
    column: &'c Column,
    chunk: Vec<u32>,
    cursor: ReadCursor,
}

impl<'c> CategoricalReader<'c> {
    /// Creates a reader with the default chunk size.
    ///
    /// Fails if the column is not categorical.
    pub fn new(column: &'c Column) -> Result<Self, Error> {
        Self::with_buffer_size(column, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering `buffer_size` rows per chunk (at least one).
    pub fn with_buffer_size(column: &'c Column, buffer_size: usize) -> Result<Self, Error> {
        if column.category() != Category::Categorical {
            return Err(Error::NotCategorical);
        }
        Ok(CategoricalReader {
            column,
            chunk: vec![0; buffer_size.max(1)],
            cursor: ReadCursor::new(column.len()),
        })
    }

    /// Dictionary index at the row after the current position; advances the position.
    ///
    /// # Panics
    ///
    /// Panics when reading past the end of the column.
    pub fn read(&mut self) -> u32 {
        let (slot, refill) = self.cursor.advance(self.chunk.len());
        if let Some(start_row) = refill {
            self.column.fill_indices(&mut self.chunk, start_row, 0, 1);
        }
        self.chunk[slot]
    }

    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        self.cursor.set_position(position);
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffers::RealBuffer, columns::ColumnType};

    fn numeric_column(values: &[f64]) -> Column {
        let mut buffer = RealBuffer::new(values.len());
        for (row, &value) in values.iter().enumerate() {
            buffer.set(row, value);
        }
        buffer.to_column(ColumnType::Real).unwrap()
    }

    #[test]
    fn sequential_read_returns_all_values() {
        let column = numeric_column(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut reader = NumericReader::with_buffer_size(&column, 2).unwrap();
        assert_eq!(BEFORE_FIRST, reader.position());
        let values: Vec<f64> = (0..5).map(|_| reader.read()).collect();
        assert_eq!(vec![1.0, 2.0, 3.0, 4.0, 5.0], values);
        assert_eq!(4, reader.position());
        assert!(!reader.has_remaining());
    }

    #[test]
    fn chunked_sweep_issues_one_fill_per_chunk() {
        let column = numeric_column(&(0..10).map(f64::from).collect::<Vec<_>>());
        let mut reader = NumericReader::with_buffer_size(&column, 3).unwrap();
        for _ in 0..10 {
            reader.read();
        }
        // 10 rows at 3 per chunk
        assert_eq!(4, reader.refills());
    }

    #[test]
    fn set_position_continues_after_the_given_row() {
        let column = numeric_column(&[1.0, 2.0, 3.0, 4.0]);
        let mut reader = NumericReader::new(&column).unwrap();
        reader.set_position(1);
        assert_eq!(3.0, reader.read());
        reader.set_position(BEFORE_FIRST);
        assert_eq!(1.0, reader.read());
    }

    #[test]
    #[should_panic(expected = "BEFORE_FIRST")]
    fn positions_below_before_first_panic() {
        let column = numeric_column(&[1.0]);
        let mut reader = NumericReader::new(&column).unwrap();
        reader.set_position(-2);
    }

    #[test]
    fn zero_length_column_has_nothing_remaining() {
        let column = numeric_column(&[]);
        let reader = NumericReader::new(&column).unwrap();
        assert_eq!(0, reader.remaining());
        assert_eq!(BEFORE_FIRST, reader.position());
    }

    #[test]
    fn object_reader_rejects_numeric_columns() {
        let column = numeric_column(&[1.0]);
        assert!(matches!(
            ObjectReader::new(&column),
            Err(Error::MissingCapability { .. })
        ));
    }
}
