use std::fmt;

use crate::{
    columns::{AnyValue, Capabilities, Category, Column},
    reader::{BEFORE_FIRST, SMALL_BUFFER_SIZE},
    Error,
};

/// Position bookkeeping shared by the row readers: the current row and the range of rows
/// buffered in the per column chunks. All chunks of one reader share the same geometry, so a
/// single cursor governs them together.
#[derive(Debug)]
struct RowCursor {
    height: usize,
    chunk_rows: usize,
    chunk_start: usize,
    chunk_valid: usize,
    current: i64,
}

impl RowCursor {
    fn new(height: usize, chunk_rows: usize) -> Self {
        RowCursor {
            height,
            chunk_rows,
            chunk_start: 0,
            chunk_valid: 0,
            current: BEFORE_FIRST,
        }
    }

    fn position(&self) -> i64 {
        self.current
    }

    fn remaining(&self) -> usize {
        self.height.saturating_sub((self.current + 1).max(0) as usize)
    }

    fn in_chunk(&self, row: usize) -> bool {
        row >= self.chunk_start && row < self.chunk_start + self.chunk_valid
    }

    /// Advances to the next row. `Some(start)` asks the caller to refill its chunks starting at
    /// that row.
    fn move_next(&mut self) -> Option<usize> {
        self.current += 1;
        self.ensure_buffered()
    }

    fn set_position(&mut self, position: i64) -> Option<usize> {
        assert!(
            position >= BEFORE_FIRST,
            "Reader positions start at BEFORE_FIRST (-1). Got {position}."
        );
        self.current = position;
        self.ensure_buffered()
    }

    fn ensure_buffered(&mut self) -> Option<usize> {
        if self.current < 0 {
            return None;
        }
        let row = self.current as usize;
        if row >= self.height || self.in_chunk(row) {
            return None;
        }
        self.chunk_start = row;
        self.chunk_valid = self.chunk_rows.min(self.height - row);
        Some(row)
    }

    /// Chunk slot of the current row.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is before the first or past the last row.
    fn slot(&self) -> usize {
        assert!(
            self.current >= 0 && (self.current as usize) < self.height,
            "The reader is not positioned on a row. Move it before accessing values."
        );
        self.current as usize - self.chunk_start
    }
}

fn chunk_rows_for(desired_rows: usize, width: usize) -> usize {
    (desired_rows / width.max(1)).max(1)
}

fn validate_columns(columns: &[&Column]) -> Result<usize, Error> {
    let first = columns.first().ok_or(Error::EmptySelection)?;
    assert!(
        columns.iter().all(|column| column.len() == first.len()),
        "All columns of a row reader must share one height."
    );
    Ok(first.len())
}

/// Multi column cursor over the raw dictionary indices of categorical columns.
#[derive(Debug)]
pub struct CategoricalRowReader<'c> {
    columns: Vec<&'c Column>,
    chunks: Vec<Vec<u32>>,
    cursor: RowCursor,
}

impl<'c> CategoricalRowReader<'c> {
    /// Creates a reader over the given categorical columns, splitting the default chunk budget
    /// over them.
    ///
    /// Fails if no column is given or any column is not categorical.
    pub fn new(columns: &[&'c Column]) -> Result<Self, Error> {
        Self::with_buffer_size(columns, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering about `desired_rows` rows in total across all columns.
    pub fn with_buffer_size(columns: &[&'c Column], desired_rows: usize) -> Result<Self, Error> {
        let height = validate_columns(columns)?;
        if columns
            .iter()
            .any(|column| column.category() != Category::Categorical)
        {
            return Err(Error::NotCategorical);
        }
        let chunk_rows = chunk_rows_for(desired_rows, columns.len());
        Ok(CategoricalRowReader {
            columns: columns.to_vec(),
            chunks: columns.iter().map(|_| vec![0; chunk_rows]).collect(),
            cursor: RowCursor::new(height, chunk_rows),
        })
    }

    /// Dictionary index of column `column_index` at the current row.
    ///
    /// # Panics
    ///
    /// Panics if the reader is not positioned on a row.
    pub fn get(&self, column_index: usize) -> u32 {
        self.chunks[column_index][self.cursor.slot()]
    }

    /// Advances the reader to the next row.
    pub fn move_next(&mut self) {
        if let Some(start_row) = self.cursor.move_next() {
            self.refill(start_row);
        }
    }

    /// Moves the reader so it stands on `position`; the next [`Self::move_next`] advances to
    /// the row after it.
    ///
    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        if let Some(start_row) = self.cursor.set_position(position) {
            self.refill(start_row);
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn refill(&mut self, start_row: usize) {
        for (column, chunk) in self.columns.iter().zip(&mut self.chunks) {
            column.fill_indices(chunk, start_row, 0, 1);
        }
    }
}

impl fmt::Display for CategoricalRowReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Categorical Row reader ({}x{})\nRow position: {}",
            self.cursor.height,
            self.width(),
            self.position()
        )
    }
}

/// Multi column cursor over the numeric views of its columns.
#[derive(Debug)]
pub struct NumericRowReader<'c> {
    columns: Vec<&'c Column>,
    chunks: Vec<Vec<f64>>,
    cursor: RowCursor,
}

impl<'c> NumericRowReader<'c> {
    /// Creates a reader over the given numeric readable columns.
    ///
    /// Fails if no column is given or any column is not numeric readable.
    pub fn new(columns: &[&'c Column]) -> Result<Self, Error> {
        Self::with_buffer_size(columns, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering about `desired_rows` rows in total across all columns.
    pub fn with_buffer_size(columns: &[&'c Column], desired_rows: usize) -> Result<Self, Error> {
        let height = validate_columns(columns)?;
        if columns.iter().any(|column| {
            !column
                .capabilities()
                .contains(Capabilities::NUMERIC_READABLE)
        }) {
            return Err(Error::MissingCapability {
                required: Capabilities::NUMERIC_READABLE,
            });
        }
        let chunk_rows = chunk_rows_for(desired_rows, columns.len());
        Ok(NumericRowReader {
            columns: columns.to_vec(),
            chunks: columns.iter().map(|_| vec![0.0; chunk_rows]).collect(),
            cursor: RowCursor::new(height, chunk_rows),
        })
    }

    /// Numeric value of column `column_index` at the current row.
    ///
    /// # Panics
    ///
    /// Panics if the reader is not positioned on a row.
    pub fn get(&self, column_index: usize) -> f64 {
        self.chunks[column_index][self.cursor.slot()]
    }

    pub fn move_next(&mut self) {
        if let Some(start_row) = self.cursor.move_next() {
            self.refill(start_row);
        }
    }

    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        if let Some(start_row) = self.cursor.set_position(position) {
            self.refill(start_row);
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn refill(&mut self, start_row: usize) {
        for (column, chunk) in self.columns.iter().zip(&mut self.chunks) {
            column
                .fill_numeric(chunk, start_row, 0, 1)
                .expect("numeric readability is checked on reader construction");
        }
    }
}

impl fmt::Display for NumericRowReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Numeric Row reader ({}x{})\nRow position: {}",
            self.cursor.height,
            self.width(),
            self.position()
        )
    }
}

/// Per column chunk set of the general row reader. A column gets a numeric chunk if it is
/// numeric readable, an object chunk if it is object readable and an index chunk if it is
/// categorical; categorical columns typically hold all three.
struct GeneralChunks {
    numeric: Option<Vec<f64>>,
    objects: Option<Vec<Option<AnyValue>>>,
    indices: Option<Vec<u32>>,
}

/// Multi column cursor over columns of mixed types, exposing the numeric, index and object
/// views side by side. Views a column does not support fall back to the documented defaults:
/// `NaN` numeric, index `0`, no object.
pub struct GeneralRowReader<'c> {
    columns: Vec<&'c Column>,
    chunks: Vec<GeneralChunks>,
    cursor: RowCursor,
}

impl<'c> GeneralRowReader<'c> {
    /// Creates a reader over the given columns.
    ///
    /// Fails if no column is given.
    pub fn new(columns: &[&'c Column]) -> Result<Self, Error> {
        Self::with_buffer_size(columns, SMALL_BUFFER_SIZE)
    }

    /// Creates a reader buffering about `desired_rows` rows in total across all columns.
    pub fn with_buffer_size(columns: &[&'c Column], desired_rows: usize) -> Result<Self, Error> {
        let height = validate_columns(columns)?;
        let chunk_rows = chunk_rows_for(desired_rows, columns.len());
        let chunks = columns
            .iter()
            .map(|column| {
                let capabilities = column.capabilities();
                GeneralChunks {
                    numeric: capabilities
                        .contains(Capabilities::NUMERIC_READABLE)
                        .then(|| vec![0.0; chunk_rows]),
                    objects: capabilities
                        .contains(Capabilities::OBJECT_READABLE)
                        .then(|| vec![None; chunk_rows]),
                    indices: (column.category() == Category::Categorical)
                        .then(|| vec![0; chunk_rows]),
                }
            })
            .collect();
        Ok(GeneralRowReader {
            columns: columns.to_vec(),
            chunks,
            cursor: RowCursor::new(height, chunk_rows),
        })
    }

    /// Numeric view of column `column_index` at the current row; `NaN` if the column is not
    /// numeric readable.
    ///
    /// # Panics
    ///
    /// Panics if the reader is not positioned on a row.
    pub fn get_numeric(&self, column_index: usize) -> f64 {
        match &self.chunks[column_index].numeric {
            Some(chunk) => chunk[self.cursor.slot()],
            None => f64::NAN,
        }
    }

    /// Dictionary index of column `column_index` at the current row; `0` if the column is not
    /// categorical.
    ///
    /// # Panics
    ///
    /// Panics if the reader is not positioned on a row.
    pub fn get_index(&self, column_index: usize) -> u32 {
        match &self.chunks[column_index].indices {
            Some(chunk) => chunk[self.cursor.slot()],
            None => 0,
        }
    }

    /// Object view of column `column_index` at the current row; `None` if the column is not
    /// object readable or the value is missing.
    ///
    /// # Panics
    ///
    /// Panics if the reader is not positioned on a row.
    pub fn get_object(&self, column_index: usize) -> Option<AnyValue> {
        match &self.chunks[column_index].objects {
            Some(chunk) => chunk[self.cursor.slot()].clone(),
            None => None,
        }
    }

    pub fn move_next(&mut self) {
        if let Some(start_row) = self.cursor.move_next() {
            self.refill(start_row);
        }
    }

    /// # Panics
    ///
    /// Panics for positions below [`BEFORE_FIRST`].
    pub fn set_position(&mut self, position: i64) {
        if let Some(start_row) = self.cursor.set_position(position) {
            self.refill(start_row);
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn refill(&mut self, start_row: usize) {
        for (column, chunks) in self.columns.iter().zip(&mut self.chunks) {
            if let Some(chunk) = &mut chunks.numeric {
                column
                    .fill_numeric(chunk, start_row, 0, 1)
                    .expect("chunk allocation follows the column capabilities");
            }
            if let Some(chunk) = &mut chunks.objects {
                column
                    .fill_objects(chunk, start_row, 0, 1)
                    .expect("chunk allocation follows the column capabilities");
            }
            if let Some(chunk) = &mut chunks.indices {
                column.fill_indices(chunk, start_row, 0, 1);
            }
        }
    }
}

impl fmt::Display for GeneralRowReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "General Row reader ({}x{})\nRow position: {}",
            self.cursor.height,
            self.width(),
            self.position()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffers::{AnyCategoricalBuffer, FreeBuffer, RealBuffer},
        columns::ColumnType,
        format::IntegerFormat,
        reader::NumericReader,
    };

    fn numeric_column(values: &[f64]) -> Column {
        let mut buffer = RealBuffer::new(values.len());
        for (row, &value) in values.iter().enumerate() {
            buffer.set(row, value);
        }
        buffer.to_column(ColumnType::Real).unwrap()
    }

    fn word_column(values: &[&str]) -> Column {
        let mut buffer = AnyCategoricalBuffer::new(values.len(), IntegerFormat::U8);
        for (row, value) in values.iter().enumerate() {
            buffer.set(row, Some(value.to_string())).unwrap();
        }
        buffer.to_column(ColumnType::Categorical).unwrap()
    }

    #[test]
    fn categorical_rows_expose_indices() {
        let left = word_column(&["a", "b", "a"]);
        let right = word_column(&["x", "x", "y"]);
        let mut reader = CategoricalRowReader::new(&[&left, &right]).unwrap();
        assert_eq!(BEFORE_FIRST, reader.position());
        assert_eq!(3, reader.remaining());
        reader.move_next();
        assert_eq!((1, 1), (reader.get(0), reader.get(1)));
        reader.move_next();
        assert_eq!((2, 1), (reader.get(0), reader.get(1)));
        reader.move_next();
        assert_eq!((1, 2), (reader.get(0), reader.get(1)));
        assert!(!reader.has_remaining());
    }

    #[test]
    fn single_and_multi_column_reads_agree() {
        let values: Vec<f64> = (0..100).map(|row| row as f64 * 0.25).collect();
        let column = numeric_column(&values);
        let mut single = NumericReader::with_buffer_size(&column, 7).unwrap();
        let mut multi = NumericRowReader::with_buffer_size(&[&column], 7).unwrap();
        for _ in 0..100 {
            multi.move_next();
            assert_eq!(single.read(), multi.get(0));
        }
    }

    #[test]
    fn general_reader_mixes_views() {
        let numbers = numeric_column(&[0.5, 1.5]);
        let words = word_column(&["a", "b"]);
        let mut free = FreeBuffer::new(2);
        free.set(0, Some("boxed".to_string()));
        let free = free.to_column(ColumnType::Free).unwrap();

        let mut reader = GeneralRowReader::new(&[&numbers, &words, &free]).unwrap();
        reader.move_next();
        assert_eq!(0.5, reader.get_numeric(0));
        assert_eq!(0, reader.get_index(0));
        assert!(reader.get_object(0).is_none());
        // Categorical columns carry the numeric, index and object views at once.
        assert_eq!(1.0, reader.get_numeric(1));
        assert_eq!(1, reader.get_index(1));
        assert_eq!(
            "a",
            reader
                .get_object(1)
                .unwrap()
                .downcast_ref::<String>()
                .unwrap()
        );
        assert!(reader.get_numeric(2).is_nan());
        assert_eq!(
            "boxed",
            reader
                .get_object(2)
                .unwrap()
                .downcast_ref::<String>()
                .unwrap()
        );
    }

    #[test]
    fn set_position_rewinds_the_cursor() {
        let column = word_column(&["a", "b", "c"]);
        let mut reader = CategoricalRowReader::new(&[&column]).unwrap();
        reader.move_next();
        reader.move_next();
        assert_eq!(2, reader.get(0));
        reader.set_position(BEFORE_FIRST);
        reader.move_next();
        assert_eq!(1, reader.get(0));
    }

    #[test]
    fn display_reports_shape_and_position() {
        let column = word_column(&["a", "b", "c"]);
        let numbers = numeric_column(&[1.0, 2.0, 3.0]);
        let mut reader = GeneralRowReader::new(&[&column, &numbers]).unwrap();
        assert_eq!(
            "General Row reader (3x2)\nRow position: -1",
            reader.to_string()
        );
        reader.move_next();
        assert_eq!(
            "General Row reader (3x2)\nRow position: 0",
            reader.to_string()
        );
    }

    #[test]
    fn empty_column_selection_is_rejected() {
        assert!(matches!(
            CategoricalRowReader::new(&[]),
            Err(Error::EmptySelection)
        ));
    }
}
