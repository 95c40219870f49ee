use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Mutex, RwLock},
};

use crate::{
    buffers::{fmt_buffer, FROZEN_BUFFER},
    columns::{CategoricalColumn, Category, Column, ColumnType, Dictionary},
    format::{IndexStorage, IntegerFormat},
    Error,
};

/// Mutable dictionary of a categorical buffer: the ordered value list plus the reverse value to
/// index map. Lookups take the read path only; the first insert of a new value serializes
/// behind the dictionary lock and re-checks before publishing, so concurrent writers agree on
/// one index per value.
#[derive(Debug)]
pub(crate) struct DictionaryBuilder<T> {
    /// Ordered dictionary slots. Slot 0 holds the missing value.
    values: Mutex<Vec<Option<Arc<T>>>>,
    /// Reverse map from value to dictionary index.
    lookup: RwLock<HashMap<Arc<T>, u32>>,
}

impl<T> DictionaryBuilder<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        DictionaryBuilder {
            values: Mutex::new(vec![None]),
            lookup: RwLock::new(HashMap::new()),
        }
    }

    /// Index of `value`, inserting it if the dictionary does not contain it yet. `None` if
    /// inserting would push the dictionary past `max_index` slots; the dictionary is not
    /// modified in that case.
    pub fn index_of_or_insert(&self, value: &T, max_index: u32) -> Option<u32> {
        if let Some(&index) = self.lookup.read().unwrap().get(value) {
            return Some(index);
        }
        // Slow path. The values mutex doubles as the dictionary lock serializing appends.
        let mut values = self.values.lock().unwrap();
        if let Some(&index) = self.lookup.read().unwrap().get(value) {
            // Another writer published the value while we waited for the lock.
            return Some(index);
        }
        let index = values.len() as u32;
        if index > max_index {
            return None;
        }
        let shared = Arc::new(value.clone());
        values.push(Some(shared.clone()));
        self.lookup.write().unwrap().insert(shared, index);
        Some(index)
    }

    /// Number of slots, including the missing slot 0.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    pub fn value_at(&self, index: usize) -> Option<Arc<T>> {
        self.values.lock().unwrap()[index].clone()
    }

    pub fn into_dictionary(self) -> Dictionary<T> {
        Dictionary::new(self.values.into_inner().unwrap())
    }
}

/// Dictionary coded buffer, generic over the element type and the index storage width. The
/// declared [`IntegerFormat`] bounds the number of distinct categories; for the 2 and 4 bit
/// formats the bound is the format's, not the byte storage's, and the indices are packed to
/// their nominal width when the buffer is sealed.
///
/// Use the width specific aliases ([`UInt8CategoricalBuffer`], [`UInt16CategoricalBuffer`],
/// [`Int32CategoricalBuffer`]) when the format is known at compile time, or
/// [`AnyCategoricalBuffer`] to dispatch on a runtime format.
#[derive(Debug)]
pub struct CategoricalBuffer<T, S> {
    indices: S,
    format: IntegerFormat,
    dictionary: DictionaryBuilder<T>,
    frozen: bool,
}

/// Categorical buffer with byte wide index storage. Also backs the 2 and 4 bit formats.
pub type UInt8CategoricalBuffer<T> = CategoricalBuffer<T, Vec<u8>>;
/// Categorical buffer with 16 bit index storage.
pub type UInt16CategoricalBuffer<T> = CategoricalBuffer<T, Vec<u16>>;
/// Categorical buffer with 32 bit index storage.
pub type Int32CategoricalBuffer<T> = CategoricalBuffer<T, Vec<i32>>;

impl<T, S> CategoricalBuffer<T, S>
where
    T: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
    S: IndexStorage,
{
    /// Creates a buffer of `len` missing values with the given declared format.
    ///
    /// # Panics
    ///
    /// Panics if the format's indices do not fit the storage width (e.g. requesting `I32` on a
    /// byte backed buffer).
    pub fn new(len: usize, format: IntegerFormat) -> Self {
        assert!(
            format.max_value() <= S::MAX_INDEX,
            "The index storage of this buffer is too narrow for the format {format:?}."
        );
        CategoricalBuffer {
            indices: S::zeroed(len),
            format,
            dictionary: DictionaryBuilder::new(),
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.len() == 0
    }

    /// Declared format bounding the number of distinct categories.
    pub fn format(&self) -> IntegerFormat {
        self.format
    }

    /// Value stored at `row`, `None` if the row is missing.
    pub fn get(&self, row: usize) -> Option<Arc<T>> {
        self.dictionary.value_at(self.indices.get(row) as usize)
    }

    /// Dictionary index stored at `row`.
    pub fn index_at(&self, row: usize) -> u32 {
        self.indices.get(row)
    }

    /// Number of distinct non-missing values written so far.
    pub fn different_values(&self) -> usize {
        self.dictionary.len() - 1
    }

    /// Writes `value` to `row`, growing the dictionary if the value is new. Returns `false`
    /// without touching dictionary or row if the dictionary is already at the capacity of the
    /// declared format.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn try_set(&mut self, row: usize, value: Option<T>) -> bool {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        let index = match value {
            None => 0,
            Some(value) => {
                match self
                    .dictionary
                    .index_of_or_insert(&value, self.format.max_value())
                {
                    Some(index) => index,
                    None => return false,
                }
            }
        };
        self.indices.set(row, index);
        true
    }

    /// Writes `value` to `row` like [`Self::try_set`], but reports dictionary overflow as an
    /// error instead of a flag.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: Option<T>) -> Result<(), Error> {
        if self.try_set(row, value) {
            Ok(())
        } else {
            Err(Error::TooManyCategories {
                format: self.format,
                max: self.format.max_value(),
            })
        }
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a categorical column, packing the indices to the nominal width of
    /// the declared format and freezing the dictionary.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        if column_type.category() != Category::Categorical {
            return Err(Error::TypeMismatch {
                flavor: "Categorical",
                requested: column_type.name(),
            });
        }
        let dictionary = Arc::new(self.dictionary.into_dictionary());
        Ok(Column::Categorical(CategoricalColumn::new(
            self.indices.into_index_vec(self.format),
            dictionary,
        )))
    }
}

impl<T, S> fmt::Display for CategoricalBuffer<T, S>
where
    T: Eq + Hash + Clone + Send + Sync + fmt::Debug + fmt::Display + 'static,
    S: IndexStorage,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Categorical", self.len(), |row| {
            match self.get(row) {
                Some(value) => value.to_string(),
                None => "?".to_string(),
            }
        })
    }
}

/// Categorical buffer whose index width is picked from an [`IntegerFormat`] at runtime. The 2
/// and 4 bit formats share the byte backed variant.
#[derive(Debug)]
pub enum AnyCategoricalBuffer<T> {
    Byte(UInt8CategoricalBuffer<T>),
    Word(UInt16CategoricalBuffer<T>),
    Int(Int32CategoricalBuffer<T>),
}

impl<T> AnyCategoricalBuffer<T>
where
    T: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
{
    /// Creates a buffer of `len` missing values, choosing the narrowest storage which fits the
    /// format.
    pub fn new(len: usize, format: IntegerFormat) -> Self {
        match format {
            IntegerFormat::U2 | IntegerFormat::U4 | IntegerFormat::U8 => {
                AnyCategoricalBuffer::Byte(CategoricalBuffer::new(len, format))
            }
            IntegerFormat::U16 => AnyCategoricalBuffer::Word(CategoricalBuffer::new(len, format)),
            IntegerFormat::I32 => AnyCategoricalBuffer::Int(CategoricalBuffer::new(len, format)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.len(),
            AnyCategoricalBuffer::Word(buffer) => buffer.len(),
            AnyCategoricalBuffer::Int(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> IntegerFormat {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.format(),
            AnyCategoricalBuffer::Word(buffer) => buffer.format(),
            AnyCategoricalBuffer::Int(buffer) => buffer.format(),
        }
    }

    pub fn get(&self, row: usize) -> Option<Arc<T>> {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.get(row),
            AnyCategoricalBuffer::Word(buffer) => buffer.get(row),
            AnyCategoricalBuffer::Int(buffer) => buffer.get(row),
        }
    }

    pub fn different_values(&self) -> usize {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.different_values(),
            AnyCategoricalBuffer::Word(buffer) => buffer.different_values(),
            AnyCategoricalBuffer::Int(buffer) => buffer.different_values(),
        }
    }

    pub fn try_set(&mut self, row: usize, value: Option<T>) -> bool {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.try_set(row, value),
            AnyCategoricalBuffer::Word(buffer) => buffer.try_set(row, value),
            AnyCategoricalBuffer::Int(buffer) => buffer.try_set(row, value),
        }
    }

    pub fn set(&mut self, row: usize, value: Option<T>) -> Result<(), Error> {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.set(row, value),
            AnyCategoricalBuffer::Word(buffer) => buffer.set(row, value),
            AnyCategoricalBuffer::Int(buffer) => buffer.set(row, value),
        }
    }

    pub fn freeze(&mut self) {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.freeze(),
            AnyCategoricalBuffer::Word(buffer) => buffer.freeze(),
            AnyCategoricalBuffer::Int(buffer) => buffer.freeze(),
        }
    }

    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        match self {
            AnyCategoricalBuffer::Byte(buffer) => buffer.to_column(column_type),
            AnyCategoricalBuffer::Word(buffer) => buffer.to_column(column_type),
            AnyCategoricalBuffer::Int(buffer) => buffer.to_column(column_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_values_get_consecutive_indices() {
        let mut buffer = UInt8CategoricalBuffer::<String>::new(5, IntegerFormat::U8);
        buffer.set(0, Some("a".to_string())).unwrap();
        buffer.set(1, Some("b".to_string())).unwrap();
        buffer.set(2, Some("a".to_string())).unwrap();
        buffer.set(3, None).unwrap();
        buffer.set(4, Some("c".to_string())).unwrap();
        assert_eq!(1, buffer.index_at(0));
        assert_eq!(2, buffer.index_at(1));
        assert_eq!(1, buffer.index_at(2));
        assert_eq!(0, buffer.index_at(3));
        assert_eq!(3, buffer.index_at(4));
        assert_eq!(3, buffer.different_values());
        assert_eq!("a", buffer.get(0).unwrap().as_str());
        assert!(buffer.get(3).is_none());
    }

    #[test]
    fn overflow_check_uses_the_declared_format_not_the_storage() {
        // U2 shares the byte storage with U8, yet must reject the fourth distinct value.
        let mut buffer = UInt8CategoricalBuffer::<i64>::new(8, IntegerFormat::U2);
        assert!(buffer.try_set(0, Some(10)));
        assert!(buffer.try_set(1, Some(20)));
        assert!(buffer.try_set(2, Some(30)));
        assert!(!buffer.try_set(3, Some(40)));
        // A rejected write mutates neither the dictionary nor the row.
        assert_eq!(3, buffer.different_values());
        assert_eq!(0, buffer.index_at(3));
        // Known values and the missing value still work.
        assert!(buffer.try_set(3, Some(20)));
        assert!(buffer.try_set(4, None));
    }

    #[test]
    fn u8_overflows_at_256_distinct_values() {
        let mut buffer = UInt8CategoricalBuffer::<i64>::new(256, IntegerFormat::U8);
        for row in 0..255 {
            assert!(buffer.try_set(row, Some(row as i64)));
        }
        assert!(!buffer.try_set(255, Some(255)));
        assert_eq!(255, buffer.different_values());
        assert!(matches!(
            buffer.set(255, Some(255)),
            Err(Error::TooManyCategories { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn writing_to_frozen_buffer_panics() {
        let mut buffer = AnyCategoricalBuffer::<String>::new(3, IntegerFormat::U16);
        buffer.freeze();
        buffer.try_set(0, Some("a".to_string()));
    }

    #[test]
    fn sealing_packs_narrow_formats() {
        let mut buffer = AnyCategoricalBuffer::<String>::new(5, IntegerFormat::U4);
        for (row, value) in ["x", "y", "x", "z", "y"].iter().enumerate() {
            buffer.set(row, Some(value.to_string())).unwrap();
        }
        let column = buffer.to_column(ColumnType::Categorical).unwrap();
        assert_eq!(vec![1, 2, 1, 3, 2], column.index_data().unwrap());
        let dictionary = column.get_dictionary::<String>().unwrap();
        assert_eq!(4, dictionary.len());
        assert!(dictionary[0].is_none());
        assert_eq!("x", dictionary[1].as_ref().unwrap().as_str());
        assert_eq!("z", dictionary[3].as_ref().unwrap().as_str());
    }

    #[test]
    fn sealing_rejects_foreign_category() {
        let buffer = AnyCategoricalBuffer::<String>::new(3, IntegerFormat::I32);
        assert!(matches!(
            buffer.to_column(ColumnType::Real),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn concurrent_inserts_agree_on_indices() {
        use std::thread;

        let dictionary = DictionaryBuilder::<String>::new();
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for value in 0..100 {
                        dictionary.index_of_or_insert(&format!("v{value}"), u32::MAX);
                    }
                });
            }
        });
        // 100 distinct values plus the missing slot, regardless of racing writers.
        assert_eq!(101, dictionary.len());
        for value in 0..100 {
            let index = dictionary
                .index_of_or_insert(&format!("v{value}"), u32::MAX)
                .unwrap();
            assert_eq!(
                format!("v{value}"),
                dictionary.value_at(index as usize).unwrap().as_str()
            );
        }
    }
}
