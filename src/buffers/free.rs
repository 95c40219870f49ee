use std::{fmt, sync::Arc};

use crate::{
    buffers::{fmt_buffer, FROZEN_BUFFER},
    columns::{free_objects, Column, ColumnType, FreeColumn},
    Error,
};

/// Buffer of boxed element values of one declared type. Accepts any value of the element type
/// or `None` for missing rows.
#[derive(Debug)]
pub struct FreeBuffer<T> {
    values: Vec<Option<Arc<T>>>,
    frozen: bool,
}

impl<T> FreeBuffer<T>
where
    T: Send + Sync + fmt::Debug + 'static,
{
    pub fn new(len: usize) -> Self {
        FreeBuffer {
            values: (0..len).map(|_| None).collect(),
            frozen: false,
        }
    }

    pub(crate) fn from_values(values: Vec<Option<Arc<T>>>) -> Self {
        FreeBuffer {
            values,
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shared handle to the value at `row`.
    pub fn get(&self, row: usize) -> Option<Arc<T>> {
        self.values[row].clone()
    }

    /// Writes `value` to `row`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is frozen or `row` is out of range.
    pub fn set(&mut self, row: usize, value: Option<T>) {
        assert!(!self.frozen, "{FROZEN_BUFFER}");
        self.values[row] = value.map(Arc::new);
    }

    /// Renders the buffer inert. Idempotent; every mutation afterwards panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Seals the buffer into a free column. The requested type must be `Free`.
    pub fn to_column(self, column_type: ColumnType) -> Result<Column, Error> {
        if column_type != ColumnType::Free {
            return Err(Error::TypeMismatch {
                flavor: "Free",
                requested: column_type.name(),
            });
        }
        Ok(Column::Free(FreeColumn::new(free_objects(self.values))))
    }
}

impl<T> fmt::Display for FreeBuffer<T>
where
    T: Send + Sync + fmt::Debug + fmt::Display + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_buffer(f, "Free", self.values.len(), |row| match &self.values[row] {
            Some(value) => value.to_string(),
            None => "?".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_the_sealed_column() {
        let mut buffer = FreeBuffer::new(3);
        buffer.set(0, Some("x0.0".to_string()));
        buffer.set(2, Some("x1.0".to_string()));
        let column = buffer.to_column(ColumnType::Free).unwrap();
        let Column::Free(free) = &column else {
            panic!("expected free column")
        };
        let values = free.typed::<String>().unwrap();
        assert_eq!("x0.0", values[0].as_ref().unwrap().as_str());
        assert!(values[1].is_none());
        assert_eq!("x1.0", values[2].as_ref().unwrap().as_str());
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn writing_to_frozen_buffer_panics() {
        let mut buffer: FreeBuffer<String> = FreeBuffer::new(1);
        buffer.freeze();
        buffer.set(0, None);
    }

    #[test]
    fn display_marks_missing_values() {
        let mut buffer = FreeBuffer::new(2);
        buffer.set(0, Some("a".to_string()));
        assert_eq!("Free Buffer (2)\n(a, ?)", buffer.to_string());
    }
}
