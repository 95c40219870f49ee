use std::sync::Arc;

use crate::{
    columns::{fill_positions, AnyValue, Dictionary, DictionaryLookup},
    format::IndexVec,
    Error,
};

/// Dictionary coded column. Every row stores a small index into the shared dictionary; index
/// `0` denotes a missing value. The numeric view of a row is its index as a float (`NaN` for
/// missing), the object view is the dictionary value the index resolves to.
#[derive(Debug, Clone)]
pub struct CategoricalColumn {
    indices: IndexVec,
    dictionary: Arc<dyn DictionaryLookup>,
}

impl CategoricalColumn {
    pub(crate) fn new(indices: IndexVec, dictionary: Arc<dyn DictionaryLookup>) -> Self {
        CategoricalColumn {
            indices,
            dictionary,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Dictionary index stored at `row`.
    pub fn index_at(&self, row: usize) -> u32 {
        self.indices.get(row)
    }

    /// Number of dictionary slots, including the missing slot `0`.
    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    /// The entire index stream, unpacked.
    pub fn index_data(&self) -> Vec<i32> {
        self.indices.to_i32_vec()
    }

    /// Object value at `row`, resolved through the dictionary.
    pub fn value_at(&self, row: usize) -> Option<AnyValue> {
        self.dictionary.value_at(self.indices.get(row) as usize)
    }

    pub(crate) fn typed_dictionary<T>(&self) -> Result<Vec<Option<Arc<T>>>, Error>
    where
        T: Send + Sync + 'static,
    {
        let typed = self
            .dictionary
            .as_any()
            .downcast_ref::<Dictionary<T>>()
            .ok_or_else(|| Error::ElementTypeMismatch {
                stored: self.dictionary.element_type_name(),
                requested: std::any::type_name::<T>(),
            })?;
        Ok(typed.values().to_vec())
    }

    pub(crate) fn fill_numeric(
        &self,
        dst: &mut [f64],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            let index = self.indices.get(row);
            dst[target] = if index == 0 { f64::NAN } else { index as f64 };
        }
    }

    pub(crate) fn fill_objects(
        &self,
        dst: &mut [Option<AnyValue>],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            dst[target] = self.dictionary.value_at(self.indices.get(row) as usize);
        }
    }

    pub(crate) fn fill_indices(
        &self,
        dst: &mut [u32],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            dst[target] = self.indices.get(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IndexVec;

    fn color_column() -> CategoricalColumn {
        let dictionary = Dictionary::new(vec![
            None,
            Some(Arc::new("red".to_string())),
            Some(Arc::new("blue".to_string())),
        ]);
        CategoricalColumn::new(IndexVec::U8(vec![1, 2, 0, 1]), Arc::new(dictionary))
    }

    #[test]
    fn numeric_view_is_index_with_nan_for_missing() {
        let column = color_column();
        let mut dst = [0.0; 4];
        column.fill_numeric(&mut dst, 0, 0, 1);
        assert_eq!(1.0, dst[0]);
        assert_eq!(2.0, dst[1]);
        assert!(dst[2].is_nan());
        assert_eq!(1.0, dst[3]);
    }

    #[test]
    fn object_view_resolves_through_dictionary() {
        let column = color_column();
        let mut dst: Vec<Option<AnyValue>> = vec![None; 4];
        column.fill_objects(&mut dst, 0, 0, 1);
        let as_str = |slot: &Option<AnyValue>| {
            slot.as_ref()
                .map(|value| value.downcast_ref::<String>().unwrap().clone())
        };
        assert_eq!(Some("red".to_string()), as_str(&dst[0]));
        assert_eq!(Some("blue".to_string()), as_str(&dst[1]));
        assert_eq!(None, as_str(&dst[2]));
    }

    #[test]
    fn typed_dictionary_rejects_wrong_element_type() {
        let column = color_column();
        assert!(column.typed_dictionary::<String>().is_ok());
        assert!(matches!(
            column.typed_dictionary::<i64>(),
            Err(Error::ElementTypeMismatch { .. })
        ));
    }

    #[test]
    fn indices_stay_within_dictionary_bounds() {
        let column = color_column();
        for row in 0..column.len() {
            assert!((column.index_at(row) as usize) < column.dictionary_len());
        }
    }
}
