use std::{any::Any, sync::Arc};

use crate::columns::AnyValue;

/// Ordered list of the distinct values of a categorical column. Slot `0` is always `None` and
/// represents the missing value. Dictionaries are frozen together with their column and shared
/// immutably between the column and any readers or projections derived from it.
#[derive(Debug)]
pub struct Dictionary<T> {
    values: Vec<Option<Arc<T>>>,
}

impl<T> Dictionary<T> {
    pub(crate) fn new(values: Vec<Option<Arc<T>>>) -> Self {
        debug_assert!(!values.is_empty() && values[0].is_none());
        Dictionary { values }
    }

    /// Number of slots, including the missing slot at index `0`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if the dictionary holds nothing besides the reserved missing slot.
    pub fn is_empty(&self) -> bool {
        self.values.len() == 1
    }

    /// Value stored at `index`. `None` for index `0`.
    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.values[index].as_ref()
    }

    /// All slots in index order.
    pub fn values(&self) -> &[Option<Arc<T>>] {
        &self.values
    }
}

/// Type erased access to a dictionary, so columns of arbitrary element types fit one `Column`
/// variant. The typed dictionary is recovered through `as_any`.
pub(crate) trait DictionaryLookup: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    /// Shared handle to the value at `index`, `None` for the missing slot.
    fn value_at(&self, index: usize) -> Option<AnyValue>;
    fn as_any(&self) -> &dyn Any;
    fn element_type_name(&self) -> &'static str;
}

impl<T> DictionaryLookup for Dictionary<T>
where
    T: Send + Sync + std::fmt::Debug + 'static,
{
    fn len(&self) -> usize {
        Dictionary::len(self)
    }

    fn value_at(&self, index: usize) -> Option<AnyValue> {
        self.values[index]
            .as_ref()
            .map(|value| value.clone() as AnyValue)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at_resolves_through_erased_lookup() {
        let dictionary = Dictionary::new(vec![
            None,
            Some(Arc::new("red".to_string())),
            Some(Arc::new("green".to_string())),
        ]);
        let lookup: &dyn DictionaryLookup = &dictionary;
        assert_eq!(3, lookup.len());
        assert!(lookup.value_at(0).is_none());
        let green = lookup.value_at(2).unwrap();
        assert_eq!("green", green.downcast_ref::<String>().unwrap());
    }
}
