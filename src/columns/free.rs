use std::{any::Any, sync::Arc};

use crate::{
    columns::{fill_positions, AnyValue},
    Error,
};

/// Type erased access to a boxed object vector.
pub(crate) trait ObjectArray: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn value_at(&self, row: usize) -> Option<AnyValue>;
    fn as_any(&self) -> &dyn Any;
    fn element_type_name(&self) -> &'static str;
}

#[derive(Debug)]
pub(crate) struct TypedObjects<T> {
    pub(crate) values: Vec<Option<Arc<T>>>,
}

impl<T> ObjectArray for TypedObjects<T>
where
    T: Send + Sync + std::fmt::Debug + 'static,
{
    fn len(&self) -> usize {
        self.values.len()
    }

    fn value_at(&self, row: usize) -> Option<AnyValue> {
        self.values[row]
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

/// Erases a typed object vector for storage inside a [`FreeColumn`].
pub(crate) fn free_objects<T>(values: Vec<Option<Arc<T>>>) -> Arc<dyn ObjectArray>
where
    T: Send + Sync + std::fmt::Debug + 'static,
{
    Arc::new(TypedObjects { values })
}

/// Column of boxed element values of one declared type. Rows hold shared handles or nothing.
/// The numeric view of a free column is `NaN` everywhere; its object view hands out clones of
/// the stored handles.
#[derive(Debug, Clone)]
pub struct FreeColumn {
    values: Arc<dyn ObjectArray>,
}

impl FreeColumn {
    pub(crate) fn new(values: Arc<dyn ObjectArray>) -> Self {
        FreeColumn { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Object value stored at `row`.
    pub fn value_at(&self, row: usize) -> Option<AnyValue> {
        self.values.value_at(row)
    }

    /// Name of the element type this column has been created with.
    pub fn element_type_name(&self) -> &'static str {
        self.values.element_type_name()
    }

    /// Typed view on the stored values.
    ///
    /// Fails with [`Error::ElementTypeMismatch`] if the column stores a different element type.
    pub fn typed<T>(&self) -> Result<&[Option<Arc<T>>], Error>
    where
        T: Send + Sync + std::fmt::Debug + 'static,
    {
        let typed = self
            .values
            .as_any()
            .downcast_ref::<TypedObjects<T>>()
            .ok_or_else(|| Error::ElementTypeMismatch {
                stored: self.values.element_type_name(),
                requested: std::any::type_name::<T>(),
            })?;
        Ok(&typed.values)
    }

    pub(crate) fn fill_objects(
        &self,
        dst: &mut [Option<AnyValue>],
        start_row: usize,
        offset: usize,
        stride: usize,
    ) {
        for (target, row) in fill_positions(dst.len(), self.len(), start_row, offset, stride) {
            dst[target] = self.values.value_at(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_view_recovers_element_type() {
        let column = FreeColumn::new(Arc::new(TypedObjects {
            values: vec![Some(Arc::new(42i64)), None],
        }));
        let values = column.typed::<i64>().unwrap();
        assert_eq!(42, *values[0].as_ref().unwrap().as_ref());
        assert!(values[1].is_none());
        assert!(matches!(
            column.typed::<String>(),
            Err(Error::ElementTypeMismatch { .. })
        ));
    }
}
