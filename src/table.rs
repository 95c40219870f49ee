//! Tables tie labelled columns of one height together and hand out transformers over them.

use std::{fmt, sync::Arc};

use log::debug;

use crate::{
    columns::Column,
    transform::{MultiTransformer, Transformer},
    Error,
};

/// Ordered collection of labelled columns sharing one height. Tables are cheap to clone; the
/// columns are shared, not copied.
///
/// ```
/// use coltable::{buffers::RealBuffer, Context, Table};
///
/// let mut prices = RealBuffer::new(3);
/// prices.set(0, 1.5);
/// prices.set(1, 2.5);
/// prices.set(2, 4.0);
/// let table = Table::builder(3).add("price", prices)?.build();
/// assert_eq!(3, table.height());
/// let total = table.transform("price")?.reduce(0.0, |a, b| a + b, &Context::new())?;
/// assert_eq!(8.0, total);
/// # Ok::<_, coltable::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    height: usize,
    labels: Vec<String>,
    columns: Vec<Arc<Column>>,
}

impl Table {
    /// Starts building a table of the given height.
    pub fn builder(height: usize) -> TableBuilder {
        TableBuilder {
            height,
            labels: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Number of rows shared by all columns.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column labels in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Column by label.
    pub fn column(&self, label: &str) -> Result<&Column, Error> {
        let index = self.index_of(label)?;
        Ok(&self.columns[index])
    }

    /// Column by position.
    pub fn column_at(&self, index: usize) -> Result<&Column, Error> {
        self.columns
            .get(index)
            .map(Arc::as_ref)
            .ok_or(Error::ColumnIndexOutOfRange {
                index,
                width: self.columns.len(),
            })
    }

    /// Starts a transformation over the column with the given label.
    pub fn transform(&self, label: &str) -> Result<Transformer<'_>, Error> {
        Ok(Transformer::new(self.column(label)?))
    }

    /// Starts a transformation over the column at the given position.
    pub fn transform_at(&self, index: usize) -> Result<Transformer<'_>, Error> {
        Ok(Transformer::new(self.column_at(index)?))
    }

    /// Starts a row wise transformation over the columns with the given labels, in the given
    /// order.
    pub fn transform_multi(&self, labels: &[&str]) -> Result<MultiTransformer<'_>, Error> {
        let columns = labels
            .iter()
            .map(|label| self.column(label))
            .collect::<Result<Vec<_>, _>>()?;
        MultiTransformer::new(columns)
    }

    /// Starts a row wise transformation over the columns at the given positions, in the given
    /// order.
    pub fn transform_multi_at(&self, indices: &[usize]) -> Result<MultiTransformer<'_>, Error> {
        let columns = indices
            .iter()
            .map(|&index| self.column_at(index))
            .collect::<Result<Vec<_>, _>>()?;
        MultiTransformer::new(columns)
    }

    fn index_of(&self, label: &str) -> Result<usize, Error> {
        self.labels
            .iter()
            .position(|candidate| candidate == label)
            .ok_or_else(|| Error::UnknownLabel {
                label: label.to_string(),
            })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table ({}x{})", self.width(), self.height())
    }
}

/// Builder assembling a [`Table`] column by column. Buffers are sealed into columns of their
/// natural type on the way in.
#[derive(Debug)]
pub struct TableBuilder {
    height: usize,
    labels: Vec<String>,
    columns: Vec<Arc<Column>>,
}

impl TableBuilder {
    /// Adds a labelled column. Accepts columns as well as open buffers, which are sealed into
    /// their natural column type.
    ///
    /// Fails if the label is already taken or the column height does not match the table.
    pub fn add(mut self, label: impl Into<String>, column: impl Into<Column>) -> Result<Self, Error> {
        let label = label.into();
        let column = column.into();
        if self.labels.contains(&label) {
            return Err(Error::DuplicateLabel { label });
        }
        if column.len() != self.height {
            return Err(Error::HeightMismatch {
                label,
                expected: self.height,
                actual: column.len(),
            });
        }
        self.labels.push(label);
        self.columns.push(Arc::new(column));
        Ok(self)
    }

    /// Finishes the table. All validation has already happened while adding columns.
    pub fn build(self) -> Table {
        debug!(
            "Built table with {} columns of height {}.",
            self.columns.len(),
            self.height
        );
        Table {
            height: self.height,
            labels: self.labels,
            columns: self.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buffers::{AnyCategoricalBuffer, RealBuffer},
        format::IntegerFormat,
    };

    fn sample_table() -> Table {
        let mut prices = RealBuffer::new(3);
        prices.set(0, 1.0);
        prices.set(1, 2.0);
        prices.set(2, 3.0);
        let mut kinds = AnyCategoricalBuffer::new(3, IntegerFormat::U8);
        kinds.set(0, Some("a".to_string())).unwrap();
        kinds.set(1, Some("b".to_string())).unwrap();
        kinds.set(2, Some("a".to_string())).unwrap();
        Table::builder(3)
            .add("price", prices)
            .unwrap()
            .add("kind", kinds)
            .unwrap()
            .build()
    }

    #[test]
    fn labels_resolve_to_columns() {
        let table = sample_table();
        assert_eq!(2, table.width());
        assert_eq!(3, table.height());
        assert_eq!(&["price".to_string(), "kind".to_string()], table.labels());
        assert_eq!(3, table.column("price").unwrap().len());
        assert!(matches!(
            table.column("absent"),
            Err(Error::UnknownLabel { .. })
        ));
        assert!(table.column_at(1).is_ok());
        assert!(matches!(
            table.column_at(2),
            Err(Error::ColumnIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let result = Table::builder(1)
            .add("x", RealBuffer::new(1))
            .unwrap()
            .add("x", RealBuffer::new(1));
        assert!(matches!(result, Err(Error::DuplicateLabel { .. })));
    }

    #[test]
    fn height_mismatches_are_rejected() {
        let result = Table::builder(2).add("x", RealBuffer::new(3));
        assert!(matches!(result, Err(Error::HeightMismatch { .. })));
    }

    #[test]
    fn display_reports_the_shape() {
        assert_eq!("Table (2x3)", sample_table().to_string());
    }
}
