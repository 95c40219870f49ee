use thiserror::Error as ThisError;

use crate::{columns::Capabilities, format::IntegerFormat};

#[derive(Debug, ThisError)]
/// Error type used to indicate that a request made to the engine could not be satisfied. All
/// validation performed by the public entry points reports through this type. Violations of
/// documented usage contracts (e.g. writing to a frozen buffer) are considered programming errors
/// and panic instead, see the `# Panics` sections of the individual methods.
pub enum Error {
    /// A label has been used for more than one column of the same table.
    #[error(
        "The label '{label}' is used for more than one column. Labels must be unique within a \
        table."
    )]
    DuplicateLabel { label: String },
    /// A column added to a table builder does not match the height the table has been created
    /// with.
    #[error(
        "The column '{label}' has {actual} rows, but the table is built for a height of \
        {expected} rows. All columns of a table must share the same height."
    )]
    HeightMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    /// A column has been requested by a label the table does not contain.
    #[error("No column labelled '{label}' exists in this table.")]
    UnknownLabel { label: String },
    /// A column has been requested by an index outside of the table width.
    #[error("Column index {index} is out of range for a table of width {width}.")]
    ColumnIndexOutOfRange { index: usize, width: usize },
    /// A transformation has been started over an empty column selection.
    #[error("At least one column must be selected for a transformation.")]
    EmptySelection,
    /// A buffer has been asked to seal itself into a column whose type belongs to a different
    /// storage category.
    #[error(
        "A {flavor} buffer cannot be sealed into a column of type {requested}. The requested \
        type belongs to a different storage category than the buffer."
    )]
    TypeMismatch {
        flavor: &'static str,
        requested: &'static str,
    },
    /// Writing a value to a categorical buffer would grow the dictionary beyond the capacity of
    /// the buffer's integer format.
    #[error(
        "More than {max} different values. The format {format:?} cannot hold additional \
        categories. Use a wider integer format for this buffer."
    )]
    TooManyCategories { format: IntegerFormat, max: u32 },
    /// An operation requires a view the column does not support.
    #[error(
        "The column does not support the view required by this operation. Required capabilities: \
        {required:?}."
    )]
    MissingCapability { required: Capabilities },
    /// A categorical-only operation has been invoked on a column of a different category.
    #[error("This operation is only supported by categorical columns.")]
    NotCategorical,
    /// A typed access to dictionary or object data requested a different element type than the
    /// one the column stores.
    #[error(
        "The column stores elements of type '{stored}', not of the requested type \
        '{requested}'."
    )]
    ElementTypeMismatch {
        stored: &'static str,
        requested: &'static str,
    },
    /// The context reported cancellation before all batches were dispatched. Batches already in
    /// flight have run to completion, but the overall result is discarded.
    #[error("The computation has been cancelled through its execution context.")]
    Cancelled,
}
