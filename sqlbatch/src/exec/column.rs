use std::collections::BTreeSet;

use crate::{
    driver::{Cursor, SqlType},
    error::DriverResult,
    exec::{row::Row, value::Value},
};

/// How a column value is extracted from the cursor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Read in the value's native representation.
    Scalar,
    /// Read in string form, so that no large object handle outlives the row.
    LargeObject,
}

impl ColumnKind {
    /// Returns the extraction policy for a column of the given type.
    pub fn of(ty: SqlType) -> ColumnKind {
        if ty.is_large_object() {
            ColumnKind::LargeObject
        } else {
            ColumnKind::Scalar
        }
    }
}

/// A result set column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// The column label.
    pub name: String,
    /// The 1-based column position.
    pub ordinal: usize,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    /// Reads this column's value at the cursor's current row.
    pub fn extract(&self, cursor: &dyn Cursor) -> DriverResult<Value> {
        match self.kind {
            ColumnKind::Scalar => cursor.value(self.ordinal),
            ColumnKind::LargeObject => cursor.string(self.ordinal).map(Value::from),
        }
    }
}

/// The ordered, fixed-size set of columns of an executed statement.
///
/// It is derived once from the cursor metadata and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    inner: Box<[ColumnDescriptor]>,
}

impl Columns {
    /// Reads the cursor metadata. Fails on the first metadata error.
    pub fn from_cursor(cursor: &dyn Cursor) -> DriverResult<Columns> {
        let count = cursor.column_count()?;
        let inner = (1..=count)
            .map(|ordinal| {
                Ok(ColumnDescriptor {
                    name: cursor.column_label(ordinal)?,
                    ordinal,
                    kind: ColumnKind::of(cursor.column_type(ordinal)?),
                })
            })
            .collect::<DriverResult<_>>()?;
        Ok(Columns { inner })
    }

    /// Builds a row from the cursor's current position.
    pub fn read_row(&self, cursor: &dyn Cursor) -> DriverResult<Row> {
        let mut row = Row::with_capacity(self.inner.len());
        for column in self.iter() {
            row.set(column.name.clone(), column.extract(cursor)?);
        }
        Ok(row)
    }

    /// Returns a new set with the column labels.
    pub fn names(&self) -> BTreeSet<String> {
        self.iter().map(|column| column.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
