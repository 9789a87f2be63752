//! Database driver interface.
//!
//! These traits describe the handles a driver hands out: a [`DataSource`]
//! yields open [`Connection`]s, a connection creates [`Statement`]s and a
//! statement exposes the result set it produced as a [`Cursor`]. All handles
//! are owned and `Send`, so a cursor may outlive the call that opened it and
//! be consumed on another thread.
//!
//! Every `close` method must tolerate being called on an already closed
//! handle. The crate itself never calls `close` twice on the same handle.

use crate::{error::DriverResult, exec::Value};

/// A source of database connections.
pub trait DataSource: Send + Sync {
    /// Returns an open connection. The caller owns it and must close it.
    fn connection(&self) -> DriverResult<Box<dyn Connection>>;
}

/// An open database connection.
pub trait Connection: Send {
    /// Creates a statement handle bound to this connection.
    fn create_statement(&mut self) -> DriverResult<Box<dyn Statement>>;

    /// Closes the connection.
    fn close(&mut self) -> DriverResult<()>;
}

/// A statement handle, reusable across several executions.
pub trait Statement: Send {
    /// Executes the given SQL. Returns `true` if it produced a result set,
    /// which may then be fetched using [`Statement::result_set`].
    fn execute(&mut self, sql: &str) -> DriverResult<bool>;

    /// Returns the cursor over the result set produced by the last execution.
    fn result_set(&mut self) -> DriverResult<Box<dyn Cursor>>;

    /// Closes the statement.
    fn close(&mut self) -> DriverResult<()>;
}

/// A live, forward-only cursor over a result set.
///
/// The cursor starts *before* the first row; [`Cursor::advance`] must be called
/// before any value may be read. Column ordinals are 1-based.
pub trait Cursor: Send {
    /// Number of columns of the result set.
    fn column_count(&self) -> DriverResult<usize>;

    /// The column label, i.e., its alias if one was given.
    fn column_label(&self, ordinal: usize) -> DriverResult<String>;

    /// The declared SQL type of the column.
    fn column_type(&self, ordinal: usize) -> DriverResult<SqlType>;

    /// Moves to the next row. Returns `false` once there are no more rows.
    fn advance(&mut self) -> DriverResult<bool>;

    /// Reads the value of the column in its native representation.
    fn value(&self, ordinal: usize) -> DriverResult<Value>;

    /// Reads the value of the column in its string representation. `None`
    /// stands for SQL `NULL`.
    fn string(&self, ordinal: usize) -> DriverResult<Option<String>>;

    /// Closes the cursor.
    fn close(&mut self) -> DriverResult<()>;
}

/// Declared SQL type of a result set column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Varchar,
    Date,
    Time,
    Timestamp,
    Binary,
    /// Character large object.
    Clob,
    /// Binary large object.
    Blob,
    /// A driver-specific type, identified by its vendor code.
    Other(i32),
}

impl SqlType {
    /// Checks whether values of this type are large objects.
    pub fn is_large_object(self) -> bool {
        matches!(self, SqlType::Clob | SqlType::Blob)
    }
}
