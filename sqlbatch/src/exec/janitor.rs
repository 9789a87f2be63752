use tracing::{debug, warn};

use crate::{
    driver::{Connection, Cursor, Statement},
    error::DriverResult,
};

/// A driver handle that may be released.
trait Resource {
    const KIND: &'static str;

    fn close(&mut self) -> DriverResult<()>;
}

impl Resource for Box<dyn Cursor> {
    const KIND: &'static str = "cursor";

    fn close(&mut self) -> DriverResult<()> {
        (**self).close()
    }
}

impl Resource for Box<dyn Statement> {
    const KIND: &'static str = "statement";

    fn close(&mut self) -> DriverResult<()> {
        (**self).close()
    }
}

impl Resource for Box<dyn Connection> {
    const KIND: &'static str = "connection";

    fn close(&mut self) -> DriverResult<()> {
        (**self).close()
    }
}

/// Closes the resource in the slot, if any. Close errors are logged and
/// swallowed; the slot is left empty in any case.
fn close_quietly<R: Resource>(slot: &mut Option<R>) {
    let Some(mut resource) = slot.take() else {
        return;
    };
    match resource.close() {
        Ok(()) => debug!(resource = R::KIND, "closed"),
        Err(error) => warn!(resource = R::KIND, %error, "error while closing resource"),
    }
}

/// Holds the cursor, statement and connection handles of an execution and
/// releases them.
///
/// Each handle is closed at most once: closing takes it out of its slot, so
/// every `close_*` method is idempotent. Failures never escape.
#[derive(Default)]
pub struct Janitor {
    cursor: Option<Box<dyn Cursor>>,
    statement: Option<Box<dyn Statement>>,
    connection: Option<Box<dyn Connection>>,
}

impl Janitor {
    /// Creates a janitor owning only a connection.
    pub fn with_connection(connection: Box<dyn Connection>) -> Janitor {
        Janitor {
            connection: Some(connection),
            ..Janitor::default()
        }
    }

    /// Creates a janitor owning the handles of an open result set.
    pub fn with_results(cursor: Box<dyn Cursor>, statement: Box<dyn Statement>) -> Janitor {
        Janitor {
            cursor: Some(cursor),
            statement: Some(statement),
            connection: None,
        }
    }

    pub fn cursor(&self) -> Option<&dyn Cursor> {
        self.cursor.as_deref()
    }

    pub fn cursor_mut(&mut self) -> Option<&mut (dyn Cursor + 'static)> {
        self.cursor.as_deref_mut()
    }

    pub fn statement_mut(&mut self) -> Option<&mut (dyn Statement + 'static)> {
        self.statement.as_deref_mut()
    }

    pub fn connection_mut(&mut self) -> Option<&mut (dyn Connection + 'static)> {
        self.connection.as_deref_mut()
    }

    /// Replaces the current cursor. A previous cursor is closed first.
    pub fn set_cursor(&mut self, cursor: Box<dyn Cursor>) {
        self.close_cursor();
        self.cursor = Some(cursor);
    }

    pub fn set_statement(&mut self, statement: Box<dyn Statement>) {
        self.close_statement();
        self.statement = Some(statement);
    }

    /// Gives up the ownership of the cursor and the statement.
    pub fn take_results(&mut self) -> Option<(Box<dyn Cursor>, Box<dyn Statement>)> {
        match (self.cursor.take(), self.statement.take()) {
            (Some(cursor), Some(statement)) => Some((cursor, statement)),
            (cursor, statement) => {
                self.cursor = cursor;
                self.statement = statement;
                None
            }
        }
    }

    /// Gives up the ownership of the connection.
    pub fn take_connection(&mut self) -> Option<Box<dyn Connection>> {
        self.connection.take()
    }

    pub fn close_cursor(&mut self) {
        close_quietly(&mut self.cursor);
    }

    pub fn close_statement(&mut self) {
        close_quietly(&mut self.statement);
    }

    pub fn close_connection(&mut self) {
        close_quietly(&mut self.connection);
    }

    /// Closes the cursor, then the statement.
    pub fn close_results(&mut self) {
        self.close_cursor();
        self.close_statement();
    }

    /// Closes the cursor, then the statement, then the connection.
    pub fn close_all(&mut self) {
        self.close_results();
        self.close_connection();
    }
}
