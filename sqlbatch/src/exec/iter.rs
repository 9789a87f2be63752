use std::{
    collections::BTreeSet,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::{debug, instrument};

use crate::{
    driver::{Cursor, Statement},
    error::{DbResult, Error},
    exec::{column::Columns, janitor::Janitor, row::Row},
};

/// State shared between an iterator and its [`IteratorCloser`]s.
struct Shared {
    /// Set once the iterator reaches its terminal state.
    closed: AtomicBool,
    /// Owns the cursor and the statement. Never the connection.
    janitor: Mutex<Janitor>,
}

impl Shared {
    fn janitor(&self) -> MutexGuard<'_, Janitor> {
        self.janitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("closing row iterator");
            self.janitor().close_results();
        }
    }
}

/// A lazy, one-pass sequence of rows over a live cursor.
///
/// The iterator owns the cursor and the statement that produced it, and closes
/// both as soon as the cursor runs out of rows, a read fails, or
/// [`RowIterator::close`] is called. The connection is never touched; it is
/// owned by whoever registered the iterator's cleanup (see
/// [`CompletionBinding`](crate::exec::CompletionBinding)).
///
/// The first row is fetched on construction, so an empty result set yields an
/// iterator that is already exhausted and closed.
///
/// Besides [`RowIterator::next_row`], rows may be consumed through the
/// [`Iterator`] implementation, which yields a failure at most once and then
/// ends.
pub struct RowIterator {
    columns: Columns,
    shared: Arc<Shared>,
}

impl RowIterator {
    /// Wraps the given cursor, reading its column metadata and fetching the
    /// first row.
    pub fn new(cursor: Box<dyn Cursor>, statement: Box<dyn Statement>) -> DbResult<RowIterator> {
        match Columns::from_cursor(&*cursor) {
            Ok(columns) => RowIterator::with_columns(columns, cursor, statement),
            Err(error) => {
                Janitor::with_results(cursor, statement).close_results();
                Err(Error::RowProcessing(error))
            }
        }
    }

    /// Same as [`RowIterator::new`], but with an already derived column set.
    pub(crate) fn with_columns(
        columns: Columns,
        cursor: Box<dyn Cursor>,
        statement: Box<dyn Statement>,
    ) -> DbResult<RowIterator> {
        let iter = RowIterator {
            columns,
            shared: Arc::new(Shared {
                closed: AtomicBool::new(false),
                janitor: Mutex::new(Janitor::with_results(cursor, statement)),
            }),
        };
        iter.load_next()?;
        Ok(iter)
    }

    /// Checks whether there is a row left to be returned.
    pub fn has_next(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire)
    }

    /// Returns the current row and advances the cursor.
    ///
    /// Fails with [`Error::IteratorExhausted`] if there are no rows left. A
    /// read failure closes the iterator and is reported as
    /// [`Error::RowProcessing`].
    #[instrument(name = "RowIteratorNext", level = "trace", skip_all)]
    pub fn next_row(&mut self) -> DbResult<Row> {
        if !self.has_next() {
            return Err(Error::IteratorExhausted);
        }

        let read = {
            let janitor = self.shared.janitor();
            // The cursor is gone if a closer won the race since the check.
            let read = janitor.cursor().map(|cursor| self.columns.read_row(cursor));
            read
        };

        match read {
            Some(Ok(row)) => {
                self.load_next()?;
                Ok(row)
            }
            Some(Err(error)) => {
                self.close();
                Err(Error::RowProcessing(error))
            }
            None => Err(Error::IteratorExhausted),
        }
    }

    /// Always fails: a database result is read-only.
    pub fn remove(&mut self) -> DbResult<()> {
        Err(Error::Unsupported("cannot remove from a database result"))
    }

    /// Returns a new set with the column labels.
    pub fn column_names(&self) -> BTreeSet<String> {
        self.columns.names()
    }

    /// Closes the cursor and the statement. Calling it again, or after the
    /// iterator is exhausted, does nothing.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Returns a handle that may close this iterator from elsewhere, such as
    /// another thread or a completion callback.
    pub fn closer(&self) -> IteratorCloser {
        IteratorCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Advances the cursor, closing the iterator once there are no more rows.
    fn load_next(&self) -> DbResult<()> {
        let advanced = {
            let mut janitor = self.shared.janitor();
            let advanced = match janitor.cursor_mut() {
                Some(cursor) => cursor.advance(),
                None => Ok(false),
            };
            advanced
        };

        match advanced {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.close();
                Ok(())
            }
            Err(error) => {
                self.close();
                Err(Error::RowProcessing(error))
            }
        }
    }
}

impl Iterator for RowIterator {
    type Item = DbResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        match self.next_row() {
            Err(Error::IteratorExhausted) => None,
            result => Some(result),
        }
    }
}

impl fmt::Debug for RowIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIterator")
            .field("columns", &self.columns.names())
            .field("exhausted", &!self.has_next())
            .finish()
    }
}

/// Closes the cursor and the statement of a [`RowIterator`] without holding
/// the iterator itself.
#[derive(Clone)]
pub struct IteratorCloser {
    shared: Arc<Shared>,
}

impl IteratorCloser {
    /// See [`RowIterator::close`].
    pub fn close(&self) {
        self.shared.close();
    }

    /// Checks whether the iterator reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for IteratorCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratorCloser")
            .field("closed", &self.is_closed())
            .finish()
    }
}
