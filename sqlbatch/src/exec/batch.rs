use tracing::{debug, error, info, instrument};

use crate::{
    config::{OutputMode, STATEMENT_SEPARATOR},
    driver::{Connection, Cursor},
    error::{DbResult, DriverError, DriverResult, Error},
    exchange::Body,
    exec::{column::Columns, iter::RowIterator, janitor::Janitor, row::Row},
};

/// Splits a script into its statements.
///
/// The split is textual (see [`STATEMENT_SEPARATOR`]). Statements are trimmed
/// and empty ones are dropped.
pub fn split_script(script: &str) -> Vec<&str> {
    script
        .split(STATEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|sql| !sql.is_empty())
        .collect()
}

/// The result of the last result-producing statement of a script.
#[derive(Debug)]
pub enum Payload {
    Rows(Vec<Row>),
    Stream(RowIterator),
}

impl From<Payload> for Body {
    fn from(payload: Payload) -> Body {
        match payload {
            Payload::Rows(rows) => Body::Rows(rows),
            Payload::Stream(iter) => Body::Stream(iter),
        }
    }
}

/// Outcome of [`BatchExecutor::execute`].
#[derive(Debug)]
pub struct Execution {
    /// `None` if no statement produced a result set.
    pub payload: Option<Payload>,
    /// Whether the caller must close the connection now. It is `false` when
    /// the payload is a stream, whose cleanup must be bound to the exchange
    /// completion instead.
    pub close_connection: bool,
}

/// Executes the statements of a script, in order, over a single connection.
///
/// Every statement runs on the same statement handle. When a statement
/// produces a result set, the executor either drains it
/// ([`OutputMode::Materialize`]) or hands the live cursor, along with the
/// statement handle, to a [`RowIterator`] ([`OutputMode::StreamRows`]). In the
/// latter case execution stops there: the statements following the streamed
/// one are never executed.
///
/// The executor never closes the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchExecutor {
    mode: OutputMode,
}

impl BatchExecutor {
    pub fn new(mode: OutputMode) -> BatchExecutor {
        BatchExecutor { mode }
    }

    /// Executes the given script.
    ///
    /// On failure, the remaining statements are skipped and the cursor and
    /// statement opened so far are closed before the error is returned.
    #[instrument(name = "BatchExecute", level = "debug", skip_all, fields(mode = %self.mode))]
    pub fn execute(&self, script: &str, connection: &mut dyn Connection) -> DbResult<Execution> {
        let statements = split_script(script);
        debug!(count = statements.len(), "split script");

        let mut janitor = Janitor::default();
        let result = self.run(&statements, connection, &mut janitor);
        // Everything that was not handed to a row iterator is released here.
        janitor.close_results();

        if let Err(error) = &result {
            error!(%error, "failed to execute script");
        }
        result
    }

    fn run(
        &self,
        statements: &[&str],
        connection: &mut dyn Connection,
        janitor: &mut Janitor,
    ) -> DbResult<Execution> {
        let mut payload = None;
        let Some(&first) = statements.first() else {
            return Ok(Execution {
                payload,
                close_connection: true,
            });
        };

        let statement = connection
            .create_statement()
            .map_err(|source| execution_error(first, source))?;
        janitor.set_statement(statement);

        for (i, &sql) in statements.iter().enumerate() {
            let Some(statement) = janitor.statement_mut() else {
                break;
            };

            debug!(sql, "executing statement");
            let has_result_set = statement
                .execute(sql)
                .map_err(|source| execution_error(sql, source))?;
            if !has_result_set {
                continue;
            }
            let cursor = statement
                .result_set()
                .map_err(|source| execution_error(sql, source))?;
            janitor.set_cursor(cursor);

            let columns = match janitor.cursor() {
                Some(cursor) => Columns::from_cursor(cursor).map_err(Error::RowProcessing)?,
                None => continue,
            };
            info!(columns = ?columns.names(), "output column names");

            match self.mode {
                OutputMode::Materialize => {
                    let rows = match janitor.cursor_mut() {
                        Some(cursor) => drain(cursor, &columns).map_err(Error::RowProcessing)?,
                        None => Vec::new(),
                    };
                    debug!(rows = rows.len(), "materialized result set");
                    janitor.close_cursor();
                    payload = Some(Payload::Rows(rows));
                }
                OutputMode::StreamRows => {
                    let Some((cursor, statement)) = janitor.take_results() else {
                        break;
                    };
                    let skipped = statements.len() - i - 1;
                    if skipped > 0 {
                        debug!(skipped, "streaming result set; skipping remaining statements");
                    }
                    let iter = RowIterator::with_columns(columns, cursor, statement)?;
                    return Ok(Execution {
                        payload: Some(Payload::Stream(iter)),
                        close_connection: false,
                    });
                }
            }
        }

        Ok(Execution {
            payload,
            close_connection: true,
        })
    }
}

/// Reads all remaining rows of the cursor.
fn drain(cursor: &mut dyn Cursor, columns: &Columns) -> DriverResult<Vec<Row>> {
    let mut rows = Vec::new();
    while cursor.advance()? {
        rows.push(columns.read_row(&*cursor)?);
    }
    Ok(rows)
}

fn execution_error(sql: &str, source: DriverError) -> Error {
    Error::StatementExecution {
        sql: sql.to_owned(),
        source,
    }
}
