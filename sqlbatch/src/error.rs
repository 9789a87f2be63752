use std::borrow::Cow;

pub type DbResult<T, E = Error> = Result<T, E>;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Could not obtain a connection from the data source. Nothing was
    /// executed.
    #[error("failed to acquire a connection")]
    ConnectionAcquisition(#[source] DriverError),

    /// A statement of the batch failed; the remaining statements were skipped.
    #[error("failed to execute statement `{sql}`")]
    StatementExecution {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// Reading the cursor metadata or extracting a row's values failed.
    #[error("row processing failed")]
    RowProcessing(#[source] DriverError),

    /// `next` was called on an exhausted row iterator.
    #[error("row iterator is exhausted")]
    IteratorExhausted,

    /// The operation is not supported.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// No data source registered under the given name.
    #[error("no data source named `{0}`")]
    UnknownDataSource(String),

    /// Invalid endpoint URI or configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    /// The exchange body has not the expected type.
    #[error("invalid body: expected {expected}, but found {actual}")]
    InvalidBody {
        expected: &'static str,
        actual: &'static str,
    },
}

/// An error reported by a database driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    message: Cow<'static, str>,
    sql_state: Option<String>,
}

impl DriverError {
    /// Creates a new driver error with the given message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> DriverError {
        DriverError {
            message: message.into(),
            sql_state: None,
        }
    }

    /// Attaches a SQLSTATE code to the error.
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> DriverError {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }
}
