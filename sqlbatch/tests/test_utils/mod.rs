use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use sqlbatch::{
    driver::{Connection, Cursor, DataSource, SqlType, Statement},
    error::{DriverError, DriverResult},
    exec::Value,
};

/// Sets up tracing subscriber.
#[allow(dead_code)]
pub fn setup_tracing(level: Option<&str>) {
    use tracing_subscriber::{
        fmt::{format::FmtSpan, layer},
        layer::SubscriberExt,
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter_layer = level
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or("warn".into()));
    let fmt_layer = layer().with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

/// Runs `f` with a subscriber that records every event emitted on the
/// current thread, and returns them along with the result of `f`.
#[allow(dead_code)]
pub fn capture_events<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    use tracing_subscriber::layer::SubscriberExt;

    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventRecorder(Arc::clone(&events)));
    let result = tracing::subscriber::with_default(subscriber, f);

    let events = std::mem::take(&mut *events.lock().unwrap());
    (result, events)
}

/// An event recorded by [`capture_events`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub message: String,
}

struct EventRecorder(Arc<Mutex<Vec<CapturedEvent>>>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventRecorder {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// A result set definition.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<(String, SqlType)>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: &[(&str, SqlType)]) -> Table {
        Table {
            columns: columns
                .iter()
                .map(|&(name, ty)| (name.to_owned(), ty))
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: impl IntoIterator<Item = Value>) -> Table {
        self.rows.push(values.into_iter().collect());
        self
    }
}

/// A failure to inject in the fake driver.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Connect,
    CreateStatement,
    /// Reading the column types fails.
    Metadata,
    /// The n-th call to `advance` (0-based) of any cursor fails.
    Advance(usize),
    /// Reading any value of the n-th row (0-based) fails.
    Read(usize),
    CloseCursor,
    CloseStatement,
    CloseConnection,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Table>,
    faults: HashSet<Fault>,
    next_id: u32,
    open: Vec<String>,
    events: Vec<String>,
}

impl State {
    fn open(&mut self, kind: &str) -> u32 {
        self.next_id += 1;
        let handle = format!("{kind}#{}", self.next_id);
        self.events.push(format!("open {handle}"));
        self.open.push(handle);
        self.next_id
    }

    fn close(&mut self, kind: &str, id: u32, fault: Fault) -> DriverResult<()> {
        let handle = format!("{kind}#{id}");
        match self.open.iter().position(|open| *open == handle) {
            Some(i) => {
                self.open.remove(i);
                self.events.push(format!("close {handle}"));
            }
            None => self.events.push(format!("double close {handle}")),
        }
        if self.faults.contains(&fault) {
            return Err(DriverError::new(format!("failed to close {handle}")));
        }
        Ok(())
    }
}

/// An in-memory scripted database.
///
/// Statements registered with [`FakeDb::table`] produce a result set; any
/// other `SELECT` fails, and any other statement starting with a known
/// keyword succeeds without a result set. Everything else is a syntax error.
#[derive(Clone, Default)]
pub struct FakeDb {
    state: Arc<Mutex<State>>,
}

#[allow(dead_code)]
impl FakeDb {
    pub fn new() -> FakeDb {
        FakeDb::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Registers the result of the given query.
    pub fn table(self, sql: &str, table: Table) -> FakeDb {
        self.state().tables.insert(sql.to_owned(), table);
        self
    }

    pub fn fault(self, fault: Fault) -> FakeDb {
        self.state().faults.insert(fault);
        self
    }

    /// Handles that were opened and not closed yet, such as `cursor#3`.
    pub fn open_handles(&self) -> Vec<String> {
        self.state().open.clone()
    }

    pub fn is_open(&self, kind: &str) -> bool {
        self.state().open.iter().any(|handle| handle.starts_with(kind))
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    /// Counts the events starting with the given prefix.
    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .events
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }

    /// The executed statements, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| event.strip_prefix("execute "))
            .map(str::to_owned)
            .collect()
    }

    /// Asserts that every handle was closed exactly once.
    pub fn assert_all_closed(&self) {
        let state = self.state();
        assert!(state.open.is_empty(), "open handles: {:?}", state.open);
        assert!(
            !state.events.iter().any(|event| event.starts_with("double")),
            "events: {:?}",
            state.events
        );
    }
}

impl DataSource for FakeDb {
    fn connection(&self) -> DriverResult<Box<dyn Connection>> {
        let mut state = self.state();
        if state.faults.contains(&Fault::Connect) {
            return Err(DriverError::new("connection refused").with_sql_state("08001"));
        }
        let id = state.open("connection");
        Ok(Box::new(FakeConnection {
            db: self.clone(),
            id,
        }))
    }
}

struct FakeConnection {
    db: FakeDb,
    id: u32,
}

impl Connection for FakeConnection {
    fn create_statement(&mut self) -> DriverResult<Box<dyn Statement>> {
        let mut state = self.db.state();
        if state.faults.contains(&Fault::CreateStatement) {
            return Err(DriverError::new("too many statements"));
        }
        let id = state.open("statement");
        Ok(Box::new(FakeStatement {
            db: self.db.clone(),
            id,
            pending: None,
        }))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.db
            .state()
            .close("connection", self.id, Fault::CloseConnection)
    }
}

struct FakeStatement {
    db: FakeDb,
    id: u32,
    pending: Option<Table>,
}

const KEYWORDS: &[&str] = &["SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "SET"];

impl Statement for FakeStatement {
    fn execute(&mut self, sql: &str) -> DriverResult<bool> {
        let mut state = self.db.state();
        state.events.push(format!("execute {sql}"));

        if let Some(table) = state.tables.get(sql) {
            self.pending = Some(table.clone());
            return Ok(true);
        }
        self.pending = None;

        let keyword = sql.split_whitespace().next().unwrap_or_default().to_uppercase();
        match keyword.as_str() {
            "SELECT" | "WITH" => Err(DriverError::new(format!("unknown query `{sql}`"))),
            keyword if KEYWORDS.contains(&keyword) => Ok(false),
            _ => Err(DriverError::new(format!("syntax error near `{keyword}`")).with_sql_state("42000")),
        }
    }

    fn result_set(&mut self) -> DriverResult<Box<dyn Cursor>> {
        let table = self
            .pending
            .take()
            .ok_or_else(|| DriverError::new("no result set"))?;
        let id = self.db.state().open("cursor");
        Ok(Box::new(FakeCursor {
            db: self.db.clone(),
            id,
            table,
            position: None,
            advances: 0,
        }))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.db
            .state()
            .close("statement", self.id, Fault::CloseStatement)
    }
}

struct FakeCursor {
    db: FakeDb,
    id: u32,
    table: Table,
    position: Option<usize>,
    advances: usize,
}

impl FakeCursor {
    fn column(&self, ordinal: usize) -> DriverResult<&(String, SqlType)> {
        self.table
            .columns
            .get(ordinal.wrapping_sub(1))
            .ok_or_else(|| DriverError::new(format!("invalid column index {ordinal}")))
    }

    fn current(&self, ordinal: usize) -> DriverResult<&Value> {
        let position = self
            .position
            .filter(|&position| position < self.table.rows.len())
            .ok_or_else(|| DriverError::new("cursor is not on a row"))?;
        if self.db.state().faults.contains(&Fault::Read(position)) {
            return Err(DriverError::new(format!("failed to read row {position}")));
        }
        self.column(ordinal)?;
        Ok(&self.table.rows[position][ordinal - 1])
    }
}

impl Cursor for FakeCursor {
    fn column_count(&self) -> DriverResult<usize> {
        Ok(self.table.columns.len())
    }

    fn column_label(&self, ordinal: usize) -> DriverResult<String> {
        Ok(self.column(ordinal)?.0.clone())
    }

    fn column_type(&self, ordinal: usize) -> DriverResult<SqlType> {
        if self.db.state().faults.contains(&Fault::Metadata) {
            return Err(DriverError::new("metadata unavailable"));
        }
        Ok(self.column(ordinal)?.1)
    }

    fn advance(&mut self) -> DriverResult<bool> {
        let call = self.advances;
        self.advances += 1;
        if self.db.state().faults.contains(&Fault::Advance(call)) {
            return Err(DriverError::new("connection lost while fetching"));
        }
        let next = self.position.map_or(0, |position| position + 1);
        self.position = Some(next);
        Ok(next < self.table.rows.len())
    }

    fn value(&self, ordinal: usize) -> DriverResult<Value> {
        if self.column(ordinal)?.1.is_large_object() {
            return Err(DriverError::new("large object handles are not supported"));
        }
        self.current(ordinal).cloned()
    }

    fn string(&self, ordinal: usize) -> DriverResult<Option<String>> {
        Ok(match self.current(ordinal)? {
            Value::Null => None,
            value => Some(value.to_string()),
        })
    }

    fn close(&mut self) -> DriverResult<()> {
        self.db.state().close("cursor", self.id, Fault::CloseCursor)
    }
}

/// The `t` table, with three rows.
#[allow(dead_code)]
pub fn people() -> Table {
    Table::new(&[("id", SqlType::Integer), ("name", SqlType::Varchar)])
        .row([Value::Int(1), Value::from("ada")])
        .row([Value::Int(2), Value::from("grace")])
        .row([Value::Int(3), Value::from("edsger")])
}

/// A single-row, single-column result.
#[allow(dead_code)]
pub fn one() -> Table {
    Table::new(&[("1", SqlType::Integer)]).row([Value::Int(1)])
}
