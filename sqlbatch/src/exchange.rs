use std::{collections::BTreeMap, fmt, mem};

use tracing::debug;

use crate::exec::{Row, RowIterator};

/// The payload of a [`Message`].
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    /// A materialized result.
    Rows(Vec<Row>),
    /// A streamed result.
    Stream(RowIterator),
}

impl Body {
    /// Returns the name of the body variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Text(_) => "text",
            Body::Rows(_) => "rows",
            Body::Stream(_) => "stream",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Takes the body, leaving [`Body::Empty`] in its place.
    pub fn take(&mut self) -> Body {
        mem::take(self)
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Body::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<RowIterator> {
        match self {
            Body::Stream(iter) => Some(iter),
            _ => None,
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Body {
        Body::Text(text.to_owned())
    }
}

/// A message: headers and a body.
#[derive(Debug, Default)]
pub struct Message {
    pub headers: BTreeMap<String, String>,
    pub body: Body,
}

impl Message {
    pub fn new(body: impl Into<Body>) -> Message {
        Message {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Message {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A callback fired once the processing of an [`Exchange`] is over.
///
/// Exactly one of the two methods is called, exactly once.
pub trait Synchronization: Send {
    /// The exchange was processed successfully.
    fn on_complete(self: Box<Self>);

    /// The exchange processing failed or was abandoned.
    fn on_failure(self: Box<Self>);
}

/// A request/reply unit of work.
///
/// Completion callbacks registered with [`Exchange::add_on_completion`] run
/// when [`Exchange::complete`] or [`Exchange::fail`] is called. An exchange
/// dropped before that is considered abandoned, and its callbacks run as
/// failures.
pub struct Exchange {
    input: Message,
    output: Message,
    completions: Vec<Box<dyn Synchronization>>,
}

impl Exchange {
    pub fn new(input: Message) -> Exchange {
        Exchange {
            input,
            output: Message::default(),
            completions: Vec::new(),
        }
    }

    pub fn input(&self) -> &Message {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Message {
        &mut self.input
    }

    pub fn output(&self) -> &Message {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Message {
        &mut self.output
    }

    /// Registers a callback to run once the exchange is done.
    pub fn add_on_completion(&mut self, sync: Box<dyn Synchronization>) {
        self.completions.push(sync);
    }

    /// Number of callbacks that have not run yet.
    pub fn pending_completions(&self) -> usize {
        self.completions.len()
    }

    /// Marks the exchange as successfully processed.
    pub fn complete(&mut self) {
        self.done(true);
    }

    /// Marks the exchange as failed.
    pub fn fail(&mut self) {
        self.done(false);
    }

    fn done(&mut self, success: bool) {
        let completions = mem::take(&mut self.completions);
        debug!(success, count = completions.len(), "running completions");
        for sync in completions {
            if success {
                sync.on_complete();
            } else {
                sync.on_failure();
            }
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        if !self.completions.is_empty() {
            debug!("exchange abandoned");
            self.done(false);
        }
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("pending_completions", &self.completions.len())
            .finish()
    }
}
