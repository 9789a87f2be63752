use std::{collections::HashMap, convert::Infallible, fmt, sync::Arc};

use tracing::{debug, error, instrument};

use crate::{
    config::{EndpointConfig, URI_SCHEME},
    driver::DataSource,
    error::{DbResult, Error},
    exchange::{Body, Exchange},
    exec::{BatchExecutor, CompletionBinding, Execution, Janitor, Payload},
};

/// Creates [`Endpoint`]s over a registry of named data sources.
#[derive(Default)]
pub struct Component {
    data_sources: HashMap<String, Arc<dyn DataSource>>,
}

impl Component {
    pub fn new() -> Component {
        Component::default()
    }

    /// Registers a data source under the given name, replacing any previous
    /// one.
    pub fn register(&mut self, name: impl Into<String>, data_source: Arc<dyn DataSource>) {
        self.data_sources.insert(name.into(), data_source);
    }

    /// Creates the endpoint described by an URI of the form
    /// `sqlbatch:<data source>?<parameters>`.
    ///
    /// The data source must have been registered.
    pub fn create_endpoint(&self, uri: &str) -> DbResult<Endpoint> {
        let rest = uri
            .strip_prefix(URI_SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| {
                Error::InvalidConfig(format!("expected a `{URI_SCHEME}:` uri, got `{uri}`").into())
            })?;
        let rest = rest.trim_start_matches("//");
        let (name, query) = rest.split_once('?').unwrap_or((rest, ""));

        let data_source = self
            .data_sources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDataSource(name.to_owned()))?;
        let config = EndpointConfig::from_query(query)?;
        debug!(uri, mode = %config.output_mode, "created endpoint");

        Ok(Endpoint::new(uri, data_source, config))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("data_sources", &self.data_sources.keys())
            .finish()
    }
}

/// A configured access point to a data source.
#[derive(Clone)]
pub struct Endpoint {
    uri: String,
    data_source: Arc<dyn DataSource>,
    config: EndpointConfig,
}

impl Endpoint {
    pub fn new(
        uri: impl Into<String>,
        data_source: Arc<dyn DataSource>,
        config: EndpointConfig,
    ) -> Endpoint {
        Endpoint {
            uri: uri.into(),
            data_source,
            config,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EndpointConfig {
        &mut self.config
    }

    /// An endpoint is shared by all its producers.
    pub fn is_singleton(&self) -> bool {
        true
    }

    /// Creates a producer with the endpoint's current configuration.
    pub fn create_producer(&self) -> Producer {
        Producer {
            data_source: Arc::clone(&self.data_source),
            executor: BatchExecutor::new(self.config.output_mode),
        }
    }

    /// Always fails: endpoints can't be consumed from.
    pub fn create_consumer(&self) -> DbResult<Infallible> {
        Err(Error::Unsupported("an endpoint can't be consumed from"))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("uri", &self.uri)
            .field("config", &self.config)
            .finish()
    }
}

/// Runs the script carried by an exchange.
#[derive(Clone)]
pub struct Producer {
    data_source: Arc<dyn DataSource>,
    executor: BatchExecutor,
}

impl Producer {
    /// Executes the script in the exchange input body and sets the result of
    /// its last result-producing statement as the output body. The input
    /// headers are copied to the output.
    ///
    /// For a streamed result the connection stays open; its release is
    /// registered as a completion of the exchange.
    #[instrument(name = "Producer", level = "debug", skip_all)]
    pub fn process(&self, exchange: &mut Exchange) -> DbResult<()> {
        let input = exchange.input();
        let Some(script) = input.body.as_text() else {
            return Err(Error::InvalidBody {
                expected: "text",
                actual: input.body.kind(),
            });
        };
        let script = script.to_owned();
        let headers = input.headers.clone();

        let mut connection = self.data_source.connection().map_err(|error| {
            error!(%error, "failed to acquire a connection");
            Error::ConnectionAcquisition(error)
        })?;

        let Execution {
            payload,
            close_connection,
        } = match self.executor.execute(&script, &mut *connection) {
            Ok(execution) => execution,
            Err(error) => {
                Janitor::with_connection(connection).close_connection();
                return Err(error);
            }
        };

        match &payload {
            Some(Payload::Stream(iter)) if !close_connection => {
                let binding = CompletionBinding::new(iter, connection);
                exchange.add_on_completion(Box::new(binding));
            }
            _ => Janitor::with_connection(connection).close_connection(),
        }

        let output = exchange.output_mut();
        output.headers.extend(headers);
        if let Some(payload) = payload {
            output.body = Body::from(payload);
        }
        Ok(())
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("executor", &self.executor)
            .finish()
    }
}
