use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::{DbResult, Error};

/// Scheme of the endpoint URIs understood by [`Component`](crate::Component).
pub const URI_SCHEME: &str = "sqlbatch";

/// Separator between the statements of a script.
///
/// The split is purely textual: a semicolon inside a string literal or a
/// comment also separates statements.
pub const STATEMENT_SEPARATOR: char = ';';

/// How the result of the last result-producing statement is handed out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum OutputMode {
    /// Drain the cursor into a `Vec<Row>` and release every resource before
    /// returning.
    #[default]
    #[serde(alias = "SelectList")]
    Materialize,
    /// Hand out a lazy [`RowIterator`](crate::exec::RowIterator). Resources are
    /// released by the exchange completion hook.
    #[serde(alias = "StreamList")]
    StreamRows,
}

impl OutputMode {
    /// Returns the canonical name.
    pub fn name(self) -> &'static str {
        match self {
            OutputMode::Materialize => "Materialize",
            OutputMode::StreamRows => "StreamRows",
        }
    }
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> DbResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "materialize" | "selectlist" => Ok(OutputMode::Materialize),
            "streamrows" | "streamlist" => Ok(OutputMode::StreamRows),
            _ => Err(Error::InvalidConfig(
                format!("unknown output mode `{s}`").into(),
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-endpoint configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EndpointConfig {
    pub output_mode: OutputMode,
}

impl EndpointConfig {
    /// Parses the configuration from an URI query string, such as
    /// `outputMode=StreamRows`. Absent parameters keep their default values.
    pub fn from_query(query: &str) -> DbResult<Self> {
        let mut config = EndpointConfig::default();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::InvalidConfig(
                    format!("parameter `{pair}` has no value").into(),
                ));
            };
            config.set(key, value)?;
        }
        Ok(config)
    }

    /// Sets a single parameter.
    pub fn set(&mut self, key: &str, value: &str) -> DbResult<()> {
        match key {
            // `outputType` is the legacy name of the option.
            "outputMode" | "outputType" => self.output_mode = value.parse()?,
            unknown => {
                return Err(Error::InvalidConfig(
                    format!("unknown parameter `{unknown}`").into(),
                ))
            }
        }
        Ok(())
    }
}
