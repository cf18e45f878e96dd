use std::collections::HashMap;
use std::sync::Arc;

use crate::sink::{Sink, StdoutSink};

/// Log target used when the engine doesn't name one
pub const DEFAULT_LOG_TARGET: &str = "k6_output_template";

/// Everything the engine hands to an output when constructing it
#[derive(Clone)]
pub struct Params {
    /// Raw JSON configuration, if any was given
    pub json_config: Option<Vec<u8>>,

    /// Snapshot of the process environment
    pub environment: HashMap<String, String>,

    /// The `--out template=...` argument string
    pub config_argument: String,

    /// Log target all of the output's log records are filed under
    pub log_target: String,

    /// Where flushed samples go
    pub sink: Arc<dyn Sink>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            json_config: None,
            environment: HashMap::new(),
            config_argument: String::new(),
            log_target: DEFAULT_LOG_TARGET.to_string(),
            sink: Arc::new(StdoutSink),
        }
    }
}

impl Params {
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::new()
    }
}

/// Builder for output parameters
pub struct ParamsBuilder {
    params: Params,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    pub fn json_config(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.params.json_config = Some(raw.into());
        self
    }

    pub fn environment(mut self, environment: HashMap<String, String>) -> Self {
        self.params.environment = environment;
        self
    }

    /// Set a single environment variable
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.environment.insert(key.into(), value.into());
        self
    }

    pub fn config_argument(mut self, arg: impl Into<String>) -> Self {
        self.params.config_argument = arg.into();
        self
    }

    pub fn log_target(mut self, target: impl Into<String>) -> Self {
        self.params.log_target = target.into();
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.params.sink = sink;
        self
    }

    pub fn build(self) -> Params {
        self.params
    }
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
