// src/error.rs
use std::fmt;
use std::io;
use thiserror::Error;

use crate::config::Config;

/// Result type used throughout the output
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors raised by the output lifecycle
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timer error: {0}")]
    TimerInit(String),

    #[error("Flusher error: {0}")]
    Flusher(String),

    #[error("Output has already been started")]
    AlreadyStarted,

    #[error("Output has not been started")]
    NotStarted,

    #[error("Output has already been stopped")]
    Stopped,

    #[error("Buffer error: {0}")]
    Buffer(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors produced while resolving the output configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The JSON blob could not be decoded
    #[error("couldn't parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A pair in the argument string has no `=`
    #[error("couldn't parse {0:?} as argument for template output")]
    InvalidArgument(String),

    /// The argument string names a key we don't know
    #[error("unknown key {0:?} as argument for template output")]
    UnknownArgumentKey(String),

    /// One or more fields failed to parse. Resolution still ran to completion,
    /// `config` holds everything that did resolve.
    #[error("{}", join_field_errors(.errors))]
    Fields {
        errors: Vec<FieldError>,
        config: Box<Config>,
    },
}

impl ConfigError {
    /// The partially resolved config, if resolution got that far
    pub fn partial_config(&self) -> Option<&Config> {
        match self {
            ConfigError::Fields { config, .. } => Some(config),
            _ => None,
        }
    }
}

/// A single value that failed to parse, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Human readable origin, e.g. `environment variable "K6_TEMPLATE_ADDRESS"`
    pub source: String,
    pub message: String,
}

impl FieldError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {}", self.source, self.message)
    }
}

impl std::error::Error for FieldError {}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
