//! Output configuration and its four-layer resolution:
//! defaults, JSON blob, environment, argument string.
pub mod args;
pub mod duration;
pub mod helper;

use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;
use helper::{Field, FieldErrors, Lookup, MapLookup, resolve_field};

/// Default address the output reports to
pub const DEFAULT_ADDRESS: &str = "template";

/// Default interval between two flushes
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable overriding the address
pub const ENV_ADDRESS: &str = "K6_TEMPLATE_ADDRESS";

/// Environment variable overriding the push interval
pub const ENV_PUSH_INTERVAL: &str = "K6_TEMPLATE_PUSH_INTERVAL";

const ENV_ALIASES: &[(Field, &[&str])] = &[
    (Field::Address, &[ENV_ADDRESS]),
    (Field::PushInterval, &[ENV_PUSH_INTERVAL]),
];

const ARG_ALIASES: &[(Field, &[&str])] = &[
    (Field::Address, &["address"]),
    (Field::PushInterval, &["push_interval"]),
];

/// Output configuration. A `None` field is unset and leaves whatever a
/// lower-precedence layer put there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where samples are sent
    pub address: Option<String>,

    /// How often buffered samples are flushed
    #[serde(deserialize_with = "duration::deserialize_opt")]
    pub push_interval: Option<Duration>,
}

impl Config {
    /// The built-in defaults, i.e. the bottom layer of resolution
    pub fn with_defaults() -> Self {
        Self {
            address: Some(DEFAULT_ADDRESS.to_string()),
            push_interval: Some(DEFAULT_PUSH_INTERVAL),
        }
    }

    /// Overlay every field that is set in `other`
    pub fn apply(mut self, other: Config) -> Self {
        if other.address.is_some() {
            self.address = other.address;
        }
        if other.push_interval.is_some() {
            self.push_interval = other.push_interval;
        }
        self
    }

    /// Resolved address, falling back to the default
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    /// Resolved push interval, falling back to the default
    pub fn push_interval(&self) -> Duration {
        self.push_interval.unwrap_or(DEFAULT_PUSH_INTERVAL)
    }
}

/// Decode the JSON layer. A `null` document sets nothing.
pub fn from_json(raw: &[u8]) -> Result<Config, ConfigError> {
    let parsed: Option<Config> = serde_json::from_slice(raw)?;
    Ok(parsed.unwrap_or_default())
}

/// Read every field of `source`, recording bad values in `errors`
fn overlay(source: &dyn Lookup, errors: &mut FieldErrors) -> Config {
    let address = resolve_field(
        source,
        Field::Address,
        |raw| Ok::<_, String>(raw.to_string()),
        errors,
    );
    let push_interval = resolve_field(source, Field::PushInterval, duration::parse_duration, errors);

    Config {
        address,
        push_interval,
    }
}

/// Combine defaults, the JSON blob, the environment snapshot and the
/// argument string, in increasing order of precedence.
///
/// Malformed JSON and a malformed argument string abort immediately. Bad
/// field values don't: every source is still read, and the errors come back
/// together with the config that did resolve.
pub fn resolve(
    json: Option<&[u8]>,
    env: &HashMap<String, String>,
    arg: &str,
) -> Result<Config, ConfigError> {
    let mut result = Config::with_defaults();

    if let Some(raw) = json {
        result = result.apply(from_json(raw)?);
    }

    let arg_pairs = args::parse_arg(arg)?;
    let mut errors = FieldErrors::new();

    let env_lookup = MapLookup::new(env, "environment variable", ENV_ALIASES);
    result = result.apply(overlay(&env_lookup, &mut errors));

    let arg_lookup = MapLookup::new(&arg_pairs, "argument key", ARG_ALIASES);
    result = result.apply(overlay(&arg_lookup, &mut errors));

    if !errors.is_empty() {
        return Err(ConfigError::Fields {
            errors: errors.into_vec(),
            config: Box::new(result),
        });
    }

    debug!("Resolved output config: {:?}", result);

    Ok(result)
}
