//! The single-string form of the output configuration: `key=value,key=value`
//! or just a bare address.
use std::collections::HashMap;

use crate::error::ConfigError;

/// Keys accepted in the argument string
pub const ARG_KEYS: [&str; 2] = ["address", "push_interval"];

/// Key the whole string is assigned to when it contains no `=`
pub const SHORTHAND_KEY: &str = "address";

/// Split an argument string into its key/value pairs.
///
/// An empty string yields no pairs. Unknown keys and pairs without `=` are
/// rejected here, before any value is looked at.
pub fn parse_arg(arg: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut pairs = HashMap::new();

    if arg.is_empty() {
        return Ok(pairs);
    }

    if !arg.contains('=') {
        pairs.insert(SHORTHAND_KEY.to_string(), arg.to_string());
        return Ok(pairs);
    }

    for pair in arg.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidArgument(arg.to_string()))?;

        if !ARG_KEYS.iter().any(|known| *known == key) {
            return Err(ConfigError::UnknownArgumentKey(key.to_string()));
        }

        pairs.insert(key.to_string(), value.to_string());
    }

    Ok(pairs)
}
