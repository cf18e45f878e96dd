//! Per-source lookups and the error accumulator used while resolving config.
use std::collections::HashMap;

use crate::error::FieldError;

/// Fields of the output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Address,
    PushInterval,
}

/// A flat key/value configuration source
pub trait Lookup {
    /// Names this source knows the field under, in priority order
    fn names(&self, field: Field) -> &[&str];

    /// Raw value stored under `name`
    fn get(&self, name: &str) -> Option<&str>;

    /// Describe where `name` came from, for error messages
    fn describe(&self, name: &str) -> String;
}

/// A lookup over a string map, e.g. an environment snapshot or a parsed
/// argument string
pub struct MapLookup<'a> {
    values: &'a HashMap<String, String>,
    kind: &'static str,
    aliases: &'a [(Field, &'a [&'a str])],
}

impl<'a> MapLookup<'a> {
    pub fn new(
        values: &'a HashMap<String, String>,
        kind: &'static str,
        aliases: &'a [(Field, &'a [&'a str])],
    ) -> Self {
        Self {
            values,
            kind,
            aliases,
        }
    }
}

impl Lookup for MapLookup<'_> {
    fn names(&self, field: Field) -> &[&str] {
        self.aliases
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn describe(&self, name: &str) -> String {
        format!("{} {:?}", self.kind, name)
    }
}

/// Collects field errors so that every bad value is reported in one go
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.errors
    }
}

/// Look `field` up under each of its names in `source`.
///
/// The first name that is present and parses wins, but every name is still
/// parsed so that a bad value under a later alias is recorded in `errors`.
/// An empty value counts as not set.
pub fn resolve_field<T, P>(
    source: &dyn Lookup,
    field: Field,
    parse: P,
    errors: &mut FieldErrors,
) -> Option<T>
where
    P: Fn(&str) -> Result<T, String>,
{
    let mut resolved = None;

    for name in source.names(field) {
        let Some(raw) = source.get(name).filter(|raw| !raw.is_empty()) else {
            continue;
        };

        match parse(raw) {
            Ok(value) => {
                if resolved.is_none() {
                    resolved = Some(value);
                }
            }
            Err(message) => errors.push(FieldError::new(source.describe(name), message)),
        }
    }

    resolved
}
