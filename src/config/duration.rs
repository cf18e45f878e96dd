//! Duration strings as accepted in every config source
use std::time::Duration;

use humantime::DurationError;
use serde::de::{self, Deserializer, Visitor};

/// Parse a duration string such as `"2s"`, `"4ms"` or `"1h30m"`.
///
/// A bare number, e.g. `"250"` or `"1.5"`, is taken as milliseconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return trimmed
            .parse::<f64>()
            .map_err(|e| format!("invalid duration {:?}: {}", input, e))
            .and_then(|ms| {
                let nanos = (ms * 1_000_000.0).round();
                if !nanos.is_finite() || nanos > u64::MAX as f64 {
                    return Err(format!("invalid duration {:?}: out of range", input));
                }
                Ok(Duration::from_nanos(nanos as u64))
            });
    }

    humantime::parse_duration(trimmed).map_err(|e| describe(input, e))
}

fn describe(input: &str, err: DurationError) -> String {
    match err {
        DurationError::UnknownUnit { unit, .. } if unit.is_empty() => {
            format!("missing unit in duration {:?}", input)
        }
        DurationError::UnknownUnit { unit, .. } => {
            format!("unknown unit {:?} in duration {:?}", unit, input)
        }
        DurationError::Empty => "empty duration".to_string(),
        other => format!("invalid duration {:?}: {}", input, other),
    }
}

/// Deserialize an optional duration from either a duration string or a
/// number of milliseconds.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Option<Duration>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a duration string or a number of milliseconds")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_duration(v).map(Some).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(|ms| Some(Duration::from_millis(ms)))
                .map_err(|_| E::custom(format!("negative duration {}ms", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if !v.is_finite() || v < 0.0 {
                return Err(E::custom(format!("invalid duration {}ms", v)));
            }
            Ok(Some(Duration::from_secs_f64(v / 1000.0)))
        }
    }

    deserializer.deserialize_option(DurationVisitor)
}
