//! Samples as handed over by the engine
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tags attached to a sample, kept in key order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        f.write_str("}")
    }
}

/// A single metric observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Name of the metric this is a value of
    pub metric: String,
    pub value: f64,
    pub tags: TagSet,
    pub time: DateTime<Utc>,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn new(metric: impl Into<String>, value: f64, tags: TagSet) -> Self {
        Self {
            metric: metric.into(),
            value,
            tags,
            time: Utc::now(),
        }
    }

    /// The line written to the sink for this sample
    pub fn to_line(&self) -> String {
        format!("{}={:.5},{}", self.metric, self.value, self.tags)
    }
}

/// A group of samples the engine emits together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleContainer {
    samples: Vec<Sample>,
}

impl SampleContainer {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Sample> for SampleContainer {
    fn from(sample: Sample) -> Self {
        Self::new(vec![sample])
    }
}

impl From<Vec<Sample>> for SampleContainer {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let tags = TagSet::new().with("status", "200").with("method", "GET");
        let sample = Sample::new("http_req_duration", 12.345, tags);

        assert_eq!(
            sample.to_line(),
            "http_req_duration=12.34500,{method=GET, status=200}"
        );
    }

    #[test]
    fn test_line_without_tags() {
        let sample = Sample::new("vus", 3.0, TagSet::new());
        assert_eq!(sample.to_line(), "vus=3.00000,{}");
    }

    #[test]
    fn test_tags_from_pairs() {
        let tags: TagSet = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("b"), Some("2"));
        assert_eq!(tags.iter().next(), Some(("a", "1")));
    }
}
