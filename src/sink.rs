//! Destinations for flushed samples
use log::info;
use std::io::Write;
use std::sync::RwLock;

use crate::error::{OutputError, Result};

/// Somewhere flushed sample lines are written to
pub trait Sink: Send + Sync + 'static {
    /// Write one formatted sample line
    fn write_line(&self, line: &str) -> Result<()>;

    /// Get a name for this sink
    fn name(&self) -> &str;
}

/// Writes every line to the process standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_line(&self, line: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// Writes every line through the logger at info level
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Sink for LogSink {
    fn write_line(&self, line: &str) -> Result<()> {
        info!(target: self.target.as_str(), "{}", line);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Keeps every line in memory, for hosts that want to inspect what was flushed
pub struct MemorySink {
    lines: RwLock<Vec<String>>,
    name: String,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lines: RwLock::new(Vec::new()),
            name: name.into(),
        }
    }

    /// Every line written so far
    pub fn lines(&self) -> Result<Vec<String>> {
        let lines = self
            .lines
            .read()
            .map_err(|_| OutputError::Sink("Lock poisoned".to_string()))?;
        Ok(lines.clone())
    }

    /// Remove and return every line written so far
    pub fn take(&self) -> Result<Vec<String>> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| OutputError::Sink("Lock poisoned".to_string()))?;
        Ok(std::mem::take(&mut *lines))
    }

    pub fn len(&self) -> Result<usize> {
        let lines = self
            .lines
            .read()
            .map_err(|_| OutputError::Sink("Lock poisoned".to_string()))?;
        Ok(lines.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Sink for MemorySink {
    fn write_line(&self, line: &str) -> Result<()> {
        let mut lines = self
            .lines
            .write()
            .map_err(|_| OutputError::Sink("Lock poisoned".to_string()))?;
        lines.push(line.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_lines() {
        let sink = MemorySink::new("test");
        sink.write_line("a=1.00000,{}").unwrap();
        sink.write_line("b=2.00000,{}").unwrap();

        assert_eq!(sink.len().unwrap(), 2);
        assert_eq!(sink.lines().unwrap(), vec!["a=1.00000,{}", "b=2.00000,{}"]);
        assert_eq!(sink.take().unwrap().len(), 2);
        assert!(sink.is_empty().unwrap());
    }

    #[test]
    fn test_sink_names() {
        assert_eq!(StdoutSink.name(), "stdout");
        assert_eq!(LogSink::new("k6_output_template").name(), "log");
        assert_eq!(MemorySink::new("captured").name(), "captured");
    }

    #[test]
    fn test_log_sink_never_fails() {
        assert!(LogSink::new("k6_output_template").write_line("x=1.00000,{}").is_ok());
    }
}
