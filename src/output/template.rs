use async_trait::async_trait;
use log::{debug, error, warn};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::{Output, Params};
use crate::buffer::SampleBuffer;
use crate::config::{self, Config};
use crate::error::{OutputError, Result};
use crate::flusher::PeriodicFlusher;
use crate::sample::SampleContainer;
use crate::sink::Sink;

/// Lifecycle of an output. `Stopped` is terminal.
enum State {
    Created,
    Started(PeriodicFlusher),
    Stopped,
}

/// An output that buffers samples and writes them to a sink every push
/// interval
pub struct TemplateOutput {
    config: Config,
    buffer: Arc<SampleBuffer>,
    sink: Arc<dyn Sink>,
    log_target: String,
    state: Mutex<State>,
}

impl TemplateOutput {
    /// Resolve the configuration from the engine's parameters and create the
    /// output. Nothing is started yet.
    pub fn new(params: Params) -> Result<Self> {
        let Params {
            json_config,
            environment,
            config_argument,
            log_target,
            sink,
        } = params;

        let config = config::resolve(json_config.as_deref(), &environment, &config_argument)
            .inspect_err(|e| {
                error!(target: log_target.as_str(), "Invalid template output config: {}", e)
            })?;

        Ok(Self {
            config,
            buffer: Arc::new(SampleBuffer::new()),
            sink,
            log_target,
            state: Mutex::new(State::Created),
        })
    }

    /// Get the resolved configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of samples waiting for the next flush
    pub fn buffered_samples(&self) -> Result<usize> {
        self.buffer.sample_count()
    }
}

#[async_trait]
impl Output for TemplateOutput {
    fn description(&self) -> String {
        format!("template: {}", self.config.address())
    }

    async fn start(&self) -> Result<()> {
        let target = self.log_target.as_str();
        debug!(target: target, "Starting...");

        let mut state = self.state.lock().await;
        match *state {
            State::Created => {}
            State::Started(_) => return Err(OutputError::AlreadyStarted),
            State::Stopped => return Err(OutputError::Stopped),
        }

        // This is where a real output would connect to its backend

        let buffer = Arc::clone(&self.buffer);
        let sink = Arc::clone(&self.sink);
        let flush_target = self.log_target.clone();
        let flusher = PeriodicFlusher::new(self.config.push_interval(), move || {
            flush_metrics(&buffer, sink.as_ref(), &flush_target);
        })?;

        debug!(target: target, "Started! Flushing every {:?}", flusher.period());
        *state = State::Started(flusher);

        Ok(())
    }

    fn add_samples(&self, containers: Vec<SampleContainer>) -> Result<()> {
        self.buffer.add(containers)
    }

    async fn stop_with_test_error(
        &self,
        test_error: Option<&(dyn Error + Send + Sync)>,
    ) -> Result<()> {
        let target = self.log_target.as_str();

        let mut state = self.state.lock().await;
        let flusher = match std::mem::replace(&mut *state, State::Stopped) {
            State::Started(flusher) => flusher,
            State::Created => {
                *state = State::Created;
                return Err(OutputError::NotStarted);
            }
            State::Stopped => return Err(OutputError::Stopped),
        };

        debug!(target: target, "Stopping...");
        if let Some(err) = test_error {
            debug!(target: target, "Test run ended with error: {}", err);
        }

        flusher.stop().await?;
        debug!(target: target, "Stopped!");

        Ok(())
    }
}

/// Drain the buffer and write every sample to the sink.
///
/// Sink failures are logged and otherwise ignored.
fn flush_metrics(buffer: &SampleBuffer, sink: &dyn Sink, target: &str) -> usize {
    let containers = match buffer.drain() {
        Ok(containers) => containers,
        Err(e) => {
            error!(target: target, "Failed to drain sample buffer: {}", e);
            return 0;
        }
    };

    let start = Instant::now();
    let mut count = 0;

    for container in &containers {
        count += container.len();
        for sample in container.samples() {
            if let Err(e) = sink.write_line(&sample.to_line()) {
                warn!(target: target, "Failed to write sample to {}: {}", sink.name(), e);
            }
        }
    }

    if count > 0 {
        debug!(
            target: target,
            "Wrote {} metrics to {} in {:?}",
            count,
            sink.name(),
            start.elapsed()
        );
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ENV_ADDRESS, ENV_PUSH_INTERVAL};
    use crate::error::ConfigError;
    use crate::sample::{Sample, TagSet};
    use crate::sink::MemorySink;
    use std::time::Duration;
    use tokio::time;

    fn output(arg: &str) -> (TemplateOutput, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new("test"));
        let params = Params::builder()
            .config_argument(arg)
            .sink(sink.clone())
            .build();
        (TemplateOutput::new(params).unwrap(), sink)
    }

    fn container(metric: &str, value: f64) -> SampleContainer {
        Sample::new(metric, value, TagSet::new().with("scenario", "default")).into()
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn write_line(&self, _line: &str) -> Result<()> {
            Err(OutputError::Sink("unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_description() {
        let (out, _) = output("example.com");
        assert_eq!(out.description(), "template: example.com");

        let (out, _) = output("");
        assert_eq!(out.description(), "template: template");
    }

    #[test]
    fn test_new_resolves_all_sources() {
        let params = Params::builder()
            .json_config(r#"{"address": "json", "push_interval": "3s"}"#)
            .env_var(ENV_PUSH_INTERVAL, "4ms")
            .config_argument("address=arg")
            .build();
        let out = TemplateOutput::new(params).unwrap();

        assert_eq!(out.config().address(), "arg");
        assert_eq!(out.config().push_interval(), Duration::from_millis(4));
    }

    #[test]
    fn test_new_reports_config_error() {
        let params = Params::builder()
            .env_var(ENV_ADDRESS, "somewhere")
            .env_var(ENV_PUSH_INTERVAL, "4something")
            .build();

        match TemplateOutput::new(params) {
            Err(OutputError::Config(err @ ConfigError::Fields { .. })) => {
                assert!(err.to_string().contains("unknown unit \"something\""));
                assert_eq!(err.partial_config().unwrap().address(), "somewhere");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_flushes_buffer() {
        let (out, sink) = output("push_interval=1s");
        out.start().await.unwrap();

        out.add_samples(vec![container("http_reqs", 1.0), container("vus", 10.0)])
            .unwrap();
        assert_eq!(out.buffered_samples().unwrap(), 2);

        time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            sink.lines().unwrap(),
            vec![
                "http_reqs=1.00000,{scenario=default}",
                "vus=10.00000,{scenario=default}"
            ]
        );
        assert_eq!(out.buffered_samples().unwrap(), 0);

        out.stop().await.unwrap();
        assert_eq!(sink.len().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_flushes_samples_since_last_tick() {
        let (out, sink) = output("push_interval=1s");
        out.start().await.unwrap();

        time::sleep(Duration::from_millis(1500)).await;
        assert!(sink.is_empty().unwrap());

        out.add_samples(vec![container("iterations", 1.0)]).unwrap();
        out.stop().await.unwrap();

        assert_eq!(sink.lines().unwrap(), vec!["iterations=1.00000,{scenario=default}"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_after_stop_are_not_flushed() {
        let (out, sink) = output("push_interval=1s");
        out.start().await.unwrap();
        out.stop().await.unwrap();

        out.add_samples(vec![container("late", 1.0)]).unwrap();
        time::sleep(Duration::from_secs(5)).await;

        assert!(sink.is_empty().unwrap());
        assert_eq!(out.buffered_samples().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (out, _) = output("");

        assert!(matches!(out.stop().await, Err(OutputError::NotStarted)));
        out.start().await.unwrap();
        assert!(matches!(out.start().await, Err(OutputError::AlreadyStarted)));
        out.stop().await.unwrap();
        assert!(matches!(out.stop().await, Err(OutputError::Stopped)));
        assert!(matches!(out.start().await, Err(OutputError::Stopped)));
    }

    #[tokio::test]
    async fn test_zero_interval_fails_start() {
        let (out, _) = output("push_interval=0s");

        assert!(matches!(out.start().await, Err(OutputError::TimerInit(_))));
        assert!(matches!(out.stop().await, Err(OutputError::NotStarted)));
    }

    #[tokio::test]
    async fn test_stop_with_test_error() {
        let (out, sink) = output("");
        out.start().await.unwrap();
        out.add_samples(vec![container("checks", 0.0)]).unwrap();

        let test_error: Box<dyn Error + Send + Sync> = "thresholds crossed".into();
        out.stop_with_test_error(Some(test_error.as_ref()))
            .await
            .unwrap();

        assert_eq!(sink.len().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_all_flushed() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;

        let (out, sink) = output("push_interval=5ms");
        let out = Arc::new(out);
        out.start().await.unwrap();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let out = Arc::clone(&out);
                tokio::spawn(async move {
                    for seq in 0..PER_PRODUCER {
                        let tags = TagSet::new()
                            .with("producer", producer.to_string())
                            .with("seq", seq.to_string());
                        out.add_samples(vec![Sample::new("iterations", 1.0, tags).into()])
                            .unwrap();
                        if seq % 50 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.await.unwrap();
        }
        out.stop().await.unwrap();

        let lines = sink.lines().unwrap();
        assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);
        let unique: std::collections::HashSet<&String> = lines.iter().collect();
        assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER);
    }

    /// Keeps the messages of records filed under [`RECORDED_TARGET`]
    struct RecordingLogger;

    const RECORDED_TARGET: &str = "template_output_lifecycle";

    static RECORDED: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());

    impl log::Log for RecordingLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.target() == RECORDED_TARGET
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                RECORDED.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    fn recorded() -> Vec<String> {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            log::set_logger(&RecordingLogger).unwrap();
            log::set_max_level(log::LevelFilter::Trace);
        });
        RECORDED.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_rejected_stop_logs_nothing() {
        recorded();
        let params = Params::builder()
            .log_target(RECORDED_TARGET)
            .sink(Arc::new(MemorySink::new("test")))
            .build();
        let out = TemplateOutput::new(params).unwrap();

        assert!(matches!(out.stop().await, Err(OutputError::NotStarted)));
        assert!(!recorded().iter().any(|m| m.starts_with("Stopping")));

        out.start().await.unwrap();
        out.stop().await.unwrap();
        assert!(matches!(out.stop().await, Err(OutputError::Stopped)));

        let messages = recorded();
        let stopping = messages.iter().filter(|m| m.starts_with("Stopping")).count();
        let stopped = messages.iter().filter(|m| m.starts_with("Stopped!")).count();
        assert_eq!((stopping, stopped), (1, 1));
        assert!(messages.iter().any(|m| m.starts_with("Started! Flushing every 1s")));
    }

    #[test]
    fn test_flush_ignores_sink_failures() {
        let buffer = SampleBuffer::new();
        buffer
            .add(vec![container("a", 1.0), container("b", 2.0)])
            .unwrap();

        let count = flush_metrics(&buffer, &FailingSink, "test");

        assert_eq!(count, 2);
        assert!(buffer.is_empty().unwrap());
    }

    #[test]
    fn test_flush_empty_buffer() {
        let sink = MemorySink::new("test");
        assert_eq!(flush_metrics(&SampleBuffer::new(), &sink, "test"), 0);
        assert!(sink.is_empty().unwrap());
    }
}
