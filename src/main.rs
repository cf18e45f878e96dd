// A small host that drives the template output the way the engine would:
// several workers emit samples concurrently until the run is over.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use k6_output_template::config::duration::parse_duration;
use k6_output_template::output::{DEFAULT_LOG_TARGET, Output, Params, TemplateOutput};
use k6_output_template::sample::{Sample, SampleContainer, TagSet};
use k6_output_template::sink::{LogSink, Sink, StdoutSink};
use k6_output_template::util::logging::{self, LogLevel};
use log::{error, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};

/// Where flushed samples go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    Stdout,
    Log,
}

/// Command line arguments for the demo host
#[derive(Parser, Debug)]
#[command(name = "k6-output-template", about = "Feed synthetic samples through the template output")]
struct Args {
    /// Output argument string, e.g. `address=example.com,push_interval=2s`
    #[arg(short, long, default_value = "")]
    out: String,

    /// JSON configuration file for the output
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of concurrent workers emitting samples
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// How long the run lasts
    #[arg(short, long, default_value = "5s", value_parser = parse_duration)]
    duration: Duration,

    /// Iterations per second for each worker
    #[arg(short, long, default_value_t = 10)]
    rate: u32,

    /// Sink flushed samples are written to
    #[arg(long, value_enum, default_value_t = SinkKind::Stdout)]
    sink: SinkKind,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn build_params(args: &Args) -> Result<Params> {
    let mut builder = Params::builder()
        .environment(std::env::vars().collect::<HashMap<_, _>>())
        .config_argument(args.out.clone());

    if let Some(path) = &args.config {
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        builder = builder.json_config(raw);
    }

    let sink: Arc<dyn Sink> = match args.sink {
        SinkKind::Stdout => Arc::new(StdoutSink),
        SinkKind::Log => Arc::new(LogSink::new(DEFAULT_LOG_TARGET)),
    };

    Ok(builder.sink(sink).build())
}

/// One virtual user: runs an iteration every `1 / rate` seconds and reports
/// what it measured
async fn run_worker(
    id: usize,
    rate: u32,
    output: Arc<TemplateOutput>,
    mut done: watch::Receiver<bool>,
) -> Result<u64> {
    let period = Duration::from_secs_f64(1.0 / f64::from(rate.max(1)));
    let mut interval_timer = time::interval(period);
    let mut iterations = 0u64;

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {}
            _ = done.changed() => break,
        }

        let started = Instant::now();
        // Simulated work
        let latency_ms = 5.0 + rand::random::<f64>() * 95.0;
        let tags = TagSet::new()
            .with("vu", id.to_string())
            .with("scenario", "default");

        let container = SampleContainer::new(vec![
            Sample::new("http_req_duration", latency_ms, tags.clone()),
            Sample::new("http_reqs", 1.0, tags.clone().with("status", "200")),
            Sample::new(
                "iteration_duration",
                started.elapsed().as_secs_f64() * 1000.0 + latency_ms,
                tags,
            ),
        ]);

        output.add_samples(vec![container])?;
        iterations += 1;
    }

    Ok(iterations)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_level);

    let params = build_params(&args)?;
    let output = Arc::new(TemplateOutput::new(params).context("Failed to create output")?);

    info!("output: {}", output.description());
    output.start().await.context("Failed to start output")?;

    let (done_tx, done_rx) = watch::channel(false);
    let workers: Vec<_> = (0..args.workers)
        .map(|id| tokio::spawn(run_worker(id, args.rate, Arc::clone(&output), done_rx.clone())))
        .collect();

    tokio::select! {
        _ = time::sleep(args.duration) => info!("Run finished after {:?}", args.duration),
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping"),
    }
    done_tx.send(true)?;

    let mut total = 0;
    let mut test_error: Option<anyhow::Error> = None;
    for worker in workers {
        match worker.await? {
            Ok(iterations) => total += iterations,
            Err(e) => {
                error!("Worker failed: {}", e);
                test_error.get_or_insert(e);
            }
        }
    }
    info!("{} workers ran {} iterations", args.workers, total);

    let test_error = test_error.map(Box::<dyn std::error::Error + Send + Sync>::from);
    output
        .stop_with_test_error(test_error.as_deref())
        .await
        .context("Failed to stop output")?;

    Ok(())
}
