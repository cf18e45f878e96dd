//! A template output for a load-testing engine: samples are buffered as the
//! test runs and written to a sink every push interval

pub mod buffer;
pub mod config;
pub mod error;
pub mod flusher;
pub mod output;
pub mod sample;
pub mod sink;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::buffer::SampleBuffer;
    pub use crate::config::{Config, resolve};
    pub use crate::error::{ConfigError, FieldError, OutputError, Result};
    pub use crate::output::{Output, Params, TemplateOutput};
    pub use crate::sample::{Sample, SampleContainer, TagSet};
    pub use crate::sink::{LogSink, MemorySink, Sink, StdoutSink};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
