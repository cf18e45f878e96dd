//! The contract between the engine and an output, and the template output
//! implementing it
mod params;
mod template;

pub use params::{DEFAULT_LOG_TARGET, Params, ParamsBuilder};
pub use template::TemplateOutput;

use async_trait::async_trait;
use std::error::Error;

use crate::error::Result;
use crate::sample::SampleContainer;

/// An output receives samples from the engine for the length of a test run
#[async_trait]
pub trait Output: Send + Sync + 'static {
    /// Human readable description shown when the test starts
    fn description(&self) -> String;

    /// Prepare the output before the engine starts emitting samples
    async fn start(&self) -> Result<()>;

    /// Hand samples over to the output. Called concurrently from many workers.
    fn add_samples(&self, containers: Vec<SampleContainer>) -> Result<()>;

    /// Flush what is left and shut down, given how the test run ended
    async fn stop_with_test_error(
        &self,
        test_error: Option<&(dyn Error + Send + Sync)>,
    ) -> Result<()>;

    /// Shut down after a test run without error
    async fn stop(&self) -> Result<()> {
        self.stop_with_test_error(None).await
    }
}
