//! Shared installation context.
//!
//! Groups the state threaded through every operation: the HTTP client pool
//! and the progress reporter.

use std::sync::Arc;
use std::time::Duration;

use crate::Reporter;
use crate::ui::ConsoleReporter;

/// Groups common state used during install operations.
#[derive(Clone)]
pub struct Context {
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context with the standard client and a console reporter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(quiet: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(carafe_core::USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            reporter: Arc::new(ConsoleReporter::new(quiet)),
        })
    }
}
