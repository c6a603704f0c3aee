//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific console implementation.

use carafe_schema::AppName;

/// Progress and status sink for the install pipeline.
pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Fetching", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of an archive download.
    fn fetching(&self, name: &str, current: u64, total: Option<u64>);

    /// An archive's digest matched the recipe.
    fn verified(&self, name: &str);

    /// The isolated environment for an application is being created.
    fn building_env(&self, app: &AppName);

    /// One archive is being installed into the environment.
    fn installing(&self, app: &AppName, what: &str);

    /// The post-install check is running.
    fn checking(&self, app: &AppName);

    /// An application is being removed.
    fn removing(&self, app: &AppName);

    /// Marks an operation as successfully completed.
    fn done(&self, name: &str, detail: &str);

    /// Marks an operation as failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn fetching(&self, name: &str, current: u64, total: Option<u64>) {
        (**self).fetching(name, current, total);
    }
    fn verified(&self, name: &str) {
        (**self).verified(name);
    }
    fn building_env(&self, app: &AppName) {
        (**self).building_env(app);
    }
    fn installing(&self, app: &AppName, what: &str) {
        (**self).installing(app, what);
    }
    fn checking(&self, app: &AppName) {
        (**self).checking(app);
    }
    fn removing(&self, app: &AppName) {
        (**self).removing(app);
    }
    fn done(&self, name: &str, detail: &str) {
        (**self).done(name, detail);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &str, _: u64, _: Option<u64>) {}
    fn verified(&self, _: &str) {}
    fn building_env(&self, _: &AppName) {}
    fn installing(&self, _: &AppName, _: &str) {}
    fn checking(&self, _: &AppName) {}
    fn removing(&self, _: &AppName) {}
    fn done(&self, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
