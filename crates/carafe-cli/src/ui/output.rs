//! Plain-line console reporter.
//!
//! Implements [`Reporter`] with one status line per event. Download
//! progress is collapsed to a single announcement per archive; this tool
//! installs a handful of small sdists, not gigabyte artifacts, so a live
//! progress bar would be noise.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::Reporter;
use carafe_schema::AppName;

/// Console implementation of [`Reporter`].
#[derive(Debug)]
pub struct ConsoleReporter {
    quiet: bool,
    announced: Mutex<HashSet<String>>,
}

impl ConsoleReporter {
    /// Create a reporter; `quiet` suppresses everything but warnings and
    /// errors.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            announced: Mutex::new(HashSet::new()),
        }
    }

    fn line(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        self.line(&format!("==> {title}"));
    }

    fn fetching(&self, name: &str, _current: u64, _total: Option<u64>) {
        let mut announced = self.announced.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if announced.insert(format!("fetch:{name}")) {
            self.line(&format!("    fetching {name}"));
        }
    }

    fn verified(&self, name: &str) {
        let mut announced = self.announced.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if announced.insert(format!("verify:{name}")) {
            self.line(&format!("    verified {name}"));
        }
    }

    fn building_env(&self, app: &AppName) {
        self.line(&format!("==> Building environment for {app}"));
    }

    fn installing(&self, _app: &AppName, what: &str) {
        self.line(&format!("    installing {what}"));
    }

    fn checking(&self, app: &AppName) {
        self.line(&format!("==> Checking {app}"));
    }

    fn removing(&self, app: &AppName) {
        self.line(&format!("==> Removing {app}"));
    }

    fn done(&self, name: &str, detail: &str) {
        self.line(&format!("   OK: {name} {detail}"));
    }

    fn failed(&self, name: &str, reason: &str) {
        eprintln!("   FAIL: {name}: {reason}");
    }

    fn info(&self, msg: &str) {
        self.line(msg);
    }

    fn success(&self, msg: &str) {
        self.line(msg);
    }

    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        self.line(&format!(
            "Completed {count} {action}(s) in {elapsed_secs:.1}s"
        ));
    }
}
