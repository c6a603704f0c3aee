//! Async archive fetching with streaming SHA-256 verification.
//!
//! Bytes are hashed as they arrive, so by the time a download completes the
//! digest verdict is already known. A mismatch deletes the partial file; the
//! cache can never hold bytes that were not verified against the recipe.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use carafe_schema::Sha256Digest;

/// Bounded retry attempts for transient network failures.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Errors from fetching or verifying one archive.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport or HTTP status failure from the remote host.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure while writing the archive.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The computed digest of the fetched bytes does not match the recipe.
    /// Never retried with the same bytes; a later attempt must re-fetch.
    #[error("digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch {
        /// Digest declared in the recipe.
        expected: String,
        /// Digest computed from the fetched bytes.
        actual: String,
    },
}

impl FetchError {
    /// Whether a retry with backoff can plausibly succeed.
    ///
    /// Connection failures, timeouts, interrupted bodies, and 5xx responses
    /// are transient. 4xx responses and digest mismatches are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => match e.status() {
                Some(status) => status.is_server_error(),
                None => e.is_timeout() || e.is_connect() || e.is_body(),
            },
            Self::Io(_) | Self::DigestMismatch { .. } => false,
        }
    }
}

/// Request for one archive fetch.
#[derive(Debug)]
pub struct FetchRequest<'a, R: Reporter> {
    /// Shared HTTP client (connection pool).
    pub client: &'a Client,
    /// Display name of the entry being fetched (resource or package).
    pub name: &'a str,
    /// Source URL.
    pub url: &'a str,
    /// Cache destination for the verified archive.
    pub dest: &'a Path,
    /// Digest declared in the recipe.
    pub expected: &'a Sha256Digest,
    /// Progress sink.
    pub reporter: &'a R,
}

impl<'a, R: Reporter> FetchRequest<'a, R> {
    /// Build a fetch request.
    pub fn new(
        client: &'a Client,
        name: &'a str,
        url: &'a str,
        dest: &'a Path,
        expected: &'a Sha256Digest,
        reporter: &'a R,
    ) -> Self {
        Self {
            client,
            name,
            url,
            dest,
            expected,
            reporter,
        }
    }

    /// Execute the fetch: reuse a verified cache entry if present, otherwise
    /// download with bounded retry and exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] after retries are exhausted, or immediately
    /// for non-transient failures (4xx status, digest mismatch).
    pub async fn execute(self) -> Result<String, FetchError> {
        if tokio::fs::try_exists(self.dest).await.unwrap_or(false) {
            // Re-hash rather than trust: a truncated cache entry must not pass.
            let cached = sha256_file_async(self.dest).await?;
            if self.expected.matches(&cached) {
                self.reporter.verified(self.name);
                return Ok(cached);
            }
            tracing::warn!(
                name = self.name,
                "cached archive failed verification, refetching"
            );
            tokio::fs::remove_file(self.dest).await.ok();
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(hash) => return Ok(hash),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::debug!(
                        name = self.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient fetch failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length();
        self.reporter.fetching(self.name, 0, total);

        if let Some(parent) = self.dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(self.dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            self.reporter.fetching(self.name, downloaded, total);
        }

        file.flush().await?;
        let actual = hex::encode(hasher.finalize());

        if !self.expected.matches(&actual) {
            tokio::fs::remove_file(self.dest).await.ok();
            return Err(FetchError::DigestMismatch {
                expected: self.expected.to_string(),
                actual,
            });
        }

        self.reporter.verified(self.name);
        Ok(actual)
    }
}

/// Compute the SHA-256 hash of a file (streaming).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

async fn sha256_file_async(path: &Path) -> std::io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha256_file(&path))
        .await
        .map_err(std::io::Error::other)?
}
