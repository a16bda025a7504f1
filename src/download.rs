//! HTTP archive fetching.
//!
//! Downloads follow redirects manually (the Adoptium API answers with a
//! chain of them), stream to disk, and report progress in 10% steps. A
//! failed download never leaves a partial file behind.

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{StatusCode, Url};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::cache::{self, HostFs};

/// What `fetch` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A plausible archive was already on disk; no request was made.
    Cached,
    Downloaded { bytes: u64 },
}

/// Download progress.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn percent(&self) -> Option<u8> {
        self.total.map(|t| {
            if t == 0 {
                0
            } else {
                ((self.downloaded.min(t) * 100) / t) as u8
            }
        })
    }

    /// Human-readable form, e.g. `12.0/180.5 MB (6%)`.
    pub fn display(&self) -> String {
        let downloaded_mb = self.downloaded as f64 / (1024.0 * 1024.0);
        match (self.total, self.percent()) {
            (Some(total), Some(pct)) => {
                let total_mb = total as f64 / (1024.0 * 1024.0);
                format!("{:.1}/{:.1} MB ({}%)", downloaded_mb, total_mb, pct)
            }
            _ => format!("{:.1} MB", downloaded_mb),
        }
    }
}

/// Tracks the last reported 10% step.
#[derive(Debug, Default)]
pub struct ProgressSteps {
    last: u8,
}

impl ProgressSteps {
    /// Returns the new step (10, 20, ... 100) if `progress` crossed one.
    pub fn advance(&mut self, progress: &Progress) -> Option<u8> {
        let step = progress.percent()? / 10 * 10;
        if step > self.last {
            self.last = step;
            Some(step)
        } else {
            None
        }
    }
}

/// HTTP client with automatic redirects disabled; [`fetch`] follows them.
pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("jrekit/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch `url` into `dest` unless a usable copy is already there.
pub async fn fetch(client: &reqwest::Client, url: &str, dest: &Path) -> Result<FetchOutcome> {
    if cache::archive_is_cached(&HostFs, dest) {
        match cache::verify_sidecar(dest)? {
            Some(false) => {
                tracing::warn!(
                    "{} does not match its recorded checksum; downloading again",
                    dest.display()
                );
                std::fs::remove_file(dest)
                    .with_context(|| format!("Failed to remove {}", dest.display()))?;
            }
            _ => {
                tracing::info!("[SKIP] using cached {}", dest.display());
                return Ok(FetchOutcome::Cached);
            }
        }
    }

    tracing::info!("downloading {}", url);
    match download(client, url, dest).await {
        Ok(bytes) => {
            cache::write_sidecar(dest)?;
            Ok(FetchOutcome::Downloaded { bytes })
        }
        Err(e) => {
            cache::discard_archive(dest);
            Err(e)
        }
    }
}

/// Blocking wrapper around [`fetch`] for the sequential pipeline.
pub fn fetch_blocking(url: &str, dest: &Path) -> Result<FetchOutcome> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    rt.block_on(async {
        let client = client()?;
        fetch(&client, url, dest).await
    })
}

/// Somewhere JDK archives come from.
pub trait ArchiveSource {
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome>;
}

/// Fetches over HTTP(S).
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSource;

impl ArchiveSource for HttpSource {
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        fetch_blocking(url, dest)
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Send a GET, following redirects until a non-redirect response arrives.
async fn follow_redirects(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    let mut current = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    loop {
        let response = client
            .get(current.clone())
            .send()
            .await
            .with_context(|| format!("HTTP request failed: {}", current))?;

        if !is_redirect(response.status()) {
            return Ok(response);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .with_context(|| {
                format!(
                    "HTTP {} from {} without a Location header",
                    response.status().as_u16(),
                    current
                )
            })?;
        let next = current
            .join(location)
            .with_context(|| format!("Bad redirect target '{}' from {}", location, current))?;
        tracing::debug!(from = %current, to = %next, "redirect");
        current = next;
    }
}

async fn download(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    let response = follow_redirects(client, url).await?;

    let status = response.status();
    if status != StatusCode::OK {
        bail!(
            "HTTP {} for {}: {}",
            status.as_u16(),
            response.url(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut writer = tokio::io::BufWriter::new(file);

    let total = response.content_length();
    let mut progress = Progress {
        downloaded: 0,
        total,
    };
    let mut steps = ProgressSteps::default();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read response body from {}", url))?;
        writer
            .write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        progress.downloaded += chunk.len() as u64;
        if steps.advance(&progress).is_some() {
            tracing::info!("  {}", progress.display());
        }
    }

    writer
        .flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    if let Some(expected) = total {
        if progress.downloaded != expected {
            bail!(
                "Download incomplete for {}: expected {} bytes, got {}",
                url,
                expected,
                progress.downloaded
            );
        }
    }

    Ok(progress.downloaded)
}
