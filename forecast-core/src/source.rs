use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, path::PathBuf};

use crate::observation::Dataset;

/// Where historical CSV data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Http,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Http => "http",
        }
    }

    /// URLs with an `http`/`https` scheme are fetched over the network; anything else is a path.
    pub fn detect(location: &str) -> Self {
        let lower = location.trim().to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceKind::Http
        } else {
            SourceKind::File
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait DataSource: Send + Sync + Debug {
    /// Fetch the raw CSV text.
    async fn fetch(&self) -> Result<String>;

    /// Fetch and parse into a dataset.
    async fn load(&self) -> Result<Dataset> {
        let text = self.fetch().await?;
        Dataset::from_csv_str(&text)
            .with_context(|| format!("Failed to parse weather data from {self:?}"))
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read weather data file: {}", self.path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    http: Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), http: Client::new() }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self) -> Result<String> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to send request for weather data: {}", self.url))?;

        let status = res.status();
        let body = res.text().await.context("Failed to read weather data response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Weather data request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        tracing::info!(url = %self.url, bytes = body.len(), "downloaded weather data");
        Ok(body)
    }
}

/// Construct the source matching a configured location.
pub fn source_for(location: &str) -> Result<Box<dyn DataSource>> {
    let location = location.trim();
    if location.is_empty() {
        return Err(anyhow!(
            "No weather data location configured.\n\
             Hint: pass `--data <path|url>` or run `forecast configure`."
        ));
    }

    let kind = SourceKind::detect(location);
    tracing::debug!(%kind, location, "selected weather data source");
    let boxed: Box<dyn DataSource> = match kind {
        SourceKind::File => Box::new(FileSource::new(location)),
        SourceKind::Http => Box::new(HttpSource::new(location)),
    };

    Ok(boxed)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
