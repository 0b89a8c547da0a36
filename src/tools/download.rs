use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Fetches a remote file to a local path
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP(S) download
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(url, dest = %dest.display(), "Downloading");

        let response = reqwest::blocking::get(url)
            .with_context(|| format!("Failed to download {} (check network connectivity)", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with HTTP {} from {}", response.status(), url);
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read response body from {}", url))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}
