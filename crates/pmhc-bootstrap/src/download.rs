//! Large-file downloads.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use pmhc_common::{Result, SandboxClient};
use pmhc_config::NetworkConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    /// `dest` only appears once the transfer is complete.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Streams downloads through the allowlisted [`SandboxClient`].
pub struct HttpDownloader {
    client: SandboxClient,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let client = SandboxClient::with_extra_hosts(
            Duration::from_secs(network.timeout_secs),
            &network.extra_allowed_hosts,
        )?;
        Ok(Self { client, show_progress: true })
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner} [{elapsed_precise}] {bar:40} {bytes}/{total_bytes} ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

/// `<dest>.part`, the staging name used while a download is in flight.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        info!(url, dest = %dest.display(), "Downloading");

        let mut response = self.client.get(url)?.send().await?.error_for_status()?;
        let bar = self.progress_bar(response.content_length());

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        let part = partial_path(dest);
        let mut file = fs::File::create(&part).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            bar.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        fs::rename(&part, dest).await?;
        bar.finish_and_clear();
        debug!(bytes = written, dest = %dest.display(), "Download complete");
        Ok(written)
    }
}
