use std::time::Duration;

use reqwest::Client;

use crate::error::{Result, SetupError};
use crate::interrupt::interruptible;

/// HTTPS fetches for installer scripts and signing keys.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SetupError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch `url`, failing on any non-2xx status. Ctrl-C aborts the transfer.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        interruptible(&format!("downloading {}", url), self.get(url)).await
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("Downloading {}", url);

        let download_err = |source| SetupError::Download {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(download_err)?;

        let body = response.bytes().await.map_err(download_err)?;
        Ok(body.to_vec())
    }
}
