//! Remote fetching of cover art and audio.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{EmbedError, Result};

/// Size of the write buffer used while streaming audio to disk.
pub const CHUNK_SIZE: usize = 8192;

/// HTTP client for upstream audio and image hosts.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    image_timeout: Duration,
    audio_timeout: Option<Duration>,
}

impl Fetcher {
    /// Create a fetcher from the service configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| EmbedError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            image_timeout: config.image_timeout,
            audio_timeout: config.audio_timeout,
        })
    }

    /// Fetch an image into memory.
    ///
    /// Any failure, including a non-success status, is `ImageFetchFailed`.
    pub async fn fetch_image(&self, url: &str) -> Result<Bytes> {
        debug!("GET {} (image)", url);

        let response = self
            .client
            .get(url)
            .timeout(self.image_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Invalid image URL or failed to fetch image: {}", e);
                EmbedError::image(e)
            })?;

        response.bytes().await.map_err(|e| {
            error!("Failed to read image body: {}", e);
            EmbedError::image(e)
        })
    }

    /// Stream audio from `url` into `sink` without buffering the whole body.
    ///
    /// Returns the number of bytes written.
    pub async fn download_to<W>(&self, url: &str, sink: W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        debug!("GET {} (audio)", url);

        let mut request = self.client.get(url);
        if let Some(timeout) = self.audio_timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("API request error: {}", e);
                EmbedError::UpstreamFetchFailed(e)
            })?;

        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, sink);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Audio stream interrupted: {}", e);
                EmbedError::UpstreamFetchFailed(e)
            })?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        writer.flush().await?;
        debug!("Downloaded {} bytes from {}", written, url);

        Ok(written)
    }
}
