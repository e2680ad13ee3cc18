//! Fetch, tag, and stage one song.
//!
//! [`Embedder::embed`] runs the whole sequence for a request: validate the
//! parameters, fetch and normalize the cover, stream the audio to a scratch
//! file, and write the tags. The returned [`TaggedAudio`] owns the scratch
//! file; dropping it removes the file.

use tracing::{info, warn};

use crate::artwork::{self, CoverArt};
use crate::config::{Config, TaggingPolicy};
use crate::error::{EmbedError, Result};
use crate::fetch::Fetcher;
use crate::models::GenerateAudioParams;
use crate::scratch::ScratchFile;
use crate::tagging::{self, TagOutcome};

/// A tagged file ready to be sent.
#[derive(Debug)]
pub struct TaggedAudio {
    /// Scratch file holding the audio. Removed when dropped.
    pub scratch: ScratchFile,
    /// Suggested download filename.
    pub filename: String,
    /// File size in bytes.
    pub size: u64,
    /// Whether the tags were written.
    pub tagged: bool,
}

/// Runs the embedding sequence for incoming requests.
#[derive(Debug, Clone)]
pub struct Embedder {
    fetcher: Fetcher,
    config: Config,
}

impl Embedder {
    /// Create a new embedder.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self { fetcher, config })
    }

    /// Produce a tagged copy of the requested audio.
    ///
    /// # Errors
    ///
    /// - `MissingParameter` if no audio URL was given; nothing is fetched or written.
    /// - `ImageFetchFailed` if the cover cannot be fetched or decoded; the audio is
    ///   never requested.
    /// - `UpstreamFetchFailed` if the audio cannot be fetched.
    /// - `TaggingFailed` only under [`TaggingPolicy::Strict`].
    pub async fn embed(&self, params: &GenerateAudioParams) -> Result<TaggedAudio> {
        let audio_url = params.require_audio_url()?;
        info!("Downloading song: {} by {}", params.song_name, params.artist);

        let cover = match params.image_url() {
            Some(url) => Some(self.fetch_cover(url).await?),
            None => None,
        };

        let scratch = ScratchFile::reserve(&self.config.scratch_dir)?;
        let file = scratch.create().await?;
        self.fetcher.download_to(audio_url, file).await?;

        let mut metadata = params.metadata();
        if let Some(cover) = cover {
            metadata = metadata.with_cover_art(cover.data);
        }

        let path = scratch.path().to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || tagging::write_metadata(path, &metadata))
            .await
            .map_err(|e| EmbedError::Unexpected(format!("Tagging task failed: {}", e)))?;

        let tagged = match outcome {
            TagOutcome::Tagged => {
                info!("Metadata added to {}", scratch.path().display());
                true
            }
            TagOutcome::Failed(e) => match self.config.tagging_policy {
                TaggingPolicy::BestEffort => {
                    warn!("Failed to add metadata to the file, sending it untagged");
                    false
                }
                TaggingPolicy::Strict => return Err(EmbedError::TaggingFailed(e.to_string())),
            },
        };

        let size = tokio::fs::metadata(scratch.path()).await?.len();

        Ok(TaggedAudio {
            scratch,
            filename: params.download_filename(),
            size,
            tagged,
        })
    }

    async fn fetch_cover(&self, url: &str) -> Result<CoverArt> {
        let bytes = self.fetcher.fetch_image(url).await?;
        artwork::normalize(&bytes).inspect_err(|e| {
            warn!("Invalid image URL or failed to decode image: {:?}", e);
        })
    }
}
