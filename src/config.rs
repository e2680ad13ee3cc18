//! Service configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for fetching cover art.
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when writing tags into the scratch file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaggingPolicy {
    /// Log the failure and deliver the audio as fetched.
    #[default]
    BestEffort,
    /// Fail the request with a server error.
    Strict,
}

/// Runtime configuration for the embedding service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Directory scratch audio files are staged in.
    pub scratch_dir: PathBuf,
    /// Timeout applied to the cover art request.
    pub image_timeout: Duration,
    /// Timeout applied to the audio request. `None` leaves it to the transport.
    pub audio_timeout: Option<Duration>,
    pub tagging_policy: TaggingPolicy,
    /// User-Agent sent on upstream requests.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            scratch_dir: std::env::temp_dir(),
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            audio_timeout: None,
            tagging_policy: TaggingPolicy::default(),
            user_agent: concat!("m4a-embed/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Set the scratch directory.
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set the cover art timeout.
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    /// Set the audio timeout.
    pub fn with_audio_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.audio_timeout = timeout;
        self
    }

    /// Set the tagging policy.
    pub fn with_tagging_policy(mut self, policy: TaggingPolicy) -> Self {
        self.tagging_policy = policy;
        self
    }
}
