//! # m4a-embed
//!
//! An HTTP service that fetches a remote M4A file, embeds title, artist,
//! album, year and cover art into it, and streams the result back as a
//! download.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use m4a_embed::{server, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     server::run(Config::default()).await?;
//!     Ok(())
//! }
//! ```
//!
//! The embedding sequence can also be driven without HTTP:
//!
//! ```rust,no_run
//! use m4a_embed::{Config, Embedder, GenerateAudioParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let embedder = Embedder::new(Config::default())?;
//!     let params = GenerateAudioParams {
//!         audio_url: Some("https://example.com/song.m4a".to_string()),
//!         song_name: "Song".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let audio = embedder.embed(&params).await?;
//!     println!("{} ({} bytes, tagged: {})", audio.filename, audio.size, audio.tagged);
//!     // The scratch file is removed when `audio` goes out of scope.
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! The library only emits `tracing` events and spans. Installing a
//! subscriber is left to the binary (or to tests).

pub mod artwork;
pub mod config;
mod embedder;
pub mod error;
pub mod fetch;
pub mod models;
pub mod scratch;
pub mod server;
pub mod tagging;

pub use config::{Config, TaggingPolicy};
pub use embedder::{Embedder, TaggedAudio};
pub use error::EmbedError;
pub use models::GenerateAudioParams;
