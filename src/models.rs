//! Request data model.

use serde::Deserialize;

use crate::error::{EmbedError, Result};
use crate::tagging::TrackMetadata;

/// Placeholder used for every text field the caller leaves out.
pub const UNKNOWN: &str = "Unknown";

/// File extension of the container this service produces.
pub const EXTENSION: &str = "m4a";

/// Content type of the container this service produces.
pub const CONTENT_TYPE: &str = "audio/mp4";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Query parameters of `GET /generate-audio`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioParams {
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "unknown")]
    pub song_name: String,
    #[serde(default = "unknown")]
    pub artist: String,
    #[serde(default = "unknown")]
    pub album: String,
    #[serde(default = "unknown")]
    pub year: String,
}

impl Default for GenerateAudioParams {
    fn default() -> Self {
        Self {
            audio_url: None,
            image_url: None,
            song_name: unknown(),
            artist: unknown(),
            album: unknown(),
            year: unknown(),
        }
    }
}

impl GenerateAudioParams {
    /// Build parameters from decoded query pairs.
    ///
    /// The first value of a repeated key wins; unknown keys are ignored.
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut audio_url = None;
        let mut image_url = None;
        let mut song_name = None;
        let mut artist = None;
        let mut album = None;
        let mut year = None;

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "audioUrl" => &mut audio_url,
                "imageUrl" => &mut image_url,
                "songName" => &mut song_name,
                "artist" => &mut artist,
                "album" => &mut album,
                "year" => &mut year,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Self {
            audio_url,
            image_url,
            song_name: song_name.unwrap_or_else(unknown),
            artist: artist.unwrap_or_else(unknown),
            album: album.unwrap_or_else(unknown),
            year: year.unwrap_or_else(unknown),
        }
    }

    /// The audio URL, or `MissingParameter` if it was not supplied.
    pub fn require_audio_url(&self) -> Result<&str> {
        match self.audio_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(EmbedError::MissingParameter(
                "Audio URL is required".to_string(),
            )),
        }
    }

    /// The image URL, treating an empty value as absent.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Suggested download filename, safe to place in a header.
    pub fn download_filename(&self) -> String {
        let stem = sanitize_filename(&self.song_name);
        let stem = if stem.is_empty() { UNKNOWN } else { &stem };
        format!("{}.{}", stem, EXTENSION)
    }

    /// Text tags to write, without cover art.
    pub fn metadata(&self) -> TrackMetadata {
        TrackMetadata::new()
            .with_title(&self.song_name)
            .with_artist(&self.artist)
            .with_album(&self.album)
            .with_year(&self.year)
    }
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}
