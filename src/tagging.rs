//! Audio metadata tagging utilities.
//!
//! This module embeds title, artist, album, year and cover art into MP4/M4A
//! files through their `ilst` atom.

use std::fs::File;
use std::path::Path;

use lofty::config::{ParseOptions, WriteOptions};
use lofty::error::LoftyError;
use lofty::file::AudioFile;
use lofty::mp4::{Atom, AtomData, AtomIdent, Ilst, Mp4File};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, TagExt};
use tracing::{debug, warn};

const TITLE: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9nam");
const ARTIST: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9ART");
const ALBUM: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9alb");
const YEAR: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9day");
const COVER: AtomIdent<'static> = AtomIdent::Fourcc(*b"covr");

/// Metadata to embed in audio files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track title.
    pub title: Option<String>,
    /// Track artist.
    pub artist: Option<String>,
    /// Album title.
    pub album: Option<String>,
    /// Release year, kept as free text.
    pub year: Option<String>,
    /// Cover art bytes.
    pub cover_art: Option<Vec<u8>>,
}

impl TrackMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set title.
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set artist.
    pub fn with_artist<S: Into<String>>(mut self, artist: S) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set album.
    pub fn with_album<S: Into<String>>(mut self, album: S) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set year.
    pub fn with_year<S: Into<String>>(mut self, year: S) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Set cover art bytes.
    pub fn with_cover_art(mut self, cover: Vec<u8>) -> Self {
        self.cover_art = Some(cover);
        self
    }
}

/// Result of a tagging attempt.
#[derive(Debug)]
pub enum TagOutcome {
    /// Tags were written and saved.
    Tagged,
    /// The file was left as it was.
    Failed(LoftyError),
}

impl TagOutcome {
    pub fn is_tagged(&self) -> bool {
        matches!(self, TagOutcome::Tagged)
    }
}

/// Tags read back from a file.
#[derive(Debug, Clone)]
pub struct StoredTags {
    pub metadata: TrackMetadata,
    /// Codec the cover record is typed with, if there is one.
    pub cover_mime_type: Option<MimeType>,
}

/// Write metadata to an M4A file in place.
///
/// Existing values in the touched slots are replaced; other atoms are kept.
/// The cover record is always typed as JPEG.
///
/// Never fails: the outcome tells the caller whether the file was changed.
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &TrackMetadata) -> TagOutcome {
    let path = path.as_ref();
    debug!("Writing metadata to: {}", path.display());

    match try_write_metadata(path, metadata) {
        Ok(()) => {
            debug!("Successfully wrote metadata to {}", path.display());
            TagOutcome::Tagged
        }
        Err(e) => {
            warn!("Failed to write tags to {}: {}", path.display(), e);
            TagOutcome::Failed(e)
        }
    }
}

fn try_write_metadata(path: &Path, metadata: &TrackMetadata) -> Result<(), LoftyError> {
    let mut ilst = {
        let mut file = File::open(path)?;
        let mp4 = Mp4File::read_from(&mut file, ParseOptions::new().read_properties(false))?;
        mp4.ilst().cloned().unwrap_or_default()
    };

    if let Some(title) = &metadata.title {
        set_text(&mut ilst, TITLE, title);
    }

    if let Some(artist) = &metadata.artist {
        set_text(&mut ilst, ARTIST, artist);
    }

    if let Some(album) = &metadata.album {
        set_text(&mut ilst, ALBUM, album);
    }

    if let Some(year) = &metadata.year {
        set_text(&mut ilst, YEAR, year);
    }

    if let Some(cover_data) = &metadata.cover_art {
        ilst.remove(&COVER).for_each(drop);
        ilst.insert_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            cover_data.clone(),
        ));
    }

    ilst.save_to_path(path, WriteOptions::default())
}

fn set_text(ilst: &mut Ilst, ident: AtomIdent<'static>, value: &str) {
    ilst.remove(&ident).for_each(drop);
    ilst.insert(Atom::new(ident, AtomData::UTF8(value.to_string())));
}

/// Read back the tags this module writes.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<StoredTags, LoftyError> {
    let mut file = File::open(path.as_ref())?;
    let mp4 = Mp4File::read_from(&mut file, ParseOptions::new().read_properties(false))?;

    let Some(ilst) = mp4.ilst() else {
        return Ok(StoredTags {
            metadata: TrackMetadata::default(),
            cover_mime_type: None,
        });
    };

    let year = ilst.get(&YEAR).and_then(|atom| {
        atom.data().find_map(|data| match data {
            AtomData::UTF8(text) => Some(text.clone()),
            _ => None,
        })
    });

    let cover = ilst.pictures().and_then(|mut pictures| pictures.next());

    Ok(StoredTags {
        metadata: TrackMetadata {
            title: ilst.title().map(|s| s.into_owned()),
            artist: ilst.artist().map(|s| s.into_owned()),
            album: ilst.album().map(|s| s.into_owned()),
            year,
            cover_art: cover.map(|picture| picture.data().to_vec()),
        },
        cover_mime_type: cover.and_then(|picture| picture.mime_type().cloned()),
    })
}
