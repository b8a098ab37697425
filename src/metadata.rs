use chrono::{DateTime, Utc};
use lofty::file::TaggedFileExt;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;

use crate::error::MetadataError;
use crate::selector::MediaFile;

/// Raw text fields read from an audio file's tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub title: Option<String>,
    pub website: Option<String>,
    pub comment: Option<String>,
}

/// Anything that can pull title/website/comment out of an audio file
pub trait TagReader {
    /// Read tag fields from `path`. A file without any tag is not an error
    /// and yields empty fields.
    fn read_tags(&self, path: &Path) -> Result<TagFields, MetadataError>;
}

/// Tag reader backed by lofty (ID3v1/ID3v2/APE on MP3 and ADTS AAC)
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagFields, MetadataError> {
        let tagged_file =
            lofty::probe::read_from_path(path).map_err(|e| MetadataError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let tag: Option<&Tag> = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag());

        Ok(tag.map(fields_from_tag).unwrap_or_default())
    }
}

fn fields_from_tag(tag: &Tag) -> TagFields {
    // URL-class items, in order of preference for the item link
    let website = [
        ItemKey::AudioFileUrl,
        ItemKey::AudioSourceUrl,
        ItemKey::PublisherUrl,
    ]
    .iter()
    .find_map(|key| {
        // ID3v2 URL frames come through as locators, other formats as text
        non_blank(tag.get_locators(key).next()).or_else(|| non_blank(tag.get_string(key)))
    });

    TagFields {
        title: non_blank(tag.title().as_deref()),
        website,
        comment: non_blank(tag.comment().as_deref()),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Everything an `<item>` needs besides the enclosure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub title: Option<String>,
    pub link_url: Option<String>,
    pub description: Option<String>,
    /// Always the file's modification time, never a tag date
    pub pub_date: DateTime<Utc>,
}

impl EpisodeMetadata {
    /// Metadata with no tag-derived fields, used when tags are unreadable
    pub fn blank(file: &MediaFile) -> Self {
        EpisodeMetadata {
            title: None,
            link_url: None,
            description: None,
            pub_date: file.modified,
        }
    }
}

/// Extract episode metadata for one selected file
pub fn extract_metadata(
    reader: &dyn TagReader,
    file: &MediaFile,
) -> Result<EpisodeMetadata, MetadataError> {
    let tags = reader.read_tags(&file.path)?;

    Ok(EpisodeMetadata {
        title: tags.title,
        link_url: tags.website,
        description: tags.comment,
        pub_date: file.modified,
    })
}

/// Format a timestamp for RSS `pubDate`/`lastBuildDate`
pub fn format_rfc2822(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
