use std::ffi::OsStr;
use std::path::Path;

/// Audio container types that can appear in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MediaType {
    Mp3,
    Aac,
}

impl MediaType {
    /// Look up a media type from a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match normalize_extension(ext).as_str() {
            "mp3" => Some(MediaType::Mp3),
            "aac" => Some(MediaType::Aac),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        get_extension(path).and_then(|ext| Self::from_extension(&ext))
    }

    /// MIME type for the enclosure `type` attribute
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaType::Mp3 => "audio/mpeg",
            MediaType::Aac => "audio/aac",
        }
    }
}

/// Normalize file extension: lowercase, no leading dot
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Get the file extension from a path
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Build the public URL of a media file: prefix + percent-encoded basename
pub fn enclosure_url(url_prefix: &str, path: &Path) -> String {
    let Some(basename) = path.file_name() else {
        return url_prefix.to_string();
    };
    format!("{}{}", url_prefix, encode_file_name(basename))
}

/// Percent-encode the raw bytes of a file name, so names that are not
/// valid UTF-8 still map to the file on disk
#[cfg(unix)]
fn encode_file_name(name: &OsStr) -> String {
    use std::os::unix::ffi::OsStrExt;
    urlencoding::encode_binary(name.as_bytes()).into_owned()
}

#[cfg(not(unix))]
fn encode_file_name(name: &OsStr) -> String {
    urlencoding::encode(&name.to_string_lossy()).into_owned()
}
