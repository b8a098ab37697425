use ini::{Ini, ParseOption};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Config file read when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "updatepodcastdir.config";

/// What to do when removing an old file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteErrorPolicy {
    /// Stop the run; no feed is written
    #[default]
    Abort,
    /// Log the failure, keep the file out of the feed and carry on
    Skip,
}

/// What to do with a file whose tags cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataErrorPolicy {
    /// Leave the file out of the feed
    #[default]
    Skip,
    /// Emit an item with empty title/link/description
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub media_directory: PathBuf,
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    pub url_prefix: String,
    pub max_items: usize,
    pub delete_old: bool,
    pub on_delete_error: DeleteErrorPolicy,
    pub on_metadata_error: MetadataErrorPolicy,
}

impl Config {
    /// Load configuration from an INI file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from INI text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        // Quotes and escapes stay literal so Windows paths survive.
        // Key lookups are case-insensitive (crate feature), like ConfigParser.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, options).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;

        let max_items_raw = required(&ini, "misc", "maxitems")?;
        let max_items = max_items_raw
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue {
                section: "misc",
                key: "maxitems",
                value: max_items_raw.to_string(),
                expected: "a non-negative integer",
            })?;

        let on_delete_error = match ini.get_from(Some("misc"), "ondeleteerror") {
            None => DeleteErrorPolicy::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "abort" => DeleteErrorPolicy::Abort,
                "skip" => DeleteErrorPolicy::Skip,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: "misc",
                        key: "ondeleteerror",
                        value: raw.to_string(),
                        expected: "abort or skip",
                    })
                }
            },
        };

        let on_metadata_error = match ini.get_from(Some("misc"), "onmetadataerror") {
            None => MetadataErrorPolicy::default(),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "skip" => MetadataErrorPolicy::Skip,
                "blank" => MetadataErrorPolicy::Blank,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: "misc",
                        key: "onmetadataerror",
                        value: raw.to_string(),
                        expected: "skip or blank",
                    })
                }
            },
        };

        Ok(Config {
            media_directory: PathBuf::from(required(&ini, "paths", "mp3path")?),
            template_path: PathBuf::from(required(&ini, "paths", "rsstemplate")?),
            output_path: PathBuf::from(required(&ini, "paths", "rssoutfile")?),
            url_prefix: required(&ini, "web", "urlprefix")?.to_string(),
            max_items,
            delete_old: parse_bool("misc", "deleteold", required(&ini, "misc", "deleteold")?)?,
            on_delete_error,
            on_metadata_error,
        })
    }
}

fn required<'a>(
    ini: &'a Ini,
    section: &'static str,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    ini.get_from(Some(section), key)
        .ok_or(ConfigError::MissingKey { section, key })
}

/// Boolean words accepted in the config file, case-insensitive
fn parse_bool(section: &'static str, key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section,
            key,
            value: raw.to_string(),
            expected: "a boolean (yes/no, true/false, on/off, 1/0)",
        }),
    }
}
