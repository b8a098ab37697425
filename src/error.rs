//! Error types for the feed updater.
//!
//! Configuration and template errors are fatal and abort the run before
//! anything is written. Filesystem errors abort unless the deletion policy
//! says otherwise. Metadata errors are per file and never abort a run on
//! their own.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("missing required config key [{section}] {key}")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("invalid value {value:?} for [{section}] {key}: expected {expected}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("failed to list directory {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read tags from {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("template {path} has no <channel> element")]
    MissingChannel { path: PathBuf },

    #[error("failed to serialize feed: {0}")]
    Serialize(String),
}

impl Error {
    /// Short label for the error class, used in logs and the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration",
            Error::Filesystem(_) => "filesystem",
            Error::Metadata(_) => "metadata",
            Error::Template(_) => "template",
        }
    }
}
