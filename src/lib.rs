//! Regenerate a podcast RSS feed from a directory of audio files.
//!
//! A run lists the media directory, keeps the newest `.mp3`/`.aac` files up to
//! the configured limit (optionally deleting the rest), reads each file's tag
//! and appends one `<item>` per file to a static RSS template.

pub mod args;
pub mod config;
pub mod error;
pub mod failed;
pub mod feed;
pub mod filename;
pub mod metadata;
pub mod processor;
pub mod selector;

pub use config::Config;
pub use error::{Error, Result};
pub use metadata::{LoftyTagReader, TagReader};
pub use processor::{Processor, RunReport};

/// Rebuild the feed described by `config`, reading tags with lofty
pub fn run(config: &Config) -> Result<RunReport> {
    Processor::new(config.clone(), &LoftyTagReader).run()
}
