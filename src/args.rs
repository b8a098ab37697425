use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

/// Scan a directory of audio files and regenerate a podcast RSS feed
#[derive(Debug, Parser)]
#[command(name = "updatepodcastdir", version, about)]
pub struct Args {
    /// Path to the INI config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Show what would be deleted and written without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Default log filter when `RUST_LOG` is not set
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
