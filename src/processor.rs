use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::{Config, MetadataErrorPolicy};
use crate::error::{Error, Result};
use crate::failed::{generate_debug_info, handle_failed_file, FailedFile, FailureStage};
use crate::feed::{write_feed, FeedEntry, FeedTemplate};
use crate::metadata::{extract_metadata, EpisodeMetadata, TagReader};
use crate::selector::{select, TruncatePolicy};

/// What a run did, for the summary printed at the end
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub total_files: usize,
    pub included: usize,
    pub excluded: usize,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<FailedFile>,
    pub output_path: PathBuf,
    pub written: bool,
    pub dry_run: bool,
}

pub struct Processor<'a> {
    config: Config,
    tag_reader: &'a dyn TagReader,
    dry_run: bool,
}

impl<'a> Processor<'a> {
    pub fn new(config: Config, tag_reader: &'a dyn TagReader) -> Self {
        Processor {
            config,
            tag_reader,
            dry_run: false,
        }
    }

    /// Select and build as usual, but delete nothing and write nothing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Rebuild the feed from the current contents of the media directory
    pub fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        let mut report = RunReport {
            output_path: config.output_path.clone(),
            dry_run: self.dry_run,
            ..RunReport::default()
        };

        // Template problems must surface before any file is deleted
        let template = FeedTemplate::load(&config.template_path)?;
        info!(template = %config.template_path.display(), "loaded feed template");

        let selection = select(
            &config.media_directory,
            TruncatePolicy {
                max_items: config.max_items,
                delete_old: config.delete_old,
                on_delete_error: config.on_delete_error,
                dry_run: self.dry_run,
            },
        )?;

        report.total_files =
            selection.kept.len() + selection.excluded.len() + selection.deleted.len();
        report.excluded = selection.excluded.len();
        report.deleted = selection.deleted.iter().map(|f| f.path.clone()).collect();
        report.failed = selection.failed;

        let mut entries = Vec::with_capacity(selection.kept.len());
        for file in &selection.kept {
            match extract_metadata(self.tag_reader, file) {
                Ok(metadata) => entries.push(FeedEntry { file, metadata }),
                Err(e) => {
                    let err = Error::from(e);
                    report
                        .failed
                        .push(handle_failed_file(&file.path, FailureStage::Metadata, &err));
                    if config.on_metadata_error == MetadataErrorPolicy::Blank {
                        entries.push(FeedEntry {
                            file,
                            metadata: EpisodeMetadata::blank(file),
                        });
                    }
                }
            }
        }
        report.included = entries.len();

        let document = template.build(&Utc::now(), &config.url_prefix, &entries)?;
        let bytes = document.to_bytes()?;

        if self.dry_run {
            info!(output = %config.output_path.display(), items = entries.len(), "dry run, feed not written");
        } else {
            write_feed(&bytes, &config.output_path)?;
            report.written = true;
            info!(output = %config.output_path.display(), items = entries.len(), "wrote feed");
        }

        Ok(report)
    }
}

impl RunReport {
    pub fn print_summary(&self) {
        println!();
        println!("=== FEED UPDATE COMPLETE ===");
        println!("Audio files found: {}", self.total_files);
        println!("Items in feed: {}", self.included);

        if self.excluded > 0 {
            println!("Left out (over the item limit): {}", self.excluded);
        }

        if !self.deleted.is_empty() {
            if self.dry_run {
                println!("Would delete: {}", self.deleted.len());
            } else {
                println!("Deleted: {}", self.deleted.len());
            }
            for path in &self.deleted {
                println!("  - {}", path.display());
            }
        }

        println!("Failed: {}", self.failed.len());

        if self.written {
            println!("Feed written to: {}", self.output_path.display());
        } else {
            println!("Feed not written (dry run)");
        }

        if !self.failed.is_empty() {
            println!();
            println!("=== FAILED FILES ===");
            for failed in &self.failed {
                println!();
                print!("{}", generate_debug_info(failed));
            }
        }
    }
}
