use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DeleteErrorPolicy;
use crate::error::{Error, FilesystemError, Result};
use crate::failed::{handle_failed_file, FailedFile, FailureStage};
use crate::filename::MediaType;

/// A supported audio file found in the media directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size_bytes: u64,
    pub media_type: MediaType,
}

/// Outcome of listing and truncating the media directory
#[derive(Debug, Default)]
pub struct Selection {
    /// Files that go into the feed, newest first
    pub kept: Vec<MediaFile>,
    /// Files beyond the cutoff that were left on disk
    pub excluded: Vec<MediaFile>,
    /// Files beyond the cutoff that were removed (or would be, on a dry run)
    pub deleted: Vec<MediaFile>,
    pub failed: Vec<FailedFile>,
}

/// How the selector treats files beyond `max_items`
#[derive(Debug, Clone, Copy)]
pub struct TruncatePolicy {
    pub max_items: usize,
    pub delete_old: bool,
    pub on_delete_error: DeleteErrorPolicy,
    pub dry_run: bool,
}

/// List supported audio files directly inside `dir`, newest first.
///
/// Ties on modification time are ordered by path so repeated runs over the
/// same directory produce the same ordering.
pub fn collect_files(dir: &Path, failed: &mut Vec<FailedFile>) -> Result<Vec<MediaFile>> {
    let mut files = Vec::new();

    for entry_result in WalkDir::new(dir).max_depth(1).min_depth(1).sort_by_file_name() {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) if err.depth() == 0 => {
                return Err(FilesystemError::List {
                    path: dir.to_path_buf(),
                    source: err.into(),
                }
                .into());
            }
            Err(err) => {
                if let Some(path) = err.path() {
                    warn!(path = %path.display(), "failed to access entry: {}", err);
                } else {
                    warn!("walkdir error: {}", err);
                }
                continue;
            }
        };

        let path = entry.path();

        let Some(media_type) = MediaType::from_path(path) else {
            debug!(path = %path.display(), "skipping unsupported file");
            continue;
        };

        // Follows symlinks, so a link to a regular audio file counts
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(source) => {
                let err = Error::from(FilesystemError::Stat {
                    path: path.to_path_buf(),
                    source,
                });
                failed.push(handle_failed_file(path, FailureStage::Scan, &err));
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(m) => DateTime::<Utc>::from(m),
            Err(source) => {
                let err = Error::from(FilesystemError::Stat {
                    path: path.to_path_buf(),
                    source,
                });
                failed.push(handle_failed_file(path, FailureStage::Scan, &err));
                continue;
            }
        };

        files.push(MediaFile {
            path: path.to_path_buf(),
            modified,
            size_bytes: metadata.len(),
            media_type,
        });
    }

    sort_newest_first(&mut files);
    Ok(files)
}

pub fn sort_newest_first(files: &mut [MediaFile]) {
    files.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Drop files beyond `max_items` from the end of a newest-first list,
/// removing them from disk when `delete_old` is set.
pub fn truncate(mut files: Vec<MediaFile>, policy: TruncatePolicy) -> Result<Selection> {
    let mut selection = Selection::default();

    while files.len() > policy.max_items {
        let Some(file) = files.pop() else {
            break;
        };

        if !policy.delete_old {
            debug!(path = %file.path.display(), "excluding old file from feed");
            selection.excluded.push(file);
            continue;
        }

        if policy.dry_run {
            info!(path = %file.path.display(), "would delete old file (dry run)");
            selection.deleted.push(file);
            continue;
        }

        match fs::remove_file(&file.path) {
            Ok(()) => {
                info!(path = %file.path.display(), "deleted old file");
                selection.deleted.push(file);
            }
            Err(source) => {
                let err = Error::from(FilesystemError::Delete {
                    path: file.path.clone(),
                    source,
                });
                match policy.on_delete_error {
                    DeleteErrorPolicy::Abort => return Err(err),
                    DeleteErrorPolicy::Skip => {
                        selection
                            .failed
                            .push(handle_failed_file(&file.path, FailureStage::Delete, &err));
                        selection.excluded.push(file);
                    }
                }
            }
        }
    }

    selection.kept = files;
    Ok(selection)
}

/// List, sort and truncate the media directory
pub fn select(dir: &Path, policy: TruncatePolicy) -> Result<Selection> {
    let mut scan_failures = Vec::new();
    let files = collect_files(dir, &mut scan_failures)?;
    info!(dir = %dir.display(), count = files.len(), "found audio files");

    let mut selection = truncate(files, policy)?;
    scan_failures.append(&mut selection.failed);
    selection.failed = scan_failures;
    Ok(selection)
}
