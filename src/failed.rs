use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Error;

/// Pipeline stage in which a single file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Scan,
    Delete,
    Metadata,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Scan => "scan",
            FailureStage::Delete => "delete",
            FailureStage::Metadata => "metadata",
        };
        f.write_str(s)
    }
}

/// A file that did not make it through the run cleanly
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub stage: FailureStage,
    pub error: String,
}

/// Record a per-file failure and log it
pub fn handle_failed_file(file_path: &Path, stage: FailureStage, error: &Error) -> FailedFile {
    warn!(
        path = %file_path.display(),
        stage = %stage,
        kind = error.kind(),
        "{}",
        error
    );

    FailedFile {
        path: file_path.to_path_buf(),
        stage,
        error: error.to_string(),
    }
}

/// Generate debug information for a failed file, for the run summary
pub fn generate_debug_info(failed: &FailedFile) -> String {
    let mut info = String::new();

    info.push_str(&format!("File: {}\n", failed.path.display()));
    info.push_str(&format!("Stage: {}\n", failed.stage));

    match fs::metadata(&failed.path) {
        Ok(metadata) => {
            info.push_str(&format!("Size: {} bytes\n", metadata.len()));
            if let Ok(modified) = metadata.modified() {
                let modified: chrono::DateTime<chrono::Utc> = modified.into();
                info.push_str(&format!("Modified: {}\n", modified.to_rfc2822()));
            }
        }
        Err(_) => info.push_str("Status: no longer on disk\n"),
    }

    info.push_str(&format!("Error: {}\n", failed.error));
    info
}
