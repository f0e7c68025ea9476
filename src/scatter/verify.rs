//! Output-completeness verification
//!
//! An engine invocation can exit 0 yet leave no result file behind in rare
//! environments, so after the pool drains the produced artifacts are counted
//! against the dispatched jobs. A mismatch is a reported discrepancy, not a
//! hard gate.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::Result;

/// Outcome of the post-run artifact count
#[derive(Debug, Clone, Copy)]
pub struct CompletenessReport {
    pub expected: usize,
    pub found: usize,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.expected == self.found
    }
}

/// Count `{prefix}.{N}.vcf.gz` artifacts and compare with the job count
///
/// Only filenames whose block segment is purely numeric are counted, so the
/// per-region `.tar.gz` archives and unrelated files in the same directory
/// never inflate the tally.
pub async fn verify_outputs(output_prefix: &Path, expected: usize) -> Result<CompletenessReport> {
    let (dir, stem) = split_prefix(output_prefix);

    let mut found = 0;
    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if is_numbered_vcf(name, &stem) {
                found += 1;
            }
        }
    }

    let report = CompletenessReport { expected, found };
    if report.is_complete() {
        info!("All {} expected output files are present", expected);
    } else {
        error!(
            "Number of output files not expected: expected {}, found {}",
            expected, found
        );
    }

    Ok(report)
}

/// Split an output prefix into the directory to scan and the filename stem
fn split_prefix(prefix: &Path) -> (PathBuf, String) {
    let dir = match prefix.parent() {
        Some(parent) if parent.components().next().is_some() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, stem)
}

fn is_numbered_vcf(name: &str, stem: &str) -> bool {
    let Some(rest) = name.strip_prefix(stem) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix('.') else {
        return false;
    };
    let Some(block) = rest.strip_suffix(".vcf.gz") else {
        return false;
    };
    !block.is_empty() && block.bytes().all(|b| b.is_ascii_digit())
}
