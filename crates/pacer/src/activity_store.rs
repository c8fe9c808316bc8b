//! Directory of per-activity CSV tables.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use walkdir::WalkDir;

use crate::{
    config::ScanOrder,
    errors::Result,
    features::{ActivitySummary, FeatureExtractor},
    table::Table,
};

pub const ACTIVITY_EXTENSION: &str = "csv";

/// Files directly inside `dir` with the given extension (case-insensitive), in `order`.
pub fn list_files(dir: impl AsRef<Path>, extension: &str, order: ScanOrder) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }

    match order {
        ScanOrder::FileName => files.sort(),
        ScanOrder::LastModified => {
            files.sort_by_cached_key(|path| {
                let modified = std::fs::metadata(path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path.clone())
            });
        }
    }

    Ok(files)
}

/// Activity-store files in `dir`.
pub fn list_activities(dir: impl AsRef<Path>, order: ScanOrder) -> Result<Vec<PathBuf>> {
    list_files(dir, ACTIVITY_EXTENSION, order)
}

/// Reads every activity table in `dir`. Unreadable or empty files are logged and skipped.
pub fn load_activities(dir: impl AsRef<Path>, order: ScanOrder) -> Result<Vec<(PathBuf, Table)>> {
    let mut loaded = Vec::new();

    for path in list_activities(dir, order)? {
        match Table::read_csv(&path) {
            Ok(table) if table.is_empty() => {
                tracing::warn!("Activity {} is empty", path.display());
            }
            Ok(table) => loaded.push((path, table)),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
            }
        }
    }

    Ok(loaded)
}

/// Summarizes one activity file.
pub fn summarize_file(extractor: &FeatureExtractor, path: impl AsRef<Path>) -> Result<ActivitySummary> {
    let path = path.as_ref();
    let table = Table::read_csv(path)?;
    extractor.summarize(&table, &path.display().to_string())
}

/// Summarizes every activity in `dir`; per-file failures are logged and skipped.
///
/// Fails only when the directory itself cannot be listed.
pub fn summarize_directory(
    extractor: &FeatureExtractor,
    dir: impl AsRef<Path>,
    order: ScanOrder,
) -> Result<Vec<ActivitySummary>> {
    let dir = dir.as_ref();
    let mut summaries = Vec::new();

    for path in list_activities(dir, order)? {
        match summarize_file(extractor, &path) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "Summarized {} activities from {}",
        summaries.len(),
        dir.display()
    );
    Ok(summaries)
}
