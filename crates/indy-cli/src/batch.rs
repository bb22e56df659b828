//! Migration of every matching file under a directory.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indy_config::{FileFilter, IndyConfig};
use indy_migrate::migrate_source_with;
use indy_syntax::PrintOptions;
use rayon::prelude::*;
use serde::Serialize;
use similar::TextDiff;
use walkdir::WalkDir;

/// What to do with a file that needs migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print a unified diff.
    Diff,
    /// Overwrite the file.
    Write,
    /// Only report it.
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Migrated,
    Unchanged,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Path relative to the walked root.
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub migrated_classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub diff: Option<String>,
}

impl FileReport {
    fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            migrated_classes: Vec::new(),
            error: None,
            diff: None,
        }
    }

    fn failed(path: PathBuf, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path, FileStatus::Failed)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub files_scanned: usize,
    pub migrated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

impl BatchSummary {
    fn from_reports(files: Vec<FileReport>) -> Self {
        let count = |status| files.iter().filter(|file| file.status == status).count();
        Self {
            files_scanned: files.len(),
            migrated: count(FileStatus::Migrated),
            unchanged: count(FileStatus::Unchanged),
            failed: count(FileStatus::Failed),
            files,
        }
    }
}

/// Java files under `root` accepted by `filter`, in a stable order.
pub fn collect_files(root: &Path, filter: &FileFilter) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if filter.matches(relative) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

/// Migrates one file. Errors end up in the report; they never abort the
/// batch.
pub fn migrate_file(root: &Path, path: &Path, options: &PrintOptions, mode: Mode) -> FileReport {
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                target = "indy.cli",
                path = %relative.display(),
                error = %err,
                "skipping unreadable file"
            );
            return FileReport::failed(relative, format!("failed to read file: {err}"));
        }
    };
    let migration = match migrate_source_with(&text, options) {
        Ok(migration) => migration,
        Err(err) => {
            tracing::warn!(
                target = "indy.cli",
                path = %relative.display(),
                error = %err,
                "skipping file"
            );
            return FileReport::failed(relative, err.to_string());
        }
    };
    if !migration.report.is_changed() {
        return FileReport::new(relative, FileStatus::Unchanged);
    }

    let mut report = FileReport::new(relative, FileStatus::Migrated);
    report.migrated_classes = migration.report.migrated_classes;
    match mode {
        Mode::Write => {
            if let Err(err) = write_atomically(path, &migration.text) {
                tracing::warn!(
                    target = "indy.cli",
                    path = %report.path.display(),
                    error = %err,
                    "failed to write migrated file"
                );
                return FileReport::failed(report.path, format!("failed to write file: {err}"));
            }
        }
        Mode::Diff => {
            let name = report.path.display().to_string().replace('\\', "/");
            let diff = TextDiff::from_lines(&text, &migration.text)
                .unified_diff()
                .context_radius(3)
                .header(&format!("a/{name}"), &format!("b/{name}"))
                .to_string();
            report.diff = Some(diff);
        }
        Mode::Check => {}
    }
    tracing::debug!(
        target = "indy.cli",
        path = %report.path.display(),
        classes = report.migrated_classes.len(),
        "migrated file"
    );
    report
}

/// Replaces `path` with `text` through a temporary file in the same
/// directory, so an interrupted run leaves either the old or the new file.
fn write_atomically(path: &Path, text: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Builds the worker pool, shrinking it when the OS refuses threads. `None`
/// means not even one worker could be started.
fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("indy-worker-{idx}"))
            .build()
        {
            Ok(pool) => return Some(pool),
            Err(_) if threads > 1 => threads = (threads / 2).max(1),
            Err(_) => return None,
        }
    }
}

/// Migrates every file under `root` that the config selects.
pub fn run(root: &Path, config: &IndyConfig, mode: Mode) -> Result<BatchSummary> {
    let filter = config.batch.file_filter()?;
    let files = collect_files(root, &filter)?;
    let options = PrintOptions {
        indent_width: config.output.indent_width,
        ..PrintOptions::default()
    };
    tracing::info!(
        target = "indy.cli",
        root = %root.display(),
        files = files.len(),
        "migrating source tree"
    );

    let migrate = |path: &PathBuf| migrate_file(root, path, &options, mode);
    let reports: Vec<FileReport> = match build_pool(config.batch.effective_threads()) {
        Some(pool) => pool.install(|| files.par_iter().map(migrate).collect()),
        None => files.iter().map(migrate).collect(),
    };
    Ok(BatchSummary::from_reports(reports))
}
