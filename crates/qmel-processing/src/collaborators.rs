//! Narrow interfaces to the world outside the cleaning core.
//!
//! The core never moves files or talks to the analytics platform itself. The
//! binary wires these traits to the local implementations below; other
//! deployments can substitute their own.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::table::Table;
use crate::writer::CsvWriter;

/// Suffix layout appended to pushed table names.
pub const TABLE_SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Moves a finished or consumed artifact into an archive directory.
pub trait ArtifactMover {
    /// Move `src` into directory `dest_dir`, keeping its file name.
    /// Returns the new location.
    fn move_file(&self, src: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// Receives a cleaned table for downstream analysis.
pub trait TableSink {
    /// Push `table` into `pool` under a fresh name derived from
    /// `table_name`. Returns the name actually used.
    fn push_table(&self, pool: &str, table_name: &str, table: &Table) -> Result<String>;
}

/// `<base>_<yyyymmdd>_<hhmmss>`, unique per second.
pub fn unique_table_name(base: &str, now: NaiveDateTime) -> String {
    format!("{}_{}", base, now.format(TABLE_SUFFIX_FORMAT))
}

/// Filesystem mover: rename, falling back to copy and remove when the
/// destination is on another filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl ArtifactMover for FsMover {
    fn move_file(&self, src: &Path, dest_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir).map_err(|e| ProcessingError::file_access(dest_dir, e))?;

        let file_name = src.file_name().ok_or_else(|| {
            ProcessingError::InvalidConfig(format!("'{}' has no file name", src.display()))
        })?;
        let dest = dest_dir.join(file_name);

        if let Err(rename_err) = fs::rename(src, &dest) {
            debug!(
                "Rename of {} failed ({}), copying instead",
                src.display(),
                rename_err
            );
            fs::copy(src, &dest).map_err(|e| ProcessingError::file_access(src, e))?;
            fs::remove_file(src).map_err(|e| ProcessingError::file_access(src, e))?;
        }

        info!("Moved {} to {}", src.display(), dest.display());
        Ok(dest)
    }
}

/// Sink that stores each pushed table as `<root>/<pool>/<unique name>.csv`.
///
/// Pools are directories and are created on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    writer: CsvWriter,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer: CsvWriter::new(),
        }
    }

    fn pool_dir(&self, pool: &str) -> std::io::Result<PathBuf> {
        let dir = self.root.join(pool);
        if dir.is_dir() {
            info!("Found existing data pool: {}", pool);
        } else {
            info!("Creating new data pool: {}", pool);
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    fn push_failure(pool: &str, table: &str, reason: impl ToString) -> ProcessingError {
        ProcessingError::DownstreamPush {
            pool: pool.to_string(),
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl TableSink for DirectorySink {
    fn push_table(&self, pool: &str, table_name: &str, table: &Table) -> Result<String> {
        if pool.trim().is_empty() || table_name.trim().is_empty() {
            return Err(Self::push_failure(pool, table_name, "pool and table names must not be empty"));
        }

        let dir = self
            .pool_dir(pool)
            .map_err(|e| Self::push_failure(pool, table_name, e))?;
        let unique = unique_table_name(table_name, chrono::Local::now().naive_local());
        info!("Creating new table '{}' in data pool '{}'", unique, pool);

        let path = dir.join(format!("{}.csv", unique));
        self.writer
            .write(table, &path)
            .map_err(|e| Self::push_failure(pool, &unique, e))?;

        info!("Data pushed to {}.{}", pool, unique);
        Ok(unique)
    }
}
