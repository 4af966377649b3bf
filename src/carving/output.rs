use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::OutputConfig;
use crate::error::{Result, ScoopError};
use crate::types::{AnalysisResult, FileType};

const STAGING_DIR: &str = ".partial";

/// Resolves output paths for carved files.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    base: PathBuf,
    organise: bool,
}

impl OutputLayout {
    /// Fixes the base directory, including the timestamp component, once per
    /// run.
    pub fn new(config: &OutputConfig) -> Self {
        let label = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        Self::with_label(config, &label)
    }

    pub fn with_label(config: &OutputConfig, timestamp: &str) -> Self {
        let base = if config.timestamp {
            config.root.join(timestamp)
        } else {
            config.root.clone()
        };
        Self {
            base,
            organise: config.organise,
        }
    }

    #[inline]
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn directory_for(&self, verdict: AnalysisResult, file_type: FileType) -> PathBuf {
        if self.organise {
            self.base.join(verdict.name()).join(file_type.extension())
        } else {
            self.base.clone()
        }
    }

    /// Creates the target directory if needed and returns a path that does
    /// not exist yet.
    pub fn path_for(&self, verdict: AnalysisResult, file_type: FileType, filename: &str) -> Result<PathBuf> {
        let dir = self.directory_for(verdict, file_type);
        ensure_dir(&dir)?;
        Ok(unique_path(&dir, filename, file_type.extension()))
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.base.join(STAGING_DIR)
    }

    pub fn staging_path(&self, file_id: usize, filename: &str) -> Result<PathBuf> {
        let dir = self.staging_dir();
        ensure_dir(&dir)?;
        Ok(dir.join(format!("{file_id}_{filename}.part")))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| ScoopError::directory_create(dir, e))
}

/// `dir/stem.ext`, or the first free `dir/stem_N.ext` counting from zero.
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.{extension}"));
    if !candidate.exists() {
        return candidate;
    }
    (0u64..)
        .map(|n| dir.join(format!("{stem}_{n}.{extension}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
