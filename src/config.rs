use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScoopError};
use crate::types::{FileType, DEFAULT_CHUNK_SIZE};

/// Where and how carved files are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub root: PathBuf,
    /// Sort files into `<verdict>/<type>/` subdirectories.
    pub organise: bool,
    /// Nest everything under a directory named after the run's start time.
    pub timestamp: bool,
    /// Also write files no validator recognised.
    pub unrecognised_output: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            organise: true,
            timestamp: false,
            unrecognised_output: false,
        }
    }
}

/// Everything one run needs, built once at startup and passed down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoopConfig {
    pub input: PathBuf,
    pub output: OutputConfig,
    pub chunk_size: usize,
    pub file_types: Vec<FileType>,
    pub threads: Option<usize>,
    pub write_report: bool,
}

impl ScoopConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: OutputConfig::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_types: FileType::ALL.to_vec(),
            threads: None,
            write_report: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ScoopError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }
}

/// Parses a comma-separated type list. Unknown names are skipped with a
/// warning; duplicates are dropped.
pub fn parse_file_types(list: &str) -> Vec<FileType> {
    let mut types = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match name.parse::<FileType>() {
            Ok(t) if !types.contains(&t) => types.push(t),
            Ok(_) => {}
            Err(e) => warn!("{e}, skipping"),
        }
    }
    types
}
