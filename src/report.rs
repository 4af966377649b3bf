use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoopError};
use crate::types::{AnalysisFileInfo, AnalysisResult, FileType, Offset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarvedFile {
    pub file_id: usize,
    pub path: PathBuf,
    pub file_type: FileType,
    pub verdict: AnalysisResult,
    pub start: Offset,
    /// Exclusive.
    pub stop: Offset,
    pub info: AnalysisFileInfo,
}

impl CarvedFile {
    #[inline]
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveFailure {
    pub file_id: usize,
    pub filename: String,
    pub file_type: FileType,
    pub error: String,
}

/// Outcome of one carve pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveReport {
    pub carved: Vec<CarvedFile>,
    pub failures: Vec<CarveFailure>,
    pub skipped_unrecognised: usize,
}

impl CarveReport {
    pub fn stats(&self) -> CarveStats {
        CarveStats::from_report(self)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| ScoopError::file_write(path, std::io::Error::other(e)))?;
        fs::write(path, json).map_err(|e| ScoopError::file_write(path, e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarveStats {
    pub correct: usize,
    pub partial: usize,
    pub format_error: usize,
    pub corrupted: usize,
    pub unrecognised: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_written: u64,
    pub per_type: BTreeMap<FileType, usize>,
}

impl CarveStats {
    pub fn from_report(report: &CarveReport) -> Self {
        let mut stats = Self {
            failed: report.failures.len(),
            skipped: report.skipped_unrecognised,
            ..Self::default()
        };

        for file in &report.carved {
            match file.verdict {
                AnalysisResult::Correct => stats.correct += 1,
                AnalysisResult::Partial => stats.partial += 1,
                AnalysisResult::FormatError => stats.format_error += 1,
                AnalysisResult::Corrupted => stats.corrupted += 1,
                AnalysisResult::Unrecognised | AnalysisResult::Unanalysed => stats.unrecognised += 1,
            }
            stats.bytes_written += file.len();
            *stats.per_type.entry(file.file_type).or_default() += 1;
        }
        stats
    }

    pub fn total_files(&self) -> usize {
        self.correct + self.partial + self.format_error + self.corrupted + self.unrecognised
    }
}
