use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Offset = u64;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

pub const DEFAULT_CHUNK_SIZE: usize = (2 * MB) as usize;
pub const DEFAULT_CARVE_SIZE: u64 = 10 * MB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
    Png,
    Jpg,
    Gif,
    Bmp,
    Mp3,
    Wav,
    Mp4,
    Mov,
    Zip,
    Docx,
    Xlsx,
    Pptx,
    Rar,
    Pdf,
}

impl FileType {
    pub const ALL: [FileType; 14] = [
        FileType::Png,
        FileType::Jpg,
        FileType::Gif,
        FileType::Bmp,
        FileType::Mp3,
        FileType::Wav,
        FileType::Mp4,
        FileType::Mov,
        FileType::Zip,
        FileType::Docx,
        FileType::Xlsx,
        FileType::Pptx,
        FileType::Rar,
        FileType::Pdf,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Gif => "gif",
            FileType::Bmp => "bmp",
            FileType::Mp3 => "mp3",
            FileType::Wav => "wav",
            FileType::Mp4 => "mp4",
            FileType::Mov => "mov",
            FileType::Zip => "zip",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Pptx => "pptx",
            FileType::Rar => "rar",
            FileType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFileType(pub String);

impl fmt::Display for UnknownFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported file type: {}", self.0)
    }
}

impl std::error::Error for UnknownFileType {}

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "jpeg" {
            return Ok(FileType::Jpg);
        }
        FileType::ALL
            .into_iter()
            .find(|t| t.extension() == lower)
            .ok_or_else(|| UnknownFileType(s.to_string()))
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Part {
    Header,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileTypePart {
    pub file_type: FileType,
    pub part: Part,
}

impl FileTypePart {
    pub fn header(file_type: FileType) -> Self {
        Self {
            file_type,
            part: Part::Header,
        }
    }

    pub fn footer(file_type: FileType) -> Self {
        Self {
            file_type,
            part: Part::Footer,
        }
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        self.part == Part::Header
    }
}

/// A signature hit. `end` is the offset of the last matched byte, so a
/// one-byte match has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    pub start: Offset,
    pub end: Offset,
    pub kind: FileTypePart,
}

impl Match {
    pub fn new(start: Offset, end: Offset, kind: FileTypePart) -> Self {
        debug_assert!(start <= end);
        Self { start, end, kind }
    }

    #[inline]
    pub fn file_type(&self) -> FileType {
        self.kind.file_type
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        self.kind.is_header()
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// A header paired with the footer that closes it, if any.
pub type MatchPair = (Match, Option<Match>);

/// Carving quality, ordered by severity. See [`AnalysisResult::degrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnalysisResult {
    Correct,
    Partial,
    FormatError,
    Corrupted,
    Unrecognised,
    Unanalysed,
}

impl AnalysisResult {
    pub const VERDICTS: [AnalysisResult; 5] = [
        AnalysisResult::Correct,
        AnalysisResult::Partial,
        AnalysisResult::FormatError,
        AnalysisResult::Corrupted,
        AnalysisResult::Unrecognised,
    ];

    /// Folds a sub-check outcome into a running result. The result only ever
    /// moves towards the more severe end, and `Corrupted` absorbs everything
    /// after it.
    #[must_use]
    pub fn degrade(self, update: AnalysisResult) -> AnalysisResult {
        match (self, update) {
            (_, AnalysisResult::Unanalysed) => self,
            (AnalysisResult::Unanalysed, _) => update,
            (AnalysisResult::Corrupted, _) => AnalysisResult::Corrupted,
            _ => self.max(update),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisResult::Correct => "Correct",
            AnalysisResult::Partial => "Partial",
            AnalysisResult::FormatError => "FormatError",
            AnalysisResult::Corrupted => "Corrupted",
            AnalysisResult::Unrecognised => "Unrecognised",
            AnalysisResult::Unanalysed => "Unanalysed",
        }
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Facts a validator is certain about. `None` means "not determined".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFileInfo {
    pub actual_size: Option<u64>,
    pub actual_offset: Option<u64>,
    pub actual_type: Option<FileType>,
}

impl AnalysisFileInfo {
    pub fn with_size(size: u64) -> Self {
        Self {
            actual_size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_type(file_type: FileType) -> Self {
        Self {
            actual_type: Some(file_type),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingStrategy {
    /// Pair a footer with the most recent pending header.
    PairNext,
    /// Pair a footer with the most recent pending header no further than one
    /// chunk away; older headers are dropped.
    PairLast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrade_is_monotonic() {
        let r = AnalysisResult::Correct
            .degrade(AnalysisResult::Partial)
            .degrade(AnalysisResult::Correct);
        assert_eq!(r, AnalysisResult::Partial);

        let r = AnalysisResult::FormatError.degrade(AnalysisResult::Partial);
        assert_eq!(r, AnalysisResult::FormatError);
    }

    #[test]
    fn test_corrupted_absorbs() {
        let r = AnalysisResult::Corrupted.degrade(AnalysisResult::Unrecognised);
        assert_eq!(r, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_unanalysed_is_neutral() {
        assert_eq!(
            AnalysisResult::Unanalysed.degrade(AnalysisResult::Partial),
            AnalysisResult::Partial
        );
        assert_eq!(
            AnalysisResult::Correct.degrade(AnalysisResult::Unanalysed),
            AnalysisResult::Correct
        );
    }

    #[test]
    fn test_file_type_from_str() {
        assert_eq!("PNG".parse::<FileType>(), Ok(FileType::Png));
        assert_eq!("jpeg".parse::<FileType>(), Ok(FileType::Jpg));
        assert_eq!(" docx ".parse::<FileType>(), Ok(FileType::Docx));
        assert!("exe".parse::<FileType>().is_err());
    }

    #[test]
    fn test_match_len_is_inclusive() {
        let m = Match::new(10, 11, FileTypePart::header(FileType::Jpg));
        assert_eq!(m.len(), 2);
    }
}
