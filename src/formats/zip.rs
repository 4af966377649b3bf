//! ZIP containers, including the OOXML (docx/xlsx/pptx) subtypes.

use std::io::Read;

use flate2::read::DeflateDecoder;

use super::{le_u16, le_u32, rfind};
use crate::types::{AnalysisFileInfo, AnalysisResult, FileType};

pub const LOCAL_HEADER_SIG: u32 = 0x0403_4B50;
pub const CENTRAL_HEADER_SIG: u32 = 0x0201_4B50;
pub const EOCD_SIG: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;
const EOCD_LEN: usize = 22;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;
const FLAG_ENCRYPTED: u16 = 0x0001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralEntry {
    pub name: Vec<u8>,
    pub flags: u16,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub local_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub offset: usize,
    pub entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    /// Finds the last end-of-central-directory record in `data`.
    pub fn locate(data: &[u8]) -> Option<Self> {
        let offset = rfind(data, &EOCD_SIG)?;
        Some(Self {
            offset,
            entries: le_u16(data, offset + 10)?,
            cd_size: le_u32(data, offset + 12)?,
            cd_offset: le_u32(data, offset + 16)?,
            comment_len: le_u16(data, offset + 20)?,
        })
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset + EOCD_LEN + self.comment_len as usize
    }
}

fn read_central_entry(data: &[u8], pos: usize) -> Option<(CentralEntry, usize)> {
    if le_u32(data, pos)? != CENTRAL_HEADER_SIG {
        return None;
    }
    let name_len = le_u16(data, pos + 28)? as usize;
    let extra_len = le_u16(data, pos + 30)? as usize;
    let comment_len = le_u16(data, pos + 32)? as usize;
    let name_start = pos + CENTRAL_HEADER_LEN;
    let name = data.get(name_start..name_start + name_len)?.to_vec();

    let entry = CentralEntry {
        name,
        flags: le_u16(data, pos + 8)?,
        method: le_u16(data, pos + 10)?,
        crc32: le_u32(data, pos + 16)?,
        compressed_size: le_u32(data, pos + 20)?,
        uncompressed_size: le_u32(data, pos + 24)?,
        local_offset: le_u32(data, pos + 42)?,
    };
    Some((entry, name_start + name_len + extra_len + comment_len))
}

/// Compressed payload of the local entry at `local`.
fn local_payload<'a>(data: &'a [u8], local: usize, entry: &CentralEntry) -> Option<&'a [u8]> {
    if le_u32(data, local)? != LOCAL_HEADER_SIG {
        return None;
    }
    let name_len = le_u16(data, local + 26)? as usize;
    let extra_len = le_u16(data, local + 28)? as usize;
    let start = local + LOCAL_HEADER_LEN + name_len + extra_len;
    data.get(start..start + entry.compressed_size as usize)
}

/// Checks a local entry's stored CRC. Methods other than stored and deflate,
/// and encrypted entries, come back `Unanalysed`.
fn check_entry_crc(payload: &[u8], entry: &CentralEntry) -> AnalysisResult {
    if entry.flags & FLAG_ENCRYPTED != 0 {
        return AnalysisResult::Unanalysed;
    }

    let crc = match entry.method {
        METHOD_STORED => crc32fast::hash(payload),
        METHOD_DEFLATED => match inflate_crc(payload, entry.uncompressed_size as u64) {
            Some(crc) => crc,
            None => return AnalysisResult::Corrupted,
        },
        _ => return AnalysisResult::Unanalysed,
    };

    if crc == entry.crc32 {
        AnalysisResult::Correct
    } else {
        AnalysisResult::Corrupted
    }
}

fn inflate_crc(payload: &[u8], expected_len: u64) -> Option<u32> {
    let mut decoder = DeflateDecoder::new(payload);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 8192];
    let mut total = 0u64;

    loop {
        let n = decoder.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > expected_len {
            return None;
        }
        hasher.update(&buf[..n]);
    }

    (total == expected_len).then(|| hasher.finalize())
}

fn detect_subtype(entries: &[CentralEntry]) -> Option<FileType> {
    let has_prefix = |prefix: &[u8]| entries.iter().any(|e| e.name.starts_with(prefix));
    if !entries.iter().any(|e| e.name == b"[Content_Types].xml") {
        return None;
    }
    if has_prefix(b"word/") {
        Some(FileType::Docx)
    } else if has_prefix(b"xl/") {
        Some(FileType::Xlsx)
    } else if has_prefix(b"ppt/") {
        Some(FileType::Pptx)
    } else {
        None
    }
}

pub fn validate(file_type: FileType, data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    if le_u32(data, 0) != Some(LOCAL_HEADER_SIG) {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    }

    let Some(eocd) = EndOfCentralDirectory::locate(data) else {
        return (AnalysisResult::Partial, AnalysisFileInfo::default());
    };

    let mut result = AnalysisResult::Correct;
    let mut info = AnalysisFileInfo::default();

    if eocd.end() > data.len() {
        result = result.degrade(AnalysisResult::Partial);
    } else {
        info.actual_size = Some(eocd.end() as u64);
    }

    let Some(cd_pos) = eocd.offset.checked_sub(eocd.cd_size as usize) else {
        return (result.degrade(AnalysisResult::Corrupted), info);
    };

    // Offsets in the archive are relative to its first byte, which may not be
    // where this carve starts.
    let shift = cd_pos as i64 - eocd.cd_offset as i64;
    if shift < 0 {
        result = result.degrade(AnalysisResult::Partial);
    } else if shift > 0 {
        info.actual_offset = Some(shift as u64);
    }

    let mut entries = Vec::with_capacity(eocd.entries as usize);
    let mut pos = cd_pos;
    for _ in 0..eocd.entries {
        match read_central_entry(data, pos) {
            Some((entry, next)) => {
                entries.push(entry);
                pos = next;
            }
            None => {
                result = result.degrade(AnalysisResult::Corrupted);
                break;
            }
        }
    }
    if pos != eocd.offset {
        result = result.degrade(AnalysisResult::FormatError);
    }

    for entry in &entries {
        let local = entry.local_offset as i64 + shift;
        if local < 0 {
            continue;
        }
        let outcome = match local_payload(data, local as usize, entry) {
            Some(payload) => check_entry_crc(payload, entry),
            None => AnalysisResult::Corrupted,
        };
        result = result.degrade(outcome);
    }

    let detected = detect_subtype(&entries);
    match file_type {
        FileType::Docx | FileType::Xlsx | FileType::Pptx => {
            if detected != Some(file_type) {
                result = result.degrade(AnalysisResult::FormatError);
                info.actual_type = Some(detected.unwrap_or(FileType::Zip));
            }
        }
        _ => info.actual_type = detected,
    }

    (result, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    struct Entry<'a> {
        name: &'a str,
        body: &'a [u8],
        deflate: bool,
    }

    fn build_zip(entries: &[Entry<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for e in entries {
            let crc = crc32fast::hash(e.body);
            let (method, payload) = if e.deflate {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(e.body).unwrap();
                (METHOD_DEFLATED, enc.finish().unwrap())
            } else {
                (METHOD_STORED, e.body.to_vec())
            };
            let local_offset = out.len() as u32;

            out.extend_from_slice(&LOCAL_HEADER_SIG.to_le_bytes());
            out.extend_from_slice(&[0x14, 0x00, 0x06, 0x00]);
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(e.body.len() as u32).to_le_bytes());
            out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(e.name.as_bytes());
            out.extend_from_slice(&payload);

            central.extend_from_slice(&CENTRAL_HEADER_SIG.to_le_bytes());
            central.extend_from_slice(&[0x14, 0x00, 0x14, 0x00, 0x06, 0x00]);
            central.extend_from_slice(&method.to_le_bytes());
            central.extend_from_slice(&[0; 4]);
            central.extend_from_slice(&crc.to_le_bytes());
            central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            central.extend_from_slice(&(e.body.len() as u32).to_le_bytes());
            central.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0; 12]);
            central.extend_from_slice(&local_offset.to_le_bytes());
            central.extend_from_slice(e.name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(&EOCD_SIG);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    fn plain() -> Vec<u8> {
        build_zip(&[
            Entry { name: "a.txt", body: b"hello hello hello", deflate: false },
            Entry { name: "b.txt", body: &[b'z'; 300], deflate: true },
        ])
    }

    #[test]
    fn test_plain_zip_is_correct() {
        let data = plain();
        let (result, info) = validate(FileType::Zip, &data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_size, Some(data.len() as u64));
        assert_eq!(info.actual_type, None);
    }

    #[test]
    fn test_stored_crc_mismatch_is_corrupted() {
        let mut data = plain();
        // first byte of a.txt's body
        data[LOCAL_HEADER_LEN + 5] ^= 0x20;
        assert_eq!(validate(FileType::Zip, &data).0, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_missing_eocd_is_partial() {
        let mut data = plain();
        data.truncate(data.len() - EOCD_LEN);
        assert_eq!(validate(FileType::Zip, &data).0, AnalysisResult::Partial);
    }

    #[test]
    fn test_carve_starting_mid_archive_is_partial() {
        let data = plain();
        let second = LOCAL_HEADER_LEN + 5 + 17;
        let (result, _) = validate(FileType::Zip, &data[second..]);
        assert_eq!(result, AnalysisResult::Partial);
    }

    #[test]
    fn test_ooxml_subtype_detection() {
        let data = build_zip(&[
            Entry { name: "[Content_Types].xml", body: b"<Types/>", deflate: true },
            Entry { name: "word/document.xml", body: b"<w:document/>", deflate: true },
        ]);
        let (result, info) = validate(FileType::Docx, &data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_type, None);

        let (_, info) = validate(FileType::Zip, &data);
        assert_eq!(info.actual_type, Some(FileType::Docx));

        let (result, info) = validate(FileType::Xlsx, &data);
        assert_eq!(result, AnalysisResult::FormatError);
        assert_eq!(info.actual_type, Some(FileType::Docx));
    }

    #[test]
    fn test_not_zip() {
        assert_eq!(validate(FileType::Zip, b"Rar!\x1a\x07\x00").0, AnalysisResult::Unrecognised);
    }
}
