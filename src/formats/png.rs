use super::be_u32;
use crate::types::{AnalysisFileInfo, AnalysisResult};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR_LEN: u32 = 13;

const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ihdr {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub colour_type: u8,
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

impl Ihdr {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() != IHDR_LEN as usize {
            return None;
        }
        Some(Self {
            width: be_u32(payload, 0)?,
            height: be_u32(payload, 4)?,
            bit_depth: payload[8],
            colour_type: payload[9],
            compression: payload[10],
            filter: payload[11],
            interlace: payload[12],
        })
    }

    pub fn is_valid(&self) -> bool {
        let depth_ok = match self.colour_type {
            0 => matches!(self.bit_depth, 1 | 2 | 4 | 8 | 16),
            3 => matches!(self.bit_depth, 1 | 2 | 4 | 8),
            2 | 4 | 6 => matches!(self.bit_depth, 8 | 16),
            _ => false,
        };

        depth_ok
            && self.width > 0
            && self.height > 0
            && self.width <= MAX_CHUNK_LEN
            && self.height <= MAX_CHUNK_LEN
            && self.compression == 0
            && self.filter == 0
            && self.interlace <= 1
    }

    #[inline]
    pub fn requires_palette(&self) -> bool {
        self.colour_type == 3
    }

    #[inline]
    pub fn forbids_palette(&self) -> bool {
        matches!(self.colour_type, 0 | 4)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PngChunk<'a> {
    pub offset: usize,
    pub chunk_type: [u8; 4],
    pub payload: &'a [u8],
    pub stored_crc: u32,
}

impl PngChunk<'_> {
    #[inline]
    pub fn crc_matches(&self) -> bool {
        chunk_crc(&self.chunk_type, self.payload) == self.stored_crc
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.offset + 12 + self.payload.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    Truncated { offset: usize },
    Oversized { offset: usize, length: u32 },
}

pub struct PngChunkIterator<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> PngChunkIterator<'a> {
    pub fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < 8 || data[..8] != PNG_SIGNATURE {
            return None;
        }

        Some(Self {
            data,
            pos: 8,
            done: false,
        })
    }
}

impl<'a> Iterator for PngChunkIterator<'a> {
    type Item = Result<PngChunk<'a>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }

        let offset = self.pos;
        let Some(length) = be_u32(self.data, offset) else {
            self.done = true;
            return Some(Err(ChunkError::Truncated { offset }));
        };

        if length > MAX_CHUNK_LEN {
            self.done = true;
            return Some(Err(ChunkError::Oversized { offset, length }));
        }

        let total_size = 12 + length as usize;
        if offset + total_size > self.data.len() {
            self.done = true;
            return Some(Err(ChunkError::Truncated { offset }));
        }

        let chunk_type = [
            self.data[offset + 4],
            self.data[offset + 5],
            self.data[offset + 6],
            self.data[offset + 7],
        ];
        let payload = &self.data[offset + 8..offset + 8 + length as usize];
        let stored_crc = be_u32(self.data, offset + 8 + length as usize)?;

        self.pos += total_size;

        Some(Ok(PngChunk {
            offset,
            chunk_type,
            payload,
            stored_crc,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdatRun {
    NotSeen,
    Open,
    Closed,
}

pub fn validate(data: &[u8]) -> (AnalysisResult, AnalysisFileInfo) {
    let Some(chunks) = PngChunkIterator::new(data) else {
        return (AnalysisResult::Unrecognised, AnalysisFileInfo::default());
    };

    let mut result = AnalysisResult::Correct;
    let mut ihdr: Option<Ihdr> = None;
    let mut idat = IdatRun::NotSeen;
    let mut palette_seen = false;
    let mut iend_end = None;

    for (index, chunk) in chunks.enumerate() {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(_) => {
                result = result.degrade(AnalysisResult::Corrupted);
                break;
            }
        };

        if !chunk.chunk_type.iter().all(u8::is_ascii_alphabetic) {
            result = result.degrade(AnalysisResult::Corrupted);
            break;
        }

        if !chunk.crc_matches() {
            result = result.degrade(AnalysisResult::Corrupted);
        }

        if index == 0 {
            match (&chunk.chunk_type, Ihdr::parse(chunk.payload)) {
                (b"IHDR", Some(header)) => {
                    if !header.is_valid() {
                        result = result.degrade(AnalysisResult::FormatError);
                    }
                    ihdr = Some(header);
                }
                _ => result = result.degrade(AnalysisResult::FormatError),
            }
            continue;
        }

        match &chunk.chunk_type {
            b"IHDR" => result = result.degrade(AnalysisResult::FormatError),
            b"IDAT" => {
                if idat == IdatRun::Closed {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                idat = IdatRun::Open;
            }
            b"PLTE" => {
                let forbidden = ihdr.is_some_and(|h| h.forbids_palette());
                if forbidden
                    || palette_seen
                    || idat != IdatRun::NotSeen
                    || chunk.payload.is_empty()
                    || chunk.payload.len() % 3 != 0
                {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                palette_seen = true;
            }
            b"IEND" => {
                if !chunk.payload.is_empty() {
                    result = result.degrade(AnalysisResult::FormatError);
                }
                iend_end = Some(chunk.end());
                break;
            }
            _ => {}
        }

        if idat == IdatRun::Open && &chunk.chunk_type != b"IDAT" {
            idat = IdatRun::Closed;
        }
    }

    if ihdr.is_some_and(|h| h.requires_palette()) && !palette_seen {
        result = result.degrade(AnalysisResult::FormatError);
    }
    if idat == IdatRun::NotSeen || iend_end.is_none() {
        result = result.degrade(AnalysisResult::Partial);
    }

    let info = AnalysisFileInfo {
        actual_size: iend_end.map(|end| end as u64),
        ..Default::default()
    };
    (result, info)
}

/// CRC-32 over a chunk's type and payload bytes.
pub fn chunk_crc(chunk_type: &[u8; 4], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(payload);
        out.extend_from_slice(&chunk_crc(chunk_type, payload).to_be_bytes());
        out
    }

    fn ihdr(colour_type: u8, bit_depth: u8) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&16u32.to_be_bytes());
        payload.extend_from_slice(&16u32.to_be_bytes());
        payload.extend_from_slice(&[bit_depth, colour_type, 0, 0, 0]);
        chunk(b"IHDR", &payload)
    }

    fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    fn minimal() -> Vec<u8> {
        png(&[ihdr(2, 8), chunk(b"IDAT", &[0x78, 0x9C, 0x01]), chunk(b"IEND", &[])])
    }

    #[test]
    fn test_minimal_png_is_correct() {
        let data = minimal();
        let (result, info) = validate(&data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_size, Some(data.len() as u64));
    }

    #[test]
    fn test_bad_crc_is_corrupted() {
        let mut data = minimal();
        // last byte of the IHDR CRC
        data[8 + 12 + 13 - 1] ^= 0xFF;
        assert_eq!(validate(&data).0, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_missing_idat_is_partial() {
        let data = png(&[ihdr(2, 8), chunk(b"IEND", &[])]);
        assert_eq!(validate(&data).0, AnalysisResult::Partial);
    }

    #[test]
    fn test_missing_iend_is_partial() {
        let data = png(&[ihdr(2, 8), chunk(b"IDAT", &[1, 2, 3])]);
        let (result, info) = validate(&data);
        assert_eq!(result, AnalysisResult::Partial);
        assert_eq!(info.actual_size, None);
    }

    #[test]
    fn test_trailing_bytes_after_iend_ignored() {
        let mut data = minimal();
        let len = data.len() as u64;
        data.extend_from_slice(&[0xAB; 32]);
        let (result, info) = validate(&data);
        assert_eq!(result, AnalysisResult::Correct);
        assert_eq!(info.actual_size, Some(len));
    }

    #[test]
    fn test_truncated_chunk_is_corrupted() {
        let mut data = png(&[ihdr(2, 8)]);
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(b"IDAT");
        data.extend_from_slice(&[0; 10]);
        assert_eq!(validate(&data).0, AnalysisResult::Corrupted);
    }

    #[test]
    fn test_invalid_colour_depth_pair() {
        let data = png(&[ihdr(2, 4), chunk(b"IDAT", &[1]), chunk(b"IEND", &[])]);
        assert_eq!(validate(&data).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_palette_rules() {
        let missing = png(&[ihdr(3, 8), chunk(b"IDAT", &[1]), chunk(b"IEND", &[])]);
        assert_eq!(validate(&missing).0, AnalysisResult::FormatError);

        let present = png(&[
            ihdr(3, 8),
            chunk(b"PLTE", &[0, 0, 0, 255, 255, 255]),
            chunk(b"IDAT", &[1]),
            chunk(b"IEND", &[]),
        ]);
        assert_eq!(validate(&present).0, AnalysisResult::Correct);

        let forbidden = png(&[
            ihdr(0, 8),
            chunk(b"PLTE", &[0, 0, 0]),
            chunk(b"IDAT", &[1]),
            chunk(b"IEND", &[]),
        ]);
        assert_eq!(validate(&forbidden).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_interrupted_idat_run() {
        let data = png(&[
            ihdr(2, 8),
            chunk(b"IDAT", &[1]),
            chunk(b"tEXt", b"k\0v"),
            chunk(b"IDAT", &[2]),
            chunk(b"IEND", &[]),
        ]);
        assert_eq!(validate(&data).0, AnalysisResult::FormatError);
    }

    #[test]
    fn test_not_png() {
        assert_eq!(validate(&[0xFF, 0xD8, 0xFF]).0, AnalysisResult::Unrecognised);
    }
}
