use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Result, ScoopError};

/// A seekable source of raw image bytes.
///
/// The search phase walks it sequentially with [`next_chunk`](Self::next_chunk);
/// the carve phase revisits chunk boundaries with [`read_at`](Self::read_at).
pub trait ChunkSource {
    /// Reads the next sequential chunk into `buf`. Returns the number of bytes
    /// read, which is only short at the end of the source and zero past it.
    fn next_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Fills `buf` from `offset`, stopping early only at the end of the source.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Total size of the source in bytes.
    fn size(&self) -> u64;

    /// Rewinds sequential reading to offset zero.
    fn reset(&mut self) -> io::Result<()>;
}

pub struct DiskReader<R = File> {
    inner: R,
    size: u64,
    position: u64,
}

impl DiskReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source| ScoopError::InputOpen {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new().read(true).open(path).map_err(open_err)?;
        if file.metadata().map_err(open_err)?.is_dir() {
            return Err(open_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "input is a directory",
            )));
        }

        Self::new(file).map_err(open_err)
    }
}

impl DiskReader<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            inner: Cursor::new(bytes),
            size,
            position: 0,
        }
    }
}

impl<R: Read + Seek> DiskReader<R> {
    /// Wraps any seekable reader. Block devices report a zero metadata length,
    /// so the size is always taken from the end position.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            size,
            position: 0,
        })
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read + Seek> ChunkSource for DiskReader<R> {
    fn next_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.size {
            return Ok(0);
        }
        self.inner.seek(SeekFrom::Start(self.position))?;
        let n = self.read_full(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.read_full(buf)
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    fn reset(&mut self) -> io::Result<()> {
        self.position = 0;
        self.inner.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_chunks() {
        let mut reader = DiskReader::from_bytes((0u8..10).collect());
        let mut buf = [0u8; 4];

        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 4);
        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[8, 9]);
        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 0);
        assert_eq!(reader.position(), 10);
    }

    #[test]
    fn test_read_at_does_not_move_cursor() {
        let mut reader = DiskReader::from_bytes((0u8..10).collect());
        let mut buf = [0u8; 3];

        assert_eq!(reader.read_at(6, &mut buf).unwrap(), 3);
        assert_eq!(buf, [6, 7, 8]);
        assert_eq!(reader.read_at(20, &mut buf).unwrap(), 0);

        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 3);
        assert_eq!(buf, [0, 1, 2]);
    }

    #[test]
    fn test_reset() {
        let mut reader = DiskReader::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 8];
        reader.next_chunk(&mut buf).unwrap();
        reader.reset().unwrap();
        assert_eq!(reader.next_chunk(&mut buf).unwrap(), 3);
    }

    #[test]
    fn test_open_missing_file() {
        let err = DiskReader::open("/definitely/not/here.img").err().unwrap();
        assert!(matches!(err, ScoopError::InputOpen { .. }));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        std::fs::write(&path, vec![7u8; 1000]).unwrap();

        let reader = DiskReader::open(&path).unwrap();
        assert_eq!(reader.size(), 1000);
    }
}
