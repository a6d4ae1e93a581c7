//! Buffered random-access file handle
//!
//! [`ByteStream`] wraps a single file and remembers its size at open time.
//! It implements [`Read`], [`Write`] and [`Seek`] so the scanner and writer
//! in [`crate::JpegIO`] can run against it or against any in-memory cursor.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How a [`ByteStream`] opens its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only, buffered
    Read,
    /// Create or truncate, buffered writes
    Write,
    /// Read and write an existing file, unbuffered
    ReadWrite,
}

/// Origin for [`ByteStream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    ReadWriter(File),
}

/// A single open file with a cached size
///
/// The size is computed once by [`ByteStream::open`] and is not updated by
/// writes through this handle.
#[derive(Default)]
pub struct ByteStream {
    handle: Option<Handle>,
    size: u64,
    filename: Option<PathBuf>,
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("open", &self.is_open())
            .field("size", &self.size)
            .field("filename", &self.filename)
            .finish()
    }
}

impl ByteStream {
    /// Create a closed stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` in `mode`, closing any previously open file first
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: OpenMode) -> Result<()> {
        self.close()?;

        let path = path.as_ref();
        let file = match mode {
            OpenMode::Read => File::open(path)?,
            OpenMode::Write => File::create(path)?,
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path)?,
        };

        let mut handle = match mode {
            OpenMode::Read => Handle::Reader(BufReader::new(file)),
            OpenMode::Write => Handle::Writer(BufWriter::new(file)),
            OpenMode::ReadWrite => Handle::ReadWriter(file),
        };

        let size = handle.seek(SeekFrom::End(0))?;
        handle.seek(SeekFrom::Start(0))?;

        self.handle = Some(handle);
        self.size = size;
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    /// Flush and release the file; safe to call when already closed
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take();
        self.size = 0;
        self.filename = None;
        if let Some(mut handle) = handle {
            handle.flush()?;
        }
        Ok(())
    }

    /// Whether a file is currently open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Next byte, or `None` at end of file, on error, or when closed
    pub fn read_byte(&mut self) -> Option<u8> {
        let handle = self.handle.as_mut()?;
        let mut byte = [0u8; 1];
        loop {
            match handle.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => return Some(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return None,
            }
        }
    }

    /// Move the file position, returning the new absolute position
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
        let pos = match whence {
            Whence::Start => {
                let start = u64::try_from(offset).map_err(|_| {
                    Error::InvalidFormat(format!("Negative absolute seek: {}", offset))
                })?;
                SeekFrom::Start(start)
            }
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        Ok(handle.seek(pos)?)
    }

    /// Current file position
    pub fn tell(&mut self) -> Result<u64> {
        let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
        Ok(handle.stream_position()?)
    }

    /// Fill `buffer` as far as the file allows
    ///
    /// Returns the number of bytes actually read; a count below
    /// `buffer.len()` means end of file was reached.
    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
        let mut filled = 0;
        while filled < buffer.len() {
            match handle.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Write all of `buffer`, returning the number of bytes written
    pub fn write_bytes(&mut self, buffer: &[u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
        handle.write_all(buffer)?;
        Ok(buffer.len())
    }

    /// File size cached at open time (0 when closed)
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the open file
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        let name = self.filename.clone();
        if let Err(e) = self.close() {
            log::warn!("Failed to flush {:?} on drop: {}", name, e);
        }
    }
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is not open")
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.as_mut().ok_or_else(not_open)?.read(buf)
    }
}

impl Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.as_mut().ok_or_else(not_open)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.handle.as_mut() {
            Some(handle) => handle.flush(),
            None => Ok(()),
        }
    }
}

impl Seek for ByteStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.handle.as_mut().ok_or_else(not_open)?.seek(pos)
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Handle::Reader(r) => r.read(buf),
            Handle::Writer(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream opened for writing",
            )),
            Handle::ReadWriter(f) => f.read(buf),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Handle::Reader(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream opened for reading",
            )),
            Handle::Writer(w) => w.write(buf),
            Handle::ReadWriter(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Handle::Reader(_) => Ok(()),
            Handle::Writer(w) => w.flush(),
            Handle::ReadWriter(f) => f.flush(),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Handle::Reader(r) => r.seek(pos),
            Handle::Writer(w) => w.seek(pos),
            Handle::ReadWriter(f) => f.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_caches_size() {
        let file = scratch(b"0123456789");
        let mut stream = ByteStream::new();
        assert_eq!(stream.size(), 0);

        stream.open(file.path(), OpenMode::Read).unwrap();
        assert_eq!(stream.size(), 10);
        assert_eq!(stream.tell().unwrap(), 0);
        assert_eq!(stream.filename(), Some(file.path()));
    }

    #[test]
    fn test_read_byte_and_eof() {
        let file = scratch(&[0xFF, 0xD8]);
        let mut stream = ByteStream::new();
        assert_eq!(stream.read_byte(), None, "closed stream yields EOF");

        stream.open(file.path(), OpenMode::Read).unwrap();
        assert_eq!(stream.read_byte(), Some(0xFF));
        assert_eq!(stream.read_byte(), Some(0xD8));
        assert_eq!(stream.read_byte(), None);
    }

    #[test]
    fn test_seek_whence() {
        let file = scratch(b"abcdefgh");
        let mut stream = ByteStream::new();
        stream.open(file.path(), OpenMode::Read).unwrap();

        assert_eq!(stream.seek(3, Whence::Start).unwrap(), 3);
        assert_eq!(stream.seek(2, Whence::Current).unwrap(), 5);
        assert_eq!(stream.seek(-1, Whence::End).unwrap(), 7);
        assert_eq!(stream.read_byte(), Some(b'h'));
        assert!(stream.seek(-1, Whence::Start).is_err());
    }

    #[test]
    fn test_short_read_reports_count() {
        let file = scratch(b"abc");
        let mut stream = ByteStream::new();
        stream.open(file.path(), OpenMode::Read).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(stream.read_bytes(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_write_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut stream = ByteStream::new();
        stream.open(&path, OpenMode::Write).unwrap();
        assert_eq!(stream.write_bytes(b"hello").unwrap(), 5);
        assert_eq!(stream.size(), 0, "size is not updated by writes");

        stream.open(&path, OpenMode::Read).unwrap();
        assert_eq!(stream.size(), 5);
    }

    #[test]
    fn test_close_is_idempotent() {
        let file = scratch(b"x");
        let mut stream = ByteStream::new();
        stream.open(file.path(), OpenMode::Read).unwrap();

        stream.close().unwrap();
        stream.close().unwrap();
        assert!(!stream.is_open());
        assert_eq!(stream.filename(), None);
        assert_eq!(stream.size(), 0);
        assert!(matches!(stream.tell(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = ByteStream::new();
        assert!(stream
            .open(dir.path().join("missing.jpg"), OpenMode::Read)
            .is_err());
        assert!(!stream.is_open());
        assert_eq!(stream.size(), 0);
    }
}
