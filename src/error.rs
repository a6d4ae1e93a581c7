//! Error types for jpeg-comment-io

use std::io;

/// Result type for jpeg-comment-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning, decoding or rewriting a JPEG
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream does not start with an SOI marker
    #[error("Not a JPEG file")]
    NotJpeg,

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid segment
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },

    /// EXIF payload could not be decoded
    #[error("Invalid EXIF data: {0}")]
    InvalidExif(String),

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },

    /// Save requested on a document with no pending changes
    #[error("Document has no pending changes")]
    NotModified,

    /// Operation requires an open stream
    #[error("Stream is not open")]
    NotOpen,

    /// Source ended before a segment could be copied in full
    #[error("Short copy of segment 0x{marker:02X}: expected {expected} bytes, copied {copied}")]
    ShortCopy {
        marker: u8,
        expected: u64,
        copied: u64,
    },
}
