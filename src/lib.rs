//! Streaming JPEG segment parser with in-place comment rewriting.
//!
//! This crate scans a JPEG marker stream once, records where every segment
//! lives, decodes JFIF and EXIF metadata on the way, and writes the file back
//! with a new or replaced COM (comment) segment. Segments that were not
//! edited, including the entropy-coded image data, are copied byte for byte
//! from the source.
//!
//! # Design Principles
//!
//! - **Streaming**: Segments are cataloged by offset; only small metadata
//!   payloads are read into memory
//! - **Lossless**: Unknown markers and fill bytes are passed through untouched
//! - **Safe saves**: Overwriting the open file goes through a temporary file,
//!   and a failed write never leaves a partial output behind
//!
//! # Quick Start
//!
//! ```no_run
//! use jpeg_comment_io::JpegDocument;
//!
//! # fn main() -> jpeg_comment_io::Result<()> {
//! let mut doc = JpegDocument::open("image.jpg")?;
//! println!("Comment: {:?}", doc.comment());
//!
//! if let Some(exif) = doc.exif() {
//!     println!("Orientation: {:?}", exif.orientation());
//! }
//!
//! doc.set_comment("Edited")?;
//! doc.save("image.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Lower-Level API
//!
//! [`JpegIO`] works on any `Read + Seek` source, so it can scan in-memory
//! buffers too:
//!
//! ```
//! use jpeg_comment_io::{test_utils::JpegBuilder, JpegIO};
//! use std::io::Cursor;
//!
//! # fn main() -> jpeg_comment_io::Result<()> {
//! let bytes = JpegBuilder::new().comment("hello").baseline_image().build();
//! let structure = JpegIO::new().parse(&mut Cursor::new(&bytes))?;
//! assert_eq!(structure.comment.as_deref(), Some("hello"));
//!
//! let mut out = Vec::new();
//! JpegIO::new().write(&structure.catalog, &mut Cursor::new(&bytes), &mut out)?;
//! assert_eq!(out, bytes);
//! # Ok(())
//! # }
//! ```

mod byte_stream;
mod catalog;
mod comment;
mod document;
mod error;
mod exif;
mod jfif;
mod jpeg_io;
mod options;
mod segment;

pub use byte_stream::{ByteStream, OpenMode, Whence};
pub use catalog::SegmentCatalog;
pub use comment::{close_file, get_comment, open_file, save_file, set_comment};
pub use document::{JpegDocument, MAX_COMMENT_LEN};
pub use error::{Error, Result};
pub use exif::{
    tag_name, tags, type_size, types, ByteOrder, Charset, ExifDecoder, Ifd, IfdEntry,
    MAX_IFD_TAGS,
};
pub use jfif::{DensityUnits, JfifInfo};
pub use jpeg_io::{JpegIO, JpegStructure};
pub use options::{DocumentOptions, DEFAULT_TEMP_SUFFIX};
pub use segment::{
    marker_label, markers, ByteRange, Segment, SegmentSource, MAX_MARKER_SIZE, MAX_SEGMENT_SIZE,
    NOT_PARSED,
};

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
