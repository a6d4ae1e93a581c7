//! Segment types and location tracking

/// JPEG marker bytes (the byte following `0xFF`)
pub mod markers {
    pub const SOF0: u8 = 0xC0; // Baseline DCT
    pub const DHT: u8 = 0xC4; // Huffman tables
    pub const SOI: u8 = 0xD8; // Start of Image
    pub const EOI: u8 = 0xD9; // End of Image
    pub const SOS: u8 = 0xDA; // Start of Scan (image data follows)
    pub const DQT: u8 = 0xDB; // Quantization tables
    pub const DRI: u8 = 0xDD; // Restart interval
    pub const APP0: u8 = 0xE0; // JFIF / JFXX
    pub const APP1: u8 = 0xE1; // EXIF / XMP
    pub const APP15: u8 = 0xEF;
    pub const COM: u8 = 0xFE; // Comment

    /// Sentinel for the trailing compressed-data pseudo segment
    pub const DATA: u8 = 0xFF;

    /// Whether `marker` is one of APP0..=APP15
    pub fn is_app(marker: u8) -> bool {
        marker & 0xF0 == 0xE0
    }
}

/// Maximum payload of a single marker segment (length field minus itself)
pub const MAX_MARKER_SIZE: usize = 65533;

/// Maximum size of a segment payload read into memory during a scan (256 MB)
///
/// Bounds APP0/APP1 inspection buffers so a forged length cannot request a
/// huge allocation.
pub const MAX_SEGMENT_SIZE: u64 = 256 * 1024 * 1024;

/// Name shown for markers the scanner records without interpreting
pub const NOT_PARSED: &str = "NOTPARSED";

/// Get human-readable label for a JPEG marker
pub fn marker_label(marker: u8) -> &'static str {
    match marker {
        0xD8 => "SOI",
        0xD9 => "EOI",
        0xDA => "SOS",
        0xDB => "DQT",
        0xC0 => "SOF0",
        0xC4 => "DHT",
        0xDD => "DRI",
        0xFE => "COM",
        0xE0 => "APP0",
        0xE1 => "APP1",
        0xE2 => "APP2",
        0xE3 => "APP3",
        0xE4 => "APP4",
        0xE5 => "APP5",
        0xE6 => "APP6",
        0xE7 => "APP7",
        0xE8 => "APP8",
        0xE9 => "APP9",
        0xEA => "APP10",
        0xEB => "APP11",
        0xEC => "APP12",
        0xED => "APP13",
        0xEE => "APP14",
        0xEF => "APP15",
        0xFF => "DATA",
        _ => NOT_PARSED,
    }
}

/// A byte range in a file (offset and size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset from start of file
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
}

impl ByteRange {
    /// Create a new byte range
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Get the end offset of this range
    pub fn end_offset(&self) -> u64 {
        self.offset + self.size
    }
}

/// Where the payload of a segment comes from at write time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSource {
    /// Payload lives in the source file at this offset
    Offset(u64),
    /// Payload replaced by an owned buffer
    Buffer(Vec<u8>),
}

/// One top-level JPEG marker segment
///
/// `length` excludes the two marker bytes and the two length bytes. For
/// buffer-mode segments it always equals the buffer length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Marker byte, or [`markers::DATA`] for the trailing image data
    pub marker: u8,
    /// Payload length
    pub length: u64,
    /// Offset in the source or an owned replacement buffer
    pub source: SegmentSource,
    /// Display name
    pub name: &'static str,
    /// Extra `0xFF` fill bytes that preceded the marker in the source
    pub fill: u64,
}

impl Segment {
    /// Create an offset-mode segment named after its marker
    ///
    /// # Example
    ///
    /// ```
    /// use jpeg_comment_io::{Segment, SegmentSource};
    ///
    /// let dqt = Segment::new(0xDB, 20, 67);
    /// assert_eq!(dqt.name, "DQT");
    /// assert_eq!(dqt.source, SegmentSource::Offset(20));
    /// ```
    pub fn new(marker: u8, offset: u64, length: u64) -> Self {
        Self {
            marker,
            length,
            source: SegmentSource::Offset(offset),
            name: marker_label(marker),
            fill: 0,
        }
    }

    /// Create a buffer-mode segment
    pub fn with_buffer(marker: u8, data: Vec<u8>) -> Self {
        Self {
            marker,
            length: data.len() as u64,
            source: SegmentSource::Buffer(data),
            name: marker_label(marker),
            fill: 0,
        }
    }

    /// The start-of-image record (no payload)
    pub fn soi() -> Self {
        Self::new(markers::SOI, 0, 0)
    }

    /// The trailing compressed-data pseudo segment
    pub fn data(offset: u64, length: u64) -> Self {
        Self::new(markers::DATA, offset, length)
    }

    /// Override the display name
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Record fill bytes written before the marker
    pub fn with_fill(mut self, fill: u64) -> Self {
        self.fill = fill;
        self
    }

    /// Source offset, if this segment is in offset mode
    pub fn offset(&self) -> Option<u64> {
        match self.source {
            SegmentSource::Offset(offset) => Some(offset),
            SegmentSource::Buffer(_) => None,
        }
    }

    /// Owned payload, if this segment is in buffer mode
    pub fn buffer(&self) -> Option<&[u8]> {
        match &self.source {
            SegmentSource::Buffer(data) => Some(data),
            SegmentSource::Offset(_) => None,
        }
    }

    /// Payload location in the source file (offset mode only)
    pub fn range(&self) -> Option<ByteRange> {
        self.offset().map(|offset| ByteRange::new(offset, self.length))
    }

    /// Check if this is an APPn segment
    pub fn is_app(&self) -> bool {
        markers::is_app(self.marker)
    }

    /// Check if this is a COM segment
    pub fn is_comment(&self) -> bool {
        self.marker == markers::COM
    }

    /// Check if this is the trailing data segment
    pub fn is_data(&self) -> bool {
        self.marker == markers::DATA
    }

    /// Check if this is the SOI record
    pub fn is_soi(&self) -> bool {
        self.marker == markers::SOI
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            SegmentSource::Offset(offset) => write!(
                f,
                "{} (0x{:02X}) @ {} len {}",
                self.name, self.marker, offset, self.length
            ),
            SegmentSource::Buffer(_) => write!(
                f,
                "{} (0x{:02X}) [buffer] len {}",
                self.name, self.marker, self.length
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_marker_range() {
        assert!(markers::is_app(0xE0));
        assert!(markers::is_app(0xEF));
        assert!(!markers::is_app(0xDF));
        assert!(!markers::is_app(0xF1));
    }

    #[test]
    fn test_unknown_marker_label() {
        assert_eq!(marker_label(0xF1), NOT_PARSED);
        assert_eq!(marker_label(0xFF), "DATA");
    }

    #[test]
    fn test_buffer_mode_overrides_offset() {
        let seg = Segment::with_buffer(markers::COM, b"hello".to_vec());
        assert_eq!(seg.length, 5);
        assert_eq!(seg.offset(), None);
        assert_eq!(seg.range(), None);
        assert_eq!(seg.buffer(), Some(&b"hello"[..]));
        assert!(seg.is_comment());
    }

    #[test]
    fn test_range() {
        let seg = Segment::data(100, 50);
        assert_eq!(seg.range(), Some(ByteRange::new(100, 50)));
        assert_eq!(seg.range().unwrap().end_offset(), 150);
        assert!(seg.is_data());
    }
}
