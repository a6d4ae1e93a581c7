//! Test utilities for synthesizing JPEG and EXIF fixtures.
//!
//! Fixtures are built in memory so tests do not depend on binary files:
//! - [`TiffBuilder`] produces an EXIF TIFF payload in either byte order
//! - [`JpegBuilder`] assembles a marker stream segment by segment
//!
//! # Usage
//!
//! ```
//! use jpeg_comment_io::test_utils::*;
//! use jpeg_comment_io::ByteOrder;
//!
//! let tiff = TiffBuilder::new(ByteOrder::BigEndian)
//!     .user_comment("from exif")
//!     .build();
//! let jpeg = JpegBuilder::new()
//!     .jfif()
//!     .exif(&tiff)
//!     .comment("from jfif")
//!     .baseline_image()
//!     .build();
//! assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
//! ```

use crate::exif::{tags, types, ByteOrder};
use crate::segment::markers;
use crate::Result;
use std::path::{Path, PathBuf};

/// Entropy-coded bytes used by [`JpegBuilder::baseline_image`], ending in EOI
pub const SAMPLE_SCAN_DATA: &[u8] = &[
    0x12, 0x34, 0xFF, 0x00, 0x56, 0x78, 0x9A, 0xFF, 0x00, 0xBC, 0xDE, 0xFF, 0xD9,
];

#[derive(Debug, Clone)]
struct RawEntry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

/// Builds a TIFF payload (the part of an EXIF APP1 after `Exif\0\0`)
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    order: ByteOrder,
    ifd0: Vec<RawEntry>,
    exif: Vec<RawEntry>,
    gps: Vec<RawEntry>,
}

impl TiffBuilder {
    /// Start a payload with an empty IFD0
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            ifd0: Vec::new(),
            exif: Vec::new(),
            gps: Vec::new(),
        }
    }

    fn u16_bytes(&self, value: u16) -> [u8; 2] {
        match self.order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    fn u32_bytes(&self, value: u32) -> [u8; 4] {
        match self.order {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Add Orientation (SHORT) to IFD0
    pub fn orientation(mut self, value: u16) -> Self {
        let data = self.u16_bytes(value).to_vec();
        self.ifd0.push(RawEntry {
            tag: tags::ORIENTATION,
            kind: types::SHORT,
            count: 1,
            data,
        });
        self
    }

    /// Add Make (ASCII) to IFD0
    pub fn make(mut self, make: &str) -> Self {
        let mut data = make.as_bytes().to_vec();
        data.push(0);
        self.ifd0.push(RawEntry {
            tag: tags::MAKE,
            kind: types::ASCII,
            count: data.len() as u32,
            data,
        });
        self
    }

    /// Add an ASCII-coded UserComment to the EXIF IFD
    pub fn user_comment(self, text: &str) -> Self {
        let mut raw = b"ASCII\0\0\0".to_vec();
        raw.extend_from_slice(text.as_bytes());
        self.raw_user_comment(raw)
    }

    /// Add a UserComment with caller-supplied bytes (prefix included)
    pub fn raw_user_comment(mut self, raw: Vec<u8>) -> Self {
        self.exif.push(RawEntry {
            tag: tags::USER_COMMENT,
            kind: types::UNDEFINED,
            count: raw.len() as u32,
            data: raw,
        });
        self
    }

    /// Add GPSVersionID 2.3.0.0 to the GPS IFD
    pub fn gps_version(mut self) -> Self {
        self.gps.push(RawEntry {
            tag: tags::GPS_VERSION_ID,
            kind: types::BYTE,
            count: 4,
            data: vec![2, 3, 0, 0],
        });
        self
    }

    fn ifd_size(entries: &[RawEntry]) -> usize {
        let out_of_line: usize = entries
            .iter()
            .filter(|e| e.data.len() > 4)
            .map(|e| (e.data.len() + 1) & !1)
            .sum();
        2 + entries.len() * 12 + 4 + out_of_line
    }

    fn write_ifd(&self, out: &mut Vec<u8>, entries: &[RawEntry]) {
        let start = out.len();
        let mut data_at = start + 2 + entries.len() * 12 + 4;
        let mut extra = Vec::new();

        out.extend_from_slice(&self.u16_bytes(entries.len() as u16));
        for e in entries {
            out.extend_from_slice(&self.u16_bytes(e.tag));
            out.extend_from_slice(&self.u16_bytes(e.kind));
            out.extend_from_slice(&self.u32_bytes(e.count));
            if e.data.len() <= 4 {
                let mut value = e.data.clone();
                value.resize(4, 0);
                out.extend_from_slice(&value);
            } else {
                out.extend_from_slice(&self.u32_bytes(data_at as u32));
                extra.extend_from_slice(&e.data);
                if e.data.len() % 2 == 1 {
                    extra.push(0);
                }
                data_at += (e.data.len() + 1) & !1;
            }
        }
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&extra);
    }

    fn pointer(&self, tag: u16, offset: usize) -> RawEntry {
        RawEntry {
            tag,
            kind: types::LONG,
            count: 1,
            data: self.u32_bytes(offset as u32).to_vec(),
        }
    }

    /// Serialize: header, IFD0, then EXIF and GPS IFDs when present
    pub fn build(&self) -> Vec<u8> {
        let mut ifd0 = self.ifd0.clone();
        if !self.exif.is_empty() {
            ifd0.push(self.pointer(tags::EXIF_IFD_POINTER, 0));
        }
        if !self.gps.is_empty() {
            ifd0.push(self.pointer(tags::GPS_IFD_POINTER, 0));
        }

        let exif_offset = 8 + Self::ifd_size(&ifd0);
        let gps_offset = exif_offset
            + if self.exif.is_empty() {
                0
            } else {
                Self::ifd_size(&self.exif)
            };

        for entry in ifd0.iter_mut() {
            match entry.tag {
                tags::EXIF_IFD_POINTER => *entry = self.pointer(entry.tag, exif_offset),
                tags::GPS_IFD_POINTER => *entry = self.pointer(entry.tag, gps_offset),
                _ => {}
            }
        }
        ifd0.sort_by_key(|e| e.tag);

        let mut out = Vec::new();
        match self.order {
            ByteOrder::LittleEndian => out.extend_from_slice(b"II"),
            ByteOrder::BigEndian => out.extend_from_slice(b"MM"),
        }
        out.extend_from_slice(&self.u16_bytes(0x002A));
        out.extend_from_slice(&self.u32_bytes(8));

        self.write_ifd(&mut out, &ifd0);
        if !self.exif.is_empty() {
            self.write_ifd(&mut out, &self.exif);
        }
        if !self.gps.is_empty() {
            self.write_ifd(&mut out, &self.gps);
        }
        out
    }
}

/// Assembles a JPEG marker stream
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    bytes: Vec<u8>,
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegBuilder {
    /// Start with an SOI marker
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF, markers::SOI],
        }
    }

    /// Append a marker segment with a correct length field
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0xFF, marker]);
        self.bytes
            .extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append arbitrary bytes
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// APP0 JFIF 1.01, 72 dpi, no thumbnail
    pub fn jfif(self) -> Self {
        self.segment(
            markers::APP0,
            b"JFIF\0\x01\x01\x01\x00\x48\x00\x48\x00\x00",
        )
    }

    /// APP1 `Exif\0\0` + TIFF payload
    pub fn exif(self, tiff: &[u8]) -> Self {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(tiff);
        self.segment(markers::APP1, &payload)
    }

    /// APP1 XMP packet
    pub fn xmp(self, packet: &str) -> Self {
        let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
        payload.extend_from_slice(packet.as_bytes());
        self.segment(markers::APP1, &payload)
    }

    /// COM segment
    pub fn comment(self, text: &str) -> Self {
        self.segment(markers::COM, text.as_bytes())
    }

    /// A single 8-bit quantization table
    pub fn dqt(self) -> Self {
        let mut payload = vec![0x00];
        payload.extend((1..=64).map(|v| v as u8));
        self.segment(markers::DQT, &payload)
    }

    /// DQT, SOF0, DHT, SOS header, entropy data and EOI
    pub fn baseline_image(self) -> Self {
        self.dqt().image_tail()
    }

    /// SOF0, DHT, SOS header, entropy data and EOI
    pub fn image_tail(self) -> Self {
        self.segment(
            markers::SOF0,
            &[0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00],
        )
        .segment(markers::DHT, &[0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x00])
        .segment(markers::SOS, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00])
        .raw(SAMPLE_SCAN_DATA)
    }

    /// Finished byte stream
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
