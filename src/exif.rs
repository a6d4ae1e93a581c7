//! EXIF (TIFF-structured APP1 payload) decoder
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD0 offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! All offsets are relative to the start of the TIFF header, i.e. the first
//! byte after `Exif\0\0`. The decoder keeps its own copy of that payload and
//! never reads outside it.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use std::collections::HashSet;

/// TIFF/EXIF tag IDs
pub mod tags {
    pub const IMAGE_WIDTH: u16 = 0x0100;
    pub const IMAGE_LENGTH: u16 = 0x0101;
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const X_RESOLUTION: u16 = 0x011A;
    pub const Y_RESOLUTION: u16 = 0x011B;
    pub const RESOLUTION_UNIT: u16 = 0x0128;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATE_TIME: u16 = 0x0132;
    pub const ARTIST: u16 = 0x013B;
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
    pub const YCBCR_POSITIONING: u16 = 0x0213;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;
    pub const ISO_SPEED: u16 = 0x8827;
    pub const EXIF_VERSION: u16 = 0x9000;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const MAKER_NOTE: u16 = 0x927C;
    pub const USER_COMMENT: u16 = 0x9286;
    pub const COLOR_SPACE: u16 = 0xA001;
    pub const PIXEL_X_DIMENSION: u16 = 0xA002;
    pub const PIXEL_Y_DIMENSION: u16 = 0xA003;
    pub const GPS_VERSION_ID: u16 = 0x0000;
    pub const GPS_LATITUDE_REF: u16 = 0x0001;
    pub const GPS_LATITUDE: u16 = 0x0002;
    pub const GPS_LONGITUDE_REF: u16 = 0x0003;
    pub const GPS_LONGITUDE: u16 = 0x0004;
}

/// TIFF data types
pub mod types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
    pub const FLOAT: u16 = 11;
    pub const DOUBLE: u16 = 12;
}

/// Maximum number of tags in an IFD (prevents DOS attacks)
pub const MAX_IFD_TAGS: u16 = 1000;

const USER_COMMENT_PREFIX_LEN: usize = 8;

// Indexed by type code; unknown and zero codes fall back to 1.
const TYPE_SIZES: [usize; 13] = [1, 1, 1, 2, 4, 8, 1, 1, 2, 4, 8, 4, 8];

/// Size in bytes of one value of TIFF type `kind`
pub fn type_size(kind: u16) -> usize {
    TYPE_SIZES.get(kind as usize).copied().unwrap_or(1)
}

const TAG_NAMES: &[(u16, &str)] = &[
    (tags::IMAGE_WIDTH, "ImageWidth"),
    (tags::IMAGE_LENGTH, "ImageLength"),
    (tags::IMAGE_DESCRIPTION, "ImageDescription"),
    (tags::MAKE, "Make"),
    (tags::MODEL, "Model"),
    (tags::ORIENTATION, "Orientation"),
    (tags::X_RESOLUTION, "XResolution"),
    (tags::Y_RESOLUTION, "YResolution"),
    (tags::RESOLUTION_UNIT, "ResolutionUnit"),
    (tags::SOFTWARE, "Software"),
    (tags::DATE_TIME, "DateTime"),
    (tags::ARTIST, "Artist"),
    (tags::JPEG_INTERCHANGE_FORMAT, "JPEGInterchangeFormat"),
    (tags::JPEG_INTERCHANGE_FORMAT_LENGTH, "JPEGInterchangeFormatLength"),
    (tags::YCBCR_POSITIONING, "YCbCrPositioning"),
    (tags::COPYRIGHT, "Copyright"),
    (tags::EXPOSURE_TIME, "ExposureTime"),
    (tags::F_NUMBER, "FNumber"),
    (tags::EXIF_IFD_POINTER, "ExifIFDPointer"),
    (tags::GPS_IFD_POINTER, "GPSInfoIFDPointer"),
    (tags::ISO_SPEED, "ISOSpeedRatings"),
    (tags::EXIF_VERSION, "ExifVersion"),
    (tags::DATE_TIME_ORIGINAL, "DateTimeOriginal"),
    (tags::DATE_TIME_DIGITIZED, "DateTimeDigitized"),
    (tags::FOCAL_LENGTH, "FocalLength"),
    (tags::MAKER_NOTE, "MakerNote"),
    (tags::USER_COMMENT, "UserComment"),
    (tags::COLOR_SPACE, "ColorSpace"),
    (tags::PIXEL_X_DIMENSION, "PixelXDimension"),
    (tags::PIXEL_Y_DIMENSION, "PixelYDimension"),
];

const GPS_TAG_NAMES: &[(u16, &str)] = &[
    (tags::GPS_VERSION_ID, "GPSVersionID"),
    (tags::GPS_LATITUDE_REF, "GPSLatitudeRef"),
    (tags::GPS_LATITUDE, "GPSLatitude"),
    (tags::GPS_LONGITUDE_REF, "GPSLongitudeRef"),
    (tags::GPS_LONGITUDE, "GPSLongitude"),
];

/// Human-readable name of a tag within `ifd`
pub fn tag_name(ifd: Ifd, tag: u16) -> Option<&'static str> {
    let table = match ifd {
        Ifd::Gps => GPS_TAG_NAMES,
        _ => TAG_NAMES,
    };
    table.iter().find(|(id, _)| *id == tag).map(|(_, name)| *name)
}

/// Byte order for reading multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II`
    LittleEndian,
    /// `MM`
    BigEndian,
}

impl ByteOrder {
    /// Detect from the first two bytes of a TIFF header
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            b"II" => Some(Self::LittleEndian),
            b"MM" => Some(Self::BigEndian),
            _ => None,
        }
    }

    /// Read a u16 from the first two bytes of `data`
    ///
    /// Panics if `data` is shorter than two bytes.
    pub fn read_u16(&self, data: &[u8]) -> u16 {
        match self {
            Self::LittleEndian => LittleEndian::read_u16(data),
            Self::BigEndian => BigEndian::read_u16(data),
        }
    }

    /// Read a u32 from the first four bytes of `data`
    ///
    /// Panics if `data` is shorter than four bytes.
    pub fn read_u32(&self, data: &[u8]) -> u32 {
        match self {
            Self::LittleEndian => LittleEndian::read_u32(data),
            Self::BigEndian => BigEndian::read_u32(data),
        }
    }
}

/// Which directory an entry was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ifd {
    /// Main image
    Ifd0,
    /// Thumbnail (linked from IFD0)
    Ifd1,
    /// EXIF sub-IFD (tag 0x8769)
    Exif,
    /// GPS sub-IFD (tag 0x8825)
    Gps,
}

/// One 12-byte IFD entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub ifd: Ifd,
    pub tag: u16,
    /// TIFF type code (1..=12 when well formed)
    pub kind: u16,
    pub count: u32,
    /// Last four bytes of the entry decoded in the payload byte order
    pub value_or_offset: u32,
    /// Last four bytes of the entry as stored
    pub raw_value: [u8; 4],
}

impl IfdEntry {
    /// Size of the value in bytes, if it does not overflow
    pub fn byte_len(&self) -> Option<usize> {
        type_size(self.kind).checked_mul(self.count as usize)
    }

    /// Whether the value is stored inside the entry itself
    pub fn is_inline(&self) -> bool {
        self.byte_len().is_some_and(|len| len <= 4)
    }
}

/// Character code announced by the 8-byte UserComment prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Ascii,
    Jis,
    Unicode,
    Undefined,
}

impl Charset {
    fn from_prefix(prefix: &[u8]) -> Self {
        match prefix {
            b"ASCII\0\0\0" => Self::Ascii,
            b"JIS\0\0\0\0\0" => Self::Jis,
            b"UNICODE\0" => Self::Unicode,
            _ => Self::Undefined,
        }
    }
}

/// Decoded EXIF payload
#[derive(Debug, Clone)]
pub struct ExifDecoder {
    data: Vec<u8>,
    base_offset: u64,
    byte_order: ByteOrder,
    entries: Vec<IfdEntry>,
}

impl ExifDecoder {
    /// Decode a TIFF payload
    ///
    /// `data` starts at the TIFF header (after `Exif\0\0`); `base_offset` is
    /// the file offset of that header. Malformed directories are skipped with
    /// a warning; only a bad header is an error.
    pub fn parse(data: Vec<u8>, base_offset: u64) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::InvalidExif(format!(
                "TIFF header truncated ({} bytes)",
                data.len()
            )));
        }

        let byte_order = ByteOrder::from_marker(&data[0..2])
            .ok_or_else(|| Error::InvalidExif("Unknown byte order mark".into()))?;

        let magic = byte_order.read_u16(&data[2..4]);
        if magic != 0x002A {
            return Err(Error::InvalidExif(format!("Bad TIFF magic 0x{:04X}", magic)));
        }

        let ifd0_offset = byte_order.read_u32(&data[4..8]);

        let mut decoder = Self {
            data,
            base_offset,
            byte_order,
            entries: Vec::new(),
        };
        decoder.walk(ifd0_offset);
        Ok(decoder)
    }

    /// Walk IFD0 and everything reachable from it, refusing revisits
    fn walk(&mut self, ifd0_offset: u32) {
        let mut visited = HashSet::new();
        let mut pending = vec![(Ifd::Ifd0, ifd0_offset)];

        while let Some((ifd, offset)) = pending.pop() {
            if offset == 0 {
                continue;
            }
            if !visited.insert(offset) {
                log::warn!("EXIF {:?} at offset {} already visited, skipping", ifd, offset);
                continue;
            }

            let Some(next) = self.read_ifd(ifd, offset) else {
                continue;
            };

            let first_new = self.entries.len() - next.entry_count;
            for entry in &self.entries[first_new..] {
                let child = match entry.tag {
                    tags::EXIF_IFD_POINTER => Ifd::Exif,
                    tags::GPS_IFD_POINTER => Ifd::Gps,
                    _ => continue,
                };
                pending.push((child, entry.value_or_offset));
            }

            if ifd == Ifd::Ifd0 {
                pending.push((Ifd::Ifd1, next.next_offset));
            }
        }
    }

    /// Decode the entries of one IFD, appending them to `self.entries`
    fn read_ifd(&mut self, ifd: Ifd, offset: u32) -> Option<IfdRead> {
        let start = offset as usize;
        let Some(count_bytes) = self.data.get(start..start.saturating_add(2)) else {
            log::warn!("EXIF {:?} offset {} outside payload", ifd, offset);
            return None;
        };

        let tag_count = self.byte_order.read_u16(count_bytes);
        if tag_count > MAX_IFD_TAGS {
            log::warn!("EXIF {:?} claims {} tags, skipping", ifd, tag_count);
            return None;
        }

        let table = start + 2;
        let available = (self.data.len() - table) / 12;
        let usable = (tag_count as usize).min(available);
        if usable < tag_count as usize {
            log::warn!(
                "EXIF {:?} truncated: {} of {} entries present",
                ifd,
                usable,
                tag_count
            );
        }

        for i in 0..usable {
            let at = table + i * 12;
            let bytes = &self.data[at..at + 12];
            let raw_value = [bytes[8], bytes[9], bytes[10], bytes[11]];
            let entry = IfdEntry {
                ifd,
                tag: self.byte_order.read_u16(&bytes[0..2]),
                kind: self.byte_order.read_u16(&bytes[2..4]),
                count: self.byte_order.read_u32(&bytes[4..8]),
                value_or_offset: self.byte_order.read_u32(&raw_value),
                raw_value,
            };
            log::trace!(
                "EXIF {:?} tag 0x{:04X} ({}) type {} count {}",
                ifd,
                entry.tag,
                tag_name(ifd, entry.tag).unwrap_or("?"),
                entry.kind,
                entry.count
            );
            self.entries.push(entry);
        }

        let link = table + tag_count as usize * 12;
        let next_offset = self
            .data
            .get(link..link + 4)
            .map_or(0, |b| self.byte_order.read_u32(b));

        Some(IfdRead {
            entry_count: usable,
            next_offset,
        })
    }

    /// Read a u16 honoring the payload byte order
    pub fn get16(&self, data: &[u8]) -> u16 {
        self.byte_order.read_u16(data)
    }

    /// Read a u32 honoring the payload byte order
    pub fn get32(&self, data: &[u8]) -> u32 {
        self.byte_order.read_u32(data)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// File offset of the TIFF header
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// The TIFF payload this decoder was built from
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// All decoded entries in walk order
    pub fn entries(&self) -> impl Iterator<Item = &IfdEntry> {
        self.entries.iter()
    }

    /// First entry for `tag` in `ifd`
    pub fn entry(&self, ifd: Ifd, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.ifd == ifd && e.tag == tag)
    }

    /// First entry for `tag` in any directory
    pub fn find_tag(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Value bytes of an entry, inline or out of line
    ///
    /// Returns `None` when an out-of-line value would leave the payload.
    pub fn value_bytes<'a>(&'a self, entry: &'a IfdEntry) -> Option<&'a [u8]> {
        let len = entry.byte_len()?;
        if len <= 4 {
            return Some(&entry.raw_value[..len]);
        }
        let start = entry.value_or_offset as usize;
        self.data.get(start..start.checked_add(len)?)
    }

    /// ASCII value of an entry with trailing NULs and spaces trimmed
    pub fn ascii_value(&self, entry: &IfdEntry) -> Option<String> {
        if entry.kind != types::ASCII {
            return None;
        }
        let bytes = self.value_bytes(entry)?;
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches(['\0', ' ']);
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Image orientation (1-8) from IFD0
    pub fn orientation(&self) -> Option<u16> {
        let entry = self.entry(Ifd::Ifd0, tags::ORIENTATION)?;
        (entry.kind == types::SHORT && entry.count >= 1).then(|| self.get16(&entry.raw_value))
    }

    /// Raw UserComment value including its 8-byte character code prefix
    pub fn user_comment_bytes(&self) -> Option<&[u8]> {
        let entry = self.find_tag(tags::USER_COMMENT)?;
        self.value_bytes(entry)
    }

    /// Character code of the UserComment, if the tag is present
    pub fn user_comment_charset(&self) -> Option<Charset> {
        let bytes = self.user_comment_bytes()?;
        let prefix = bytes.get(..USER_COMMENT_PREFIX_LEN)?;
        Some(Charset::from_prefix(prefix))
    }

    /// UserComment text without its character code prefix
    ///
    /// Empty when the tag is absent or too short to carry a prefix.
    pub fn user_comment(&self) -> String {
        let Some(bytes) = self.user_comment_bytes() else {
            return String::new();
        };
        if bytes.len() < USER_COMMENT_PREFIX_LEN {
            return String::new();
        }
        let (prefix, body) = bytes.split_at(USER_COMMENT_PREFIX_LEN);

        let text = match Charset::from_prefix(prefix) {
            Charset::Unicode => {
                let units: Vec<u16> = body
                    .chunks_exact(2)
                    .map(|pair| self.byte_order.read_u16(pair))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            _ => String::from_utf8_lossy(body).into_owned(),
        };
        text.trim_end_matches(['\0', ' ']).to_string()
    }
}

struct IfdRead {
    entry_count: usize,
    next_offset: u32,
}
