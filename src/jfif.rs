//! APP0 JFIF / JFXX header decoding
//!
//! These fields are informational only; nothing in the rewrite path depends
//! on them.

use byteorder::{BigEndian, ByteOrder};

const JFIF_SIGNATURE: &[u8] = b"JFIF\0";
const JFXX_SIGNATURE: &[u8] = b"JFXX\0";

/// Density units declared by a JFIF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityUnits {
    /// Aspect ratio only
    None,
    PerInch,
    PerCentimeter,
    Unknown(u8),
}

impl From<u8> for DensityUnits {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::PerInch,
            2 => Self::PerCentimeter,
            other => Self::Unknown(other),
        }
    }
}

/// Decoded APP0 header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JfifInfo {
    /// `JFIF\0` header
    Jfif {
        version_major: u8,
        version_minor: u8,
        units: DensityUnits,
        x_density: u16,
        y_density: u16,
        thumbnail_width: u8,
        thumbnail_height: u8,
    },
    /// `JFXX\0` extension header
    Jfxx {
        /// 0x10 JPEG thumbnail, 0x11 palette, 0x13 RGB
        extension_code: u8,
    },
}

impl JfifInfo {
    /// Decode an APP0 payload; `None` for unrecognized signatures or short data
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.starts_with(JFIF_SIGNATURE) {
            let body = &payload[JFIF_SIGNATURE.len()..];
            if body.len() < 9 {
                return None;
            }
            Some(Self::Jfif {
                version_major: body[0],
                version_minor: body[1],
                units: DensityUnits::from(body[2]),
                x_density: BigEndian::read_u16(&body[3..5]),
                y_density: BigEndian::read_u16(&body[5..7]),
                thumbnail_width: body[7],
                thumbnail_height: body[8],
            })
        } else if payload.starts_with(JFXX_SIGNATURE) {
            let body = &payload[JFXX_SIGNATURE.len()..];
            body.first().map(|&extension_code| Self::Jfxx { extension_code })
        } else {
            None
        }
    }
}

impl std::fmt::Display for JfifInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jfif {
                version_major,
                version_minor,
                units,
                x_density,
                y_density,
                thumbnail_width,
                thumbnail_height,
            } => write!(
                f,
                "JFIF {}.{:02} density {}x{} {:?} thumbnail {}x{}",
                version_major,
                version_minor,
                x_density,
                y_density,
                units,
                thumbnail_width,
                thumbnail_height
            ),
            Self::Jfxx { extension_code } => write!(f, "JFXX extension 0x{:02X}", extension_code),
        }
    }
}
