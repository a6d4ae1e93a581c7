//! JPEG marker stream scanning and rewriting
//!
//! [`JpegIO::parse`] walks the top-level markers once and records where
//! every segment lives; [`JpegIO::write`] reproduces the file from that
//! catalog, copying untouched segments verbatim from the source.

use crate::{
    catalog::SegmentCatalog,
    error::{Error, Result},
    exif::ExifDecoder,
    jfif::JfifInfo,
    options::DocumentOptions,
    segment::{marker_label, markers, Segment, SegmentSource, MAX_MARKER_SIZE, NOT_PARSED},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, copy, Read, Seek, SeekFrom, Write};

const EXIF_SIGNATURE: &[u8] = b"Exif\0";
const XMP_SIGNATURE_PREFIX: &[u8] = b"http:";
const APP1_SIGNATURE_LEN: u64 = 6;

/// Everything a scan discovers about a JPEG
#[derive(Debug, Default)]
pub struct JpegStructure {
    /// Segments in file order, ending with the DATA pseudo segment
    pub catalog: SegmentCatalog,
    /// Decoder for the first EXIF APP1 block
    pub exif: Option<ExifDecoder>,
    /// Payload of the last COM segment seen
    pub comment: Option<String>,
    /// First decodable APP0 header
    pub jfif: Option<JfifInfo>,
    /// Total stream size
    pub total_size: u64,
}

/// JPEG scanner and writer
#[derive(Debug, Clone, Default)]
pub struct JpegIO {
    options: DocumentOptions,
}

impl JpegIO {
    /// Create a scanner with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with custom limits
    pub fn with_options(options: DocumentOptions) -> Self {
        Self { options }
    }

    /// Detect if this is a JPEG file from header
    pub fn detect(header: &[u8]) -> bool {
        header.len() >= 2 && header[0] == 0xFF && header[1] == markers::SOI
    }

    /// Single-pass scan of the marker stream
    ///
    /// Only a missing SOI is fatal. Malformed lengths, short payloads and
    /// unknown markers are logged and recorded as they are found.
    pub fn parse<R: Read + Seek>(&self, source: &mut R) -> Result<JpegStructure> {
        let total_size = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut signature = [0u8; 2];
        if read_up_to(source, &mut signature)? != 2 || !Self::detect(&signature) {
            return Err(Error::NotJpeg);
        }

        let mut structure = JpegStructure {
            total_size,
            ..Default::default()
        };
        structure.catalog.add_segment(Segment::soi());

        let data_offset = 'scan: loop {
            let Some(prefix) = read_byte(source)? else {
                break source.stream_position()?.min(total_size);
            };
            // First FF of the marker, fill bytes included
            let marker_start = source.stream_position()? - 1;
            if prefix != 0xFF {
                // Entropy-coded data or trailing garbage starts here
                break marker_start;
            }

            let Some(mut marker) = read_byte(source)? else {
                break marker_start;
            };
            let mut fill = 0u64;
            while marker == 0xFF {
                fill += 1;
                match read_byte(source)? {
                    Some(next) => marker = next,
                    None => break 'scan marker_start,
                }
            }
            if fill > 0 {
                log::debug!("{} fill bytes before marker at {}", fill, marker_start);
            }

            if marker == markers::EOI {
                break marker_start;
            }

            let field = match source.read_u16::<BigEndian>() {
                Ok(field) => field,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    log::warn!(
                        "Length of marker 0x{:02X} at {} truncated by end of file",
                        marker,
                        marker_start
                    );
                    break marker_start;
                }
                Err(e) => return Err(e.into()),
            };

            let offset = source.stream_position()?;
            let length = if field < 2 {
                log::warn!(
                    "Marker 0x{:02X} at {} has invalid length field {}",
                    marker,
                    marker_start,
                    field
                );
                0
            } else {
                (field - 2) as u64
            };

            match marker {
                m if markers::is_app(m) => {
                    structure
                        .catalog
                        .add_segment(Segment::new(m, offset, length).with_fill(fill));
                    let inspected = match m {
                        markers::APP0 => {
                            self.inspect_app0(source, offset, length, &mut structure)
                        }
                        markers::APP1 => {
                            self.inspect_app1(source, offset, length, &mut structure)
                        }
                        _ => Ok(()),
                    };
                    if let Err(e) = inspected {
                        log::warn!("Skipping {} payload at {}: {}", marker_label(m), offset, e);
                    }
                }
                markers::DHT
                | markers::DQT
                | markers::SOS
                | markers::SOF0
                | markers::DRI
                | markers::COM => {
                    structure
                        .catalog
                        .add_segment(Segment::new(marker, offset, length).with_fill(fill));
                    if marker == markers::COM {
                        structure.comment = Some(self.read_comment(source, offset, length)?);
                    }
                }
                _ => {
                    structure.catalog.add_segment(
                        Segment::new(marker, offset, length)
                            .named(NOT_PARSED)
                            .with_fill(fill),
                    );
                }
            }

            source.seek(SeekFrom::Start(offset + length))?;

            if marker == markers::SOS {
                break offset + length;
            }
        };

        structure.catalog.add_segment(Segment::data(
            data_offset,
            total_size.saturating_sub(data_offset),
        ));

        Ok(structure)
    }

    /// Decode a JFIF/JFXX header for diagnostics
    fn inspect_app0<R: Read + Seek>(
        &self,
        source: &mut R,
        offset: u64,
        length: u64,
        structure: &mut JpegStructure,
    ) -> Result<()> {
        let payload = self.read_payload(source, offset, length)?;
        match JfifInfo::parse(&payload) {
            Some(info) => {
                log::debug!("APP0 at {}: {}", offset, info);
                structure.jfif.get_or_insert(info);
            }
            None => log::debug!("APP0 at {} has an unrecognized signature", offset),
        }
        Ok(())
    }

    /// Decode the first EXIF block; note and skip XMP
    ///
    /// The TIFF body is the `length - 6` bytes after the 6-byte signature,
    /// so the read never leaves the segment.
    fn inspect_app1<R: Read + Seek>(
        &self,
        source: &mut R,
        offset: u64,
        length: u64,
        structure: &mut JpegStructure,
    ) -> Result<()> {
        if length < APP1_SIGNATURE_LEN {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!("APP1 payload of {} bytes has no signature", length),
            });
        }

        source.seek(SeekFrom::Start(offset))?;
        let mut signature = [0u8; APP1_SIGNATURE_LEN as usize];
        let n = read_up_to(source, &mut signature)?;
        if n < signature.len() {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!("APP1 signature truncated to {} bytes", n),
            });
        }

        if signature.starts_with(EXIF_SIGNATURE) {
            if structure.exif.is_some() {
                log::warn!("Ignoring additional EXIF block at {}", offset);
                return Ok(());
            }
            let body_offset = offset + APP1_SIGNATURE_LEN;
            let body = self.read_payload(source, body_offset, length - APP1_SIGNATURE_LEN)?;
            match ExifDecoder::parse(body, body_offset) {
                Ok(decoder) => {
                    log::debug!(
                        "EXIF at {}: {:?}, {} entries",
                        body_offset,
                        decoder.byte_order(),
                        decoder.entries().count()
                    );
                    structure.exif = Some(decoder);
                }
                Err(e) => log::warn!("Undecodable EXIF block at {}: {}", offset, e),
            }
        } else if signature.starts_with(XMP_SIGNATURE_PREFIX) {
            log::debug!("XMP packet at {} left unparsed", offset);
        } else {
            log::debug!("APP1 at {} with unknown signature", offset);
        }
        Ok(())
    }

    /// Read a COM payload; a short read keeps whatever was available
    fn read_comment<R: Read + Seek>(
        &self,
        source: &mut R,
        offset: u64,
        length: u64,
    ) -> Result<String> {
        let limit = length.min(self.options.max_segment_size);
        source.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; limit as usize];
        let n = read_up_to(source, &mut buffer)?;
        if (n as u64) < length {
            log::warn!("COM at {} truncated: {} of {} bytes", offset, n, length);
        }
        buffer.truncate(n);
        let text = String::from_utf8_lossy(&buffer);
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Read an exact payload, bounded by the configured segment size limit
    fn read_payload<R: Read + Seek>(
        &self,
        source: &mut R,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        if length > self.options.max_segment_size {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!(
                    "Segment too large: {} bytes (max {} bytes)",
                    length, self.options.max_segment_size
                ),
            });
        }

        source.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; length as usize];
        let n = read_up_to(source, &mut buffer)?;
        if n < buffer.len() {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!("payload truncated: {} of {} bytes", n, length),
            });
        }
        Ok(buffer)
    }

    /// Write every catalog segment in order
    ///
    /// Offset-mode segments are copied from `source`; a short copy is an
    /// error and leaves `writer` partially written.
    pub fn write<R: Read + Seek, W: Write>(
        &self,
        catalog: &SegmentCatalog,
        source: &mut R,
        writer: &mut W,
    ) -> Result<()> {
        let mut current_read_pos = source.stream_position()?;

        for segment in catalog {
            match (segment.marker, &segment.source) {
                (markers::SOI, _) => {
                    writer.write_u8(0xFF)?;
                    writer.write_u8(markers::SOI)?;
                }

                (markers::DATA, SegmentSource::Offset(offset)) => {
                    copy_range(source, writer, segment, *offset, &mut current_read_pos)?;
                }

                (markers::DATA, SegmentSource::Buffer(data)) => {
                    writer.write_all(data)?;
                }

                (marker, source_kind) => {
                    if segment.length > MAX_MARKER_SIZE as u64 {
                        return Err(Error::DataTooLarge {
                            size: segment.length as usize,
                            max: MAX_MARKER_SIZE,
                        });
                    }
                    for _ in 0..segment.fill {
                        writer.write_u8(0xFF)?;
                    }
                    writer.write_u8(0xFF)?;
                    writer.write_u8(marker)?;
                    writer.write_u16::<BigEndian>((segment.length + 2) as u16)?;

                    match source_kind {
                        SegmentSource::Offset(offset) => {
                            copy_range(source, writer, segment, *offset, &mut current_read_pos)?;
                        }
                        SegmentSource::Buffer(data) => writer.write_all(data)?,
                    }
                }
            }
        }

        writer.flush()?;
        Ok(())
    }
}

// Helper functions

/// Copy one offset-mode payload from `source` to `writer`
fn copy_range<R: Read + Seek, W: Write>(
    source: &mut R,
    writer: &mut W,
    segment: &Segment,
    offset: u64,
    current_read_pos: &mut u64,
) -> Result<()> {
    // Optimized seek
    if *current_read_pos != offset {
        source.seek(SeekFrom::Start(offset))?;
        *current_read_pos = offset;
    }

    let mut limited = source.take(segment.length);
    let copied = copy(&mut limited, writer)?;
    *current_read_pos += copied;

    if copied != segment.length {
        return Err(Error::ShortCopy {
            marker: segment.marker,
            expected: segment.length,
            copied,
        });
    }
    Ok(())
}

/// Next byte, `None` at end of stream
fn read_byte<R: Read>(source: &mut R) -> Result<Option<u8>> {
    match source.read_u8() {
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Fill `buffer` as far as the stream allows, returning the count read
fn read_up_to<R: Read>(source: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
