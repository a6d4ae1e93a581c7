//! Read/modify/write session over one JPEG file

use crate::{
    byte_stream::{ByteStream, OpenMode},
    catalog::SegmentCatalog,
    error::{Error, Result},
    exif::ExifDecoder,
    jfif::JfifInfo,
    jpeg_io::JpegIO,
    options::DocumentOptions,
    segment::{Segment, MAX_MARKER_SIZE},
};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Longest comment that fits in a single COM segment
pub const MAX_COMMENT_LEN: usize = MAX_MARKER_SIZE;

/// An open JPEG whose comment can be read, replaced and saved
///
/// The source file stays open between [`JpegDocument::open`] and
/// [`JpegDocument::close`]; untouched segments are copied from it on save.
///
/// # Example
///
/// ```no_run
/// use jpeg_comment_io::JpegDocument;
///
/// # fn main() -> jpeg_comment_io::Result<()> {
/// let mut doc = JpegDocument::open("photo.jpg")?;
/// println!("comment: {}", doc.comment());
///
/// doc.set_comment("Sunset over the harbour")?;
/// doc.save("photo.jpg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JpegDocument {
    stream: ByteStream,
    catalog: SegmentCatalog,
    exif: Option<ExifDecoder>,
    jfif: Option<JfifInfo>,
    comment: Option<String>,
    dirty: bool,
    options: DocumentOptions,
}

impl JpegDocument {
    /// Open and scan `path` with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, DocumentOptions::default())
    }

    /// Open and scan `path`
    ///
    /// Fails only when the file cannot be opened or does not start with SOI;
    /// a file without any comment opens fine.
    pub fn open_with<P: AsRef<Path>>(path: P, options: DocumentOptions) -> Result<Self> {
        let mut doc = Self {
            stream: ByteStream::new(),
            catalog: SegmentCatalog::new(),
            exif: None,
            jfif: None,
            comment: None,
            dirty: false,
            options,
        };
        doc.reopen(path)?;
        Ok(doc)
    }

    /// Drop all state and scan another file
    pub fn reopen<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.close()?;

        let path = path.as_ref();
        self.stream.open(path, OpenMode::Read)?;

        let structure = match JpegIO::with_options(self.options.clone()).parse(&mut self.stream) {
            Ok(structure) => structure,
            Err(e) => {
                self.stream.close()?;
                return Err(e);
            }
        };

        log::debug!(
            "{}: {} segments, {} bytes",
            path.display(),
            structure.catalog.len(),
            structure.total_size
        );

        self.catalog = structure.catalog;
        self.exif = structure.exif;
        self.jfif = structure.jfif;
        self.comment = structure.comment;
        self.dirty = false;
        Ok(())
    }

    /// Close the source and forget everything learned from it
    pub fn close(&mut self) -> Result<()> {
        self.catalog.clear();
        self.exif = None;
        self.jfif = None;
        self.comment = None;
        self.dirty = false;
        self.stream.close()
    }

    /// The image comment
    ///
    /// A non-empty EXIF UserComment wins (unless disabled in the options),
    /// then the COM segment, then the empty string.
    pub fn comment(&self) -> String {
        if self.options.prefer_exif_comment {
            if let Some(exif) = &self.exif {
                let text = exif.user_comment();
                if !text.is_empty() {
                    return text;
                }
            }
        }
        self.comment.clone().unwrap_or_default()
    }

    /// The COM segment text only, ignoring EXIF
    pub fn jfif_comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Replace the COM segment, or insert one after the last APPn segment
    ///
    /// EXIF is left untouched, so a document with a UserComment keeps
    /// reporting it from [`JpegDocument::comment`].
    pub fn set_comment(&mut self, text: &str) -> Result<()> {
        if !self.stream.is_open() {
            return Err(Error::NotOpen);
        }
        if text.len() > MAX_COMMENT_LEN {
            return Err(Error::DataTooLarge {
                size: text.len(),
                max: MAX_COMMENT_LEN,
            });
        }

        let index = self.catalog.upsert_comment(text.as_bytes().to_vec());
        log::debug!("COM set at catalog index {} ({} bytes)", index, text.len());

        self.comment = Some(text.to_string());
        self.dirty = true;
        Ok(())
    }

    /// Write the edited file to `path`
    ///
    /// Saving to the open file (by any name; hard links count on Unix) goes
    /// through a temp file beside it which then replaces it, after which
    /// the document is rescanned from `path`. Saving elsewhere leaves the
    /// document open and dirty.
    ///
    /// On any copy failure the partial output is deleted and the source is
    /// left as it was. Returns the path now holding the edited data, which
    /// is the temp file if the final rename failed.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf> {
        if !self.dirty {
            return Err(Error::NotModified);
        }
        let source_path = self.stream.filename().ok_or(Error::NotOpen)?.to_path_buf();
        let dest = path.as_ref();

        if !same_file(dest, &source_path) {
            self.write_to(dest)?;
            return Ok(dest.to_path_buf());
        }

        // Symlinks are replaced at their target, hard links by name
        let target = fs::canonicalize(dest).unwrap_or_else(|_| dest.to_path_buf());
        let temp = temp_path(&target, &self.options.temp_suffix);
        self.write_to(&temp)?;

        self.stream.close()?;
        if let Err(e) = replace_file(&temp, &target) {
            log::warn!(
                "Could not move {} over {}: {}",
                temp.display(),
                target.display(),
                e
            );
            self.reopen(&temp)?;
            return Ok(temp);
        }

        self.reopen(dest)?;
        Ok(dest.to_path_buf())
    }

    /// Write the catalog to `out_path`, deleting it again on failure
    fn write_to(&mut self, out_path: &Path) -> Result<()> {
        let mut out = ByteStream::new();
        out.open(out_path, OpenMode::Write)?;

        let written = JpegIO::with_options(self.options.clone())
            .write(&self.catalog, &mut self.stream, &mut out)
            .and_then(|()| out.close());
        if let Err(e) = written {
            drop(out);
            log::warn!("Save to {} failed: {}", out_path.display(), e);
            if let Err(cleanup) = fs::remove_file(out_path) {
                log::warn!("Could not remove {}: {}", out_path.display(), cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Segments in file order
    pub fn segments(&self) -> &[Segment] {
        self.catalog.segments()
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    /// Decoder for the first EXIF block, if any
    pub fn exif(&self) -> Option<&ExifDecoder> {
        self.exif.as_ref()
    }

    /// First decodable APP0 header, if any
    pub fn jfif_info(&self) -> Option<&JfifInfo> {
        self.jfif.as_ref()
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_open()
    }

    /// Path of the open source file
    pub fn path(&self) -> Option<&Path> {
        self.stream.filename()
    }

    /// Size of the source at open time
    pub fn size(&self) -> u64 {
        self.stream.size()
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }
}

/// Whether `a` and `b` name the same file
#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => a == b,
    }
}

/// Whether `a` and `b` name the same file
///
/// Hard links to the source are not detected on this platform.
#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn temp_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Move `temp` over `target`, removing `target` first where rename cannot
fn replace_file(temp: &Path, target: &Path) -> std::io::Result<()> {
    match fs::rename(temp, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!("rename over {} failed ({}), removing first", target.display(), e);
            fs::remove_file(target)?;
            fs::rename(temp, target)
        }
    }
}
