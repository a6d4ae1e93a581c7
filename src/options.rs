//! Options for opening and saving documents

use crate::segment::MAX_SEGMENT_SIZE;

/// Suffix appended to the destination when saving over the open file
pub const DEFAULT_TEMP_SUFFIX: &str = ".tmp";

/// Settings shared by the scanner and [`crate::JpegDocument`]
///
/// The default is what most callers want; the builder methods override
/// single settings.
///
/// # Example
///
/// ```
/// use jpeg_comment_io::DocumentOptions;
///
/// let options = DocumentOptions::new()
///     .max_segment_size(1024 * 1024)
///     .temp_suffix(".partial")
///     .prefer_exif_comment(false);
/// assert_eq!(options.get_temp_suffix(), ".partial");
/// ```
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub(crate) max_segment_size: u64,
    pub(crate) temp_suffix: String,
    pub(crate) prefer_exif_comment: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            max_segment_size: MAX_SEGMENT_SIZE,
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            prefer_exif_comment: true,
        }
    }
}

impl DocumentOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest APP0/APP1/COM payload read into memory while scanning
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Suffix for the temporary file used when saving over the source
    pub fn temp_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.temp_suffix = suffix.into();
        self
    }

    /// Whether a non-empty EXIF UserComment wins over the COM segment
    pub fn prefer_exif_comment(mut self, prefer: bool) -> Self {
        self.prefer_exif_comment = prefer;
        self
    }

    pub fn get_max_segment_size(&self) -> u64 {
        self.max_segment_size
    }

    pub fn get_temp_suffix(&self) -> &str {
        &self.temp_suffix
    }

    pub fn get_prefer_exif_comment(&self) -> bool {
        self.prefer_exif_comment
    }
}
