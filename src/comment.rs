//! Plain-function façade for the common open/get/set/save/close flow
//!
//! ```no_run
//! use jpeg_comment_io::{close_file, get_comment, open_file, save_file, set_comment};
//!
//! # fn main() -> jpeg_comment_io::Result<()> {
//! if let Some(mut doc) = open_file("photo.jpg") {
//!     println!("was: {}", get_comment(&doc));
//!     set_comment(&mut doc, "new caption")?;
//!     save_file(&mut doc, "photo.jpg")?;
//!     close_file(doc)?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::{document::JpegDocument, error::Result};
use std::path::{Path, PathBuf};

/// Open a JPEG, or `None` if it cannot be opened or is not a JPEG
pub fn open_file<P: AsRef<Path>>(path: P) -> Option<JpegDocument> {
    let path = path.as_ref();
    match JpegDocument::open(path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::warn!("Could not open {}: {}", path.display(), e);
            None
        }
    }
}

/// The EXIF UserComment if non-empty, else the COM text, else ""
pub fn get_comment(doc: &JpegDocument) -> String {
    doc.comment()
}

pub fn set_comment(doc: &mut JpegDocument, text: &str) -> Result<()> {
    doc.set_comment(text)
}

/// Save pending changes to `path`; see [`JpegDocument::save`]
pub fn save_file<P: AsRef<Path>>(doc: &mut JpegDocument, path: P) -> Result<PathBuf> {
    doc.save(path)
}

pub fn close_file(mut doc: JpegDocument) -> Result<()> {
    doc.close()
}
