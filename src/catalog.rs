//! Ordered catalog of the segments discovered by a scan

use crate::segment::{markers, Segment};

/// All top-level segments of a JPEG in on-disk order
///
/// Order is only ever changed by [`SegmentCatalog::upsert_comment`], which
/// replaces the COM segment in place or inserts one by index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SegmentCatalog {
    segments: Vec<Segment>,
}

impl SegmentCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment
    pub fn add_segment(&mut self, segment: Segment) {
        log::debug!("segment {}", segment);
        self.segments.push(segment);
    }

    /// Get reference to segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Index of the first COM segment
    pub fn comment_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_comment)
    }

    /// Number of COM segments
    pub fn comment_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_comment()).count()
    }

    /// Index of the last APPn segment
    pub fn last_app_index(&self) -> Option<usize> {
        self.segments.iter().rposition(Segment::is_app)
    }

    /// Index of the SOI record
    pub fn soi_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_soi)
    }

    /// Where a new COM segment belongs: after the last APPn, else after SOI
    pub fn comment_insertion_index(&self) -> usize {
        self.last_app_index()
            .or_else(|| self.soi_index())
            .map_or(0, |i| i + 1)
    }

    /// Replace the first COM segment with `data`, or insert a new one
    ///
    /// Returns the index of the buffer-mode COM segment.
    pub fn upsert_comment(&mut self, data: Vec<u8>) -> usize {
        let segment = Segment::with_buffer(markers::COM, data);
        match self.comment_index() {
            Some(index) => {
                let fill = self.segments[index].fill;
                self.segments[index] = segment.with_fill(fill);
                index
            }
            None => {
                let index = self.comment_insertion_index();
                self.segments.insert(index, segment);
                index
            }
        }
    }
}

impl<'a> IntoIterator for &'a SegmentCatalog {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
