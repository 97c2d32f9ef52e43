use crate::syntax::position::{ByteRange, LineIndex, Point};
use std::borrow::Cow;

/// The original file buffer shared by every tree of a forest.
#[derive(Debug)]
pub struct SourceText {
    bytes: Vec<u8>,
    lines: LineIndex,
}

impl SourceText {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let lines = LineIndex::new(&bytes);
        Self { bytes, lines }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Decoded text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Bytes in `start..end`, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> &[u8] {
        let start = start.min(self.bytes.len());
        let end = end.clamp(start, self.bytes.len());
        &self.bytes[start..end]
    }

    pub fn range(&self, start: usize, end: usize) -> ByteRange {
        self.lines.range(start, end)
    }

    pub fn point_of(&self, offset: usize) -> Point {
        self.lines.point_of(offset)
    }

    pub fn offset_of(&self, point: Point) -> usize {
        self.lines.offset_of(point)
    }
}
