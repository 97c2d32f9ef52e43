//! Byte offsets, row/column points and the line index that converts
//! between them.
//!
//! Points are zero-based and count columns in bytes, matching tree-sitter.
//! Every point exposed by the crate is decoded by the [`LineIndex`] of the
//! original buffer, so byte and point forms of a range never disagree.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A zero-based (row, column) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Point {
    /// One-based `line:column`, the form people expect in messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

impl From<tree_sitter::Point> for Point {
    fn from(point: tree_sitter::Point) -> Self {
        Self::new(point.row, point.column)
    }
}

/// A half-open byte interval together with its point equivalents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteRange {
    pub start_index: usize,
    pub end_index: usize,
    pub start_position: Point,
    pub end_position: Point,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// True when `other` lies entirely inside this range.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start_index <= other.start_index && other.end_index <= self.end_index
    }
}

/// Line start table for one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(bytes: &[u8]) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            bytes
                .iter()
                .enumerate()
                .filter(|(_, byte)| **byte == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            line_starts,
            len: bytes.len(),
        }
    }

    /// Length of the indexed buffer in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Point for a byte offset. Offsets past the end clamp to the end.
    pub fn point_of(&self, offset: usize) -> Point {
        let offset = offset.min(self.len);
        let row = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Point::new(row, offset - self.line_starts[row])
    }

    /// Byte offset for a point. Rows past the end clamp to the buffer end and
    /// columns past the end of a line clamp to its newline.
    pub fn offset_of(&self, point: Point) -> usize {
        let Some(&line_start) = self.line_starts.get(point.row) else {
            return self.len;
        };
        let line_end = self
            .line_starts
            .get(point.row + 1)
            .map_or(self.len, |next| next - 1);
        line_start.saturating_add(point.column).min(line_end)
    }

    /// Build a [`ByteRange`] for `start..end`, clamped to the buffer.
    pub fn range(&self, start: usize, end: usize) -> ByteRange {
        let start = start.min(self.len);
        let end = end.clamp(start, self.len);
        ByteRange {
            start_index: start,
            end_index: end,
            start_position: self.point_of(start),
            end_position: self.point_of(end),
        }
    }
}
