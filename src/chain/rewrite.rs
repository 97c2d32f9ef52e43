//! Source rewrites applied to a slice before it is parsed.
//!
//! A [`Rewrite`] carries the replacement bytes together with an
//! [`OffsetMap`] from those bytes back to the slice, so trees parsed from
//! rewritten content still report positions in the original buffer. The
//! rewritten bytes are only kept for as long as the resolver needs them.

use crate::chain::errors::RewriteError;
use crate::chain::spec::SourceRewriter;
use crate::syntax::{OffsetMap, Segment};
use std::ops::Range;

/// Replace `range` of the slice with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub replacement: Vec<u8>,
}

impl Splice {
    pub fn new(range: Range<usize>, replacement: impl Into<Vec<u8>>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range, Vec::new())
    }

    pub fn insert(at: usize, text: impl Into<Vec<u8>>) -> Self {
        Self::new(at..at, text)
    }
}

/// Replacement bytes plus the map from them back to the original slice.
#[derive(Debug, Clone)]
pub struct Rewrite {
    bytes: Vec<u8>,
    map: OffsetMap,
}

impl Rewrite {
    /// Parse the slice as-is.
    pub fn unchanged(slice: &[u8]) -> Self {
        Self {
            bytes: slice.to_vec(),
            map: OffsetMap::identity(slice.len()),
        }
    }

    /// Bytes whose offsets correspond one to one with the slice. Extra bytes
    /// map onto the end of the slice; a shorter result leaves the tail of the
    /// slice unmapped.
    pub fn positional(bytes: Vec<u8>, original_len: usize) -> Self {
        let len = bytes.len();
        let shared = len.min(original_len);
        let mut segments = vec![Segment::linear(0..shared, 0)];
        if len > shared {
            segments.push(Segment::rewritten(shared..len, original_len..original_len));
        } else if original_len > shared {
            segments.push(Segment::rewritten(len..len, shared..original_len));
        }
        Self {
            bytes,
            map: OffsetMap::from_segments(segments),
        }
    }

    /// Apply sorted, non-overlapping splices to `slice`.
    pub fn from_splices(slice: &[u8], splices: Vec<Splice>) -> Result<Self, RewriteError> {
        let mut bytes = Vec::with_capacity(slice.len());
        let mut segments = Vec::new();
        let mut cursor = 0usize;

        for splice in splices {
            let Range { start, end } = splice.range;
            if start > end || end > slice.len() {
                return Err(RewriteError::SpliceOutOfBounds {
                    start,
                    end,
                    len: slice.len(),
                });
            }
            if start < cursor {
                return Err(RewriteError::UnorderedSplices {
                    start,
                    previous_end: cursor,
                });
            }

            if start > cursor {
                let local = bytes.len();
                bytes.extend_from_slice(&slice[cursor..start]);
                segments.push(Segment::linear(local..bytes.len(), cursor));
            }
            if start < end || !splice.replacement.is_empty() {
                let local = bytes.len();
                bytes.extend_from_slice(&splice.replacement);
                segments.push(Segment::rewritten(local..bytes.len(), start..end));
            }
            cursor = end;
        }

        if cursor < slice.len() || segments.is_empty() {
            let local = bytes.len();
            bytes.extend_from_slice(&slice[cursor..]);
            segments.push(Segment::linear(local..bytes.len(), cursor));
        }

        Ok(Self {
            bytes,
            map: OffsetMap::from_segments(segments),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Map from rewritten offsets to slice offsets.
    pub fn map(&self) -> &OffsetMap {
        &self.map
    }

    pub fn into_parts(self) -> (Vec<u8>, OffsetMap) {
        (self.bytes, self.map)
    }
}

/// Drop legacy `<!--` / `-->` markers wrapped around script or style content.
pub fn strip_comment_wrapper() -> SourceRewriter {
    SourceRewriter::new("strip-comment-wrapper", |slice, _parent| {
        let mut splices = Vec::new();

        let lead = slice
            .iter()
            .take_while(|byte| byte.is_ascii_whitespace())
            .count();
        if slice[lead..].starts_with(b"<!--") {
            splices.push(Splice::delete(lead..lead + 4));
        }

        let trail = slice
            .iter()
            .rev()
            .take_while(|byte| byte.is_ascii_whitespace())
            .count();
        let body_end = slice.len() - trail;
        let min_start = splices.last().map_or(0, |s| s.range.end);
        if body_end >= min_start + 3 && slice[..body_end].ends_with(b"-->") {
            splices.push(Splice::delete(body_end - 3..body_end));
        }

        Ok(Rewrite::from_splices(slice, splices)?)
    })
}

/// Surround the slice with fixed text, e.g. to turn the declarations of a
/// `style` attribute into a parseable rule set.
pub fn wrap(prefix: impl Into<Vec<u8>>, suffix: impl Into<Vec<u8>>) -> SourceRewriter {
    let prefix = prefix.into();
    let suffix = suffix.into();
    SourceRewriter::new("wrap", move |slice, _parent| {
        let splices = vec![
            Splice::insert(0, prefix.clone()),
            Splice::insert(slice.len(), suffix.clone()),
        ];
        Ok(Rewrite::from_splices(slice, splices)?)
    })
}

/// Blank out every `open ... close` region (template tags, server-side
/// code) with spaces, keeping newlines so offsets and lines stay put.
pub fn blank_delimited(open: impl Into<Vec<u8>>, close: impl Into<Vec<u8>>) -> SourceRewriter {
    let open = open.into();
    let close = close.into();
    SourceRewriter::new("blank-delimited", move |slice, _parent| {
        anyhow::ensure!(!open.is_empty(), "blank-delimited needs a non-empty open marker");
        let mut bytes = slice.to_vec();
        let mut at = 0;
        while let Some(start) = find(&bytes[at..], &open).map(|i| i + at) {
            let body = start + open.len();
            let end = match find(&bytes[body..], &close) {
                Some(i) if !close.is_empty() => body + i + close.len(),
                _ => bytes.len(),
            };
            for byte in &mut bytes[start..end] {
                if *byte != b'\n' {
                    *byte = b' ';
                }
            }
            at = end.max(start + 1);
        }
        Ok(Rewrite::positional(bytes, slice.len()))
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
