//! Offset maps from a tree's parsed bytes back to the original buffer.
//!
//! A map is an ordered, contiguous list of segments covering the local byte
//! space `0..local_len`. A linear segment maps offsets one to one; a rewritten
//! segment stands for replaced content and maps a start to the beginning of
//! its target and an end to the end of its target, so a mapped range always
//! covers the original text it came from.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    local: Range<usize>,
    target: Range<usize>,
    linear: bool,
}

impl Segment {
    /// Local bytes copied verbatim from `target_start..`.
    pub fn linear(local: Range<usize>, target_start: usize) -> Self {
        let target = target_start..target_start + local.len();
        Self {
            local,
            target,
            linear: true,
        }
    }

    /// Local bytes that replace `target`. Either side may be empty.
    pub fn rewritten(local: Range<usize>, target: Range<usize>) -> Self {
        Self {
            local,
            target,
            linear: false,
        }
    }

    pub fn local(&self) -> Range<usize> {
        self.local.clone()
    }

    pub fn target(&self) -> Range<usize> {
        self.target.clone()
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetMap {
    segments: Vec<Segment>,
}

impl OffsetMap {
    /// Local offsets are already target offsets.
    pub fn identity(len: usize) -> Self {
        Self::shifted(len, 0)
    }

    /// Local `0..len` maps onto `base..base + len`.
    pub fn shifted(len: usize, base: usize) -> Self {
        Self {
            segments: vec![Segment::linear(0..len, base)],
        }
    }

    /// Segments must be contiguous in local space, start at zero and have
    /// non-decreasing targets.
    pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
        if segments.is_empty() {
            return Self::identity(0);
        }
        debug_assert!(segments.first().is_some_and(|s| s.local.start == 0));
        debug_assert!(segments
            .windows(2)
            .all(|w| w[0].local.end == w[1].local.start));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn local_len(&self) -> usize {
        self.segments.last().map_or(0, |s| s.local.end)
    }

    /// The target span covered by the whole map.
    pub fn target_span(&self) -> Range<usize> {
        let start = self.segments.first().map_or(0, |s| s.target.start);
        let end = self.segments.last().map_or(start, |s| s.target.end);
        start..end.max(start)
    }

    /// True when every segment is one to one.
    pub fn is_linear(&self) -> bool {
        self.segments.iter().all(Segment::is_linear)
    }

    /// Map an offset used as the start of a range.
    pub fn map_start(&self, offset: usize) -> usize {
        for seg in &self.segments {
            if offset < seg.local.end {
                return if seg.is_linear() {
                    seg.target.start + offset.saturating_sub(seg.local.start)
                } else {
                    seg.target.start
                };
            }
        }
        self.target_span().end
    }

    /// Map an offset used as the end of a range.
    pub fn map_end(&self, offset: usize) -> usize {
        let found = self
            .segments
            .iter()
            .take_while(|seg| seg.local.start < offset)
            .last();
        match found {
            Some(seg) if seg.is_linear() => {
                seg.target.start + (offset - seg.local.start).min(seg.local.len())
            }
            Some(seg) => seg.target.end,
            None => self.target_span().start,
        }
    }

    /// Map a local range; the result is never inverted.
    ///
    /// The start never passes the mapped end. A zero-width range sitting on
    /// deleted text therefore stays before the deletion, next to the content
    /// that precedes it.
    pub fn map_range(&self, start: usize, end: usize) -> (usize, usize) {
        if self.local_len() == 0 {
            let span = self.target_span();
            return (span.start, span.end);
        }
        let mapped_end = self.map_end(end);
        (self.map_start(start).min(mapped_end), mapped_end)
    }

    /// Offset every target by `base`.
    pub fn offset_targets(mut self, base: usize) -> Self {
        for seg in &mut self.segments {
            seg.target = seg.target.start + base..seg.target.end + base;
        }
        self
    }

    /// Compose `self` (local to intermediate) with `outer` (intermediate to
    /// final), yielding a map from local offsets to final offsets.
    pub fn then(&self, outer: &OffsetMap) -> OffsetMap {
        let mut segments = Vec::with_capacity(self.segments.len());

        for seg in &self.segments {
            if !seg.is_linear() || seg.target.is_empty() {
                let (start, end) = outer.map_range(seg.target.start, seg.target.end);
                segments.push(Segment::rewritten(seg.local.clone(), start..end));
                continue;
            }

            for outer_seg in &outer.segments {
                let outer_local = &outer_seg.local;
                if outer_local.is_empty() {
                    // Content removed by an outer rewrite, strictly inside us.
                    if outer_local.start > seg.target.start && outer_local.start < seg.target.end {
                        let at = seg.local.start + (outer_local.start - seg.target.start);
                        segments.push(Segment::rewritten(at..at, outer_seg.target.clone()));
                    }
                    continue;
                }

                let lo = outer_local.start.max(seg.target.start);
                let hi = outer_local.end.min(seg.target.end);
                if lo >= hi {
                    continue;
                }

                let local = seg.local.start + (lo - seg.target.start)
                    ..seg.local.start + (hi - seg.target.start);
                segments.push(if outer_seg.is_linear() {
                    Segment::linear(local, outer_seg.target.start + (lo - outer_local.start))
                } else {
                    Segment::rewritten(local, outer_seg.target.clone())
                });
            }
        }

        OffsetMap::from_segments(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// `"<!--var-->"` with both comment markers removed.
    fn stripped() -> OffsetMap {
        OffsetMap::from_segments(vec![
            Segment::rewritten(0..0, 0..4),
            Segment::linear(0..3, 4),
            Segment::rewritten(3..3, 7..10),
        ])
    }

    #[test]
    fn identity_and_shift() {
        let map = OffsetMap::identity(10);
        assert_eq!(map.map_range(2, 5), (2, 5));

        let map = OffsetMap::shifted(10, 8);
        assert_eq!(map.map_range(0, 10), (8, 18));
        assert!(map.is_linear());
    }

    #[test]
    fn deleted_prefix_is_skipped_at_start() {
        let map = stripped();
        assert_eq!(map.map_range(0, 3), (4, 7));
        assert_eq!(map.map_range(1, 2), (5, 6));
        assert!(!map.is_linear());
    }

    #[test]
    fn inserted_text_maps_to_its_anchor() {
        // "*{" + "color:red" + "}" wrapped around original 0..9
        let map = OffsetMap::from_segments(vec![
            Segment::rewritten(0..2, 0..0),
            Segment::linear(2..11, 0),
            Segment::rewritten(11..12, 9..9),
        ]);
        assert_eq!(map.map_range(0, 12), (0, 9));
        assert_eq!(map.map_range(2, 7), (0, 5));
        assert_eq!(map.map_range(0, 1), (0, 0));
    }

    #[test]
    fn zero_width_ranges_never_invert() {
        let map = OffsetMap::from_segments(vec![
            Segment::linear(0..3, 4),
            Segment::rewritten(3..3, 7..10),
            Segment::linear(3..5, 10),
        ]);
        let (start, end) = map.map_range(3, 3);
        assert!(start <= end);
        assert_eq!((start, end), (7, 7));
    }

    #[test]
    fn zero_width_range_before_trailing_deletion_stays_inside_content() {
        // A node ending where "-->" was removed, and an empty node there.
        let map = stripped();
        let (parent_start, parent_end) = map.map_range(0, 3);
        let (start, end) = map.map_range(3, 3);
        assert_eq!((start, end), (7, 7));
        assert!(parent_start <= start && end <= parent_end);
        assert!(end <= map.target_span().end - 3);
    }

    #[test]
    fn split_rewritten_segment_stays_rewritten() {
        // Eight parsed bytes replaced four original bytes at 10..14; the child
        // slices four of them, the same length as the replaced text.
        let parent = OffsetMap::from_segments(vec![Segment::rewritten(0..8, 10..14)]);
        let child = OffsetMap::shifted(4, 2).then(&parent);

        assert!(!child.is_linear());
        assert!(!child.segments()[0].is_linear());
        assert_eq!(child.map_range(1, 2), (10, 14));
    }

    #[test]
    fn equal_length_replacement_is_not_linear() {
        let map = OffsetMap::from_segments(vec![
            Segment::linear(0..2, 0),
            Segment::rewritten(2..5, 2..5),
        ]);
        assert!(!map.is_linear());
        assert_eq!(map.map_range(3, 4), (2, 5));
    }

    #[test]
    fn compose_shift_through_shift() {
        let inner = OffsetMap::shifted(4, 3);
        let outer = OffsetMap::shifted(20, 100);
        let composed = inner.then(&outer);
        assert_eq!(composed.map_range(0, 4), (103, 107));
    }

    #[test]
    fn compose_slice_through_rewrite() {
        // Parent parsed "var" out of "<!--var-->" placed at 10..20 in the root.
        let parent = stripped().offset_targets(10);
        // Child is the slice 1..3 ("ar") of the parent bytes.
        let child = OffsetMap::shifted(2, 1).then(&parent);
        assert_eq!(child.map_range(0, 2), (15, 17));
    }

    #[test]
    fn compose_keeps_inner_deletions_visible() {
        // Parent is the root "xx<!--var-->" (identity) and the child strips
        // the markers of the slice 2..12.
        let parent = OffsetMap::identity(12);
        let child = stripped().offset_targets(2).then(&parent);
        assert_eq!(child.map_range(0, 3), (6, 9));
        assert_eq!(child.target_span(), 2..12);
    }

    #[test]
    fn empty_local_space_maps_to_whole_target() {
        let map = OffsetMap::from_segments(vec![Segment::rewritten(0..0, 5..9)]);
        assert_eq!(map.map_range(0, 0), (5, 9));
    }

    proptest! {
        #[test]
        fn mapped_ranges_stay_inside_target(
            base in 0usize..50,
            len in 1usize..40,
            a in 0usize..40,
            b in 0usize..40,
        ) {
            let map = OffsetMap::shifted(len, base).then(&OffsetMap::identity(base + len));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (start, end) = map.map_range(lo.min(len), hi.min(len));
            prop_assert!(start <= end);
            prop_assert!(start >= base && end <= base + len);
        }
    }
}
