use crate::syntax::{ByteRange, QueryMatch, SourceText};
use log::warn;
use serde::Serialize;
use std::cell::RefCell;
use std::sync::Arc;

/// A problem reported by a rule, optionally located in the original buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub title: String,
    pub range: Option<ByteRange>,
}

/// Collects the violations of one rule run on one file.
///
/// Recording goes through a shared reference so a rule can keep query
/// results borrowed from its context while it reports them.
#[derive(Debug)]
pub struct ViolationRecorder {
    source: Arc<SourceText>,
    violations: RefCell<Vec<Violation>>,
}

impl ViolationRecorder {
    pub fn new(source: Arc<SourceText>) -> Self {
        Self {
            source,
            violations: RefCell::new(Vec::new()),
        }
    }

    /// Record a violation without a location. Use the returned handle to
    /// attach one.
    pub fn violation(&self, title: impl Into<String>) -> ViolationHandle<'_> {
        let mut violations = self.violations.borrow_mut();
        violations.push(Violation {
            title: title.into(),
            range: None,
        });
        ViolationHandle {
            recorder: self,
            index: violations.len() - 1,
        }
    }

    /// Record one violation per capture of every match, located at the
    /// captured node. Returns how many were recorded.
    pub fn to_violations(&self, title: &str, matches: &[QueryMatch<'_>]) -> usize {
        let mut violations = self.violations.borrow_mut();
        let before = violations.len();
        for capture in matches.iter().flat_map(|m| m.captures.iter()) {
            violations.push(Violation {
                title: title.to_string(),
                range: Some(capture.node.range()),
            });
        }
        violations.len() - before
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.violations.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.violations.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A rule fails exactly when it recorded something.
    pub fn is_failed(&self) -> bool {
        !self.is_empty()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations.into_inner()
    }
}

/// Handle to a violation that was just recorded.
#[derive(Debug, Clone, Copy)]
pub struct ViolationHandle<'r> {
    recorder: &'r ViolationRecorder,
    index: usize,
}

impl ViolationHandle<'_> {
    /// Locate the violation at `start..end` of the original buffer. Offsets
    /// past the end are clamped and an inverted range is swapped.
    pub fn set_range(self, start: usize, end: usize) -> Self {
        let len = self.recorder.source.len();
        let (mut lo, mut hi) = (start, end);
        if lo > hi {
            warn!("violation range {start}..{end} is inverted; swapping");
            std::mem::swap(&mut lo, &mut hi);
        }
        if hi > len {
            warn!("violation range {start}..{end} exceeds the {len}-byte buffer; clamping");
            hi = len;
            lo = lo.min(len);
        }

        let range = self.recorder.source.range(lo, hi);
        self.recorder.violations.borrow_mut()[self.index].range = Some(range);
        self
    }

    /// Locate the violation at an already mapped range.
    pub fn set_byte_range(self, range: ByteRange) -> Self {
        self.set_range(range.start_index, range.end_index)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}
