//! Parser-chain descriptions.

use crate::chain::errors::ChainError;
use crate::chain::rewrite::Rewrite;
use crate::lang::LanguageTag;
use crate::syntax::SyntaxTree;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

type ExtractFn = dyn Fn(&SyntaxTree, &[u8]) -> Vec<Range<usize>> + Send + Sync;
type RewriteFn = dyn Fn(&[u8], &SyntaxTree) -> anyhow::Result<Rewrite> + Send + Sync;

/// Selects the byte ranges of a parent tree that belong to a nested
/// language.
///
/// Ranges are in the parent's own coordinate space: offsets into the bytes
/// the parent was parsed from, as reported by
/// [`SyntaxNode::local_range`](crate::syntax::SyntaxNode::local_range).
/// They should be ordered and non-overlapping.
#[derive(Clone)]
pub struct RangeExtractor {
    name: String,
    extract: Arc<ExtractFn>,
}

impl RangeExtractor {
    pub fn new<F>(name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&SyntaxTree, &[u8]) -> Vec<Range<usize>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extract: Arc::new(extract),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extract(&self, parent: &SyntaxTree, parent_bytes: &[u8]) -> Vec<Range<usize>> {
        (self.extract)(parent, parent_bytes)
    }
}

impl fmt::Debug for RangeExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RangeExtractor").field(&self.name).finish()
    }
}

/// Turns an extracted slice into the bytes that are actually parsed.
#[derive(Clone)]
pub struct SourceRewriter {
    name: String,
    rewrite: Arc<RewriteFn>,
}

impl SourceRewriter {
    pub fn new<F>(name: impl Into<String>, rewrite: F) -> Self
    where
        F: Fn(&[u8], &SyntaxTree) -> anyhow::Result<Rewrite> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            rewrite: Arc::new(rewrite),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rewrite(&self, slice: &[u8], parent: &SyntaxTree) -> anyhow::Result<Rewrite> {
        (self.rewrite)(slice, parent)
    }
}

impl fmt::Debug for SourceRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceRewriter").field(&self.name).finish()
    }
}

/// A node of a parser chain: which grammar parses the region, how nested
/// regions are found, and how a region is prepared before parsing.
///
/// ```
/// use chainlint::chain::{extract, rewrite, ChainSpec};
/// use chainlint::lang::LanguageTag;
///
/// let page = ChainSpec::new(LanguageTag::Html)
///     .with_child(
///         ChainSpec::nested(LanguageTag::JavaScript, extract::html_script())
///             .with_rewriter(rewrite::strip_comment_wrapper()),
///     )
///     .with_child(ChainSpec::nested(LanguageTag::Css, extract::html_style()));
///
/// assert!(page.validate().is_ok());
/// assert_eq!(page.languages().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ChainSpec {
    entry: LanguageTag,
    children: Vec<ChainSpec>,
    extractor: Option<RangeExtractor>,
    rewriter: Option<SourceRewriter>,
}

impl ChainSpec {
    /// A root chain parsing the whole buffer with `entry`.
    pub fn new(entry: LanguageTag) -> Self {
        Self {
            entry,
            children: Vec::new(),
            extractor: None,
            rewriter: None,
        }
    }

    /// A nested chain parsing the ranges `extractor` picks out of its parent.
    pub fn nested(entry: LanguageTag, extractor: RangeExtractor) -> Self {
        Self {
            extractor: Some(extractor),
            ..Self::new(entry)
        }
    }

    pub fn with_rewriter(mut self, rewriter: SourceRewriter) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn with_extractor(mut self, extractor: RangeExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_child(mut self, child: ChainSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn entry(&self) -> LanguageTag {
        self.entry
    }

    pub fn children(&self) -> &[ChainSpec] {
        &self.children
    }

    pub fn extractor(&self) -> Option<&RangeExtractor> {
        self.extractor.as_ref()
    }

    pub fn rewriter(&self) -> Option<&SourceRewriter> {
        self.rewriter.as_ref()
    }

    /// Check the shape of the whole chain: the root has no extractor and
    /// every nested chain has one.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.extractor.is_some() {
            return Err(ChainError::RootExtractor {
                language: self.entry,
            });
        }

        let mut pending: Vec<&ChainSpec> = self.children.iter().collect();
        while let Some(spec) = pending.pop() {
            if spec.extractor.is_none() {
                return Err(ChainError::MissingExtractor {
                    language: spec.entry,
                });
            }
            pending.extend(spec.children.iter());
        }
        Ok(())
    }

    /// Every language the chain can produce, in depth-first order without
    /// duplicates.
    pub fn languages(&self) -> Vec<LanguageTag> {
        let mut languages = Vec::new();
        self.collect_languages(&mut languages);
        languages
    }

    fn collect_languages(&self, out: &mut Vec<LanguageTag>) {
        if !out.contains(&self.entry) {
            out.push(self.entry);
        }
        for child in &self.children {
            child.collect_languages(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nothing() -> RangeExtractor {
        RangeExtractor::new("nothing", |_, _| Vec::new())
    }

    #[test]
    fn root_with_extractor_is_rejected() {
        let spec = ChainSpec::new(LanguageTag::Html).with_extractor(nothing());
        assert!(matches!(
            spec.validate(),
            Err(ChainError::RootExtractor {
                language: LanguageTag::Html
            })
        ));
    }

    #[test]
    fn deep_child_without_extractor_is_rejected() {
        let spec = ChainSpec::new(LanguageTag::Html).with_child(
            ChainSpec::nested(LanguageTag::Css, nothing())
                .with_child(ChainSpec::new(LanguageTag::JavaScript)),
        );
        assert!(matches!(
            spec.validate(),
            Err(ChainError::MissingExtractor {
                language: LanguageTag::JavaScript
            })
        ));
    }

    #[test]
    fn languages_are_unique_and_ordered() {
        let spec = ChainSpec::new(LanguageTag::Html)
            .with_child(ChainSpec::nested(LanguageTag::Css, nothing()))
            .with_child(
                ChainSpec::nested(LanguageTag::JavaScript, nothing())
                    .with_child(ChainSpec::nested(LanguageTag::Css, nothing())),
            );
        assert_eq!(
            spec.languages(),
            vec![LanguageTag::Html, LanguageTag::Css, LanguageTag::JavaScript]
        );
    }

    #[test]
    fn debug_shows_callback_names() {
        let spec = ChainSpec::nested(LanguageTag::Css, nothing());
        assert!(format!("{spec:?}").contains("nothing"));
    }
}
