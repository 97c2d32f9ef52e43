use crate::chain::errors::ChainError;
use crate::chain::spec::{ChainSpec, RangeExtractor};
use crate::forest::ResolvedForest;
use crate::lang::LanguageTag;
use crate::syntax::{Grammar, OffsetMap, SourceText, SyntaxTree, TreeSitterGrammars};
use log::{debug, warn};
use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

/// Resolves a buffer into a forest of syntax trees by walking a parser chain.
///
/// The entry language parses the whole buffer. Each nested chain then picks
/// ranges out of its parent's parsed bytes, optionally rewrites them and
/// parses the result. Trees are registered depth-first: an occurrence's own
/// nested trees are resolved before the next range of the same chain.
#[derive(Debug, Clone, Default)]
pub struct ChainResolver<G = TreeSitterGrammars> {
    grammar: G,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: Grammar> ChainResolver<G> {
    pub fn with_grammar(grammar: G) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    pub fn resolve(&self, buffer: &[u8], spec: &ChainSpec) -> Result<ResolvedForest, ChainError> {
        spec.validate()?;

        let source = Arc::new(SourceText::new(buffer));
        let mut forest = ResolvedForest::empty(Arc::clone(&source));

        let root = self.parse(spec.entry(), 0, buffer, OffsetMap::identity(buffer.len()), &source)?;
        forest.insert(Arc::clone(&root));
        self.resolve_children(&mut forest, spec, &root, buffer)?;

        debug!(
            "resolved {} tree(s) across {} language(s)",
            forest.len(),
            forest.languages().len()
        );
        Ok(forest)
    }

    fn resolve_children(
        &self,
        forest: &mut ResolvedForest,
        spec: &ChainSpec,
        parent: &SyntaxTree,
        parent_bytes: &[u8],
    ) -> Result<(), ChainError> {
        for child in spec.children() {
            let Some(extractor) = child.extractor() else {
                return Err(ChainError::MissingExtractor {
                    language: child.entry(),
                });
            };
            let language = child.entry();
            let ranges = extractor.extract(parent, parent_bytes);
            check_ranges(language, extractor, &ranges, parent_bytes.len())?;

            for range in ranges {
                let occurrence = forest.occurrences(language);
                let slice = &parent_bytes[range.clone()];

                let (bytes, local_map) = match child.rewriter() {
                    Some(rewriter) => {
                        let rewrite = rewriter.rewrite(slice, parent).map_err(|source| {
                            ChainError::Rewrite {
                                language,
                                occurrence,
                                rewriter: rewriter.name().to_string(),
                                source: source.into(),
                            }
                        })?;
                        let (bytes, map) = rewrite.into_parts();
                        (Cow::Owned(bytes), map)
                    }
                    None => (Cow::Borrowed(slice), OffsetMap::identity(slice.len())),
                };

                let map = local_map
                    .offset_targets(range.start)
                    .then(parent.offset_map());
                let tree = self.parse(language, occurrence, &bytes, map, parent.source())?;
                debug!(
                    "{} occurrence {} from {} parent bytes {}..{} -> {:?}",
                    language,
                    occurrence,
                    parent.language(),
                    range.start,
                    range.end,
                    tree.origin().as_range()
                );

                forest.insert(Arc::clone(&tree));
                self.resolve_children(forest, child, &tree, &bytes)?;
            }
        }
        Ok(())
    }

    fn parse(
        &self,
        language: LanguageTag,
        occurrence: usize,
        bytes: &[u8],
        map: OffsetMap,
        source: &Arc<SourceText>,
    ) -> Result<Arc<SyntaxTree>, ChainError> {
        let tree = self
            .grammar
            .parse(language, bytes)
            .map_err(|source| ChainError::Parse {
                language,
                occurrence,
                source,
            })?;
        Ok(Arc::new(SyntaxTree::new(
            language,
            occurrence,
            tree,
            map,
            Arc::clone(source),
        )))
    }
}

fn check_ranges(
    language: LanguageTag,
    extractor: &RangeExtractor,
    ranges: &[Range<usize>],
    len: usize,
) -> Result<(), ChainError> {
    let mut previous_end = 0;
    for (idx, range) in ranges.iter().enumerate() {
        if range.start > range.end || range.end > len {
            return Err(ChainError::InvalidRange {
                language,
                extractor: extractor.name().to_string(),
                start: range.start,
                end: range.end,
                len,
            });
        }
        if idx > 0 && range.start < previous_end {
            warn!(
                "{} extractor '{}' returned overlapping or unordered range {}..{} (previous ended at {})",
                language,
                extractor.name(),
                range.start,
                range.end,
                previous_end
            );
        }
        previous_end = previous_end.max(range.end);
    }
    Ok(())
}
