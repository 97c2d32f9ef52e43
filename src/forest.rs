//! The trees resolved from one file, and the read-only store rules see.

use crate::lang::LanguageTag;
use crate::syntax::{QueryEngine, QueryMatch, SourceText, SyntaxError, SyntaxTree};
use std::collections::HashMap;
use std::sync::Arc;

/// Every tree resolved from one buffer, grouped by language.
///
/// Trees of a language are kept in the order the resolver registered them,
/// so index `n` is occurrence `n`.
#[derive(Debug, Clone)]
pub struct ResolvedForest {
    source: Arc<SourceText>,
    by_language: HashMap<LanguageTag, Vec<Arc<SyntaxTree>>>,
    languages: Vec<LanguageTag>,
    order: Vec<Arc<SyntaxTree>>,
}

impl ResolvedForest {
    /// A forest with no trees over `source`.
    pub fn empty(source: Arc<SourceText>) -> Self {
        Self {
            source,
            by_language: HashMap::new(),
            languages: Vec::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, tree: Arc<SyntaxTree>) {
        let language = tree.language();
        debug_assert_eq!(tree.occurrence(), self.occurrences(language));
        if !self.by_language.contains_key(&language) {
            self.languages.push(language);
        }
        self.by_language
            .entry(language)
            .or_default()
            .push(Arc::clone(&tree));
        self.order.push(tree);
    }

    pub fn source(&self) -> &Arc<SourceText> {
        &self.source
    }

    /// Number of trees registered for `language`.
    pub fn occurrences(&self, language: LanguageTag) -> usize {
        self.by_language.get(&language).map_or(0, Vec::len)
    }

    /// Trees of `language` by occurrence; empty when there are none.
    pub fn trees(&self, language: LanguageTag) -> &[Arc<SyntaxTree>] {
        self.by_language
            .get(&language)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Languages in the order their first tree was registered.
    pub fn languages(&self) -> &[LanguageTag] {
        &self.languages
    }

    /// All trees in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SyntaxTree>> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Read-only access to a resolved forest by language.
#[derive(Debug, Clone)]
pub struct SyntaxStore {
    forest: ResolvedForest,
}

impl SyntaxStore {
    pub fn new(forest: ResolvedForest) -> Self {
        Self { forest }
    }

    pub fn has_syntax(&self, language: LanguageTag) -> bool {
        self.forest.occurrences(language) > 0
    }

    /// The first tree of `language`.
    pub fn get_syntax(&self, language: LanguageTag) -> Result<&SyntaxTree, SyntaxError> {
        self.forest
            .trees(language)
            .first()
            .map(Arc::as_ref)
            .ok_or(SyntaxError::NotFound { language })
    }

    pub fn syntaxes(&self, language: LanguageTag) -> &[Arc<SyntaxTree>] {
        self.forest.trees(language)
    }

    pub fn languages(&self) -> &[LanguageTag] {
        self.forest.languages()
    }

    pub fn source(&self) -> &Arc<SourceText> {
        self.forest.source()
    }

    pub fn forest(&self) -> &ResolvedForest {
        &self.forest
    }

    /// Run `pattern` against the first tree of `language`.
    ///
    /// The pattern is compiled before the tree is looked up, so a bad query
    /// is reported even when the language is absent.
    pub fn query(
        &self,
        language: LanguageTag,
        pattern: &str,
    ) -> Result<Vec<QueryMatch<'_>>, SyntaxError> {
        let engine = QueryEngine::new(language, pattern)?;
        engine.find_all(self.get_syntax(language)?)
    }

    /// Run `pattern` against every tree of `language`, occurrence by
    /// occurrence. An absent language yields no matches.
    pub fn query_all(
        &self,
        language: LanguageTag,
        pattern: &str,
    ) -> Result<Vec<QueryMatch<'_>>, SyntaxError> {
        let engine = QueryEngine::new(language, pattern)?;
        let mut matches = Vec::new();
        for tree in self.syntaxes(language) {
            matches.extend(engine.find_all(tree)?);
        }
        Ok(matches)
    }
}
