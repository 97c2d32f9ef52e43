use crate::cache;
use crate::lang::LanguageTag;
use crate::syntax::errors::SyntaxError;
use crate::syntax::node::SyntaxNode;
use crate::syntax::tree::SyntaxTree;
use std::sync::Arc;
use tree_sitter::{Query, QueryCursor, StreamingIterator};

/// One named capture of a match.
#[derive(Debug, Clone)]
pub struct Capture<'t> {
    pub name: String,
    /// Declaration index of the capture name within the query source.
    pub index: u32,
    pub node: SyntaxNode<'t>,
}

/// A match from a tree-sitter query with captured nodes.
#[derive(Debug, Clone)]
pub struct QueryMatch<'t> {
    /// Which pattern of the query source produced this match.
    pub pattern_index: usize,
    /// Captures in declaration order.
    pub captures: Vec<Capture<'t>>,
}

impl<'t> QueryMatch<'t> {
    /// First capture bound to `name`.
    pub fn capture(&self, name: &str) -> Option<SyntaxNode<'t>> {
        self.captures
            .iter()
            .find(|capture| capture.name == name)
            .map(|capture| capture.node)
    }

    /// Every node bound to `name` (quantified captures can bind several).
    pub fn nodes_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = SyntaxNode<'t>> + 'a {
        self.captures
            .iter()
            .filter(move |capture| capture.name == name)
            .map(|capture| capture.node)
    }

    pub(crate) fn sort_key(&self) -> (usize, usize) {
        let start = self
            .captures
            .first()
            .map_or(usize::MAX, |capture| capture.node.start_index());
        (start, self.pattern_index)
    }
}

/// Engine for executing a tree-sitter query against syntax trees of one
/// language.
pub struct QueryEngine {
    language: LanguageTag,
    query: Arc<Query>,
    capture_names: Vec<String>,
}

impl QueryEngine {
    /// Compile a query for `language`.
    ///
    /// # Query Syntax
    ///
    /// Tree-sitter queries use S-expression syntax; a source may hold
    /// several patterns:
    /// ```text
    /// (variable_declarator name: (identifier) @name)
    /// (call_expression function: (identifier) @callee (#eq? @callee "eval"))
    /// ```
    ///
    /// Captures are prefixed with `@` and can be referenced by name.
    pub fn new(language: LanguageTag, source: &str) -> Result<Self, SyntaxError> {
        let query = cache::get_or_compile_query(language, source)?;
        let capture_names = query
            .capture_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        Ok(Self {
            language,
            query,
            capture_names,
        })
    }

    pub fn language(&self) -> LanguageTag {
        self.language
    }

    pub fn pattern_count(&self) -> usize {
        self.query.pattern_count()
    }

    /// Get capture names defined in the query.
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    /// Execute the query against a tree and return all matches.
    ///
    /// Matches are ordered by the start offset of their first capture, then
    /// by pattern index. Text predicates such as `#eq?` see the original
    /// text of each node, also for trees parsed from rewritten bytes.
    pub fn find_all<'t>(&self, tree: &'t SyntaxTree) -> Result<Vec<QueryMatch<'t>>, SyntaxError> {
        if tree.language() != self.language {
            return Err(SyntaxError::LanguageMismatch {
                query: self.language,
                tree: tree.language(),
            });
        }

        let text = move |node: tree_sitter::Node<'_>| {
            std::iter::once(tree.original_bytes(node.byte_range()))
        };
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, tree.ts_tree().root_node(), text);

        let mut results = Vec::new();

        // tree-sitter 0.25+ uses StreamingIterator
        while let Some(m) = matches.next() {
            let mut captures: Vec<Capture<'t>> = m
                .captures
                .iter()
                .filter_map(|capture| {
                    let node = tree.node_for_ts(capture.node)?;
                    Some(Capture {
                        name: self.capture_names[capture.index as usize].clone(),
                        index: capture.index,
                        node,
                    })
                })
                .collect();
            captures.sort_by_key(|capture| capture.index);

            results.push(QueryMatch {
                pattern_index: m.pattern_index,
                captures,
            });
        }

        results.sort_by_key(QueryMatch::sort_key);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::grammar::{Grammar, TreeSitterGrammars};
    use crate::syntax::offsets::OffsetMap;
    use crate::syntax::source::SourceText;

    fn parse(language: LanguageTag, text: &str) -> SyntaxTree {
        let tree = TreeSitterGrammars.parse(language, text.as_bytes()).unwrap();
        SyntaxTree::new(
            language,
            0,
            tree,
            OffsetMap::identity(text.len()),
            Arc::new(SourceText::new(text)),
        )
    }

    #[test]
    fn find_declarations() {
        let tree = parse(LanguageTag::JavaScript, "var a = 1;\nlet b = 2;\nvar c = 3;");
        let engine = QueryEngine::new(
            LanguageTag::JavaScript,
            "(variable_declaration (variable_declarator name: (identifier) @name))",
        )
        .unwrap();

        let matches = engine.find_all(&tree).unwrap();
        let names: Vec<_> = matches
            .iter()
            .map(|m| m.capture("name").unwrap().text().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn captures_follow_declaration_order() {
        let tree = parse(LanguageTag::JavaScript, "let a = 1;");
        let engine = QueryEngine::new(
            LanguageTag::JavaScript,
            "(variable_declarator name: (identifier) @inner) @outer",
        )
        .unwrap();

        let matches = engine.find_all(&tree).unwrap();
        assert_eq!(matches.len(), 1);
        let names: Vec<_> = matches[0].captures.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
        assert_eq!(matches[0].captures[1].node.text(), "a = 1");
        assert_eq!(engine.capture_names(), ["inner", "outer"]);
    }

    #[test]
    fn nodes_for_collects_every_binding() {
        let tree = parse(LanguageTag::JavaScript, "let a = 1;");
        let engine = QueryEngine::new(
            LanguageTag::JavaScript,
            "(variable_declarator name: (identifier) @part value: (number) @part)",
        )
        .unwrap();

        let matches = engine.find_all(&tree).unwrap();
        let name = String::from("part");
        let texts: Vec<_> = matches[0]
            .nodes_for(&name)
            .map(|node| node.text().into_owned())
            .collect();
        assert_eq!(texts, vec!["a", "1"]);
        assert_eq!(matches[0].nodes_for("missing").count(), 0);
    }

    #[test]
    fn matches_are_in_document_order_across_patterns() {
        let tree = parse(LanguageTag::JavaScript, "foo();\nlet x = 1;\nbar();");
        let engine = QueryEngine::new(
            LanguageTag::JavaScript,
            "(call_expression function: (identifier) @callee)\n(lexical_declaration) @decl",
        )
        .unwrap();
        assert_eq!(engine.pattern_count(), 2);

        let matches = engine.find_all(&tree).unwrap();
        let order: Vec<_> = matches.iter().map(|m| m.pattern_index).collect();
        assert_eq!(order, vec![0, 1, 0]);
        let starts: Vec<_> = matches.iter().map(|m| m.sort_key().0).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn text_predicates_filter_matches() {
        let tree = parse(LanguageTag::JavaScript, "eval(a); run(b); eval(c);");
        let engine = QueryEngine::new(
            LanguageTag::JavaScript,
            r#"(call_expression function: (identifier) @fn (#eq? @fn "eval")) @call"#,
        )
        .unwrap();

        let matches = engine.find_all(&tree).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].capture("call").unwrap().text(), "eval(c)");
    }

    #[test]
    fn invalid_query_error() {
        let result = QueryEngine::new(LanguageTag::JavaScript, "(call_expression");
        assert!(matches!(result, Err(SyntaxError::InvalidQuery { .. })));

        let result = QueryEngine::new(LanguageTag::Css, "(no_such_node) @x");
        assert!(matches!(
            result,
            Err(SyntaxError::InvalidQuery {
                language: LanguageTag::Css,
                ..
            })
        ));
    }

    #[test]
    fn language_mismatch_error() {
        let tree = parse(LanguageTag::Css, "a {}");
        let engine = QueryEngine::new(LanguageTag::JavaScript, "(identifier) @id").unwrap();
        assert!(matches!(
            engine.find_all(&tree),
            Err(SyntaxError::LanguageMismatch { .. })
        ));
    }

    #[test]
    fn queries_do_not_mutate_the_tree() {
        let tree = parse(LanguageTag::Css, "a { color: red; }");
        let engine = QueryEngine::new(LanguageTag::Css, "(declaration) @d").unwrap();
        let before = tree.to_sexp();
        for _ in 0..3 {
            assert_eq!(engine.find_all(&tree).unwrap().len(), 1);
        }
        assert_eq!(tree.to_sexp(), before);
    }
}
