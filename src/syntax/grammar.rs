use crate::lang::LanguageTag;
use crate::pool;
use crate::syntax::errors::SyntaxError;
use tree_sitter::Tree;

/// Turns the bytes of one language into a tree-sitter tree.
///
/// Implementations must be deterministic and free of side effects for
/// identical input; the resolver may call them from many threads at once.
pub trait Grammar: Send + Sync {
    fn parse(&self, language: LanguageTag, source: &[u8]) -> Result<Tree, SyntaxError>;
}

/// Grammars bundled with ast-grep-language, parsed with pooled parsers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterGrammars;

impl Grammar for TreeSitterGrammars {
    fn parse(&self, language: LanguageTag, source: &[u8]) -> Result<Tree, SyntaxError> {
        pool::with_parser(language, |parser| {
            let tree = parser.parse(source, None);
            parser.reset();
            tree
        })?
        .ok_or(SyntaxError::ParseFailed { language })
    }
}
