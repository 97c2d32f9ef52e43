//! Thread-local parser pooling.
//!
//! Each worker thread keeps one tree-sitter parser per language. A parser is
//! created on first use for a language and reused for every later parse on
//! that thread, so parallel file checks never share parser state.

use crate::lang::LanguageTag;
use crate::syntax::SyntaxError;
use std::cell::RefCell;
use std::collections::HashMap;
use tree_sitter::Parser;

thread_local! {
    static PARSERS: RefCell<HashMap<LanguageTag, Parser>> = RefCell::new(HashMap::new());
}

/// Execute `f` with this thread's parser for `language`.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use chainlint::pool::with_parser;
/// use chainlint::LanguageTag;
///
/// let tree = with_parser(LanguageTag::JavaScript, |parser| parser.parse("let x;", None))?;
/// assert!(tree.is_some());
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(language: LanguageTag, f: F) -> Result<R, SyntaxError>
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let mut parser = Parser::new();
                parser
                    .set_language(&language.ts_language())
                    .map_err(|_| SyntaxError::LanguageSet { language })?;
                entry.insert(parser)
            }
        };
        Ok(f(parser))
    })
}

/// Number of parsers pooled on the current thread.
pub fn pooled_parsers() -> usize {
    PARSERS.with(|cell| cell.borrow().len())
}
