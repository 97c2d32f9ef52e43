//! chainlint: rules over files that embed several languages.
//!
//! A markup page carries scripts, style sheets and inline style attributes.
//! chainlint resolves which grammar governs which byte range, parses every
//! region with the right grammar and lets rules query the resulting forest as
//! if each region were a file of its own, while every node still reports its
//! position in the original buffer.
//!
//! # Architecture
//!
//! - [`chain`]: parser chains and the [`ChainResolver`] that walks them,
//!   slicing and rewriting regions before they are parsed.
//! - [`syntax`]: arena-backed trees, node navigation, offset maps and
//!   tree-sitter queries.
//! - [`forest`]: the trees of one file, grouped by language.
//! - [`rule`]: rule descriptors, the context a rule runs in and the violation
//!   recorder.
//! - [`engine`]: runs rules over many files on a rayon pool.
//! - [`config`]: TOML chains and query rules.
//!
//! # Example
//!
//! ```
//! use chainlint::chain::{extract, ChainResolver, ChainSpec};
//! use chainlint::forest::SyntaxStore;
//! use chainlint::lang::LanguageTag;
//!
//! let spec = ChainSpec::new(LanguageTag::Html)
//!     .with_child(ChainSpec::nested(LanguageTag::JavaScript, extract::html_script()));
//! let forest = ChainResolver::new()
//!     .resolve(b"<script>var x = 1;</script>", &spec)
//!     .unwrap();
//!
//! let store = SyntaxStore::new(forest);
//! let script = store.get_syntax(LanguageTag::JavaScript).unwrap();
//! assert_eq!(script.root_node().range().as_range(), 8..18);
//! ```

pub mod cache;
pub mod chain;
pub mod config;
pub mod engine;
pub mod forest;
pub mod lang;
pub mod pool;
pub mod rule;
pub mod syntax;

// Re-exports
pub use chain::{ChainError, ChainResolver, ChainSpec, RangeExtractor, SourceRewriter};
pub use config::{load_from_path, load_from_str, ConfigError, LintConfig};
pub use engine::{Engine, FileReport, Report, RuleOutcome};
pub use forest::{ResolvedForest, SyntaxStore};
pub use lang::LanguageTag;
pub use rule::{Rule, RuleContext, RuleError, Violation};
pub use syntax::{
    ByteRange, Point, QueryEngine, QueryMatch, SyntaxError, SyntaxNode, SyntaxTree,
};
