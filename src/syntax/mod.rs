//! Syntax trees, node navigation and tree-sitter queries.
//!
//! Trees are parsed by a [`Grammar`], copied into an index-linked arena and
//! exposed in the coordinates of the original file, whatever slicing or
//! rewriting happened before the parse.

pub mod errors;
pub mod grammar;
pub mod node;
pub mod offsets;
pub mod position;
pub mod query;
pub mod source;
pub mod tree;

pub use errors::SyntaxError;
pub use grammar::{Grammar, TreeSitterGrammars};
pub use node::{SyntaxNode, Walk};
pub use offsets::{OffsetMap, Segment};
pub use position::{ByteRange, LineIndex, Point};
pub use query::{Capture, QueryEngine, QueryMatch};
pub use source::SourceText;
pub use tree::{NodeId, SyntaxTree};
