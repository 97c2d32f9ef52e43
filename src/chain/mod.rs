//! Parser chains: which grammar governs which region of a buffer.
//!
//! A [`ChainSpec`] names an entry language and the nested languages found
//! inside it. The [`ChainResolver`] walks the chain, slicing and optionally
//! rewriting each region, and collects every parsed tree into a
//! [`ResolvedForest`](crate::forest::ResolvedForest).

pub mod errors;
pub mod extract;
pub mod resolver;
pub mod rewrite;
pub mod spec;

pub use errors::{ChainError, RewriteError};
pub use resolver::ChainResolver;
pub use rewrite::{Rewrite, Splice};
pub use spec::{ChainSpec, RangeExtractor, SourceRewriter};
