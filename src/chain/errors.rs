use crate::lang::LanguageTag;
use crate::syntax::SyntaxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("root {language} chain must not declare a range extractor")]
    RootExtractor { language: LanguageTag },

    #[error("nested {language} chain has no range extractor")]
    MissingExtractor { language: LanguageTag },

    #[error(
        "{language} extractor '{extractor}' returned range {start}..{end} outside a parent of {len} bytes"
    )]
    InvalidRange {
        language: LanguageTag,
        extractor: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("failed to parse {language} occurrence {occurrence}: {source}")]
    Parse {
        language: LanguageTag,
        occurrence: usize,
        #[source]
        source: SyntaxError,
    },

    #[error("rewriter '{rewriter}' failed for {language} occurrence {occurrence}: {source}")]
    Rewrite {
        language: LanguageTag,
        occurrence: usize,
        rewriter: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("splice at {start} overlaps or precedes the previous splice ending at {previous_end}")]
    UnorderedSplices { start: usize, previous_end: usize },

    #[error("splice {start}..{end} lies outside the {len}-byte slice")]
    SpliceOutOfBounds { start: usize, end: usize, len: usize },
}
