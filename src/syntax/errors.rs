use crate::lang::LanguageTag;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("failed to set {language} grammar for parser")]
    LanguageSet { language: LanguageTag },

    #[error("failed to parse {language} source")]
    ParseFailed { language: LanguageTag },

    #[error("invalid {language} query: {message}")]
    InvalidQuery {
        language: LanguageTag,
        message: String,
    },

    #[error("no {language} syntax tree was resolved for this file")]
    NotFound { language: LanguageTag },

    #[error("query compiled for {query} cannot run against a {tree} tree")]
    LanguageMismatch {
        query: LanguageTag,
        tree: LanguageTag,
    },
}
