//! Language tags and grammar selection via ast-grep-language.
//!
//! We use the grammars bundled with `ast_grep_language::SupportLang` instead
//! of depending on each tree-sitter grammar crate individually. The set of
//! languages a chain can reference is closed: every tag maps to exactly one
//! grammar.

use ast_grep_language::{LanguageExt, SupportLang};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Languages that can appear in a parse chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LanguageTag {
    Html,
    Css,
    JavaScript,
    TypeScript,
    Json,
    Php,
}

impl LanguageTag {
    /// Every supported tag, in declaration order.
    pub const ALL: [LanguageTag; 6] = [
        LanguageTag::Html,
        LanguageTag::Css,
        LanguageTag::JavaScript,
        LanguageTag::TypeScript,
        LanguageTag::Json,
        LanguageTag::Php,
    ];

    /// Lower-case identifier used in configuration and output.
    pub const fn as_str(self) -> &'static str {
        match self {
            LanguageTag::Html => "html",
            LanguageTag::Css => "css",
            LanguageTag::JavaScript => "javascript",
            LanguageTag::TypeScript => "typescript",
            LanguageTag::Json => "json",
            LanguageTag::Php => "php",
        }
    }

    /// The ast-grep language backing this tag.
    pub fn support_lang(self) -> SupportLang {
        match self {
            LanguageTag::Html => SupportLang::Html,
            LanguageTag::Css => SupportLang::Css,
            LanguageTag::JavaScript => SupportLang::JavaScript,
            LanguageTag::TypeScript => SupportLang::TypeScript,
            LanguageTag::Json => SupportLang::Json,
            LanguageTag::Php => SupportLang::Php,
        }
    }

    /// The tree-sitter grammar for this tag.
    pub fn ts_language(self) -> tree_sitter::Language {
        self.support_lang().get_ts_language()
    }

    /// Detect a language from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" | "xhtml" => Some(LanguageTag::Html),
            "css" => Some(LanguageTag::Css),
            "js" | "mjs" | "cjs" | "jsx" => Some(LanguageTag::JavaScript),
            "ts" | "mts" | "cts" => Some(LanguageTag::TypeScript),
            "json" => Some(LanguageTag::Json),
            "php" | "phtml" => Some(LanguageTag::Php),
            _ => None,
        }
    }

    /// Detect a language from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a language name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage {
    pub input: String,
    pub suggestion: Option<&'static str>,
}

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language '{}'", self.input)?;
        if let Some(suggestion) = self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for LanguageTag {
    type Err = UnknownLanguage;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "html" | "markup" => Ok(LanguageTag::Html),
            "css" | "style" => Ok(LanguageTag::Css),
            "javascript" | "js" | "script" => Ok(LanguageTag::JavaScript),
            "typescript" | "ts" => Ok(LanguageTag::TypeScript),
            "json" => Ok(LanguageTag::Json),
            "php" => Ok(LanguageTag::Php),
            _ => Err(UnknownLanguage {
                suggestion: closest_name(&normalized),
                input: input.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = UnknownLanguage;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn closest_name(input: &str) -> Option<&'static str> {
    LanguageTag::ALL
        .iter()
        .map(|tag| (tag.as_str(), strsim::jaro_winkler(input, tag.as_str())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
}
