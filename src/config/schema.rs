use crate::chain::{extract, rewrite, RangeExtractor, SourceRewriter};
use crate::lang::LanguageTag;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LintConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub chains: Vec<ChainDefinition>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl LintConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.chains.is_empty() && self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyConfig);
        }

        let nested: HashSet<&str> = self
            .chains
            .iter()
            .flat_map(|chain| chain.children.iter().map(String::as_str))
            .collect();

        let mut seen = HashSet::new();
        for chain in &self.chains {
            let scope = Scope::Chain(chain.name.clone());
            if chain.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    scope: Scope::Chain(String::new()),
                    field: "name",
                });
            } else if !seen.insert(chain.name.as_str()) {
                issues.push(ValidationIssue::Duplicate { scope });
                continue;
            }

            if !chain.extensions.is_empty() && chain.extract.is_some() {
                issues.push(ValidationIssue::InvalidCombo {
                    scope: scope.clone(),
                    message: "a root chain (with extensions) cannot declare an extractor"
                        .to_string(),
                });
            }
            if nested.contains(chain.name.as_str()) && chain.extract.is_none() {
                issues.push(ValidationIssue::MissingField {
                    scope: scope.clone(),
                    field: "extract",
                });
            }
            if let Some(extract) = &chain.extract {
                extract.check(&scope, &mut issues);
            }
            if let Some(rewrite) = &chain.rewrite {
                rewrite.check(&scope, &mut issues);
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let scope = Scope::Rule(rule.name.clone());
            if rule.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    scope: Scope::Rule(String::new()),
                    field: "name",
                });
            } else if !seen.insert(rule.name.as_str()) {
                issues.push(ValidationIssue::Duplicate {
                    scope: scope.clone(),
                });
            }

            match (&rule.chain, &rule.lang) {
                (Some(_), Some(_)) => issues.push(ValidationIssue::InvalidCombo {
                    scope: scope.clone(),
                    message: "set either `chain` or `lang`, not both".to_string(),
                }),
                (None, None) => issues.push(ValidationIssue::MissingField {
                    scope: scope.clone(),
                    field: "chain",
                }),
                _ => {}
            }
            if rule.query.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    scope: scope.clone(),
                    field: "query",
                });
            }
            if let (Some(lang), Some(target)) = (rule.lang, rule.target) {
                if lang != target {
                    issues.push(ValidationIssue::InvalidCombo {
                        scope,
                        message: format!("target {target} is never parsed by a {lang} rule"),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Chains usable out of the box: HTML pages with their scripts, style
    /// sheets and inline `style` attributes, plus the standalone languages.
    pub fn builtin() -> Self {
        let nested = |name: &str,
                      entry: LanguageTag,
                      extract: ExtractorDef,
                      rewrite: Option<RewriterDef>| ChainDefinition {
            name: name.to_string(),
            entry,
            extensions: Vec::new(),
            children: Vec::new(),
            extract: Some(extract),
            rewrite,
        };
        let root = |name: &str,
                    entry: LanguageTag,
                    extensions: &[&str],
                    children: &[&str]| ChainDefinition {
            name: name.to_string(),
            entry,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            children: children.iter().map(|c| c.to_string()).collect(),
            extract: None,
            rewrite: None,
        };

        Self {
            engine: EngineSettings::default(),
            chains: vec![
                root(
                    "page",
                    LanguageTag::Html,
                    &["html", "htm", "xhtml"],
                    &["page-script", "page-style", "inline-style"],
                ),
                nested(
                    "page-script",
                    LanguageTag::JavaScript,
                    ExtractorDef::HtmlScript,
                    Some(RewriterDef::StripCommentWrapper),
                ),
                nested(
                    "page-style",
                    LanguageTag::Css,
                    ExtractorDef::HtmlStyle,
                    Some(RewriterDef::StripCommentWrapper),
                ),
                nested(
                    "inline-style",
                    LanguageTag::Css,
                    ExtractorDef::HtmlAttribute {
                        name: "style".to_string(),
                    },
                    Some(RewriterDef::Wrap {
                        prefix: "*{".to_string(),
                        suffix: "}".to_string(),
                    }),
                ),
                root("script", LanguageTag::JavaScript, &["js", "mjs", "cjs", "jsx"], &[]),
                root("typescript", LanguageTag::TypeScript, &["ts", "mts", "cts"], &[]),
                root("stylesheet", LanguageTag::Css, &["css"], &[]),
                root("json", LanguageTag::Json, &["json"], &[]),
                root("php", LanguageTag::Php, &["php", "phtml"], &[]),
            ],
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    /// Check files on a rayon pool.
    pub parallel: bool,
    /// Worker threads; 0 lets rayon decide.
    pub jobs: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainDefinition {
    pub name: String,
    pub entry: LanguageTag,
    /// File extensions this chain handles as a root chain.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Names of nested chains.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub extract: Option<ExtractorDef>,
    #[serde(default)]
    pub rewrite: Option<RewriterDef>,
}

impl ChainDefinition {
    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExtractorDef {
    HtmlScript,
    HtmlStyle,
    HtmlAttribute {
        name: String,
    },
    Kinds {
        kinds: Vec<String>,
        #[serde(default)]
        within: Vec<String>,
    },
}

impl ExtractorDef {
    pub fn build(&self) -> RangeExtractor {
        match self {
            ExtractorDef::HtmlScript => extract::html_script(),
            ExtractorDef::HtmlStyle => extract::html_style(),
            ExtractorDef::HtmlAttribute { name } => extract::html_attribute(name.clone()),
            ExtractorDef::Kinds { kinds, within } => extract::kinds(kinds.clone(), within.clone()),
        }
    }

    fn check(&self, scope: &Scope, issues: &mut Vec<ValidationIssue>) {
        match self {
            ExtractorDef::HtmlAttribute { name } if name.trim().is_empty() => {
                issues.push(ValidationIssue::MissingField {
                    scope: scope.clone(),
                    field: "extract.name",
                });
            }
            ExtractorDef::Kinds { kinds, .. } if kinds.is_empty() => {
                issues.push(ValidationIssue::MissingField {
                    scope: scope.clone(),
                    field: "extract.kinds",
                });
            }
            _ => {}
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RewriterDef {
    StripCommentWrapper,
    Wrap {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
    /// Blank out template or server-side regions such as `{{ ... }}`.
    BlankDelimited {
        open: String,
        close: String,
    },
}

impl RewriterDef {
    pub fn build(&self) -> SourceRewriter {
        match self {
            RewriterDef::StripCommentWrapper => rewrite::strip_comment_wrapper(),
            RewriterDef::Wrap { prefix, suffix } => rewrite::wrap(prefix.clone(), suffix.clone()),
            RewriterDef::BlankDelimited { open, close } => {
                rewrite::blank_delimited(open.clone(), close.clone())
            }
        }
    }

    fn check(&self, scope: &Scope, issues: &mut Vec<ValidationIssue>) {
        match self {
            RewriterDef::Wrap { prefix, suffix } if prefix.is_empty() && suffix.is_empty() => {
                issues.push(ValidationIssue::InvalidCombo {
                    scope: scope.clone(),
                    message: "wrap needs a prefix or a suffix".to_string(),
                });
            }
            RewriterDef::BlankDelimited { open, close } => {
                if open.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        scope: scope.clone(),
                        field: "rewrite.open",
                    });
                }
                if close.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        scope: scope.clone(),
                        field: "rewrite.close",
                    });
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Named chain to resolve files with.
    #[serde(default)]
    pub chain: Option<String>,
    /// Single language to parse files with.
    #[serde(default)]
    pub lang: Option<LanguageTag>,
    /// Language the query runs against. Defaults to `lang` or the chain's
    /// entry language.
    #[serde(default)]
    pub target: Option<LanguageTag>,
    pub query: String,
    /// Violation title. Defaults to the rule name.
    #[serde(default)]
    pub title: Option<String>,
}

impl RuleDefinition {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

/// What a validation issue is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Chain(String),
    Rule(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Chain(name) if name.is_empty() => write!(f, "chain"),
            Scope::Chain(name) => write!(f, "chain '{name}'"),
            Scope::Rule(name) if name.is_empty() => write!(f, "rule"),
            Scope::Rule(name) => write!(f, "rule '{name}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyConfig,
    MissingField { scope: Scope, field: &'static str },
    Duplicate { scope: Scope },
    InvalidCombo { scope: Scope, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyConfig => write!(f, "config defines no chains and no rules"),
            ValidationIssue::MissingField { scope, field } => {
                write!(f, "{scope} missing required field '{field}'")
            }
            ValidationIssue::Duplicate { scope } => write!(f, "{scope} is defined more than once"),
            ValidationIssue::InvalidCombo { scope, message } => {
                write!(f, "{scope} has invalid configuration: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> LintConfig {
        toml_edit::de::from_str(input).unwrap()
    }

    #[test]
    fn tagged_extractors_and_rewriters() {
        let config = parse(
            r#"
[[chains]]
name = "attr"
entry = "css"
extract = { type = "html-attribute", name = "style" }
rewrite = { type = "wrap", prefix = "*{", suffix = "}" }

[[chains]]
name = "tmpl"
entry = "css"
extract = { type = "kinds", kinds = ["string_fragment"] }
rewrite = { type = "blank-delimited", open = "${", close = "}" }
"#,
        );
        assert_eq!(
            config.chains[0].extract,
            Some(ExtractorDef::HtmlAttribute {
                name: "style".into()
            })
        );
        assert_eq!(
            config.chains[1].extract,
            Some(ExtractorDef::Kinds {
                kinds: vec!["string_fragment".into()],
                within: Vec::new()
            })
        );
        assert!(matches!(
            config.chains[1].rewrite,
            Some(RewriterDef::BlankDelimited { .. })
        ));
        assert!(config.engine.parallel);
    }

    #[test]
    fn root_chain_with_extractor_is_reported() {
        let config = parse(
            r#"
[[chains]]
name = "page"
entry = "html"
extensions = ["html"]
extract = { type = "html-script" }
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chain 'page' has invalid configuration"));
    }

    #[test]
    fn nested_chain_without_extractor_is_reported() {
        let config = parse(
            r#"
[[chains]]
name = "page"
entry = "html"
children = ["script"]

[[chains]]
name = "script"
entry = "javascript"
"#,
        );
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![ValidationIssue::MissingField {
                scope: Scope::Chain("script".into()),
                field: "extract"
            }]
        );
    }

    #[test]
    fn rule_needs_exactly_one_source_and_a_query() {
        let config = parse(
            r#"
[[rules]]
name = "both"
chain = "page"
lang = "css"
query = "(rule_set) @r"

[[rules]]
name = "neither"
query = "  "
"#,
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert!(err.to_string().contains("rule 'both' has invalid configuration"));
        assert!(err.to_string().contains("rule 'neither' missing required field 'query'"));
    }

    #[test]
    fn unknown_language_is_a_parse_error() {
        let result: Result<LintConfig, _> = toml_edit::de::from_str(
            r#"
[[chains]]
name = "x"
entry = "javascrpt"
"#,
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("did you mean 'javascript'"), "{message}");
    }

    #[test]
    fn builtin_config_is_valid() {
        let config = LintConfig::builtin();
        config.validate().unwrap();
        assert!(config.chains[0].handles_extension("HTML"));
        assert_eq!(config.chains[0].children.len(), 3);
    }
}
