//! Immutable rule descriptors.
//!
//! A [`Rule`] pairs a way of choosing the parser chain for a file with a run
//! function. Rules are plain values handed to the [`Engine`](crate::engine::Engine);
//! there is no global registry.

use crate::chain::{ChainResolver, ChainSpec};
use crate::forest::{ResolvedForest, SyntaxStore};
use crate::lang::LanguageTag;
use crate::rule::context::RuleContext;
use crate::rule::errors::RuleError;
use crate::rule::violation::Violation;
use crate::syntax::{Grammar, SourceText};
use log::debug;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

type SelectFn = dyn Fn(&FileMeta<'_>) -> Option<Selection> + Send + Sync;
type RunFn = dyn Fn(&RuleContext) -> anyhow::Result<()> + Send + Sync;

/// What a selector sees of a file before anything is parsed.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta<'a> {
    pub path: &'a Path,
    pub bytes: &'a [u8],
}

/// The chain a selector picked for one file.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Parse the whole file with one grammar.
    Language(LanguageTag),
    Chain(ChainSpec),
}

impl Selection {
    pub fn into_chain(self) -> ChainSpec {
        match self {
            Selection::Language(language) => ChainSpec::new(language),
            Selection::Chain(spec) => spec,
        }
    }
}

#[derive(Clone, Default)]
pub enum LanguageSelector {
    /// Single language detected from the file extension.
    #[default]
    Detect,
    Fixed(LanguageTag),
    Chain(ChainSpec),
    /// Decided per file.
    Select(Arc<SelectFn>),
}

impl LanguageSelector {
    /// `None` means the rule runs against an empty forest.
    pub fn selection(&self, meta: &FileMeta<'_>) -> Option<Selection> {
        match self {
            LanguageSelector::Detect => LanguageTag::from_path(meta.path).map(Selection::Language),
            LanguageSelector::Fixed(language) => Some(Selection::Language(*language)),
            LanguageSelector::Chain(spec) => Some(Selection::Chain(spec.clone())),
            LanguageSelector::Select(select) => select(meta),
        }
    }
}

impl fmt::Debug for LanguageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageSelector::Detect => f.write_str("Detect"),
            LanguageSelector::Fixed(language) => f.debug_tuple("Fixed").field(language).finish(),
            LanguageSelector::Chain(spec) => f.debug_tuple("Chain").field(&spec.entry()).finish(),
            LanguageSelector::Select(_) => f.write_str("Select(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Rule {
    name: String,
    description: Option<String>,
    selector: LanguageSelector,
    run: Arc<RunFn>,
}

impl Rule {
    pub fn builder(name: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            name: name.into(),
            description: None,
            selector: LanguageSelector::Detect,
            run: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn selector(&self) -> &LanguageSelector {
        &self.selector
    }

    /// Call the run function on a prepared context.
    pub fn run(&self, ctx: &RuleContext) -> Result<(), RuleError> {
        (self.run)(ctx).map_err(|source| RuleError::Run {
            rule: self.name.clone(),
            source: source.into(),
        })
    }

    /// Resolve `bytes` with this rule's chain, run it and return what it
    /// recorded.
    pub fn check<G: Grammar>(
        &self,
        resolver: &ChainResolver<G>,
        path: &Path,
        bytes: &[u8],
    ) -> Result<Vec<Violation>, RuleError> {
        let meta = FileMeta { path, bytes };
        let forest = match self.selector.selection(&meta) {
            Some(selection) => resolver
                .resolve(bytes, &selection.into_chain())
                .map_err(|source| RuleError::Chain {
                    rule: self.name.clone(),
                    source,
                })?,
            None => {
                debug!("{}: no language for {}", self.name, path.display());
                ResolvedForest::empty(Arc::new(SourceText::new(bytes)))
            }
        };

        let ctx = RuleContext::new(path, SyntaxStore::new(forest));
        self.run(&ctx)?;
        Ok(ctx.into_violations())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Rule`].
///
/// ```
/// use chainlint::lang::LanguageTag;
/// use chainlint::rule::Rule;
///
/// let rule = Rule::builder("no-eval")
///     .lang(LanguageTag::JavaScript)
///     .desc("eval is forbidden")
///     .run(|ctx| {
///         let matches = ctx.query_all(
///             LanguageTag::JavaScript,
///             r#"(call_expression function: (identifier) @fn (#eq? @fn "eval"))"#,
///         )?;
///         ctx.to_violations("eval call", &matches);
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// assert_eq!(rule.name(), "no-eval");
/// ```
pub struct RuleBuilder {
    name: String,
    description: Option<String>,
    selector: LanguageSelector,
    run: Option<Arc<RunFn>>,
}

impl RuleBuilder {
    pub fn lang(mut self, language: LanguageTag) -> Self {
        self.selector = LanguageSelector::Fixed(language);
        self
    }

    pub fn chain(mut self, spec: ChainSpec) -> Self {
        self.selector = LanguageSelector::Chain(spec);
        self
    }

    pub fn select<F>(mut self, select: F) -> Self
    where
        F: Fn(&FileMeta<'_>) -> Option<Selection> + Send + Sync + 'static,
    {
        self.selector = LanguageSelector::Select(Arc::new(select));
        self
    }

    pub fn desc(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn run<F>(mut self, run: F) -> Self
    where
        F: Fn(&RuleContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.run = Some(Arc::new(run));
        self
    }

    /// Fails without a run function or when a fixed chain is malformed.
    pub fn build(self) -> Result<Rule, RuleError> {
        let Some(run) = self.run else {
            return Err(RuleError::MissingRun { rule: self.name });
        };
        if let LanguageSelector::Chain(spec) = &self.selector {
            spec.validate().map_err(|source| RuleError::Chain {
                rule: self.name.clone(),
                source,
            })?;
        }

        Ok(Rule {
            name: self.name,
            description: self.description,
            selector: self.selector,
            run,
        })
    }
}
