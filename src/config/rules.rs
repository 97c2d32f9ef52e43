//! Query rules declared in configuration.

use crate::config::catalog::ChainCatalog;
use crate::config::loader::ConfigError;
use crate::config::schema::{LintConfig, RuleDefinition};
use crate::lang::LanguageTag;
use crate::rule::{FileMeta, Rule, Selection};
use crate::syntax::QueryEngine;
use std::path::Path;

impl LintConfig {
    /// Turn every `[[rules]]` entry into a [`Rule`] that runs its query over
    /// all trees of the target language and reports each capture.
    ///
    /// Queries are compiled here so a typo fails the whole run up front
    /// instead of every file.
    pub fn build_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        let catalog = ChainCatalog::from_definitions(&self.chains)
            .map_err(|source| ConfigError::Catalog { path: None, source })?;
        self.rules
            .iter()
            .map(|definition| build_rule(&catalog, definition))
            .collect()
    }
}

fn build_rule(catalog: &ChainCatalog, definition: &RuleDefinition) -> Result<Rule, ConfigError> {
    let mut builder = Rule::builder(&definition.name);
    if let Some(description) = &definition.description {
        builder = builder.desc(description);
    }

    let target = match (&definition.chain, definition.lang) {
        (Some(name), _) => {
            let spec = catalog
                .spec(name)
                .map_err(|source| ConfigError::Catalog { path: None, source })?;
            let extensions = catalog
                .get(name)
                .map(|chain| chain.extensions.clone())
                .unwrap_or_default();
            let target = definition.target.unwrap_or(spec.entry());
            builder = builder.select(move |meta: &FileMeta<'_>| {
                (extensions.is_empty() || has_extension(meta.path, &extensions))
                    .then(|| Selection::Chain(spec.clone()))
            });
            target
        }
        (None, Some(language)) => {
            builder = builder.select(move |meta: &FileMeta<'_>| {
                (LanguageTag::from_path(meta.path) == Some(language))
                    .then_some(Selection::Language(language))
            });
            definition.target.unwrap_or(language)
        }
        (None, None) => {
            return Err(ConfigError::Rule {
                rule: definition.name.clone(),
                message: "no chain or lang to parse files with".to_string(),
            })
        }
    };

    QueryEngine::new(target, &definition.query).map_err(|source| ConfigError::Query {
        rule: definition.name.clone(),
        source,
    })?;

    let query = definition.query.clone();
    let title = definition.title().to_string();
    builder
        .run(move |ctx| {
            let matches = ctx.query_all(target, &query)?;
            ctx.to_violations(&title, &matches);
            Ok(())
        })
        .build()
        .map_err(|source| ConfigError::Rule {
            rule: definition.name.clone(),
            message: source.to_string(),
        })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}
