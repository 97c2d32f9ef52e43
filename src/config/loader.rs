use crate::config::catalog::{CatalogError, ChainCatalog};
use crate::config::schema::{LintConfig, ValidationError};
use crate::syntax::SyntaxError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up by [`discover`].
pub const CONFIG_FILE_NAME: &str = "chainlint.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    Catalog {
        path: Option<PathBuf>,
        source: CatalogError,
    },
    Query {
        rule: String,
        source: SyntaxError,
    },
    Rule {
        rule: String,
        message: String,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            ConfigError::Catalog { path: None, source } => ConfigError::Catalog {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse config TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
            ConfigError::Catalog { path, source } => match path {
                Some(path) => write!(f, "invalid chains ({}): {}", path.display(), source),
                None => write!(f, "invalid chains: {}", source),
            },
            ConfigError::Query { rule, source } => write!(f, "rule '{rule}': {source}"),
            ConfigError::Rule { rule, message } => write!(f, "rule '{rule}': {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Catalog { source, .. } => Some(source),
            ConfigError::Query { source, .. } => Some(source),
            ConfigError::Rule { .. } => None,
        }
    }
}

/// Parse, validate and check the chain references of a config.
pub fn load_from_str(input: &str) -> Result<LintConfig, ConfigError> {
    let config: LintConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    let catalog = ChainCatalog::from_definitions(&config.chains)
        .map_err(|source| ConfigError::Catalog { path: None, source })?;
    for rule in &config.rules {
        let Some(name) = &rule.chain else { continue };
        if catalog.get(name).is_none() {
            return Err(ConfigError::Catalog {
                path: None,
                source: CatalogError::UnknownChain {
                    name: name.clone(),
                    referenced_by: format!("rule '{}'", rule.name),
                },
            });
        }
    }
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<LintConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Nearest `chainlint.toml` in `start` or one of its ancestors.
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
