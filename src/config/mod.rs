pub mod catalog;
pub mod loader;
pub mod rules;
pub mod schema;

pub use catalog::{CatalogError, ChainCatalog};
pub use loader::{discover, load_from_path, load_from_str, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    ChainDefinition, EngineSettings, ExtractorDef, LintConfig, RewriterDef, RuleDefinition, Scope,
    ValidationError, ValidationIssue,
};
