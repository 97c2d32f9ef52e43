use crate::chain::ChainError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{rule}' has no run function")]
    MissingRun { rule: String },

    #[error("rule '{rule}': {source}")]
    Chain {
        rule: String,
        #[source]
        source: ChainError,
    },

    #[error("rule '{rule}' failed: {source}")]
    Run {
        rule: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
