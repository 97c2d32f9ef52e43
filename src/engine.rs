//! Runs rules over files, one fresh forest per rule and file.

use crate::chain::ChainResolver;
use crate::config::EngineSettings;
use crate::rule::{Rule, RuleError, Violation};
use crate::syntax::{Grammar, TreeSitterGrammars};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What one rule produced for one file.
#[derive(Debug, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub violations: Vec<Violation>,
    /// Set when the rule could not run to completion. Violations recorded
    /// before the failure are discarded.
    #[serde(serialize_with = "error_message")]
    pub error: Option<RuleError>,
}

impl RuleOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || !self.violations.is_empty()
    }
}

/// Result of checking one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcomes: Vec<RuleOutcome>,
    /// Set when the file could not be read; no rule ran.
    #[serde(serialize_with = "error_message")]
    pub error: Option<RuleError>,
}

impl FileReport {
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.outcomes.iter().any(RuleOutcome::is_failed)
    }

    pub fn violation_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.violations.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        usize::from(self.error.is_some())
            + self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Result of checking a set of files.
#[derive(Debug, Default)]
pub struct Report {
    pub files: Vec<FileReport>,
    pub duration: Duration,
}

impl Report {
    pub fn failed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| file.is_failed())
    }

    pub fn violation_count(&self) -> usize {
        self.files.iter().map(FileReport::violation_count).sum()
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().map(FileReport::error_count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_files().next().is_none()
    }

    /// 0 when clean, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

pub struct Engine<G = TreeSitterGrammars> {
    rules: Vec<Rule>,
    settings: EngineSettings,
    resolver: ChainResolver<G>,
}

impl Engine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self::with_grammar(rules, TreeSitterGrammars)
    }
}

impl<G: Grammar> Engine<G> {
    pub fn with_grammar(rules: Vec<Rule>, grammar: G) -> Self {
        Self {
            rules,
            settings: EngineSettings::default(),
            resolver: ChainResolver::with_grammar(grammar),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run every rule against an in-memory buffer.
    pub fn check_source(&self, path: &Path, bytes: &[u8]) -> FileReport {
        let outcomes = self
            .rules
            .iter()
            .map(|rule| {
                let start = Instant::now();
                let result = rule.check(&self.resolver, path, bytes);
                debug!(
                    "{} on {} took {:?}",
                    rule.name(),
                    path.display(),
                    start.elapsed()
                );
                match result {
                    Ok(violations) => RuleOutcome {
                        rule: rule.name().to_string(),
                        violations,
                        error: None,
                    },
                    Err(error) => {
                        warn!("{}: {}", path.display(), error);
                        RuleOutcome {
                            rule: rule.name().to_string(),
                            violations: Vec::new(),
                            error: Some(error),
                        }
                    }
                }
            })
            .collect();

        FileReport {
            path: path.to_path_buf(),
            outcomes,
            error: None,
        }
    }

    pub fn check_file(&self, path: &Path) -> FileReport {
        match std::fs::read(path) {
            Ok(bytes) => self.check_source(path, &bytes),
            Err(source) => FileReport {
                path: path.to_path_buf(),
                outcomes: Vec::new(),
                error: Some(RuleError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            },
        }
    }

    /// Check files, in parallel when the settings allow it. Reports come
    /// back in the order of `files`.
    pub fn check_files(&self, files: &[PathBuf]) -> Report {
        let start = Instant::now();

        let files: Vec<FileReport> = if self.settings.parallel && files.len() > 1 {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if self.settings.jobs > 0 {
                builder = builder.num_threads(self.settings.jobs);
            }
            match builder.build() {
                Ok(pool) => {
                    pool.install(|| files.par_iter().map(|f| self.check_file(f)).collect())
                }
                Err(error) => {
                    warn!("could not start worker pool, checking sequentially: {error}");
                    files.iter().map(|f| self.check_file(f)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.check_file(f)).collect()
        };

        let report = Report {
            files,
            duration: start.elapsed(),
        };
        info!(
            "checked {} file(s) with {} rule(s) in {:?}: {} violation(s), {} error(s)",
            report.files.len(),
            self.rules.len(),
            report.duration,
            report.violation_count(),
            report.error_count()
        );
        report
    }
}

fn error_message<S: Serializer>(error: &Option<RuleError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
