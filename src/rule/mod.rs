//! Rules, the context they run in and the violations they record.

pub mod context;
pub mod descriptor;
pub mod errors;
pub mod violation;

pub use context::RuleContext;
pub use descriptor::{FileMeta, LanguageSelector, Rule, RuleBuilder, Selection};
pub use errors::RuleError;
pub use violation::{Violation, ViolationHandle, ViolationRecorder};
