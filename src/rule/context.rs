use crate::forest::SyntaxStore;
use crate::lang::LanguageTag;
use crate::rule::violation::{Violation, ViolationHandle, ViolationRecorder};
use crate::syntax::{QueryMatch, SyntaxError, SyntaxTree};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a rule's run function can see for one file.
#[derive(Debug)]
pub struct RuleContext {
    path: PathBuf,
    store: SyntaxStore,
    recorder: ViolationRecorder,
}

impl RuleContext {
    pub fn new(path: impl Into<PathBuf>, store: SyntaxStore) -> Self {
        let recorder = ViolationRecorder::new(Arc::clone(store.source()));
        Self {
            path: absolute(path.into()),
            store,
            recorder,
        }
    }

    /// Absolute path of the file under check.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        self.store.source().bytes()
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.store.source().text()
    }

    pub fn store(&self) -> &SyntaxStore {
        &self.store
    }

    pub fn has_syntax(&self, language: LanguageTag) -> bool {
        self.store.has_syntax(language)
    }

    pub fn get_syntax(&self, language: LanguageTag) -> Result<&SyntaxTree, SyntaxError> {
        self.store.get_syntax(language)
    }

    pub fn syntaxes(&self, language: LanguageTag) -> &[Arc<SyntaxTree>] {
        self.store.syntaxes(language)
    }

    pub fn query(
        &self,
        language: LanguageTag,
        pattern: &str,
    ) -> Result<Vec<QueryMatch<'_>>, SyntaxError> {
        self.store.query(language, pattern)
    }

    pub fn query_all(
        &self,
        language: LanguageTag,
        pattern: &str,
    ) -> Result<Vec<QueryMatch<'_>>, SyntaxError> {
        self.store.query_all(language, pattern)
    }

    pub fn violation(&self, title: impl Into<String>) -> ViolationHandle<'_> {
        self.recorder.violation(title)
    }

    pub fn to_violations(&self, title: &str, matches: &[QueryMatch<'_>]) -> usize {
        self.recorder.to_violations(title, matches)
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.recorder.violations()
    }

    pub fn is_failed(&self) -> bool {
        self.recorder.is_failed()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.recorder.into_violations()
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{extract, ChainResolver, ChainSpec};

    fn context(path: &str, text: &str) -> RuleContext {
        let spec = ChainSpec::new(LanguageTag::Html)
            .with_child(ChainSpec::nested(LanguageTag::Css, extract::html_style()));
        let forest = ChainResolver::new().resolve(text.as_bytes(), &spec).unwrap();
        RuleContext::new(path, SyntaxStore::new(forest))
    }

    #[test]
    fn path_is_absolute() {
        let ctx = context("pages/index.html", "<p></p>");
        assert!(ctx.path().is_absolute());
        assert!(ctx.path().ends_with("pages/index.html"));
    }

    #[test]
    fn queries_and_violations_interleave() {
        let text = "<style>a { color: red; } b { color: blue; }</style>";
        let ctx = context("/site/page.html", text);
        assert_eq!(ctx.bytes(), text.as_bytes());
        assert!(ctx.has_syntax(LanguageTag::Css));
        assert!(!ctx.has_syntax(LanguageTag::JavaScript));

        let matches = ctx
            .query(LanguageTag::Css, "(declaration (plain_value) @value)")
            .unwrap();
        for m in &matches {
            let node = m.capture("value").unwrap();
            ctx.violation(format!("colour {}", node.text()))
                .set_byte_range(node.range());
        }

        let violations = ctx.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].title, "colour red");
        let span = violations[1].range.unwrap().as_range();
        assert_eq!(&text[span], "blue");
        assert!(ctx.is_failed());
    }

    #[test]
    fn passing_rule_has_no_violations() {
        let ctx = context("/site/page.html", "<p>plain</p>");
        assert!(ctx.query_all(LanguageTag::Css, "(rule_set) @r").unwrap().is_empty());
        assert!(!ctx.is_failed());
        assert!(ctx.into_violations().is_empty());
    }
}
