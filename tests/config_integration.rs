//! Integration tests for configuration on disk
//!
//! Tests discovery, loading, rule building and engine runs over real files

use chainlint::config::{discover, load_from_path, ConfigError, CONFIG_FILE_NAME};
use chainlint::engine::Engine;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CONFIG: &str = r#"
[engine]
parallel = true
jobs = 2

[[chains]]
name = "page"
entry = "html"
extensions = ["html"]
children = ["page-script", "inline-style"]

[[chains]]
name = "page-script"
entry = "javascript"
extract = { type = "html-script" }
rewrite = { type = "strip-comment-wrapper" }

[[chains]]
name = "inline-style"
entry = "css"
extract = { type = "html-attribute", name = "style" }
rewrite = { type = "wrap", prefix = "*{", suffix = "}" }

[[rules]]
name = "no-eval"
description = "eval runs arbitrary code"
chain = "page"
target = "javascript"
query = '(call_expression function: (identifier) @fn (#eq? @fn "eval"))'
title = "eval call"

[[rules]]
name = "no-important"
chain = "page"
target = "css"
query = "(important) @flag"

[[rules]]
name = "no-var"
lang = "javascript"
query = "(variable_declaration) @decl"
"#;

/// Helper to create a workspace with a config and a few source files
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), CONFIG).unwrap();

    let pages = dir.path().join("pages");
    fs::create_dir(&pages).unwrap();
    fs::write(
        pages.join("index.html"),
        r#"<html>
<body style="color: red !important">
<script>
<!--
eval(location.hash);
-->
</script>
</body>
</html>
"#,
    )
    .unwrap();
    fs::write(pages.join("clean.html"), "<p style=\"margin: 0\">hi</p>\n").unwrap();
    fs::write(dir.path().join("app.js"), "var a = 1;\nlet b = 2;\n").unwrap();

    dir
}

#[test]
fn test_discover_walks_up_from_nested_directory() {
    let workspace = setup_test_workspace();
    let found = discover(&workspace.path().join("pages")).unwrap();
    assert_eq!(found, workspace.path().join(CONFIG_FILE_NAME));
}

#[test]
fn test_discover_without_config() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();
    // An ancestor outside the temp dir could carry a config; only check
    // that nothing inside it is reported.
    if let Some(found) = discover(&nested) {
        assert!(!found.starts_with(dir.path()));
    }
}

#[test]
fn test_load_and_build_rules() {
    let workspace = setup_test_workspace();
    let config = load_from_path(workspace.path().join(CONFIG_FILE_NAME)).unwrap();

    assert!(config.engine.parallel);
    assert_eq!(config.engine.jobs, 2);
    assert_eq!(config.chains.len(), 3);

    let rules = config.build_rules().unwrap();
    let names: Vec<_> = rules.iter().map(|rule| rule.name()).collect();
    assert_eq!(names, vec!["no-eval", "no-important", "no-var"]);
    assert_eq!(rules[0].description(), Some("eval runs arbitrary code"));
}

#[test]
fn test_engine_over_workspace_files() {
    let workspace = setup_test_workspace();
    let config = load_from_path(workspace.path().join(CONFIG_FILE_NAME)).unwrap();
    let engine = Engine::new(config.build_rules().unwrap()).with_settings(config.engine.clone());

    let files: Vec<PathBuf> = vec![
        workspace.path().join("app.js"),
        workspace.path().join("pages/clean.html"),
        workspace.path().join("pages/index.html"),
    ];
    let report = engine.check_files(&files);

    assert_eq!(report.files.len(), 3);
    assert!(!report.is_clean());
    assert_eq!(report.exit_code(), 1);

    // Reports keep the input order.
    let app = &report.files[0];
    assert_eq!(app.path, files[0]);
    let by_rule = |name: &str| {
        app.outcomes
            .iter()
            .find(|outcome| outcome.rule == name)
            .unwrap()
    };
    assert_eq!(by_rule("no-var").violations.len(), 1);
    // Chain rules only select .html files.
    assert!(by_rule("no-eval").violations.is_empty());

    let clean = &report.files[1];
    assert!(!clean.is_failed(), "{:?}", clean.outcomes);

    let index = &report.files[2];
    let source = fs::read_to_string(&files[2]).unwrap();
    let eval = index
        .outcomes
        .iter()
        .find(|outcome| outcome.rule == "no-eval")
        .unwrap();
    assert_eq!(eval.violations.len(), 1);
    let violation = &eval.violations[0];
    assert_eq!(violation.title, "eval call");
    let range = violation.range.unwrap();
    assert_eq!(range.start_index, source.find("eval(").unwrap());
    assert_eq!(range.start_position.row, 4);

    let important = index
        .outcomes
        .iter()
        .find(|outcome| outcome.rule == "no-important")
        .unwrap();
    assert_eq!(important.violations.len(), 1);
    assert_eq!(important.violations[0].title, "no-important");
    assert_eq!(
        important.violations[0].range.unwrap().start_index,
        source.find("!important").unwrap()
    );
}

#[test]
fn test_sequential_and_parallel_runs_agree() {
    let workspace = setup_test_workspace();
    let config = load_from_path(workspace.path().join(CONFIG_FILE_NAME)).unwrap();
    let files = vec![
        workspace.path().join("pages/index.html"),
        workspace.path().join("app.js"),
    ];

    let mut sequential = config.engine.clone();
    sequential.parallel = false;
    let a = Engine::new(config.build_rules().unwrap())
        .with_settings(sequential)
        .check_files(&files);
    let b = Engine::new(config.build_rules().unwrap())
        .with_settings(config.engine.clone())
        .check_files(&files);

    assert_eq!(a.violation_count(), b.violation_count());
    for (left, right) in a.files.iter().zip(&b.files) {
        assert_eq!(left.path, right.path);
        assert_eq!(left.violation_count(), right.violation_count());
    }
}

#[test]
fn test_load_reports_path_on_invalid_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"
[[rules]]
name = "orphan"
chain = "missing"
query = "(program) @p"
"#,
    )
    .unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Catalog { .. }), "{err}");
    assert!(err.to_string().contains(CONFIG_FILE_NAME), "{err}");
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
