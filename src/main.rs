use anyhow::{Context, Result};
use chainlint::chain::{ChainResolver, ChainSpec};
use chainlint::config::{self, ChainCatalog, LintConfig};
use chainlint::engine::{Engine, Report};
use chainlint::forest::{ResolvedForest, SyntaxStore};
use chainlint::lang::LanguageTag;
use chainlint::syntax::{SyntaxNode, SyntaxTree};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "chainlint")]
#[command(about = "Lint files that embed several languages", long_about = None)]
#[command(version)]
struct Cli {
    /// More logging (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChainArgs {
    /// Config file (defaults to the nearest chainlint.toml, then the builtin chains)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Named chain to resolve the file with
    #[arg(long, conflicts_with = "lang")]
    chain: Option<String>,

    /// Parse the whole file with a single language
    #[arg(long)]
    lang: Option<LanguageTag>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the syntax forest resolved from a file
    Tree {
        file: PathBuf,

        #[command(flatten)]
        chain: ChainArgs,

        /// Print S-expressions instead of the node outline
        #[arg(long)]
        sexp: bool,
    },

    /// Run a tree-sitter query against every tree of one language
    Query {
        file: PathBuf,

        /// Language whose trees are queried
        #[arg(short, long)]
        target: LanguageTag,

        /// Query source, e.g. '(call_expression) @call'
        #[arg(short, long)]
        pattern: String,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Run the configured rules over files and directories
    Check {
        /// Files or directories (defaults to the current directory)
        paths: Vec<PathBuf>,

        /// Config file (defaults to the nearest chainlint.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tree { file, chain, sexp } => cmd_tree(&file, &chain, sexp),
        Commands::Query {
            file,
            target,
            pattern,
            chain,
        } => cmd_query(&file, &chain, target, &pattern),
        Commands::Check {
            paths,
            config,
            json,
            jobs,
        } => {
            let clean = cmd_check(paths, config, json, jobs)?;
            if !clean {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Explicit path, else the nearest chainlint.toml above `near`.
fn find_config(explicit: Option<PathBuf>, near: &Path) -> Result<Option<LintConfig>> {
    let path = match explicit {
        Some(path) => Some(path),
        None => {
            let start = near.canonicalize().unwrap_or_else(|_| near.to_path_buf());
            config::discover(&start)
        }
    };
    match path {
        Some(path) => {
            log::info!("using config {}", path.display());
            Ok(Some(config::load_from_path(&path)?))
        }
        None => Ok(None),
    }
}

fn resolve_file(file: &Path, args: &ChainArgs) -> Result<ResolvedForest> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let spec = chain_for(file, args)?;
    Ok(ChainResolver::new().resolve(&bytes, &spec)?)
}

fn chain_for(file: &Path, args: &ChainArgs) -> Result<ChainSpec> {
    if let Some(language) = args.lang {
        return Ok(ChainSpec::new(language));
    }

    let near = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let config = find_config(args.config.clone(), near)?.unwrap_or_else(LintConfig::builtin);
    let catalog = ChainCatalog::from_definitions(&config.chains)?;

    let name = match &args.chain {
        Some(name) => name.clone(),
        None => match catalog.root_for_path(file) {
            Some(root) => root.name.clone(),
            None => {
                let language = LanguageTag::from_path(file).with_context(|| {
                    format!("no chain handles {}; pass --chain or --lang", file.display())
                })?;
                return Ok(ChainSpec::new(language));
            }
        },
    };
    Ok(catalog.spec(&name)?)
}

fn cmd_tree(file: &Path, args: &ChainArgs, sexp: bool) -> Result<()> {
    let forest = resolve_file(file, args)?;

    for tree in forest.iter() {
        print_tree_header(tree);
        if sexp {
            println!("{}", tree.to_sexp());
        } else {
            print_outline(tree.root_node(), 1);
        }
        println!();
    }
    Ok(())
}

fn print_tree_header(tree: &SyntaxTree) {
    let origin = tree.origin();
    let mut header = format!(
        "{} #{}  {}-{}  ({} nodes)",
        tree.language().to_string().bold(),
        tree.occurrence(),
        origin.start_position,
        origin.end_position,
        tree.node_count()
    );
    if tree.is_rewritten() {
        header.push_str(&format!("  {}", "rewritten".cyan()));
    }
    if tree.has_error() {
        header.push_str(&format!("  {}", "has errors".red()));
    }
    println!("{header}");
}

fn print_outline(node: SyntaxNode<'_>, depth: usize) {
    let label = match node.field_name() {
        Some(field) => format!("{field}: {}", node.kind()),
        None => node.kind().to_string(),
    };
    let label = if node.is_error() || node.is_missing() {
        label.red().to_string()
    } else {
        label
    };
    println!(
        "{}{} {}",
        "  ".repeat(depth),
        label,
        format!("[{}-{}]", node.start_position(), node.end_position()).dimmed()
    );
    for child in node.named_children() {
        print_outline(child, depth + 1);
    }
}

fn cmd_query(file: &Path, args: &ChainArgs, target: LanguageTag, pattern: &str) -> Result<()> {
    let store = SyntaxStore::new(resolve_file(file, args)?);
    let matches = store.query_all(target, pattern)?;

    if matches.is_empty() {
        println!("{}", "no matches".dimmed());
        return Ok(());
    }

    for (idx, m) in matches.iter().enumerate() {
        println!("{} (pattern {})", format!("match {}", idx + 1).bold(), m.pattern_index);
        for capture in &m.captures {
            let text = capture.node.text();
            let first_line = text.lines().next().unwrap_or_default();
            println!(
                "  {} {} {}  {}",
                format!("@{}", capture.name).cyan(),
                capture.node.kind(),
                capture.node.start_position().to_string().dimmed(),
                first_line
            );
        }
    }
    println!("\n{} match(es)", matches.len());
    Ok(())
}

fn cmd_check(
    paths: Vec<PathBuf>,
    config_path: Option<PathBuf>,
    json: bool,
    jobs: Option<usize>,
) -> Result<bool> {
    let cwd = std::env::current_dir()?;
    let config = find_config(config_path, &cwd)?.with_context(|| {
        format!(
            "no {} found in {} or its parents; pass --config",
            config::CONFIG_FILE_NAME,
            cwd.display()
        )
    })?;

    let rules = config.build_rules()?;
    if rules.is_empty() {
        log::warn!("config defines no rules");
    }
    let catalog = ChainCatalog::from_definitions(&config.chains)?;

    let paths = if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    };
    let files = discover_files(&paths, &catalog.extensions())?;
    log::info!("discovered {} file(s)", files.len());

    let mut settings = config.engine.clone();
    if let Some(jobs) = jobs {
        settings.jobs = jobs;
    }
    let engine = Engine::new(rules).with_settings(settings);
    let report = engine.check_files(&files);

    if json {
        let files = serde_json::to_value(&report.files)?;
        let output = serde_json::json!({
            "files": files,
            "violations": report.violation_count(),
            "errors": report.error_count(),
            "duration_ms": report.duration.as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&report);
    }

    Ok(report.is_clean())
}

/// Files named directly are always checked; directories are walked for
/// files with a known extension, skipping hidden entries.
fn discover_files(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            anyhow::bail!("{} does not exist", path.display());
        }

        let walker = WalkDir::new(path).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with('.') || name == "node_modules")
        });
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let known = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
            if known {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn print_report(report: &Report) {
    for file in &report.files {
        if let Some(error) = &file.error {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
        for outcome in &file.outcomes {
            if let Some(error) = &outcome.error {
                eprintln!(
                    "{} {}: {}",
                    "error:".red().bold(),
                    file.path.display(),
                    error
                );
            }
            for violation in &outcome.violations {
                let location = match &violation.range {
                    Some(range) => format!("{}:{}", file.path.display(), range.start_position),
                    None => file.path.display().to_string(),
                };
                println!(
                    "{}: {} {}",
                    location.bold(),
                    violation.title.red(),
                    format!("[{}]", outcome.rule).dimmed()
                );
            }
        }
    }

    let summary = format!(
        "{} violation(s), {} error(s) in {} file(s) ({:.2?})",
        report.violation_count(),
        report.error_count(),
        report.files.len(),
        report.duration
    );
    if report.is_clean() {
        println!("{}", summary.green());
    } else {
        println!("\n{}", summary.yellow());
    }
}
