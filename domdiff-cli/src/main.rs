//! DomDiff command line tool
//!
//! Classifies the entities of an XML document as created, updated or deleted
//! relative to an earlier version of the same document.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use xml_domdiff::{
    write_actions, ActionKind, DiffConfig, ForestDiff, ForestSpec, MatchStrategy, XmlParser,
    DEFAULT_FOREST_NAME,
};

/// Classify XML entities as created, updated or deleted
#[derive(Parser)]
#[command(name = "domdiff")]
#[command(version)]
#[command(about = "Classify XML entities as created, updated or deleted", long_about = None)]
struct Cli {
    /// Modified (new) document
    modified: String,

    /// Existing (old) document; without it every selected node is created
    #[arg(short, long)]
    existing: Option<String>,

    /// Path selecting the compared nodes, e.g. //nutrition/food
    #[arg(short, long)]
    select: String,

    /// Name of the forest in the report
    #[arg(short, long, default_value = DEFAULT_FOREST_NAME)]
    name: String,

    /// Path from a selected node to a related node (repeatable)
    #[arg(short, long)]
    related: Vec<String>,

    /// Element or attribute name identifying a node (repeatable, comma separated)
    #[arg(short, long, value_delimiter = ',')]
    critical: Vec<String>,

    /// How modified nodes are paired with existing ones
    #[arg(long, value_enum, default_value_t = Strategy::FirstFit)]
    strategy: Strategy,

    /// Treat comment changes as differences
    #[arg(long)]
    compare_comments: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Log every comparison
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// First eligible candidate wins
    FirstFit,
    /// Closest eligible candidate wins
    MinimumDegree,
}

impl From<Strategy> for MatchStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::FirstFit => MatchStrategy::FirstFit,
            Strategy::MinimumDegree => MatchStrategy::MinimumDegree,
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Installs a stderr subscriber; `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "xml_domdiff=debug,domdiff=debug"
    } else {
        "xml_domdiff=info,domdiff=info"
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

/// Parses the documents, classifies the selected forest and writes the report.
fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let parser = XmlParser::new();

    tracing::info!("Parsing modified: {}", cli.modified);
    let modified = parser.parse_file(&cli.modified)?;

    let existing = match &cli.existing {
        Some(path) => {
            tracing::info!("Parsing existing: {}", path);
            Some(parser.parse_file(path)?)
        }
        None => None,
    };

    let mut spec = ForestSpec::new(cli.name.as_str(), cli.select.as_str());
    for path in &cli.related {
        spec = spec.with_related(path.as_str());
    }
    for field in &cli.critical {
        spec = spec.with_critical(field.trim());
    }

    let config = DiffConfig::new()
        .with_strategy(cli.strategy.into())
        .with_comments(cli.compare_comments);
    let engine = ForestDiff::with_config(config);
    let actions = engine.diff_documents(existing.as_ref(), &modified, &[spec])?;

    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    write_actions(&mut output, &actions)?;

    tracing::info!(
        "Classification complete: {} create, {} update, {} delete.",
        actions.count(ActionKind::Create),
        actions.count(ActionKind::Update),
        actions.count(ActionKind::Delete)
    );
    Ok(())
}
