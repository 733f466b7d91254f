use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dalift::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "dalift")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON schema snapshot to generate from
    schema: PathBuf,

    /// JSON file with global and per-object selections
    #[arg(long)]
    selection: Option<PathBuf>,

    /// Path to .env file for generator config
    #[arg(long, default_value = "./.env")]
    env_file: PathBuf,

    /// Comma-separated list of tables/views to include (default: all)
    #[arg(long, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Comma-separated list of tables/views to exclude
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Root namespace for generated types (overrides DALIFT_NAMESPACE)
    #[arg(long)]
    namespace: Option<String>,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    if let Err(e) = run() {
        error!(error = ?e, "Fatal error");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    info!("dalift v{}", env!("CARGO_PKG_VERSION"));
    info!(schema = ?cli.schema, selection = ?cli.selection, "Starting synthesis");

    let mut config =
        GeneratorConfig::load(&cli.env_file).context("Failed to load generator configuration")?;
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    debug!(config = ?config, "Loaded configuration");

    let filter = TableFilter {
        include: cli.tables,
        exclude: cli.exclude,
    };
    if filter.is_active() {
        debug!(filter = ?filter, "Table filter configured");
    }

    let db = JsonSnapshotImporter::from_path(&cli.schema)
        .context("Failed to open schema snapshot")?
        .with_default_schema(&config.default_schema)
        .introspect(&filter)
        .context("Failed to import schema")?;

    if db.tables().is_empty() && db.views().is_empty() {
        warn!("No tables or views found after filtering");
        return Ok(());
    }

    let mut selections = Selections::new(config.selection.clone());
    if let Some(path) = &cli.selection {
        selections = selections
            .load_file(path, &db.default_schema)
            .with_context(|| format!("Failed to load selections from {}", path.display()))?;
        for name in selections.unmatched_overrides(&db) {
            warn!(object = %name, "Selection override matches no table or view");
        }
    }

    let tree = Generator::new(config)
        .with_selections(selections)
        .generate(&db);

    let diagnostics = tree.diagnostics();
    for diagnostic in &diagnostics {
        debug!(
            kind = ?diagnostic.kind,
            object = ?diagnostic.object,
            artifact = ?diagnostic.artifact,
            message = ?diagnostic.message,
            "Diagnostic"
        );
    }
    if !diagnostics.is_empty() {
        warn!(
            count = diagnostics.len(),
            "Some schema shapes could not be translated; see #warning lines"
        );
    }

    let output = OutlineRenderer::new()?.render(&tree)?;
    io::stdout()
        .lock()
        .write_all(output.as_bytes())
        .context("Failed to write output")?;

    info!(units = tree.units.len(), "Synthesis complete");
    Ok(())
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}
