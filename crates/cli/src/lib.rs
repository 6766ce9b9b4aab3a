use anyhow::{Context as AnyhowContext, Result};
use chunk_engine::{Engine, LoadedGraph};
use chunk_graph::{QueryMode, RoleHints};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::FinderConfig;
use export::OutputFormat;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod export;
mod serve;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = writeln!(stdout, "{text}").and_then(|()| stdout.flush()) {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "chunk-finder")]
#[command(about = "Find chunks reachable from selected features of a grouped graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file, TOML or JSON (overrides CHUNK_FINDER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a graph and report detected roles and counts
    Load(LoadArgs),

    /// List feature ids of a graph
    Features(FeaturesArgs),

    /// Compute chunks reachable from selected features
    Query(QueryArgs),

    /// Answer JSON-lines protocol requests on stdin/stdout
    Serve(ServeArgs),

    /// Print JSON schemas of protocol messages
    Schema,
}

#[derive(Args)]
struct GraphArgs {
    /// Graph JSON file (`-` reads stdin)
    graph: PathBuf,

    /// Group id of file nodes (skips detection for this role)
    #[arg(long, allow_hyphen_values = true)]
    file_group: Option<i64>,

    /// Group id of chunk nodes (skips detection for this role)
    #[arg(long, allow_hyphen_values = true)]
    chunk_group: Option<i64>,
}

impl GraphArgs {
    fn hints(&self) -> RoleHints {
        RoleHints::new(self.file_group, self.chunk_group)
    }
}

#[derive(Args)]
struct LoadArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Output JSON (`ready` message plus load statistics)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FeaturesArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Keep ids containing this text (case-insensitive)
    #[arg(long)]
    filter: Option<String>,

    /// Output a JSON array
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Selected feature id (repeatable)
    #[arg(long = "select", short = 's')]
    select: Vec<String>,

    /// Combine with ALL (intersection) or ANY (union); default from config
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Lines)]
    format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    /// Do not emit `progress` messages
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    All,
    Any,
}

impl From<ModeArg> for QueryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => QueryMode::All,
            ModeArg::Any => QueryMode::Any,
        }
    }
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout carries machine-readable output in these modes
    let machine_output = match &cli.command {
        Commands::Load(args) => args.json,
        Commands::Features(args) => args.json,
        Commands::Query(args) => args.format == OutputFormat::Json && args.output.is_none(),
        Commands::Serve(_) | Commands::Schema => true,
    };
    if machine_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = FinderConfig::resolve(cli.config.as_deref())?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Load(args) => run_load(args, &config, show_progress)?,
        Commands::Features(args) => run_features(args, &config, show_progress)?,
        Commands::Query(args) => run_query(args, &config, show_progress)?,
        Commands::Serve(args) => {
            let engine = Engine::new(&config.naming)?;
            serve::run_serve(engine, !args.no_progress).await?;
        }
        Commands::Schema => {
            print_stdout(&serde_json::to_string_pretty(&chunk_protocol::schemas()?)?)?;
        }
    }
    Ok(())
}

fn read_graph_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read graph from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read graph {}", path.display()))
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos:>3}% {msg}") {
        bar.set_style(style);
    }
    bar
}

fn load_graph(
    args: &GraphArgs,
    config: &FinderConfig,
    show_progress: bool,
) -> Result<Arc<LoadedGraph>> {
    let text = read_graph_text(&args.graph)?;
    let mut engine = Engine::new(&config.naming)?;

    let bar = progress_bar(show_progress);
    let loaded = engine.load_text_with_progress(&text, args.hints(), &mut |pct, msg| {
        bar.set_position(u64::from(pct));
        bar.set_message(msg.to_string());
    });
    bar.finish_and_clear();

    loaded.with_context(|| format!("Failed to load graph {}", args.graph.display()))
}

/// Load a graph and report detected roles
fn run_load(args: LoadArgs, config: &FinderConfig, show_progress: bool) -> Result<()> {
    let loaded = load_graph(&args.graph, config, show_progress)?;
    let stats = loaded.stats();

    if args.json {
        let mut value = serde_json::to_value(loaded.ready_response())?;
        value["stats"] = serde_json::to_value(stats)?;
        print_stdout(&serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    let file_note = if stats.file_role_active {
        ""
    } else {
        ", nominal: treated as features"
    };
    let lines = [
        format!(
            "file group:   {} ({:?}{file_note})",
            stats.file_group, stats.file_evidence
        ),
        format!(
            "chunk group:  {} ({:?})",
            stats.chunk_group, stats.chunk_evidence
        ),
        format!(
            "features:     {} ({} reach chunks)",
            stats.features, stats.indexed_features
        ),
        format!("chunks:       {}", stats.chunks),
        format!("files:        {}", stats.files),
        format!(
            "links:        {} ({} dangling, {} direct, {} bridged pairs)",
            stats.links, stats.dangling_links, stats.direct_links, stats.bridged_pairs
        ),
    ];
    print_stdout(&lines.join("\n"))
}

/// List feature ids, optionally filtered
fn run_features(args: FeaturesArgs, config: &FinderConfig, show_progress: bool) -> Result<()> {
    let loaded = load_graph(&args.graph, config, show_progress)?;
    let ids = loaded
        .index()
        .filter_features(args.filter.as_deref().unwrap_or_default());

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&ids)?)?;
    } else if !ids.is_empty() {
        print_stdout(&ids.join("\n"))?;
    }
    log::info!("{} of {} features", ids.len(), loaded.feature_ids().len());
    Ok(())
}

/// Compute and export chunks for the selected features
fn run_query(args: QueryArgs, config: &FinderConfig, show_progress: bool) -> Result<()> {
    let loaded = load_graph(&args.graph, config, show_progress)?;
    let mode = args.mode.map_or(config.default_mode, QueryMode::from);

    let known: HashSet<&str> = loaded.feature_ids().iter().map(String::as_str).collect();
    let unknown: Vec<&str> = args
        .select
        .iter()
        .map(String::as_str)
        .filter(|id| !known.contains(id))
        .collect();
    if !unknown.is_empty() {
        log::warn!("Not feature ids in this graph: {}", unknown.join(", "));
    }

    let chunks = loaded.query(&args.select, mode);
    let rendered = export::render(&chunks, args.format)?;

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {} chunks to {}", chunks.len(), path.display());
        }
        None => {
            if !(args.format == OutputFormat::Lines && chunks.is_empty()) {
                print_stdout(rendered.trim_end_matches('\n'))?;
            }
            log::info!("{} chunks ({mode})", chunks.len());
        }
    }
    Ok(())
}
