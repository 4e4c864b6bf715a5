//! Mindmap CLI: build a live concept graph from a transcript stream.
//!
//! Usage:
//!   mindmap run [INPUT] [--out path] [--store dir]
//!   mindmap inspect <SNAPSHOT> [--top n]
//!   mindmap config

use clap::{Parser, Subcommand};
use mindmap::graph::ConceptGraph;
use mindmap::{
    CommandService, IngestOutcome, JsonFileStore, LiveGraph, MindmapConfig, OpenStore, SignalKind,
    Snapshot, SnapshotStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Lines starting with this marker are provisional (interim) transcripts
const PROVISIONAL_MARKER: char = '~';

#[derive(Parser)]
#[command(name = "mindmap", version, about = "Live concept graph for streaming transcripts")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest segments line by line and write a snapshot at end of input
    Run {
        /// Input file; reads stdin when omitted
        input: Option<PathBuf>,
        /// Write the final snapshot to this file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Snapshot directory (used when --out is not given)
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Print the top concepts and their edges from a snapshot file
    Inspect {
        /// Snapshot file written by `run`
        snapshot: PathBuf,
        /// Number of concepts to show
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Print the effective configuration as YAML
    Config,
}

/// Get the default snapshot directory (~/.local/share/mindmap/snapshots)
fn default_store_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("mindmap").join("snapshots")
}

fn load_config(path: Option<&Path>) -> Result<MindmapConfig, String> {
    MindmapConfig::load_or_default(path).map_err(|e| format!("Failed to load config: {}", e))
}

fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Split a raw input line into its text and signal kind.
fn parse_line(line: &str) -> (&str, SignalKind) {
    match line.strip_prefix(PROVISIONAL_MARKER) {
        Some(rest) => (rest, SignalKind::Provisional),
        None => (line, SignalKind::Final),
    }
}

async fn ingest_stream<R>(live: &LiveGraph, reader: R) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(live.config().tick_ms.max(1)));
    let mut inflight = JoinSet::new();
    let mut ingested = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let (text, kind) = parse_line(&line);
                if let IngestOutcome::Ingested { .. } = live.ingest(text, kind) {
                    ingested += 1;
                    let idle = live.enrichment().is_some_and(|adapter| !adapter.is_pending());
                    if kind == SignalKind::Final && idle {
                        let live = live.clone();
                        inflight.spawn(async move {
                            if let Err(e) = live.enrich().await {
                                warn!(error = %e, "enrichment failed");
                            }
                        });
                    }
                }
            }
            _ = ticker.tick() => {
                live.tick();
            }
        }
    }

    while inflight.join_next().await.is_some() {}
    Ok(ingested)
}

async fn ingest_input(live: &LiveGraph, input: Option<PathBuf>) -> std::io::Result<usize> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            ingest_stream(live, file).await
        }
        None => ingest_stream(live, tokio::io::stdin()).await,
    }
}

fn write_snapshot(snapshot: &Snapshot, out: Option<PathBuf>, store: Option<PathBuf>) -> Result<String, String> {
    match out {
        Some(path) => {
            let body = snapshot
                .to_json_pretty()
                .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
            std::fs::write(&path, body)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            Ok(path.display().to_string())
        }
        None => {
            let dir = store.unwrap_or_else(default_store_dir);
            let store = JsonFileStore::open(&dir)
                .map_err(|e| format!("Failed to open snapshot directory: {}", e))?;
            let id = store
                .save(snapshot)
                .map_err(|e| format!("Failed to save snapshot: {}", e))?;
            Ok(dir.join(format!("{}.json", id)).display().to_string())
        }
    }
}

fn cmd_run(config: MindmapConfig, input: Option<PathBuf>, out: Option<PathBuf>, store: Option<PathBuf>) -> i32 {
    let command = config.enrichment.command.clone();
    let mut live = LiveGraph::new(config);
    match command {
        Some(command) => {
            info!(program = %command.program, "enrichment enabled");
            live = live.with_service(Arc::new(CommandService::new(command)));
        }
        None => info!("no enrichment command configured, using local signals only"),
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    let result = rt.block_on(ingest_input(&live, input));

    let ingested = match result {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: failed to read input: {}", e);
            return 1;
        }
    };

    let (subgraph, _) = live.tick();
    match write_snapshot(&live.snapshot(), out, store) {
        Ok(location) => {
            println!(
                "Ingested {} segments; {} concepts and {} edges in view; snapshot written to {}",
                ingested,
                subgraph.nodes.len(),
                subgraph.edges.len(),
                location
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_inspect(path: &Path, top: usize) -> i32 {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", path.display(), e);
            return 1;
        }
    };
    let graph = match Snapshot::from_json(&text)
        .map_err(|e| e.to_string())
        .and_then(|s| ConceptGraph::from_snapshot(s).map_err(|e| e.to_string()))
    {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: invalid snapshot '{}': {}", path.display(), e);
            return 1;
        }
    };

    let subgraph = graph.subgraph(top);
    if subgraph.nodes.is_empty() {
        println!("No concepts in snapshot.");
        return 0;
    }

    println!("{:<32}  {:<7}  {:>10}  {:>6}", "CONCEPT", "TYPE", "WEIGHT", "PRUNED");
    println!("{}", "-".repeat(62));
    for node in &subgraph.nodes {
        println!(
            "{:<32}  {:<7}  {:>10.3}  {:>6}",
            node.id,
            node.concept_type.as_str(),
            node.weight,
            if node.pruned { "yes" } else { "" }
        );
    }

    if !subgraph.edges.is_empty() {
        println!();
        println!("{:<48}  {:>10}  {:>8}  {:>8}  {:>8}", "EDGE", "WEIGHT", "COOCCUR", "AI", "SIM");
        println!("{}", "-".repeat(90));
        for edge in &subgraph.edges {
            println!(
                "{:<48}  {:>10.3}  {:>8.2}  {:>8.2}  {:>8.2}",
                format!("{} -- {}", edge.source, edge.target),
                edge.weight,
                edge.provenance.cooccur,
                edge.provenance.ai,
                edge.provenance.sim
            );
        }
    }
    0
}

fn cmd_config(config: &MindmapConfig) -> i32 {
    match config.to_yaml() {
        Ok(yaml) => {
            print!("{}", yaml);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    let code = match cli.command {
        Commands::Run { input, out, store } => cmd_run(config, input, out, store),
        Commands::Inspect { snapshot, top } => cmd_inspect(&snapshot, top),
        Commands::Config => cmd_config(&config),
    };
    std::process::exit(code);
}
