//! nav-graph command line
//!
//! Builds a navigation graph from trace files and queries paths in a saved graph.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use nav_graph::{EngineOptions, GraphSnapshot, NavKey, NavigationModel, NodeId, Trace, normalize_location};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nav-graph")]
#[command(version)]
#[command(about = "Navigation graph builder for web interaction traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve traces into a graph and save it as a snapshot
    Ingest {
        /// JSON file holding an array of traces
        #[arg(long, short = 't', value_name = "FILE")]
        traces: PathBuf,

        /// Where to write the graph snapshot
        #[arg(long, short = 'o', value_name = "FILE")]
        out: PathBuf,

        /// Collapse repeating patterns below this location (repeatable)
        #[arg(long, value_name = "URL")]
        collapse_from: Vec<String>,

        /// Merge the effects that directly follow each location
        #[arg(long)]
        merge_effects: bool,
    },

    /// Print the steps leading from one node to another
    Path {
        /// Graph snapshot written by `ingest`
        #[arg(long, short = 's', value_name = "FILE")]
        snapshot: PathBuf,

        /// Source node id, or a location URL
        #[arg(long)]
        from: String,

        /// Target node id, or a location URL
        #[arg(long)]
        to: String,

        /// Print every path instead of the shortest one
        #[arg(long)]
        all: bool,
    },

    /// Print the JSON schema of trace files
    Schema,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            traces,
            out,
            collapse_from,
            merge_effects,
        } => ingest(&traces, &out, &collapse_from, merge_effects),
        Command::Path { snapshot, from, to, all } => path(&snapshot, &from, &to, all),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&nav_graph::trace_schema())?);
            Ok(())
        }
    }
}

fn ingest(traces: &Path, out: &Path, collapse_from: &[String], merge_effects: bool) -> Result<()> {
    let raw = fs::read_to_string(traces).with_context(|| format!("Failed to read {}", traces.display()))?;
    let traces: Vec<Trace> = serde_json::from_str(&raw).context("Invalid trace file")?;

    let mut model = NavigationModel::in_memory().with_options(EngineOptions::from_env());
    let mut skipped = 0;
    for resolved in model.ingest_all(&traces)? {
        skipped += resolved.skipped.len();
    }
    eprintln!("Ingested {} traces ({} entries skipped)", traces.len(), skipped);

    for url in collapse_from {
        let start = resolve_node(&model, url)?;
        let applied = model.collapse_until_stable(start)?;
        eprintln!("Applied {} collapse(s) below {}", applied.len(), url);
    }

    if merge_effects {
        let locations: Vec<NodeId> = model
            .snapshot()?
            .nodes
            .iter()
            .filter(|n| matches!(n.key(), Some(NavKey::Location { .. })))
            .map(|n| n.id)
            .collect();
        let mut merged = 0;
        for location in locations {
            if model.merge_effects_after_location(location)?.is_some() {
                merged += 1;
            }
        }
        eprintln!("Merged effects after {} location(s)", merged);
    }

    let snapshot = model.snapshot()?;
    fs::write(out, serde_json::to_string_pretty(&snapshot)?)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    eprintln!("Wrote {} nodes and {} edges to {}", snapshot.nodes.len(), snapshot.edges.len(), out.display());
    Ok(())
}

fn path(snapshot: &Path, from: &str, to: &str, all: bool) -> Result<()> {
    let raw = fs::read_to_string(snapshot).with_context(|| format!("Failed to read {}", snapshot.display()))?;
    let snapshot: GraphSnapshot = serde_json::from_str(&raw).context("Invalid snapshot file")?;
    let model = NavigationModel::from_snapshot(snapshot)?;

    let source = resolve_node(&model, from)?;
    let target = resolve_node(&model, to)?;

    let paths = if all {
        model.all_paths(source, target)?
    } else {
        vec![model.construct_path(source, target)?]
    };

    for path in paths {
        let steps = path.instructions();
        println!("{}", serde_json::to_string_pretty(&steps)?);
    }
    Ok(())
}

/// Node given as `12`, `#12` or a location URL
fn resolve_node(model: &NavigationModel, reference: &str) -> Result<NodeId> {
    if let Ok(id) = reference.trim_start_matches('#').parse::<u64>() {
        return Ok(NodeId(id));
    }

    let key = NavKey::Location {
        path: normalize_location(reference),
    };
    model
        .find_node(&key)?
        .map(|n| n.id)
        .ok_or_else(|| anyhow!("No node for location {}", reference))
}
