//! Heap snapshot inspection CLI.
//!
//! Provides the `heaplens` binary with subcommands for querying a heap
//! snapshot JSON file: whole-snapshot summary, single-node lookup,
//! per-class listing, and path resolution from a starting node.
//!
//! Every subcommand runs against either store representation; the
//! compact store is the default, `--expanded` selects the graph-backed
//! one. Both answer identically, so the flag only changes memory and
//! lookup cost.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use heaplens_core::{
    resolve_path, CompactSnapshot, ExpandedSnapshot, NodeId, PathSelector, SnapshotStore,
};

/// Heap snapshot inspection tools.
#[derive(Parser)]
#[command(name = "heaplens", about = "Heap snapshot inspection tools")]
struct Cli {
    /// Use the expanded (graph-backed) store instead of the compact one.
    #[arg(long, global = true)]
    expanded: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print node/edge counts, total size, and per-class categories.
    Summary {
        /// Path to the snapshot JSON file.
        snapshot: PathBuf,
    },
    /// Look up one node and its outgoing edges by identifier.
    Node {
        /// Path to the snapshot JSON file.
        snapshot: PathBuf,

        /// Node identifier.
        #[arg(long)]
        id: u64,
    },
    /// List all nodes with the given class name.
    Class {
        /// Path to the snapshot JSON file.
        snapshot: PathBuf,

        /// Class name to match.
        name: String,
    },
    /// Resolve a selector path from a starting node.
    ///
    /// Each selector is `edge:NAME` (follow the uniquely named edge) or
    /// `class:NAME` (follow the edge to the unique node of that class).
    Path {
        /// Path to the snapshot JSON file.
        snapshot: PathBuf,

        /// Starting node identifier.
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Selectors, applied in order.
        selectors: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Summary { snapshot } => run_summary(&snapshot, cli.expanded),
        Commands::Node { snapshot, id } => run_node(&snapshot, cli.expanded, NodeId(id)),
        Commands::Class { snapshot, name } => run_class(&snapshot, cli.expanded, &name),
        Commands::Path {
            snapshot,
            start,
            selectors,
        } => run_path(&snapshot, cli.expanded, NodeId(start), &selectors),
    };
    process::exit(exit_code);
}

/// Load the snapshot file and build the requested store representation.
///
/// Returns exit code 3 for I/O failures and 1 for malformed snapshots.
fn load_store(path: &PathBuf, expanded: bool) -> Result<Box<dyn SnapshotStore>, i32> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return Err(3);
        }
    };

    let store: Box<dyn SnapshotStore> = if expanded {
        match ExpandedSnapshot::from_json_str(&json) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("Error: invalid snapshot: {}", e);
                return Err(1);
            }
        }
    } else {
        match CompactSnapshot::from_json_str(&json) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("Error: invalid snapshot: {}", e);
                return Err(1);
            }
        }
    };
    tracing::info!(
        "loaded snapshot '{}': {} nodes, {} edges",
        path.display(),
        store.node_count(),
        store.edge_count()
    );
    Ok(store)
}

fn print_json(value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

/// Execute the summary subcommand.
fn run_summary(path: &PathBuf, expanded: bool) -> i32 {
    let store = match load_store(path, expanded) {
        Ok(store) => store,
        Err(code) => return code,
    };

    println!("nodes:      {}", store.node_count());
    println!("edges:      {}", store.edge_count());
    println!("total size: {}", store.total_size());
    println!();
    println!("{:<28} {:>12} {:>8} {:>10}", "class", "size", "count", "internal");
    for category in store.class_categories() {
        println!(
            "{:<28} {:>12} {:>8} {:>10}",
            category.class_name, category.size, category.count, category.internal_count
        );
    }
    0
}

/// Execute the node subcommand.
///
/// Returns exit code: 0 = success, 2 = node not found.
fn run_node(path: &PathBuf, expanded: bool, id: NodeId) -> i32 {
    let store = match load_store(path, expanded) {
        Ok(store) => store,
        Err(code) => return code,
    };

    let node = match store.node_with_identifier(id) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };
    let edges = match store.outgoing_edges(id) {
        Ok(edges) => edges,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    print_json(&serde_json::json!({ "node": node, "outgoingEdges": edges }));
    0
}

/// Execute the class subcommand.
fn run_class(path: &PathBuf, expanded: bool, class_name: &str) -> i32 {
    let store = match load_store(path, expanded) {
        Ok(store) => store,
        Err(code) => return code,
    };

    let nodes = store.nodes_with_class_name(class_name);
    print_json(&nodes);
    0
}

/// Execute the path subcommand.
///
/// Returns exit code: 0 = success, 1 = bad selector syntax,
/// 2 = resolution failure (unknown start, zero or many matches).
fn run_path(path: &PathBuf, expanded: bool, start: NodeId, raw_selectors: &[String]) -> i32 {
    let mut selectors = Vec::with_capacity(raw_selectors.len());
    for raw in raw_selectors {
        match PathSelector::parse(raw) {
            Some(selector) => selectors.push(selector),
            None => {
                eprintln!(
                    "Error: invalid selector '{}', expected edge:NAME or class:NAME",
                    raw
                );
                return 1;
            }
        }
    }

    let store = match load_store(path, expanded) {
        Ok(store) => store,
        Err(code) => return code,
    };

    match resolve_path(store.as_ref(), start, &selectors) {
        Ok(node) => {
            print_json(&node);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}
