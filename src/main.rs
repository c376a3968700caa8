//! # Butterfly-patch CLI
//!
//! Builds the patched pedestrian network from GeoJSON files and runs
//! distance queries against persisted patched networks.

use anyhow::{Context, Result};
use butterfly_patch::config::{read_collection, write_network};
use butterfly_patch::{build_patched_from_files, BuildConfig, PatchedGraph};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "butterfly-patch")]
#[command(about = "Splice user overrides into an OSM pedestrian network", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the patched network and write edges/nodes GeoJSON
    Build {
        /// Base edges FeatureCollection (LineStrings with u, v)
        #[arg(long)]
        base_edges: PathBuf,

        /// Base nodes FeatureCollection (Points with osmid)
        #[arg(long)]
        base_nodes: PathBuf,

        /// Override nodes from the editor
        #[arg(long)]
        override_nodes: Option<PathBuf>,

        /// Override edges drawn in the editor
        #[arg(long)]
        override_edges: Option<PathBuf>,

        /// Output directory for edges_patched.geojson and nodes_patched.geojson
        #[arg(short, long)]
        outdir: PathBuf,
    },

    /// Shortest walking distance between two nodes of a patched network
    Distance {
        /// Patched edges FeatureCollection
        #[arg(long)]
        edges: PathBuf,

        /// Patched nodes FeatureCollection
        #[arg(long)]
        nodes: PathBuf,

        /// Source node id
        #[arg(long)]
        from: i64,

        /// Target node id
        #[arg(long)]
        to: i64,
    },

    /// Nodes within walking distance of a coordinate
    Isochrone {
        /// Patched edges FeatureCollection
        #[arg(long)]
        edges: PathBuf,

        /// Patched nodes FeatureCollection
        #[arg(long)]
        nodes: PathBuf,

        /// Longitude of the starting point
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude of the starting point
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Walking radius in meters
        #[arg(short, long, default_value_t = 500.0)]
        meters: f64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_patched_graph(edges: &Path, nodes: &Path) -> Result<PatchedGraph> {
    let edges_fc = read_collection(edges).context("Failed to load patched edges")?;
    let nodes_fc = read_collection(nodes).context("Failed to load patched nodes")?;
    Ok(PatchedGraph::from_collections(&nodes_fc, &edges_fc))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Build {
            base_edges,
            base_nodes,
            override_nodes,
            override_edges,
            outdir,
        } => {
            let start = Instant::now();
            let config = BuildConfig::new(base_edges, base_nodes)
                .with_overrides(override_nodes, override_edges);

            let (graph, network) =
                build_patched_from_files(&config).context("Failed to build patched network")?;
            let (edges_path, nodes_path) =
                write_network(&outdir, &network).context("Failed to write patched network")?;

            println!("🦋 Patched network built in {:.2}s", start.elapsed().as_secs_f64());
            println!("  ✓ {} nodes, {} directed edges", graph.node_count(), graph.edge_count());
            println!("  ✓ {}", edges_path.display());
            println!("  ✓ {}", nodes_path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&network.report).context("Failed to render report")?
            );
        }
        Commands::Distance {
            edges,
            nodes,
            from,
            to,
        } => {
            let graph = load_patched_graph(&edges, &nodes)?;

            match graph.path_length(from, to)? {
                Some(meters) => println!("Distance {from} → {to}: {meters:.1}m"),
                None => println!("Node {to} is not reachable from {from}"),
            }
        }
        Commands::Isochrone {
            edges,
            nodes,
            lon,
            lat,
            meters,
        } => {
            let graph = load_patched_graph(&edges, &nodes)?;
            let origin = graph
                .nearest_node(lon, lat)
                .context("Patched network has no nodes")?;

            let mut reached: Vec<(i64, f64)> =
                graph.reachable_within(origin, meters)?.into_iter().collect();
            reached.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

            println!("Start node {origin}, {} nodes within {meters:.0}m", reached.len());
            for (id, dist) in reached {
                println!("  {id}\t{dist:.1}m");
            }
        }
    }

    Ok(())
}
