use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cityroute_lib::{
    load_graph, save_geojson, save_png, save_png_over_tile, shortest_path, Coordinate, Document,
    DocumentStore, ImportMode, RoadGraph, RouteAlgorithm, RoutePlan, SqliteDocumentStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "City road-network routing utilities")]
struct Cli {
    /// SQLite document store holding nodes, edges, and map tiles.
    #[arg(long, env = "CITYROUTE_STORE_PATH", default_value = "/data/osm_data.db")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Origin/destination pair shared by the routing commands.
#[derive(clap::Args, Debug)]
struct RouteArgs {
    /// Origin as LAT,LON.
    #[arg(long = "from", allow_hyphen_values = true)]
    from: Coordinate,
    /// Destination as LAT,LON.
    #[arg(long = "to", allow_hyphen_values = true)]
    to: Coordinate,
    /// Search algorithm: a-star (default) or dijkstra.
    #[arg(long, default_value_t = RouteAlgorithm::AStar)]
    algorithm: RouteAlgorithm,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate node and edge documents and add them to the store.
    ///
    /// Nothing is written unless the stored network plus the new documents
    /// (or only the new documents with `--replace`) form a valid graph.
    Import {
        /// JSON array of node documents.
        #[arg(long)]
        nodes: PathBuf,
        /// JSON array of edge documents.
        #[arg(long)]
        edges: PathBuf,
        /// Drop the stored nodes and edges first.
        #[arg(long)]
        replace: bool,
    },
    /// Print the shortest route between two coordinates.
    Route {
        #[command(flatten)]
        route: RouteArgs,
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Render the shortest route to a PNG file.
    Render {
        #[command(flatten)]
        route: RouteArgs,
        #[arg(long, default_value = "route_visualization.png")]
        output: PathBuf,
        /// Draw over the map tile stored under this location name.
        #[arg(long)]
        tile: Option<String>,
    },
    /// Export the shortest route as GeoJSON.
    Export {
        #[command(flatten)]
        route: RouteArgs,
        #[arg(long, default_value = "route.geojson")]
        output: PathBuf,
    },
    /// Write a stored map tile to a file.
    Tile {
        location_name: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Store an image file as the map tile for a location.
    StoreTile {
        location_name: String,
        #[arg(long)]
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = SqliteDocumentStore::new(&cli.store);

    match cli.command {
        Command::Import {
            nodes,
            edges,
            replace,
        } => {
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Append
            };
            handle_import(&store, &nodes, &edges, mode)
        }
        Command::Route { route, json } => handle_route(&store, &route, json),
        Command::Render {
            route,
            output,
            tile,
        } => {
            let (graph, plan) = plan(&store, &route)?;
            let rendered = match tile {
                Some(location_name) => {
                    let tile = store.fetch_map_tile(&location_name).with_context(|| {
                        format!("failed to fetch map tile for {location_name}")
                    })?;
                    save_png_over_tile(&graph, &plan.route, &tile, &output)
                }
                None => save_png(&graph, &plan.route, &output),
            };
            rendered
                .with_context(|| format!("failed to render route to {}", output.display()))?;
            println!("Route visualization saved to {}", output.display());
            Ok(())
        }
        Command::Export { route, output } => {
            let (graph, plan) = plan(&store, &route)?;
            save_geojson(&graph, &plan.route, &output)
                .with_context(|| format!("failed to export route to {}", output.display()))?;
            println!("Route saved as GeoJSON to {}", output.display());
            Ok(())
        }
        Command::Tile {
            location_name,
            output,
        } => handle_tile(&store, &location_name, &output),
        Command::StoreTile {
            location_name,
            image,
        } => {
            let bytes = fs::read(&image)
                .with_context(|| format!("failed to read {}", image.display()))?;
            store
                .insert_map_tile(&location_name, &bytes)
                .context("failed to store map tile")?;
            println!("Stored map tile for {location_name} ({} bytes)", bytes.len());
            Ok(())
        }
    }
}

fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))
}

fn handle_import(
    store: &SqliteDocumentStore,
    nodes: &Path,
    edges: &Path,
    mode: ImportMode,
) -> Result<()> {
    let nodes = read_documents(nodes)?;
    let edges = read_documents(edges)?;
    info!(nodes = nodes.len(), edges = edges.len(), ?mode, "importing documents");

    let summary = store
        .import_network(&nodes, &edges, mode)
        .with_context(|| format!("failed to import road network into {}", store.path().display()))?;
    println!(
        "Imported {} nodes and {} edges into {} (store holds {} nodes, {} edges)",
        summary.nodes,
        summary.edges,
        store.path().display(),
        summary.total_nodes,
        summary.total_edges
    );
    Ok(())
}

fn plan(store: &SqliteDocumentStore, args: &RouteArgs) -> Result<(RoadGraph, RoutePlan)> {
    let graph = load_graph(store)
        .with_context(|| format!("failed to load road graph from {}", store.path().display()))?;
    let plan = shortest_path(&graph, args.from, args.to, args.algorithm)
        .with_context(|| format!("no route from {} to {}", args.from, args.to))?;
    Ok((graph, plan))
}

fn handle_route(store: &SqliteDocumentStore, args: &RouteArgs, json: bool) -> Result<()> {
    let (_, plan) = plan(store, args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "Route from node {} to node {} ({} hops, {:.1} m; algorithm: {}):",
        plan.origin_node,
        plan.destination_node,
        plan.hop_count(),
        plan.length_m,
        plan.algorithm
    );
    for node in &plan.route {
        println!("- {node}");
    }
    Ok(())
}

fn handle_tile(store: &SqliteDocumentStore, location_name: &str, output: &Path) -> Result<()> {
    let bytes = store
        .fetch_map_tile(location_name)
        .with_context(|| format!("failed to fetch map tile for {location_name}"))?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Map tile for {location_name} written to {}", output.display());
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
