//! # Butterfly-overlay CLI
//!
//! Loads a graph fixture, snaps the requested locations into it and routes
//! between them over the query graph.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};

use butterfly_overlay::{
    ch_route, contract, dijkstra, GraphFixture, Graph, LocationIndex, Overlay, Path, QueryChGraph,
    QueryGraph, Snap, SpeedWeighting, WeightingConfig,
};

mod cli;

use cli::{LegReport, Location, RouteReport, SnapReport};

/// Command-line interface for butterfly-overlay
#[derive(Parser)]
#[command(name = "butterfly-overlay")]
#[command(about = "Route between GPS fixes spliced into a prebuilt road graph")]
#[command(long_about = "Snaps locations onto a graph fixture and routes between them:
  butterfly-overlay city.json --from 50.85,4.35 --to 50.84,4.36
  butterfly-overlay city.json --from 50.85,4.35 --via 50.845,4.355 --to 50.84,4.36

Heading and hierarchies:
  --heading 90                     # Leave the start point heading east
  --ch                             # Cross-check every leg with a contraction hierarchy")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    /// Graph fixture in JSON format
    graph: PathBuf,

    /// Start location as "lat,lon"
    #[arg(long, value_parser = cli::parse_location, allow_hyphen_values = true)]
    from: Location,

    /// Destination as "lat,lon"
    #[arg(long, value_parser = cli::parse_location, allow_hyphen_values = true)]
    to: Location,

    /// Intermediate location as "lat,lon", repeat for several
    #[arg(long = "via", value_parser = cli::parse_location, allow_hyphen_values = true)]
    via: Vec<Location>,

    /// Departure heading at the start, degrees clockwise from north
    #[arg(long)]
    heading: Option<f64>,

    /// Discourage turning back at via points
    #[arg(long)]
    pass_through: bool,

    /// Also route every leg over a contraction hierarchy
    #[arg(long)]
    ch: bool,

    /// Print the route as JSON
    #[arg(long)]
    json: bool,

    /// Seconds charged for a U-turn at a tower node
    #[arg(long, default_value_t = 40.0)]
    u_turn_cost: f64,

    /// Seconds added to virtual edges that go against a requested heading
    #[arg(long, default_value_t = 300.0)]
    heading_penalty: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    info!("🦋 Butterfly-overlay v{} starting...", env!("BUTTERFLY_VERSION"));

    let fixture = GraphFixture::load(&cli.graph)
        .with_context(|| format!("Failed to load graph fixture {}", cli.graph.display()))?;
    let (graph, encoding) = fixture.build().context("Failed to build graph from fixture")?;
    info!("Loaded {} nodes and {} edges", graph.node_count(), graph.edge_count());

    let index = LocationIndex::build(&graph);
    let locations: Vec<Location> = std::iter::once(cli.from)
        .chain(cli.via.iter().copied())
        .chain(std::iter::once(cli.to))
        .collect();
    let mut snaps = Vec::with_capacity(locations.len());
    for location in &locations {
        let snap = index
            .find_closest(&graph, location.lat, location.lon, |e| {
                e.get_bool(&encoding.access) || e.get_bool_reverse(&encoding.access)
            })
            .with_context(|| format!("Failed to snap {location}"))?;
        if snap.closest_edge().is_none() {
            bail!("No accessible road near {location}");
        }
        snaps.push(snap);
    }

    let overlay = Overlay::build(&graph, &mut snaps).context("Failed to build query overlay")?;
    for snap in &mut snaps {
        snap.calc_query_distance();
    }
    let mut query = QueryGraph::new(&graph, &overlay);

    let config = WeightingConfig {
        heading_penalty_s: cli.heading_penalty,
        u_turn_cost_s: cli.u_turn_cost,
        ..WeightingConfig::car()
    };
    let weighting = SpeedWeighting::new(&encoding, config).with_turn_costs(graph.turn_cost_table());
    let query_weighting = query.wrap_weighting(&weighting);
    let hierarchy = if cli.ch {
        Some(contract(&graph, &weighting).context("Failed to contract graph")?)
    } else {
        None
    };

    let nodes = snaps
        .iter()
        .map(closest_node)
        .collect::<Result<Vec<_>>>()?;
    let mut report = RouteReport::new(
        snaps
            .iter()
            .map(|s| SnapReport::new(s, overlay.first_virtual_node()))
            .collect(),
    );

    let mut previous: Option<Path> = None;
    for (leg, pair) in nodes.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        query.clear_unfavored_status();
        if leg == 0 {
            if let Some(heading) = cli.heading {
                if !query.enforce_heading(from, heading, false)? {
                    info!("Heading {heading} left every edge at node {from} favored");
                }
            }
        } else if cli.pass_through {
            if let Some(&arrival) = previous.as_ref().and_then(|p| p.edges.last()) {
                if query.is_virtual_node(from) && query.is_virtual_edge(arrival) {
                    query.unfavor_virtual_edge_pair(from, arrival)?;
                }
            }
        }

        let path = dijkstra(&query, &query_weighting, from, to)
            .with_context(|| format!("No route from {} to {}", locations[leg], locations[leg + 1]))?;
        let ch_weight = match &hierarchy {
            Some(ch) => {
                let view = QueryChGraph::new(ch, &query, &weighting)?;
                let found = ch_route(&view, from, to)?;
                let found = found.map(|p| p.weight);
                if let Some(weight) = found {
                    if (weight - path.weight).abs() > 1e-6 {
                        warn!(
                            "Leg {leg}: CH weight {weight:.3} differs from Dijkstra weight {:.3}",
                            path.weight
                        );
                    }
                }
                found
            }
            None => None,
        };

        let geometry = path.geometry(&query)?;
        report.push_leg(
            LegReport {
                from,
                to,
                distance: path.distance,
                weight: path.weight,
                millis: path.millis,
                edges: path.edges.len(),
                virtual_edges: path.edges.iter().filter(|&&e| query.is_virtual_edge(e)).count(),
                ch_weight,
            },
            &geometry,
        );
        previous = Some(path);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn closest_node(snap: &Snap) -> Result<butterfly_overlay::NodeId> {
    let point = snap.query_point();
    snap.closest_node()
        .with_context(|| format!("Location {:.6},{:.6} did not resolve to a node", point.lat, point.lon))
}
