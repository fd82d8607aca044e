use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

use routing_sim::{DeliveryOrder, EngineKind, Simulation, SimulationConfig};

#[derive(Parser)]
#[command(name = "routing-sim", about = "Drive DV, LS or PV routing engines over a simulated topology")]
struct Cli {
    /// JSON simulation file
    #[arg(long)]
    config: PathBuf,

    /// Override the engine named in the file (distance-vector, link-state, path-vector)
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Override the delivery order (fifo, lifo, coalesced)
    #[arg(long)]
    delivery: Option<DeliveryOrder>,

    /// Check every converged table against true shortest paths
    #[arg(long)]
    verify: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = SimulationConfig::load(&cli.config)?;
    if let Some(engine) = cli.engine {
        config.engine = engine;
    }
    if let Some(delivery) = cli.delivery {
        config.delivery = delivery;
    }

    println!("{} engine, {} delivery, config {}", config.engine, config.delivery, cli.config.display());

    let mut sim = config.build()?;
    let delivered = sim.run(config.max_deliveries)?;
    print_phase(&sim, "initial topology", delivered);
    if cli.verify {
        sim.verify_routes()?;
    }

    for change in &config.changes {
        info!(a = %change.a, b = %change.b, cost = %change.cost(), "applying link change");
        sim.set_link_cost(change.a, change.b, change.cost())?;
        let delivered = sim.run(config.max_deliveries)?;
        print_phase(&sim, &format!("link {}-{} -> {}", change.a, change.b, change.cost()), delivered);
        if cli.verify {
            sim.verify_routes()?;
        }
    }

    let stats = sim.stats();
    println!(
        "\n{} messages ({} bytes) sent, {} delivered, {} coalesced, {} route installs, {} link changes",
        stats.messages_sent,
        stats.bytes_sent,
        stats.messages_delivered,
        stats.messages_coalesced,
        stats.route_installs,
        stats.link_changes
    );
    Ok(())
}

fn print_phase(sim: &Simulation, label: &str, delivered: usize) {
    println!("\n=== {} ({}, converged after {} deliveries) ===", label, sim.kind(), delivered);
    for node in sim.topology().nodes() {
        println!("{}:", node);
        if let Some(routes) = sim.routes(node) {
            for route in routes.iter() {
                println!("  {}", route);
            }
        }
    }
}
