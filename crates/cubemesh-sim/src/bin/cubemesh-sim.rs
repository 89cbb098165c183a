//! Cubemesh Simulator
//!
//! Assemble a grid of cubes, run it, and print the final mesh snapshot as
//! JSON.
//!
//! Usage: `cubemesh-sim [width] [height] [seconds]`

use std::env;
use std::time::Duration;

use cubemesh_protocols::MeshConfig;
use cubemesh_sim::{Simulation, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cubemesh_sim=info,cubemesh_protocols=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let width: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(4);
    let height: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(3);
    let seconds: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);

    let config = SimulationConfig::default().with_mesh(MeshConfig::from_env()?);
    let mut sim = Simulation::grid(width, height, config)?;

    tracing::info!(width, height, seconds, "Running simulation");
    sim.run_for(Duration::from_secs(seconds));

    let snapshot = sim.snapshot();
    tracing::info!(
        converged = sim.is_converged(),
        hosts = ?snapshot.hosts,
        events = sim.event_count(),
        "Simulation finished"
    );

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
