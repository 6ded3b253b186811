//! Demonstration of the BioCrowd simulation.
//!
//! Run with: cargo run --example crowd_demo
//! Set `RUST_LOG=biocrowd_sim=debug` to see claim statistics per tick.

use biocrowd_sim::{CrowdConfig, CrowdResult, CrowdWorld, Scenario};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> CrowdResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    println!("=== BioCrowd - Simulation Demo ===\n");

    let config = CrowdConfig {
        grid_resolution: 8,
        grid_width: 8.0,
        grid_height: 8.0,
        cell_capacity: 16,
        agent_count: 6,
        agent_radius: 0.9,
        scenario: Scenario::Opposite,
        destination: (1.0, 1.0),
        seed: Some(7),
        ..Default::default()
    };
    let mut sim = CrowdWorld::initialize(config)?;

    println!("Initial state:");
    print_agents(&mut sim);

    println!("\nRunning simulation for 200 ticks...\n");
    for _ in 0..200 {
        sim.tick();

        if sim.current_tick() % 40 == 0 {
            let stats = sim.claim_stats();
            println!(
                "--- Tick {} (claimed={} contested={} stalled={}) ---",
                sim.current_tick(),
                stats.claimed,
                stats.contested,
                stats.stalled
            );
            print_agents(&mut sim);
        }
    }

    // Paused ticks are no-ops.
    sim.pause();
    sim.tick();
    println!("\nPaused at tick {}", sim.current_tick());

    // A new configuration means a fresh engine.
    let next = CrowdConfig {
        scenario: Scenario::Random,
        seed: Some(8),
        ..sim.config().clone()
    };
    let mut sim = sim.reset(next)?;
    println!("Reset to {} scenario, paused={}", sim.config().scenario.name(), sim.is_paused());
    sim.play();
    sim.tick();

    println!("\n=== State after reset (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty()?);
    Ok(())
}

fn print_agents(sim: &mut CrowdWorld) {
    let goal = sim.config().destination;
    for agent in sim.query_agents() {
        let distance = ((agent.x - goal.0).powi(2) + (agent.y - goal.1).powi(2)).sqrt();
        println!(
            "    Agent {}: pos=({:.2}, {:.2}) vel=({:.3}, {:.3}) markers={} to_goal={:.2}",
            agent.id,
            agent.x,
            agent.y,
            agent.vx,
            agent.vy,
            agent.claimed_markers.len(),
            distance
        );
    }
}
