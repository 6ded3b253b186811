//! Public API for the simulation.
//!
//! This module provides the main interface for a renderer (or any other
//! client) to drive the crowd.
//!
//! ## Lifecycle
//!
//! A `CrowdWorld` is built once per [`CrowdConfig`]. Any configuration
//! change goes through [`CrowdWorld::reset`], which discards the old engine
//! and builds a fresh one: obstacles, markers and agents are all re-rolled.
//!
//! ## Ticking
//!
//! Each call to [`CrowdWorld::tick`] runs one complete step unless the world
//! is paused:
//!
//! 1. `clear_claims_system` - release last tick's markers
//! 2. `claim_markers_system` - closest agent wins each marker
//! 3. `steering_system` - weight markers, derive velocities
//! 4. `advection_system` - `position += velocity`
//! 5. `grid_index_system` - re-bucket agents into cells

use crate::components::*;
use crate::config::{CrowdConfig, Scenario};
use crate::error::{CrowdError, CrowdResult};
use crate::grid::MarkerGrid;
use crate::obstacle::{Obstacle, Obstacles};
use crate::systems::*;
use crate::world::{agents_from_world, markers_from_world, AgentSnapshot, MarkerSnapshot, Snapshot};
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

/// The crowd simulation engine.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Building the engine from a configuration
/// - Ticking the simulation forward
/// - Pausing and resuming
/// - Extracting read-only snapshots
pub struct CrowdWorld {
    world: World,
    schedule: Schedule,
    paused: bool,
}

impl CrowdWorld {
    /// Build an engine with randomly scattered obstacles.
    pub fn initialize(config: CrowdConfig) -> CrowdResult<Self> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let obstacles = Obstacles::scatter(&config, &mut rng);
        Self::build(config, obstacles, rng)
    }

    /// Build an engine with an explicit obstacle layout.
    /// `config.obstacle_count` is ignored.
    pub fn with_obstacles(config: CrowdConfig, obstacles: Vec<Obstacle>) -> CrowdResult<Self> {
        config.validate()?;
        for o in &obstacles {
            if !(o.x.is_finite() && o.y.is_finite() && o.radius.is_finite() && o.radius >= 0.0) {
                return Err(CrowdError::invalid(
                    "obstacles",
                    format!("obstacle {o:?} must be finite with a non-negative radius"),
                ));
            }
        }
        let rng = config.seeded_rng();
        Self::build(config, Obstacles(obstacles), rng)
    }

    fn build(config: CrowdConfig, obstacles: Obstacles, mut rng: StdRng) -> CrowdResult<Self> {
        let grid = MarkerGrid::build(&config, &obstacles, &mut rng)?;

        let reach = grid.cell_width().min(grid.cell_height());
        if config.agent_radius > reach {
            tracing::warn!(
                agent_radius = config.agent_radius,
                cell_size = reach,
                "agent radius exceeds cell size; markers beyond the 3x3 neighbourhood are unreachable"
            );
        }

        let agents = spawn_agents(&config, &obstacles, &grid, &mut rng)?;

        tracing::info!(
            scenario = config.scenario.name(),
            resolution = grid.resolution(),
            markers = grid.marker_count(),
            obstacles = obstacles.len(),
            agents = agents.len(),
            "crowd world initialized"
        );

        let mut world = World::new();
        for agent in agents {
            world.spawn(agent);
        }

        world.insert_resource(grid);
        world.insert_resource(obstacles);
        world.insert_resource(config);
        world.insert_resource(SimTick(0));
        world.insert_resource(ClaimStats::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                clear_claims_system,
                claim_markers_system,
                steering_system,
                advection_system,
                grid_index_system,
            )
                .chain(),
        );

        Ok(Self {
            world,
            schedule,
            paused: false,
        })
    }

    /// Tear down and rebuild with a new configuration. The paused state carries over.
    pub fn reset(&self, config: CrowdConfig) -> CrowdResult<Self> {
        let mut next = Self::initialize(config)?;
        next.paused = self.paused;
        Ok(next)
    }

    /// Advance one step. Does nothing while paused.
    pub fn tick(&mut self) {
        if self.paused {
            return;
        }

        if let Some(mut tick_res) = self.world.get_resource_mut::<SimTick>() {
            tick_res.increment();
        }

        self.schedule.run(&mut self.world);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of ticks actually executed.
    pub fn current_tick(&self) -> u64 {
        self.world.get_resource::<SimTick>().map_or(0, |t| t.0)
    }

    /// Read-only agent state, sorted by agent id.
    pub fn query_agents(&mut self) -> Vec<AgentSnapshot> {
        agents_from_world(&mut self.world)
    }

    /// Read-only marker state, in pool order.
    pub fn query_markers(&self) -> Vec<MarkerSnapshot> {
        markers_from_world(&self.world)
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.paused)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> CrowdResult<String> {
        self.snapshot().to_json()
    }

    pub fn config(&self) -> &CrowdConfig {
        self.world.resource::<CrowdConfig>()
    }

    pub fn grid(&self) -> &MarkerGrid {
        self.world.resource::<MarkerGrid>()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.world.resource::<Obstacles>().0
    }

    /// Claim statistics of the last executed tick.
    pub fn claim_stats(&self) -> ClaimStats {
        *self.world.resource::<ClaimStats>()
    }

    pub fn agent_count(&mut self) -> usize {
        self.world.query::<&AgentId>().iter(&self.world).count()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

// ============================================================================
// SPAWNING
// ============================================================================

/// World rectangle `(min_x, min_y, max_x, max_y)` agents spawn in.
fn spawn_region(config: &CrowdConfig, grid: &MarkerGrid) -> (f32, f32, f32, f32) {
    let (ox, oy, max_x, max_y) = grid.bounds();

    match config.scenario {
        Scenario::Random => (ox, oy, max_x, max_y),
        Scenario::Opposite => {
            // Reflect the destination through the grid center.
            let (width, height) = (max_x - ox, max_y - oy);
            let cx = ox + width * 0.5;
            let cy = oy + height * 0.5;
            let px = (2.0 * cx - config.destination.0).clamp(ox, max_x);
            let py = (2.0 * cy - config.destination.1).clamp(oy, max_y);
            let half_w = width / 8.0;
            let half_h = height / 8.0;
            (
                (px - half_w).max(ox),
                (py - half_h).max(oy),
                (px + half_w).min(max_x),
                (py + half_h).min(max_y),
            )
        }
    }
}

fn spawn_agents(
    config: &CrowdConfig,
    obstacles: &Obstacles,
    grid: &MarkerGrid,
    rng: &mut StdRng,
) -> CrowdResult<Vec<AgentBundle>> {
    let region = spawn_region(config, grid);
    let goal = Goal::new(config.destination.0, config.destination.1);

    (0..config.agent_count)
        .map(|id| {
            let position = sample_spawn_point(id, region, obstacles, config.spawn_attempts, rng)?;
            let cell = grid.cell_index_of(position.x, position.y);
            Ok(AgentBundle::new(id, position, goal, config.agent_radius, cell))
        })
        .collect()
}

/// Re-roll until the point is outside every obstacle, up to `attempts` times.
fn sample_spawn_point<R: Rng>(
    agent: u32,
    (min_x, min_y, max_x, max_y): (f32, f32, f32, f32),
    obstacles: &Obstacles,
    attempts: u32,
    rng: &mut R,
) -> CrowdResult<Position> {
    for attempt in 0..attempts {
        let x = min_x + rng.gen::<f32>() * (max_x - min_x);
        let y = min_y + rng.gen::<f32>() * (max_y - min_y);
        if !obstacles.blocks(x, y) {
            if attempt > 0 {
                tracing::debug!(agent, rerolls = attempt, "spawn point re-rolled out of obstacles");
            }
            return Ok(Position::new(x, y));
        }
    }
    Err(CrowdError::SpawnExhausted { agent, attempts })
}
