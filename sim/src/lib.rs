//! BioCrowd - Simulation Core
//!
//! A deterministic crowd simulation where agents move by competing for
//! free-space markers scattered over a grid. Each tick every marker goes to
//! at most one agent (the closest), and each agent steers toward the weighted
//! mean of the markers it won, biased toward its goal.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod grid;
pub mod obstacle;
pub mod render_bridge;
pub mod systems;
pub mod world;

pub use api::CrowdWorld;
pub use components::*;
pub use config::{CrowdConfig, Scenario};
pub use error::{CrowdError, CrowdResult};
pub use grid::{GridCell, Marker, MarkerGrid, MarkerId};
pub use obstacle::{Obstacle, Obstacles};
pub use systems::*;
pub use world::{AgentSnapshot, MarkerSnapshot, Snapshot};
