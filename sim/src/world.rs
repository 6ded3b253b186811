//! Read-only snapshot types.
//!
//! A `Snapshot` is the only view a renderer gets of the simulation: plain,
//! serializable copies of agent and marker state taken between ticks.

use crate::components::*;
use crate::error::CrowdResult;
use crate::grid::MarkerGrid;
use crate::obstacle::{Obstacle, Obstacles};
use crate::systems::serialization::{snapshot_to_json_pretty, snapshot_to_json_string};
use crate::systems::SimTick;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub heading: f32,
    /// Positions of the markers this agent claimed on the last tick.
    pub claimed_markers: Vec<(f32, f32)>,
}

/// Snapshot of a single marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    pub x: f32,
    pub y: f32,
    pub claimed: bool,
    pub weight: f32,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticks executed so far.
    pub tick: u64,
    pub paused: bool,
    /// Agents in ascending id order.
    pub agents: Vec<AgentSnapshot>,
    /// Markers in pool order (cell by cell, row-major).
    pub markers: Vec<MarkerSnapshot>,
    pub obstacles: Vec<Obstacle>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world. The tick is read from `SimTick`.
    pub fn from_world(world: &mut World, paused: bool) -> Self {
        Self {
            tick: world.get_resource::<SimTick>().map_or(0, |t| t.0),
            paused,
            agents: agents_from_world(world),
            markers: markers_from_world(world),
            obstacles: world
                .get_resource::<Obstacles>()
                .map(|o| o.0.clone())
                .unwrap_or_default(),
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> CrowdResult<String> {
        snapshot_to_json_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> CrowdResult<String> {
        snapshot_to_json_pretty(self)
    }
}

/// Agent snapshots sorted by id.
pub fn agents_from_world(world: &mut World) -> Vec<AgentSnapshot> {
    let mut query = world.query::<(&AgentId, &Position, &Velocity, &Heading, &ClaimedMarkers)>();
    let world: &World = world;
    let grid = world.get_resource::<MarkerGrid>();

    let mut agents: Vec<AgentSnapshot> = query
        .iter(world)
        .map(|(id, pos, vel, heading, claimed)| AgentSnapshot {
            id: id.0,
            x: pos.x,
            y: pos.y,
            vx: vel.vx,
            vy: vel.vy,
            heading: heading.0,
            claimed_markers: grid
                .map(|grid| {
                    claimed
                        .iter()
                        .filter_map(|marker_id| grid.marker(*marker_id))
                        .map(|m| (m.x, m.y))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    agents.sort_by_key(|a| a.id);
    agents
}

/// Marker snapshots in pool order.
pub fn markers_from_world(world: &World) -> Vec<MarkerSnapshot> {
    world
        .get_resource::<MarkerGrid>()
        .map(|grid| {
            grid.markers()
                .iter()
                .map(|m| MarkerSnapshot {
                    x: m.x,
                    y: m.y,
                    claimed: m.is_claimed(),
                    weight: m.weight,
                })
                .collect()
        })
        .unwrap_or_default()
}
