//! Simulation configuration.
//!
//! A [`CrowdConfig`] fully determines an engine. Changing any field means
//! building a new engine with [`CrowdWorld::reset`](crate::api::CrowdWorld::reset);
//! nothing is patched in place.

use crate::error::{CrowdError, CrowdResult};
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How agents are distributed at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Spawn anywhere in the grid area, walk to the destination.
    #[default]
    Random,
    /// Spawn in a cluster on the far side of the grid from the destination.
    Opposite,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Random => "random",
            Scenario::Opposite => "opposite",
        }
    }
}

impl From<&str> for Scenario {
    /// Unknown selectors fall back to [`Scenario::Random`].
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "opposite" => Scenario::Opposite,
            _ => Scenario::Random,
        }
    }
}

/// Configuration for one simulation engine.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdConfig {
    /// Cells per axis.
    pub grid_resolution: u32,
    /// World width covered by the grid.
    pub grid_width: f32,
    /// World height covered by the grid.
    pub grid_height: f32,
    /// World position of the grid's lower-left corner.
    pub origin: (f32, f32),
    /// Candidate markers sampled per cell (before obstacle exclusion).
    pub cell_capacity: u32,
    pub agent_count: u32,
    /// Personal-space radius; markers closer than this can be claimed.
    pub agent_radius: f32,
    pub obstacle_count: u32,
    pub obstacle_min_radius: f32,
    pub obstacle_max_radius: f32,
    pub scenario: Scenario,
    /// Goal shared by every agent.
    pub destination: (f32, f32),
    /// Optional per-tick displacement bound. `None` leaves magnitude control
    /// to the claimed-weight normalization.
    pub max_speed: Option<f32>,
    /// Re-rolls allowed per agent when a spawn point lands in an obstacle.
    pub spawn_attempts: u32,
    /// Seed for obstacle, marker and spawn placement. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 10,
            grid_width: 4.0,
            grid_height: 4.0,
            origin: (0.0, 0.0),
            cell_capacity: 4, // 400 markers over 10x10 cells
            agent_count: 4,
            agent_radius: 0.4,
            obstacle_count: 2,
            obstacle_min_radius: 0.2,
            obstacle_max_radius: 0.5,
            scenario: Scenario::Random,
            destination: (0.0, 0.0),
            max_speed: None,
            spawn_attempts: 64,
            seed: None,
        }
    }
}

impl CrowdConfig {
    /// Derive the per-cell capacity from a total marker budget.
    pub fn with_marker_budget(mut self, total_markers: u32) -> Self {
        let cells = self.grid_resolution.saturating_mul(self.grid_resolution).max(1);
        self.cell_capacity = total_markers / cells;
        self
    }

    pub fn cell_width(&self) -> f32 {
        self.grid_width / self.grid_resolution as f32
    }

    pub fn cell_height(&self) -> f32 {
        self.grid_height / self.grid_resolution as f32
    }

    /// Reject degenerate parameters before anything is allocated.
    pub fn validate(&self) -> CrowdResult<()> {
        if self.grid_resolution == 0 {
            return Err(CrowdError::invalid("grid_resolution", "must be at least 1"));
        }
        if !(self.grid_width.is_finite() && self.grid_width > 0.0) {
            return Err(CrowdError::invalid(
                "grid_width",
                format!("must be positive and finite, got {}", self.grid_width),
            ));
        }
        if !(self.grid_height.is_finite() && self.grid_height > 0.0) {
            return Err(CrowdError::invalid(
                "grid_height",
                format!("must be positive and finite, got {}", self.grid_height),
            ));
        }
        if !(self.origin.0.is_finite() && self.origin.1.is_finite()) {
            return Err(CrowdError::invalid("origin", "must be finite"));
        }
        if self.cell_capacity == 0 {
            return Err(CrowdError::invalid("cell_capacity", "must be at least 1"));
        }
        if !(self.agent_radius.is_finite() && self.agent_radius >= 0.0) {
            return Err(CrowdError::invalid(
                "agent_radius",
                format!("must be non-negative and finite, got {}", self.agent_radius),
            ));
        }
        if !(self.obstacle_min_radius.is_finite() && self.obstacle_min_radius >= 0.0) {
            return Err(CrowdError::invalid(
                "obstacle_min_radius",
                "must be non-negative and finite",
            ));
        }
        if !self.obstacle_max_radius.is_finite()
            || self.obstacle_max_radius < self.obstacle_min_radius
        {
            return Err(CrowdError::invalid(
                "obstacle_max_radius",
                format!(
                    "must be finite and >= obstacle_min_radius ({})",
                    self.obstacle_min_radius
                ),
            ));
        }
        if !(self.destination.0.is_finite() && self.destination.1.is_finite()) {
            return Err(CrowdError::invalid("destination", "must be finite"));
        }
        if let Some(max_speed) = self.max_speed {
            if !(max_speed.is_finite() && max_speed >= 0.0) {
                return Err(CrowdError::invalid(
                    "max_speed",
                    format!("must be non-negative and finite, got {max_speed}"),
                ));
            }
        }
        if self.spawn_attempts == 0 {
            return Err(CrowdError::invalid("spawn_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Build the placement RNG for this configuration.
    pub fn seeded_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn from_json_str(json: &str) -> CrowdResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> CrowdResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
