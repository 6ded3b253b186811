//! ECS components for crowd agents.
//!
//! Components are pure data containers attached to agent entities.
//! All simulation logic lives in systems that query these components.

use crate::grid::MarkerId;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D world position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D velocity vector, in world units per tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };

    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Scale down to `max` if longer; direction is preserved.
    pub fn clamped(&self, max: f32) -> Self {
        let mag = self.magnitude();
        if mag > max && mag > 0.0 {
            let scale = max / mag;
            Self {
                vx: self.vx * scale,
                vy: self.vy * scale,
            }
        } else {
            *self
        }
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Facing angle in radians, measured from +x.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading(pub f32);

impl Heading {
    /// Angle of the vector from `from` to `to`.
    pub fn toward(from: &Position, to: &Goal) -> Self {
        Self((to.y - from.y).atan2(to.x - from.x))
    }
}

/// Target point an agent steers toward.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub x: f32,
    pub y: f32,
}

impl Goal {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector from `from` toward the goal; zero when already there.
    pub fn direction_from(&self, from: &Position) -> (f32, f32) {
        let dx = self.x - from.x;
        let dy = self.y - from.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len > 0.0 {
            (dx / len, dy / len)
        } else {
            (0.0, 0.0)
        }
    }
}

// ============================================================================
// IDENTITY / CLAIM COMPONENTS
// ============================================================================

/// Stable agent identifier (spawn order). Lower ids win exact claim ties.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Radius of the agent's personal space.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRadius(pub f32);

/// Cached row-major index of the grid cell containing the agent.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridIndex(pub usize);

/// Markers claimed this tick. Rebuilt every tick, never carried over.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedMarkers(pub Vec<MarkerId>);

impl ClaimedMarkers {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerId> {
        self.0.iter()
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete agent entity.
#[derive(Bundle, Default)]
pub struct AgentBundle {
    pub id: AgentId,
    pub position: Position,
    pub velocity: Velocity,
    pub heading: Heading,
    pub goal: Goal,
    pub radius: AgentRadius,
    pub grid_index: GridIndex,
    pub claimed: ClaimedMarkers,
}

impl AgentBundle {
    /// Agent at rest at `position`, facing its goal.
    pub fn new(id: u32, position: Position, goal: Goal, radius: f32, grid_index: usize) -> Self {
        Self {
            id: AgentId(id),
            position,
            velocity: Velocity::ZERO,
            heading: Heading::toward(&position, &goal),
            goal,
            radius: AgentRadius(radius),
            grid_index: GridIndex(grid_index),
            claimed: ClaimedMarkers::default(),
        }
    }
}
