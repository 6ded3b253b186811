//! Movement - advects agents by their velocity and re-buckets them.

use crate::components::*;
use crate::config::CrowdConfig;
use crate::grid::MarkerGrid;
use bevy_ecs::prelude::*;

/// Global simulation tick counter. Incremented once per executed tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// System that applies velocity to position (unit Euler step).
///
/// Honors `CrowdConfig::max_speed` when set. Agents that moved turn to face
/// their velocity; stalled agents keep their heading.
pub fn advection_system(
    config: Option<Res<CrowdConfig>>,
    mut query: Query<(&mut Position, &mut Velocity, &mut Heading)>,
) {
    let max_speed = config.as_ref().and_then(|c| c.max_speed);

    for (mut pos, mut vel, mut heading) in query.iter_mut() {
        if let Some(max) = max_speed {
            *vel = vel.clamped(max);
        }
        if vel.is_zero() {
            continue;
        }

        pos.x += vel.vx;
        pos.y += vel.vy;
        heading.0 = vel.vy.atan2(vel.vx);
    }
}

/// System that recomputes each agent's cached cell after advection.
pub fn grid_index_system(grid: Res<MarkerGrid>, mut query: Query<(&Position, &mut GridIndex)>) {
    for (pos, mut index) in query.iter_mut() {
        let cell = grid.cell_index_of(pos.x, pos.y);
        if index.0 != cell {
            index.0 = cell;
        }
    }
}
