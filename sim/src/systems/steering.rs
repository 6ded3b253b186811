//! Steering - turns an agent's claimed markers into a velocity.
//!
//! Each claimed marker pulls the agent toward itself with weight
//! `(1 + θ) / (1 + d)`, where `θ` is the cosine between the goal direction
//! and the marker direction and `d` the marker distance. Close markers that
//! lie toward the goal dominate. The weighted sum is divided by
//! `claimed_count * total_weight` to keep the magnitude bounded.

use crate::components::*;
use crate::grid::MarkerGrid;
use bevy_ecs::prelude::*;

/// Weight of a marker at offset `(dx, dy)` from the agent, given the unit
/// goal direction. Lies in `[0, 2]`.
#[inline]
pub fn marker_weight(goal_dir: (f32, f32), dx: f32, dy: f32) -> f32 {
    let d = (dx * dx + dy * dy).sqrt();
    // A marker exactly under the agent has no direction.
    let theta = if d > 0.0 {
        ((goal_dir.0 * dx + goal_dir.1 * dy) / d).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (1.0 + theta) / (1.0 + d)
}

/// System that writes marker weights and agent velocities.
/// Agents without claims (or whose claims all weigh zero) stall.
pub fn steering_system(
    mut grid: ResMut<MarkerGrid>,
    mut agents: Query<(&Position, &Goal, &ClaimedMarkers, &mut Velocity)>,
) {
    for (pos, goal, claimed, mut vel) in agents.iter_mut() {
        *vel = accumulate_velocity(pos, goal, claimed, &mut grid);
    }
}

fn accumulate_velocity(
    pos: &Position,
    goal: &Goal,
    claimed: &ClaimedMarkers,
    grid: &mut MarkerGrid,
) -> Velocity {
    if claimed.is_empty() {
        return Velocity::ZERO;
    }

    let goal_dir = goal.direction_from(pos);
    let mut vx = 0.0;
    let mut vy = 0.0;
    let mut total_weight = 0.0;

    for &id in claimed.iter() {
        let Some(marker) = grid.marker_mut(id) else {
            continue;
        };
        let dx = marker.x - pos.x;
        let dy = marker.y - pos.y;
        let weight = marker_weight(goal_dir, dx, dy);
        debug_assert!((0.0..=2.0).contains(&weight), "marker weight {weight} out of range");
        marker.weight = weight;

        vx += dx * weight;
        vy += dy * weight;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return Velocity::ZERO;
    }

    let norm = claimed.len() as f32 * total_weight;
    Velocity::new(vx / norm, vy / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrowdConfig;
    use crate::obstacle::{Obstacle, Obstacles};
    use crate::systems::claim::{claim_markers_system, clear_claims_system};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn world_with_grid(obstacles: Obstacles) -> World {
        let config = CrowdConfig {
            grid_resolution: 6,
            grid_width: 6.0,
            grid_height: 6.0,
            cell_capacity: 16,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let grid = MarkerGrid::build(&config, &obstacles, &mut rng).unwrap();
        let mut world = World::new();
        world.insert_resource(grid);
        world
    }

    fn spawn(world: &mut World, id: u32, pos: Position, goal: Goal, radius: f32) -> Entity {
        let cell = world.resource::<MarkerGrid>().cell_index_of(pos.x, pos.y);
        world.spawn(AgentBundle::new(id, pos, goal, radius, cell)).id()
    }

    fn run_tick_without_advection(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((clear_claims_system, claim_markers_system, steering_system).chain());
        schedule.run(world);
    }

    #[test]
    fn test_weight_bounds() {
        let goal = (1.0, 0.0);
        // Aligned and touching: maximum weight.
        assert!((marker_weight(goal, 1e-7, 0.0) - 2.0).abs() < 1e-4);
        // Opposite: zero.
        assert_eq!(marker_weight(goal, -0.5, 0.0), 0.0);
        // Perpendicular at distance 1: (1 + 0) / 2.
        assert!((marker_weight(goal, 0.0, 1.0) - 0.5).abs() < 1e-6);
        // No goal direction: distance-only weight.
        assert!((marker_weight((0.0, 0.0), 0.3, 0.4) - 1.0 / 1.5).abs() < 1e-6);
        // Marker under the agent.
        assert_eq!(marker_weight(goal, 0.0, 0.0), 1.0);
    }

    #[test]
    fn test_velocity_points_toward_goal() {
        let mut world = world_with_grid(Obstacles::default());
        let agent = spawn(&mut world, 0, Position::new(3.0, 3.0), Goal::new(6.0, 3.0), 1.0);

        run_tick_without_advection(&mut world);

        let vel = *world.get::<Velocity>(agent).unwrap();
        assert!(vel.vx > 0.0, "velocity {vel:?} should point toward +x");
        assert!(vel.vx.abs() > vel.vy.abs());
    }

    #[test]
    fn test_claimed_weights_in_bounds() {
        let mut world = world_with_grid(Obstacles::default());
        spawn(&mut world, 0, Position::new(2.0, 2.0), Goal::new(0.0, 0.0), 1.2);
        spawn(&mut world, 1, Position::new(2.8, 2.4), Goal::new(0.0, 0.0), 1.2);
        spawn(&mut world, 2, Position::new(4.5, 4.5), Goal::new(6.0, 0.0), 1.2);

        run_tick_without_advection(&mut world);

        let mut query = world.query::<(&Position, &Goal, &ClaimedMarkers)>();
        let world = &world;
        let grid = world.resource::<MarkerGrid>();
        let mut claimed = 0;
        for marker in grid.markers() {
            if marker.is_claimed() {
                claimed += 1;
                assert!(marker.weight >= 0.0 && marker.weight <= 2.0, "weight {}", marker.weight);
            } else {
                assert_eq!(marker.weight, 0.0);
            }
        }
        assert!(claimed > 0);

        // Strictly positive unless the marker lies exactly opposite the goal.
        for (pos, goal, markers) in query.iter(world) {
            let (gx, gy) = goal.direction_from(pos);
            for id in markers.iter() {
                let m = grid.marker(*id).unwrap();
                let (dx, dy) = (m.x - pos.x, m.y - pos.y);
                let d = (dx * dx + dy * dy).sqrt();
                let opposite = d > 0.0 && (gx * dx + gy * dy) / d <= -1.0;
                if !opposite {
                    assert!(m.weight > 0.0, "marker {id:?} weight {}", m.weight);
                }
            }
        }
    }

    #[test]
    fn test_normalization_formula() {
        let mut world = world_with_grid(Obstacles::default());
        let pos = Position::new(3.3, 2.7);
        let goal = Goal::new(0.0, 6.0);
        let agent = spawn(&mut world, 0, pos, goal, 0.9);

        run_tick_without_advection(&mut world);

        let grid = world.resource::<MarkerGrid>();
        let claimed = world.get::<ClaimedMarkers>(agent).unwrap();
        let (mut sx, mut sy, mut total) = (0.0f32, 0.0f32, 0.0f32);
        for id in claimed.iter() {
            let m = grid.marker(*id).unwrap();
            sx += (m.x - pos.x) * m.weight;
            sy += (m.y - pos.y) * m.weight;
            total += m.weight;
        }
        let n = claimed.len() as f32;
        let vel = world.get::<Velocity>(agent).unwrap();
        assert!((vel.vx - sx / (n * total)).abs() < 1e-5);
        assert!((vel.vy - sy / (n * total)).abs() < 1e-5);
    }

    #[test]
    fn test_isolated_agent_stalls() {
        // An obstacle clears every marker around the agent.
        let mut world = world_with_grid(Obstacles(vec![Obstacle::new(3.0, 3.0, 2.0)]));
        let agent = spawn(&mut world, 0, Position::new(3.0, 3.0), Goal::new(0.0, 0.0), 0.8);
        world.get_mut::<Velocity>(agent).unwrap().vx = 5.0;

        run_tick_without_advection(&mut world);

        assert!(world.get::<ClaimedMarkers>(agent).unwrap().is_empty());
        assert_eq!(*world.get::<Velocity>(agent).unwrap(), Velocity::ZERO);
    }
}
