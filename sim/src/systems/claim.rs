//! Marker claiming - assigns each free-space marker to at most one agent per tick.
//!
//! ## Phases
//!
//! 1. **Clear** (`clear_claims_system`) - every marker claimed last tick is
//!    released and every agent's claim list emptied.
//! 2. **Gather** - for each agent, collect the markers of its 3×3 cell
//!    neighbourhood that lie strictly inside its radius. Reads the grid only,
//!    so it is parallelizable.
//! 3. **Resolve** - a marker wanted by several agents goes to the closest one.
//!    Agents are visited in ascending `AgentId` and an owner is only replaced
//!    by a strictly closer agent, so exact ties go to the lowest id.
//! 4. **Commit** - owners are written into the grid and claim lists into the
//!    agents. Sequential.
//!
//! Because resolution happens after the full gather, the outcome does not
//! depend on query iteration order or on thread interleaving.
//!
//! ## Parallel Feature
//!
//! When compiled with `--features parallel`, the gather phase uses rayon.

use crate::components::*;
use crate::grid::{MarkerGrid, MarkerId};
use bevy_ecs::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Claim statistics for the most recent tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimStats {
    /// (agent, marker) pairs within radius before resolution.
    pub candidates: usize,
    /// Markers wanted by more than one agent.
    pub contested: usize,
    /// Markers owned after resolution.
    pub claimed: usize,
    /// Agents left without any marker.
    pub stalled: usize,
}

/// Agent data needed by the gather phase, copied out of the ECS.
#[derive(Debug, Clone, Copy)]
struct ClaimingAgent {
    entity: Entity,
    id: AgentId,
    x: f32,
    y: f32,
    radius: f32,
    cell: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    marker: MarkerId,
    distance: f32,
}

/// System that releases last tick's claims.
pub fn clear_claims_system(mut grid: ResMut<MarkerGrid>, mut agents: Query<&mut ClaimedMarkers>) {
    for mut claimed in agents.iter_mut() {
        for id in claimed.0.drain(..) {
            grid.release(id);
        }
    }
}

/// System that gathers, resolves and commits this tick's claims.
pub fn claim_markers_system(
    mut grid: ResMut<MarkerGrid>,
    stats: Option<ResMut<ClaimStats>>,
    mut agents: Query<(
        Entity,
        &AgentId,
        &Position,
        &AgentRadius,
        &GridIndex,
        &mut ClaimedMarkers,
    )>,
) {
    let mut claiming: Vec<ClaimingAgent> = agents
        .iter()
        .map(|(entity, id, pos, radius, cell, _)| ClaimingAgent {
            entity,
            id: *id,
            x: pos.x,
            y: pos.y,
            radius: radius.0,
            cell: cell.0,
        })
        .collect();
    claiming.sort_by_key(|a| a.id);

    // GATHER PHASE: read-only over the grid
    let pool: &MarkerGrid = &grid;

    #[cfg(feature = "parallel")]
    let candidates: Vec<Vec<Candidate>> = claiming
        .par_iter()
        .map(|agent| collect_candidates(agent, pool))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let candidates: Vec<Vec<Candidate>> = claiming
        .iter()
        .map(|agent| collect_candidates(agent, pool))
        .collect();

    // RESOLVE PHASE
    let (owned, contested) = resolve_claims(&candidates);

    // COMMIT PHASE
    let mut tick_stats = ClaimStats {
        candidates: candidates.iter().map(Vec::len).sum(),
        contested,
        ..Default::default()
    };

    for (agent, claims) in claiming.iter().zip(owned) {
        for &id in &claims {
            if let Some(marker) = grid.marker_mut(id) {
                debug_assert!(
                    marker.owner.is_none(),
                    "marker {id:?} committed to two agents in one tick"
                );
                marker.owner = Some(agent.entity);
            }
        }

        tick_stats.claimed += claims.len();
        if claims.is_empty() {
            tick_stats.stalled += 1;
        }

        if let Ok((_, _, _, _, _, mut claimed)) = agents.get_mut(agent.entity) {
            claimed.0 = claims;
        }
    }

    tracing::debug!(
        agents = claiming.len(),
        candidates = tick_stats.candidates,
        contested = tick_stats.contested,
        claimed = tick_stats.claimed,
        stalled = tick_stats.stalled,
        "claim pass"
    );

    if let Some(mut stats) = stats {
        *stats = tick_stats;
    }
}

/// Markers of the agent's neighbourhood strictly inside its radius.
/// Pure, safe to call in parallel.
fn collect_candidates(agent: &ClaimingAgent, grid: &MarkerGrid) -> Vec<Candidate> {
    grid.neighborhood_markers(agent.cell)
        .filter_map(|(marker, m)| {
            let distance = m.distance_to(agent.x, agent.y);
            (distance < agent.radius).then_some(Candidate { marker, distance })
        })
        .collect()
}

/// Closest-owner resolution over per-agent candidate lists (indexed in
/// ascending agent-id order). Returns each agent's won markers, in the order
/// they were gathered, and the number of contested markers.
fn resolve_claims(candidates: &[Vec<Candidate>]) -> (Vec<Vec<MarkerId>>, usize) {
    let mut best: HashMap<MarkerId, (f32, usize)> = HashMap::new();
    let mut contested: HashSet<MarkerId> = HashSet::new();

    for (slot, list) in candidates.iter().enumerate() {
        for candidate in list {
            match best.entry(candidate.marker) {
                Entry::Vacant(entry) => {
                    entry.insert((candidate.distance, slot));
                }
                Entry::Occupied(mut entry) => {
                    contested.insert(candidate.marker);
                    if candidate.distance < entry.get().0 {
                        entry.insert((candidate.distance, slot));
                    }
                }
            }
        }
    }

    let owned = candidates
        .iter()
        .enumerate()
        .map(|(slot, list)| {
            list.iter()
                .filter(|c| best.get(&c.marker).map(|&(_, owner)| owner) == Some(slot))
                .map(|c| c.marker)
                .collect()
        })
        .collect();

    (owned, contested.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrowdConfig;
    use crate::obstacle::Obstacles;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid(resolution: u32, capacity: u32, seed: u64) -> MarkerGrid {
        let config = CrowdConfig {
            grid_resolution: resolution,
            grid_width: resolution as f32,
            grid_height: resolution as f32,
            cell_capacity: capacity,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        MarkerGrid::build(&config, &Obstacles::default(), &mut rng).unwrap()
    }

    fn spawn_agent(world: &mut World, id: u32, x: f32, y: f32, radius: f32) -> Entity {
        let cell = world.resource::<MarkerGrid>().cell_index_of(x, y);
        world
            .spawn(AgentBundle::new(
                id,
                Position::new(x, y),
                Goal::new(0.0, 0.0),
                radius,
                cell,
            ))
            .id()
    }

    fn claim_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems((clear_claims_system, claim_markers_system).chain());
        schedule
    }

    fn owners(world: &World) -> Vec<Option<Entity>> {
        world
            .resource::<MarkerGrid>()
            .markers()
            .iter()
            .map(|m| m.owner)
            .collect()
    }

    #[test]
    fn test_single_agent_claims_markers_in_radius() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 1));
        let agent = spawn_agent(&mut world, 0, 2.0, 2.0, 0.8);

        claim_schedule().run(&mut world);

        let grid = world.resource::<MarkerGrid>();
        let claimed = world.get::<ClaimedMarkers>(agent).unwrap();
        assert!(!claimed.is_empty());
        for marker in grid.markers() {
            let inside = marker.distance_to(2.0, 2.0) < 0.8;
            assert_eq!(marker.owner == Some(agent), inside);
        }
        assert_eq!(claimed.len(), grid.claimed_count());
    }

    #[test]
    fn test_closest_agent_wins() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 2));
        let a = spawn_agent(&mut world, 0, 1.5, 2.0, 1.0);
        let b = spawn_agent(&mut world, 1, 2.5, 2.0, 1.0);

        claim_schedule().run(&mut world);

        let grid = world.resource::<MarkerGrid>();
        let mut contested = 0;
        for marker in grid.markers() {
            let da = marker.distance_to(1.5, 2.0);
            let db = marker.distance_to(2.5, 2.0);
            match marker.owner {
                Some(owner) if owner == a => {
                    assert!(da < 1.0);
                    if db < 1.0 {
                        contested += 1;
                        assert!(da <= db);
                    }
                }
                Some(owner) if owner == b => {
                    assert!(db < 1.0);
                    if da < 1.0 {
                        contested += 1;
                        assert!(db <= da);
                    }
                }
                Some(_) => panic!("unknown owner"),
                None => assert!(da >= 1.0 && db >= 1.0),
            }
        }
        assert!(contested > 0, "radii overlap, some markers must be contested");
        assert!(world.resource::<MarkerGrid>().claimed_count() > 0);
    }

    #[test]
    fn test_exact_tie_goes_to_lower_id() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 3));
        // Spawn the higher id first so iteration order disagrees with id order.
        let high = spawn_agent(&mut world, 7, 2.0, 2.0, 0.9);
        let low = spawn_agent(&mut world, 2, 2.0, 2.0, 0.9);

        claim_schedule().run(&mut world);

        assert!(world.get::<ClaimedMarkers>(high).unwrap().is_empty());
        assert!(!world.get::<ClaimedMarkers>(low).unwrap().is_empty());
        assert!(world
            .resource::<MarkerGrid>()
            .markers()
            .iter()
            .all(|m| m.owner.is_none() || m.owner == Some(low)));
    }

    #[test]
    fn test_claims_are_rebuilt_every_tick() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 4));
        let agent = spawn_agent(&mut world, 0, 1.0, 1.0, 0.7);
        let mut schedule = claim_schedule();
        schedule.run(&mut world);
        let first = world.get::<ClaimedMarkers>(agent).unwrap().clone();

        // Teleport the agent far away; old claims must not survive.
        let cell = world.resource::<MarkerGrid>().cell_index_of(3.0, 3.0);
        world.get_mut::<Position>(agent).unwrap().x = 3.0;
        world.get_mut::<Position>(agent).unwrap().y = 3.0;
        world.get_mut::<GridIndex>(agent).unwrap().0 = cell;
        schedule.run(&mut world);

        let second = world.get::<ClaimedMarkers>(agent).unwrap();
        assert!(first.iter().all(|id| !second.0.contains(id)));
        let grid = world.resource::<MarkerGrid>();
        for id in first.iter() {
            assert!(!grid.marker(*id).unwrap().is_claimed());
        }
        assert_eq!(grid.claimed_count(), second.len());
    }

    #[test]
    fn test_claim_pass_is_deterministic() {
        let mut world = World::new();
        world.insert_resource(grid(6, 9, 5));
        for i in 0..12 {
            let x = 0.5 + (i % 4) as f32 * 1.3;
            let y = 0.7 + (i / 4) as f32 * 1.6;
            spawn_agent(&mut world, i, x, y, 1.1);
        }
        let mut schedule = claim_schedule();

        schedule.run(&mut world);
        let first = owners(&world);
        schedule.run(&mut world);
        let second = owners(&world);

        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_radius_claims_nothing() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 6));
        world.insert_resource(ClaimStats::default());
        let agent = spawn_agent(&mut world, 0, 2.0, 2.0, 0.0);

        claim_schedule().run(&mut world);

        assert!(world.get::<ClaimedMarkers>(agent).unwrap().is_empty());
        let stats = *world.resource::<ClaimStats>();
        assert_eq!(stats.claimed, 0);
        assert_eq!(stats.stalled, 1);
    }

    #[test]
    fn test_stats_count_contested_markers() {
        let mut world = World::new();
        world.insert_resource(grid(4, 16, 7));
        world.insert_resource(ClaimStats::default());
        spawn_agent(&mut world, 0, 2.0, 2.0, 1.0);
        spawn_agent(&mut world, 1, 2.0, 2.0, 1.0);

        claim_schedule().run(&mut world);

        let stats = *world.resource::<ClaimStats>();
        assert!(stats.contested > 0);
        assert_eq!(stats.contested, stats.claimed);
        assert_eq!(stats.candidates, 2 * stats.claimed);
        assert_eq!(stats.stalled, 1);
    }

    #[test]
    fn test_resolve_prefers_strictly_closer() {
        let m = MarkerId(0);
        let candidates = vec![
            vec![Candidate { marker: m, distance: 0.5 }],
            vec![Candidate { marker: m, distance: 0.5 }],
            vec![Candidate { marker: m, distance: 0.4 }],
        ];
        let (owned, contested) = resolve_claims(&candidates);
        assert!(owned[0].is_empty());
        assert!(owned[1].is_empty());
        assert_eq!(owned[2], vec![m]);
        assert_eq!(contested, 1);
    }
}
