//! Static circular obstacles.
//!
//! Obstacles never collide with agents. They only keep markers (and spawn
//! points) out of their footprint, which starves the steering signal inside
//! them so agents drift around.

use crate::config::CrowdConfig;
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A circular exclusion zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    /// True when the point is strictly inside the exclusion radius.
    #[inline]
    pub fn excludes(&self, x: f32, y: f32) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() < self.radius
    }
}

/// The obstacle set of one engine. Immutable after construction.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Obstacles(pub Vec<Obstacle>);

impl Obstacles {
    /// Scatter `config.obstacle_count` obstacles with centers inside the grid area.
    pub fn scatter<R: Rng>(config: &CrowdConfig, rng: &mut R) -> Self {
        let (ox, oy) = config.origin;
        let obstacles = (0..config.obstacle_count)
            .map(|_| {
                let x = ox + rng.gen::<f32>() * config.grid_width;
                let y = oy + rng.gen::<f32>() * config.grid_height;
                let radius = if config.obstacle_max_radius > config.obstacle_min_radius {
                    rng.gen_range(config.obstacle_min_radius..config.obstacle_max_radius)
                } else {
                    config.obstacle_min_radius
                };
                Obstacle::new(x, y, radius)
            })
            .collect();
        Self(obstacles)
    }

    /// True when any obstacle excludes the point.
    #[inline]
    pub fn blocks(&self, x: f32, y: f32) -> bool {
        self.0.iter().any(|o| o.excludes(x, y))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.0.iter()
    }
}
