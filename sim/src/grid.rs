//! Uniform marker grid.
//!
//! The grid covers the simulation area with `resolution × resolution` cells.
//! Each cell holds a stratified sample of free-space markers, fixed at
//! construction. Agents look markers up through the 3×3 neighbourhood of the
//! cell they stand in, so a lookup costs O(k) in the markers of nine cells
//! rather than O(n) over the whole pool.

use crate::config::CrowdConfig;
use crate::error::CrowdResult;
use crate::obstacle::Obstacles;
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Index of a marker in the grid's marker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u32);

impl MarkerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A free-space sample point.
///
/// `owner` is a claim for the current tick only. It is an entity handle, so a
/// marker never keeps an agent alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub x: f32,
    pub y: f32,
    pub owner: Option<Entity>,
    pub weight: f32,
}

impl Marker {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            owner: None,
            weight: 0.0,
        }
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.owner.is_some()
    }

    #[inline]
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Drop any claim and reset the weight.
    #[inline]
    pub fn release(&mut self) {
        self.owner = None;
        self.weight = 0.0;
    }
}

/// One grid cell: its world rectangle and its slice of the marker pool.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    first_marker: u32,
    marker_count: u32,
}

impl GridCell {
    /// Closed-rectangle containment.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.origin_x
            && x <= self.origin_x + self.width
            && y >= self.origin_y
            && y <= self.origin_y + self.height
    }

    pub fn marker_count(&self) -> usize {
        self.marker_count as usize
    }

    /// Ids of the markers owned by this cell.
    pub fn marker_ids(&self) -> impl Iterator<Item = MarkerId> {
        (self.first_marker..self.first_marker + self.marker_count).map(MarkerId)
    }

    fn range(&self) -> Range<usize> {
        let start = self.first_marker as usize;
        start..start + self.marker_count as usize
    }
}

/// Grid of marker cells, stored row-major (`index = ix + iy * resolution`).
#[derive(Resource, Debug, Clone)]
pub struct MarkerGrid {
    resolution: usize,
    cell_width: f32,
    cell_height: f32,
    origin_x: f32,
    origin_y: f32,
    cells: Vec<GridCell>,
    markers: Vec<Marker>,
}

/// Largest `s` with `s * s <= n`.
fn floor_sqrt(n: u32) -> u32 {
    let mut s = (n as f64).sqrt() as u32;
    while s > 0 && s.saturating_mul(s) > n {
        s -= 1;
    }
    while (s + 1).saturating_mul(s + 1) <= n {
        s += 1;
    }
    s
}

impl MarkerGrid {
    /// Build the grid and stratified-sample every cell, skipping points that
    /// fall inside an obstacle.
    ///
    /// Rejects degenerate configs (zero resolution, empty world) before
    /// any cell is laid out.
    pub fn build<R: Rng>(config: &CrowdConfig, obstacles: &Obstacles, rng: &mut R) -> CrowdResult<Self> {
        config.validate()?;

        let resolution = config.grid_resolution as usize;
        let cell_width = config.cell_width();
        let cell_height = config.cell_height();
        let (origin_x, origin_y) = config.origin;

        let side = floor_sqrt(config.cell_capacity) as usize;
        let inv_side = if side > 0 { 1.0 / side as f32 } else { 0.0 };

        let cell_count = resolution * resolution;
        let mut cells = Vec::with_capacity(cell_count);
        let mut markers = Vec::with_capacity(cell_count * side * side);
        let mut excluded = 0usize;

        for index in 0..cell_count {
            let ix = index % resolution;
            let iy = index / resolution;
            let cx = origin_x + ix as f32 * cell_width;
            let cy = origin_y + iy as f32 * cell_height;
            let first_marker = markers.len() as u32;

            for sample in 0..side * side {
                let sx = (sample % side) as f32;
                let sy = (sample / side) as f32;
                let x = cx + (sx + rng.gen::<f32>()) * inv_side * cell_width;
                let y = cy + (sy + rng.gen::<f32>()) * inv_side * cell_height;
                if obstacles.blocks(x, y) {
                    excluded += 1;
                    continue;
                }
                markers.push(Marker::new(x, y));
            }

            cells.push(GridCell {
                origin_x: cx,
                origin_y: cy,
                width: cell_width,
                height: cell_height,
                first_marker,
                marker_count: markers.len() as u32 - first_marker,
            });
        }

        tracing::debug!(
            cells = cell_count,
            markers = markers.len(),
            excluded,
            "marker grid built"
        );

        Ok(Self {
            resolution,
            cell_width,
            cell_height,
            origin_x,
            origin_y,
            cells,
            markers,
        })
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f32 {
        self.cell_height
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// World rectangle covered by the grid as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.origin_x,
            self.origin_y,
            self.origin_x + self.cell_width * self.resolution as f32,
            self.origin_y + self.cell_height * self.resolution as f32,
        )
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Row-major index from 2D cell coordinates.
    #[inline]
    pub fn coords_to_index(&self, ix: usize, iy: usize) -> usize {
        ix + iy * self.resolution
    }

    /// 2D cell coordinates of an index. Out-of-range indices clamp to the last cell.
    #[inline]
    pub fn cell_coords(&self, index: usize) -> (usize, usize) {
        let index = index.min(self.cells.len().saturating_sub(1));
        (index % self.resolution, index / self.resolution)
    }

    /// World position of a cell's lower-left corner.
    #[inline]
    pub fn cell_origin(&self, ix: usize, iy: usize) -> (f32, f32) {
        (
            self.origin_x + ix as f32 * self.cell_width,
            self.origin_y + iy as f32 * self.cell_height,
        )
    }

    pub fn cell_center(&self, index: usize) -> (f32, f32) {
        let (ix, iy) = self.cell_coords(index);
        let (x, y) = self.cell_origin(ix, iy);
        (x + self.cell_width * 0.5, y + self.cell_height * 0.5)
    }

    /// Cell containing a world position. Positions outside the grid map to
    /// the nearest boundary cell.
    #[inline]
    pub fn cell_index_of(&self, x: f32, y: f32) -> usize {
        let max = self.resolution as i64 - 1;
        let ix = ((x - self.origin_x) / self.cell_width).floor() as i64;
        let iy = ((y - self.origin_y) / self.cell_height).floor() as i64;
        self.coords_to_index(ix.clamp(0, max) as usize, iy.clamp(0, max) as usize)
    }

    /// Indices of the 3×3 block around `index`, clamped at the borders
    /// (corners yield 4, edges 6, never wrapping). Row-major order.
    pub fn neighborhood_indices(&self, index: usize) -> Vec<usize> {
        let (ix, iy) = self.cell_coords(index);
        let max = self.resolution - 1;
        let mut result = Vec::with_capacity(9);
        for y in iy.saturating_sub(1)..=(iy + 1).min(max) {
            for x in ix.saturating_sub(1)..=(ix + 1).min(max) {
                result.push(self.coords_to_index(x, y));
            }
        }
        result
    }

    /// Cells of the 3×3 block around `index`.
    pub fn neighborhood(&self, index: usize) -> impl Iterator<Item = &GridCell> + '_ {
        self.neighborhood_indices(index)
            .into_iter()
            .map(move |i| &self.cells[i])
    }

    /// Every marker of the 3×3 block around `index`, with its id.
    pub fn neighborhood_markers(&self, index: usize) -> impl Iterator<Item = (MarkerId, &Marker)> + '_ {
        self.neighborhood(index)
            .flat_map(move |cell| cell.marker_ids().map(move |id| (id, &self.markers[id.index()])))
    }

    // ------------------------------------------------------------------------
    // Cells and markers
    // ------------------------------------------------------------------------

    pub fn cell(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell_markers(&self, index: usize) -> &[Marker] {
        match self.cells.get(index) {
            Some(cell) => &self.markers[cell.range()],
            None => &[],
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.index())
    }

    pub(crate) fn marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(id.index())
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn claimed_count(&self) -> usize {
        self.markers.iter().filter(|m| m.is_claimed()).count()
    }

    /// Release one marker. Unknown ids are ignored.
    pub fn release(&mut self, id: MarkerId) {
        if let Some(marker) = self.markers.get_mut(id.index()) {
            marker.release();
        }
    }
}
