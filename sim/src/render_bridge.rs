//! Renderer Bridge
//!
//! Converts a [`Snapshot`] into flat `f32` buffers a renderer can upload
//! without walking Rust structures. Three buffers are produced: agents,
//! markers and claim lines (marker to owning agent).
//!
//! # Stable Buffer Contract
//!
//! Every buffer is a contiguous `Vec<f32>` with a one-element header holding
//! the record count, followed by fixed-stride records.
//!
//! ## Agent buffer
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ [0] agent_count (as f32)                                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each agent i (offset = 1 + i * AGENT_STRIDE):               │
//! │   [+0] id            - Agent ID (u32 as f32)                    │
//! │   [+1] x             - X position (world units)                 │
//! │   [+2] y             - Y position (world units)                 │
//! │   [+3] vx            - X displacement per tick                  │
//! │   [+4] vy            - Y displacement per tick                  │
//! │   [+5] heading       - Facing angle (radians from +x)           │
//! │   [+6] claimed_count - Markers claimed on the last tick         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Marker buffer
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ [0] marker_count (as f32)                                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each marker i (offset = 1 + i * MARKER_STRIDE):             │
//! │   [+0] x       - X position                                     │
//! │   [+1] y       - Y position                                     │
//! │   [+2] claimed - 1.0 when owned this tick, else 0.0             │
//! │   [+3] weight  - Steering weight in [0, 2]                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Claim-line buffer
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ [0] line_count (as f32)                                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each line i (offset = 1 + i * LINE_STRIDE):                 │
//! │   [+0] marker_x  [+1] marker_y  [+2] agent_x  [+3] agent_y      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Determinism
//!
//! Agents appear in ascending id order and markers in pool order, exactly as
//! they are stored in the snapshot, so the same snapshot always produces the
//! same buffers.

use crate::world::Snapshot;

// ============================================================================
// CONSTANTS - STABLE BUFFER CONTRACT
// ============================================================================

/// Number of f32 values in every buffer header (the record count).
pub const HEADER_SIZE: usize = 1;

/// Number of f32 values per agent.
///
/// Fields (in order): 0. id, 1. x, 2. y, 3. vx, 4. vy, 5. heading, 6. claimed_count
pub const AGENT_STRIDE: usize = 7;

/// Number of f32 values per marker.
pub const MARKER_STRIDE: usize = 4;

/// Number of f32 values per claim line.
pub const LINE_STRIDE: usize = 4;

pub const FIELD_ID: usize = 0;
pub const FIELD_X: usize = 1;
pub const FIELD_Y: usize = 2;
pub const FIELD_VX: usize = 3;
pub const FIELD_VY: usize = 4;
pub const FIELD_HEADING: usize = 5;
pub const FIELD_CLAIMED_COUNT: usize = 6;

pub const MARKER_FIELD_X: usize = 0;
pub const MARKER_FIELD_Y: usize = 1;
pub const MARKER_FIELD_CLAIMED: usize = 2;
pub const MARKER_FIELD_WEIGHT: usize = 3;

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Flatten agent state. See module docs for the layout.
pub fn agents_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let agent_count = snapshot.agents.len();
    let buffer_size = calculate_buffer_size(agent_count, AGENT_STRIDE);

    let mut buffer = Vec::with_capacity(buffer_size);
    buffer.push(agent_count as f32);

    for agent in &snapshot.agents {
        // [+0] id
        buffer.push(agent.id as f32);
        // [+1] x
        buffer.push(agent.x);
        // [+2] y
        buffer.push(agent.y);
        // [+3] vx
        buffer.push(agent.vx);
        // [+4] vy
        buffer.push(agent.vy);
        // [+5] heading
        buffer.push(agent.heading);
        // [+6] claimed_count
        buffer.push(agent.claimed_markers.len() as f32);
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Agent buffer size mismatch");
    buffer
}

/// Flatten marker state. See module docs for the layout.
pub fn markers_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let marker_count = snapshot.markers.len();
    let buffer_size = calculate_buffer_size(marker_count, MARKER_STRIDE);

    let mut buffer = Vec::with_capacity(buffer_size);
    buffer.push(marker_count as f32);

    for marker in &snapshot.markers {
        buffer.push(marker.x);
        buffer.push(marker.y);
        buffer.push(if marker.claimed { 1.0 } else { 0.0 });
        buffer.push(marker.weight);
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Marker buffer size mismatch");
    buffer
}

/// One segment per claimed marker, from the marker to its owning agent.
pub fn claim_lines_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let line_count: usize = snapshot.agents.iter().map(|a| a.claimed_markers.len()).sum();
    let buffer_size = calculate_buffer_size(line_count, LINE_STRIDE);

    let mut buffer = Vec::with_capacity(buffer_size);
    buffer.push(line_count as f32);

    for agent in &snapshot.agents {
        for &(mx, my) in &agent.claimed_markers {
            buffer.extend_from_slice(&[mx, my, agent.x, agent.y]);
        }
    }

    debug_assert_eq!(buffer.len(), buffer_size, "Line buffer size mismatch");
    buffer
}

// ============================================================================
// HELPERS
// ============================================================================

/// `HEADER_SIZE + count * stride`
#[inline]
pub const fn calculate_buffer_size(count: usize, stride: usize) -> usize {
    HEADER_SIZE + count * stride
}

/// Read the record count from any bridge buffer.
///
/// Returns `None` if the buffer is empty.
#[inline]
pub fn parse_count(buffer: &[f32]) -> Option<usize> {
    buffer.first().map(|&count| count as usize)
}

/// Offset of record `index` in a buffer with the given stride.
#[inline]
pub const fn record_offset(index: usize, stride: usize) -> usize {
    HEADER_SIZE + index * stride
}
