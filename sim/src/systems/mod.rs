//! ECS systems for the crowd simulation.
//!
//! Systems contain the per-tick logic that operates on components and the
//! marker grid.
//!
//! ## Tick Order
//!
//! The systems run strictly in sequence; each depends on the previous one:
//!
//! 1. `clear_claims_system` - releases every marker claimed last tick
//! 2. `claim_markers_system` - gathers candidates per agent and resolves
//!    contested markers to the closest agent
//! 3. `steering_system` - weights claimed markers and writes velocities
//! 4. `advection_system` - applies velocities to positions
//! 5. `grid_index_system` - refreshes each agent's cell
//!
//! Only the gather step of `claim_markers_system` fans out across threads
//! (with the `parallel` feature). Everything that writes shared state is
//! sequential.

pub mod claim;
pub mod movement;
pub mod serialization;
pub mod steering;

pub use claim::*;
pub use movement::*;
pub use serialization::*;
pub use steering::*;
