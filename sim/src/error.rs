//! Error types surfaced by engine construction.
//!
//! The tick loop itself never fails: every error here is raised while
//! validating a [`CrowdConfig`](crate::config::CrowdConfig) or while seeding
//! the population, before the first tick runs.

use thiserror::Error;

/// Errors raised while building or (de)serializing a crowd simulation.
#[derive(Debug, Error)]
pub enum CrowdError {
    /// A configuration parameter is invalid or degenerate.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// Spawn re-rolling hit its bound: obstacles cover the spawn area.
    #[error("could not place agent {agent} outside obstacles after {attempts} attempts")]
    SpawnExhausted { agent: u32, attempts: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrowdError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type CrowdResult<T> = Result<T, CrowdError>;
