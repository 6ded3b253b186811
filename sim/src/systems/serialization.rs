//! JSON encoding of simulation snapshots.
//!
//! Every snapshot that leaves the engine as JSON goes through these helpers
//! (`Snapshot::to_json`, `CrowdWorld::snapshot_json`, the demo dump), so the
//! wire format is decided in one place. Errors surface as
//! [`CrowdError::Serialization`](crate::error::CrowdError::Serialization).

use crate::error::CrowdResult;
use crate::world::Snapshot;

/// Compact JSON bytes, for sockets and files.
pub fn snapshot_to_json(snapshot: &Snapshot) -> CrowdResult<Vec<u8>> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// Compact JSON text.
pub fn snapshot_to_json_string(snapshot: &Snapshot) -> CrowdResult<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Indented JSON text, for logs and debugging dumps.
pub fn snapshot_to_json_pretty(snapshot: &Snapshot) -> CrowdResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn snapshot_from_json(data: &[u8]) -> CrowdResult<Snapshot> {
    Ok(serde_json::from_slice(data)?)
}

pub fn snapshot_from_json_string(data: &str) -> CrowdResult<Snapshot> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CrowdWorld;
    use crate::config::CrowdConfig;
    use crate::error::CrowdError;
    use crate::obstacle::Obstacle;
    use crate::world::{AgentSnapshot, MarkerSnapshot};

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = Snapshot {
            tick: 42,
            paused: true,
            agents: vec![AgentSnapshot {
                id: 3,
                x: 1.5,
                y: 2.25,
                vx: -0.125,
                vy: 0.0,
                heading: 3.0,
                claimed_markers: vec![(1.25, 2.5)],
            }],
            markers: vec![MarkerSnapshot {
                x: 1.25,
                y: 2.5,
                claimed: true,
                weight: 0.75,
            }],
            obstacles: vec![Obstacle::new(2.0, 2.0, 0.5)],
        };

        let json = snapshot_to_json_string(&snapshot).unwrap();
        let restored = snapshot_from_json_string(&json).unwrap();
        assert_eq!(restored, snapshot);

        let bytes = snapshot_to_json(&snapshot).unwrap();
        let restored = snapshot_from_json(&bytes).unwrap();
        assert_eq!(restored.agents[0].claimed_markers, vec![(1.25, 2.5)]);

        let pretty = snapshot_to_json_pretty(&snapshot).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(snapshot_from_json_string(&pretty).unwrap(), snapshot);
    }

    #[test]
    fn test_engine_json_matches_helpers() {
        let config = CrowdConfig {
            seed: Some(31),
            ..Default::default()
        };
        let mut sim = CrowdWorld::initialize(config).unwrap();
        sim.tick();
        sim.tick();

        let snapshot = sim.snapshot();
        let json = sim.snapshot_json().unwrap();
        assert_eq!(json, snapshot_to_json_string(&snapshot).unwrap());
        assert_eq!(snapshot.to_json().unwrap(), json);
        assert_eq!(
            snapshot.to_json_pretty().unwrap(),
            snapshot_to_json_pretty(&snapshot).unwrap()
        );

        let restored = snapshot_from_json_string(&json).unwrap();
        assert_eq!(restored.tick, 2);
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            snapshot_from_json_string("{\"tick\": \"soon\"}"),
            Err(CrowdError::Serialization(_))
        ));
    }
}
