//! Partition a sweep path across vehicles and build per-vehicle
//! waypoint lists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AssignError;
use crate::models::{MissionAssignment, MissionRole, VehicleMission, Waypoint};

/// Role-assignment policy selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Each vehicle flies its own contiguous slice of the path.
    Independent,
    /// One vehicle carries the full path; the rest trail it without
    /// independent waypoints (their flight behavior is downstream).
    LeaderFollower,
}

/// Partition `path` across `vehicle_ids` under `policy`.
///
/// Pure transformation: a fresh process-unique mission id is generated
/// per call and shared by every vehicle in the result, so a partial
/// upload failure can be correlated back to one planning event.
pub fn assign(
    path: &[[f64; 2]],
    vehicle_ids: &[String],
    policy: RolePolicy,
    altitude_m: f64,
) -> Result<MissionAssignment, AssignError> {
    if vehicle_ids.is_empty() {
        return Err(AssignError::NoVehicles);
    }
    let mission_id = uuid::Uuid::new_v4().to_string();
    let vehicles = match policy {
        RolePolicy::Independent => assign_independent(path, vehicle_ids, &mission_id, altitude_m),
        RolePolicy::LeaderFollower => {
            if vehicle_ids.len() < 2 {
                return Err(AssignError::InsufficientVehicles(vehicle_ids.len()));
            }
            assign_leader_follower(path, vehicle_ids, &mission_id, altitude_m)
        }
    };
    Ok(MissionAssignment {
        mission_id,
        vehicles,
    })
}

fn waypoints(points: &[[f64; 2]], altitude_m: f64) -> Vec<Waypoint> {
    points
        .iter()
        .enumerate()
        .map(|(seq, p)| Waypoint {
            seq: seq as u32,
            lat: p[0],
            lon: p[1],
            altitude_m,
        })
        .collect()
}

/// Ceil-sized contiguous chunks, each overlapping the next by one point
/// so there is no gap at the boundary. Chunks shorter than 2 points are
/// dropped; a vehicle may receive no mission when the path runs out.
fn assign_independent(
    path: &[[f64; 2]],
    vehicle_ids: &[String],
    mission_id: &str,
    altitude_m: f64,
) -> BTreeMap<String, VehicleMission> {
    let mut vehicles = BTreeMap::new();
    if path.is_empty() {
        return vehicles;
    }
    let chunk = path.len().div_ceil(vehicle_ids.len());
    for (i, id) in vehicle_ids.iter().enumerate() {
        let start = i * chunk;
        if start >= path.len() {
            break;
        }
        let end = ((i + 1) * chunk + 1).min(path.len());
        let slice = &path[start..end];
        if slice.len() < 2 {
            continue;
        }
        vehicles.insert(
            id.clone(),
            VehicleMission {
                mission_id: mission_id.to_string(),
                role: MissionRole::Independent,
                waypoints: waypoints(slice, altitude_m),
            },
        );
    }
    vehicles
}

fn assign_leader_follower(
    path: &[[f64; 2]],
    vehicle_ids: &[String],
    mission_id: &str,
    altitude_m: f64,
) -> BTreeMap<String, VehicleMission> {
    let mut vehicles = BTreeMap::new();
    for (i, id) in vehicle_ids.iter().enumerate() {
        let (role, wps) = if i == 0 {
            (MissionRole::Leader, waypoints(path, altitude_m))
        } else {
            (MissionRole::Follower, Vec::new())
        };
        vehicles.insert(
            id.clone(),
            VehicleMission {
                mission_id: mission_id.to_string(),
                role,
                waypoints: wps,
            },
        );
    }
    vehicles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("D{i}")).collect()
    }

    fn path(n: usize) -> Vec<[f64; 2]> {
        (0..n).map(|i| [i as f64 * 0.001, 0.0]).collect()
    }

    #[test]
    fn independent_chunks_reconstruct_path_in_order() {
        let path = path(10);
        let vehicle_ids = ids(3);
        let assignment = assign(&path, &vehicle_ids, RolePolicy::Independent, 30.0).unwrap();

        // chunk = ceil(10/3) = 4; slices [0..5], [4..9], [8..10]
        let mut rebuilt: Vec<[f64; 2]> = Vec::new();
        for id in &vehicle_ids {
            let mission = &assignment.vehicles[id];
            assert_eq!(mission.role, MissionRole::Independent);
            let pts: Vec<[f64; 2]> = mission.waypoints.iter().map(|w| [w.lat, w.lon]).collect();
            // Remove the one-point overlap with the previous chunk.
            let skip = usize::from(!rebuilt.is_empty());
            rebuilt.extend_from_slice(&pts[skip..]);
        }
        assert_eq!(rebuilt, path);
    }

    #[test]
    fn independent_chunks_overlap_by_one_point() {
        let path = path(10);
        let vehicle_ids = ids(3);
        let assignment = assign(&path, &vehicle_ids, RolePolicy::Independent, 30.0).unwrap();
        let first = &assignment.vehicles["D0"].waypoints;
        let second = &assignment.vehicles["D1"].waypoints;
        let last_of_first = first.last().unwrap();
        let first_of_second = second.first().unwrap();
        assert_eq!(
            (last_of_first.lat, last_of_first.lon),
            (first_of_second.lat, first_of_second.lon)
        );
    }

    #[test]
    fn independent_drops_short_tail_chunk() {
        // 4 points over 3 vehicles: chunk = 2, third slice [4..4] is empty.
        let path = path(4);
        let assignment = assign(&path, &ids(3), RolePolicy::Independent, 30.0).unwrap();
        assert!(assignment.vehicles.contains_key("D0"));
        assert!(assignment.vehicles.contains_key("D1"));
        assert!(!assignment.vehicles.contains_key("D2"));
    }

    #[test]
    fn sequence_numbers_are_zero_based_and_contiguous() {
        let assignment = assign(&path(7), &ids(2), RolePolicy::Independent, 45.0).unwrap();
        for mission in assignment.vehicles.values() {
            for (i, wp) in mission.waypoints.iter().enumerate() {
                assert_eq!(wp.seq, i as u32);
                assert_eq!(wp.altitude_m, 45.0);
            }
        }
    }

    #[test]
    fn leader_follower_splits_roles() {
        let path = path(6);
        let assignment = assign(&path, &ids(3), RolePolicy::LeaderFollower, 30.0).unwrap();
        let leader = &assignment.vehicles["D0"];
        assert_eq!(leader.role, MissionRole::Leader);
        assert_eq!(leader.waypoints.len(), 6);
        for id in ["D1", "D2"] {
            let follower = &assignment.vehicles[id];
            assert_eq!(follower.role, MissionRole::Follower);
            assert!(follower.waypoints.is_empty());
        }
    }

    #[test]
    fn leader_follower_requires_two_vehicles() {
        assert_eq!(
            assign(&path(6), &ids(1), RolePolicy::LeaderFollower, 30.0),
            Err(AssignError::InsufficientVehicles(1))
        );
    }

    #[test]
    fn empty_vehicle_pool_is_rejected() {
        assert_eq!(
            assign(&path(6), &[], RolePolicy::Independent, 30.0),
            Err(AssignError::NoVehicles)
        );
    }

    #[test]
    fn mission_id_is_shared_and_unique_per_call() {
        let path = path(6);
        let a = assign(&path, &ids(2), RolePolicy::Independent, 30.0).unwrap();
        let b = assign(&path, &ids(2), RolePolicy::Independent, 30.0).unwrap();
        assert_ne!(a.mission_id, b.mission_id);
        for mission in a.vehicles.values() {
            assert_eq!(mission.mission_id, a.mission_id);
        }
    }
}
