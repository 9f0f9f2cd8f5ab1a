//! Mission session state machine.
//!
//! Orchestrates one draw → finalize → plan lifecycle and holds the
//! authoritative in-memory copy of the operator's drawn geometry and the
//! generated result. Re-entering drawing from planned is only reachable
//! via idle; a finalized polygon cannot be edited in place.

use serde::Serialize;

use crate::assign::{assign, RolePolicy};
use crate::coverage::{plan_coverage, SweepPath};
use crate::error::{PlanError, SessionError};
use crate::models::MissionAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Drawing,
    Planned,
}

/// Parameters for one generate invocation.
#[derive(Debug, Clone, Copy)]
pub struct GenerateParams {
    pub spacing_m: f64,
    pub policy: RolePolicy,
    pub altitude_m: f64,
    /// Cap on how many vehicles from the pool receive a slice.
    pub vehicle_limit: Option<usize>,
}

#[derive(Debug)]
pub struct MissionSession {
    state: SessionState,
    polygon: Vec<[f64; 2]>,
    path: Option<SweepPath>,
    assignment: Option<MissionAssignment>,
}

impl Default for MissionSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            polygon: Vec::new(),
            path: None,
            assignment: None,
        }
    }
}

impl MissionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn polygon(&self) -> &[[f64; 2]] {
        &self.polygon
    }

    pub fn path(&self) -> Option<&SweepPath> {
        self.path.as_ref()
    }

    pub fn assignment(&self) -> Option<&MissionAssignment> {
        self.assignment.as_ref()
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    /// idle → drawing. Clears any previously planned path and polygon.
    pub fn start_drawing(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Idle, "start drawing")?;
        *self = Self {
            state: SessionState::Drawing,
            ..Self::default()
        };
        Ok(())
    }

    /// Append one vertex while drawing.
    pub fn add_vertex(&mut self, lat: f64, lon: f64) -> Result<usize, SessionError> {
        self.require(SessionState::Drawing, "add a vertex")?;
        self.polygon.push([lat, lon]);
        Ok(self.polygon.len() - 1)
    }

    /// Replace a vertex in place (drag).
    pub fn move_vertex(&mut self, index: usize, lat: f64, lon: f64) -> Result<(), SessionError> {
        self.require(SessionState::Drawing, "move a vertex")?;
        let len = self.polygon.len();
        let vertex = self
            .polygon
            .get_mut(index)
            .ok_or(SessionError::VertexOutOfRange { index, len })?;
        *vertex = [lat, lon];
        Ok(())
    }

    /// Remove a vertex by index (splice).
    pub fn remove_vertex(&mut self, index: usize) -> Result<(), SessionError> {
        self.require(SessionState::Drawing, "remove a vertex")?;
        let len = self.polygon.len();
        if index >= len {
            return Err(SessionError::VertexOutOfRange { index, len });
        }
        self.polygon.remove(index);
        Ok(())
    }

    /// drawing → planned. Requires at least 3 vertices; on success the
    /// polygon is frozen and returned so the caller can persist it.
    pub fn finish(&mut self) -> Result<&[[f64; 2]], SessionError> {
        self.require(SessionState::Drawing, "finish the polygon")?;
        if self.polygon.len() < 3 {
            return Err(PlanError::InsufficientVertices(self.polygon.len()).into());
        }
        self.state = SessionState::Planned;
        Ok(&self.polygon)
    }

    /// Restore a previously persisted polygon straight into planned.
    pub fn resume_planned(&mut self, polygon: Vec<[f64; 2]>) -> Result<(), SessionError> {
        self.require(SessionState::Idle, "resume a planned polygon")?;
        if polygon.len() < 3 {
            return Err(PlanError::InsufficientVertices(polygon.len()).into());
        }
        *self = Self {
            state: SessionState::Planned,
            polygon,
            path: None,
            assignment: None,
        };
        Ok(())
    }

    /// Run the coverage planner and mission assigner against the frozen
    /// polygon. Valid any number of times while planned; each invocation
    /// fully replaces the previous generated result.
    pub fn generate(
        &mut self,
        params: GenerateParams,
        vehicle_pool: &[String],
    ) -> Result<(&SweepPath, &MissionAssignment), SessionError> {
        self.require(SessionState::Planned, "generate a mission")?;
        let pool = match params.vehicle_limit {
            Some(limit) => &vehicle_pool[..limit.min(vehicle_pool.len())],
            None => vehicle_pool,
        };
        let path = plan_coverage(&self.polygon, params.spacing_m)?;
        let assignment = assign(&path.points, pool, params.policy, params.altitude_m)?;
        self.path = Some(path);
        self.assignment = Some(assignment);
        Ok((
            self.path.as_ref().expect("just planned"),
            self.assignment.as_ref().expect("just assigned"),
        ))
    }

    /// Any state → idle. Discards polygon, generated path, and
    /// assignment; the caller drops the durable copy and may issue a
    /// stop command to tracked vehicles.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssignError;

    fn square_session() -> MissionSession {
        let mut session = MissionSession::new();
        session.start_drawing().unwrap();
        session.add_vertex(0.0, 0.0).unwrap();
        session.add_vertex(0.0, 0.001).unwrap();
        session.add_vertex(0.001, 0.001).unwrap();
        session.add_vertex(0.001, 0.0).unwrap();
        session
    }

    fn params(policy: RolePolicy) -> GenerateParams {
        GenerateParams {
            spacing_m: 20.0,
            policy,
            altitude_m: 30.0,
            vehicle_limit: None,
        }
    }

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("D{i}")).collect()
    }

    #[test]
    fn full_lifecycle() {
        let mut session = square_session();
        assert_eq!(session.state(), SessionState::Drawing);
        session.finish().unwrap();
        assert_eq!(session.state(), SessionState::Planned);

        let (path, assignment) = session.generate(params(RolePolicy::Independent), &pool(2)).unwrap();
        assert!(!path.degenerate);
        assert_eq!(assignment.vehicles.len(), 2);

        session.clear();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.polygon().is_empty());
        assert!(session.assignment().is_none());
    }

    #[test]
    fn finish_requires_three_vertices() {
        let mut session = MissionSession::new();
        session.start_drawing().unwrap();
        session.add_vertex(0.0, 0.0).unwrap();
        session.add_vertex(0.0, 0.001).unwrap();
        let err = session.finish().unwrap_err();
        assert_eq!(err, SessionError::Plan(PlanError::InsufficientVertices(2)));
        // Input preserved for correction, still drawing.
        assert_eq!(session.state(), SessionState::Drawing);
        assert_eq!(session.polygon().len(), 2);
    }

    #[test]
    fn vertex_edits_only_while_drawing() {
        let mut session = square_session();
        session.move_vertex(1, 0.0, 0.002).unwrap();
        assert_eq!(session.polygon()[1], [0.0, 0.002]);
        session.remove_vertex(1).unwrap();
        assert_eq!(session.polygon().len(), 3);

        session.finish().unwrap();
        assert!(matches!(
            session.add_vertex(0.0, 0.0),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.move_vertex(0, 0.0, 0.0),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn vertex_index_bounds_checked() {
        let mut session = square_session();
        assert_eq!(
            session.move_vertex(9, 0.0, 0.0),
            Err(SessionError::VertexOutOfRange { index: 9, len: 4 })
        );
        assert_eq!(
            session.remove_vertex(9),
            Err(SessionError::VertexOutOfRange { index: 9, len: 4 })
        );
    }

    #[test]
    fn drawing_unreachable_from_planned() {
        let mut session = square_session();
        session.finish().unwrap();
        assert!(matches!(
            session.start_drawing(),
            Err(SessionError::InvalidTransition { .. })
        ));
        session.clear();
        session.start_drawing().unwrap();
    }

    #[test]
    fn regenerate_replaces_previous_result() {
        let mut session = square_session();
        session.finish().unwrap();
        let first_id = {
            let (_, a) = session.generate(params(RolePolicy::Independent), &pool(2)).unwrap();
            a.mission_id.clone()
        };
        let second_id = {
            let (_, second) = session
                .generate(params(RolePolicy::LeaderFollower), &pool(2))
                .unwrap();
            second.mission_id.clone()
        };
        assert_ne!(first_id, second_id);
        assert_eq!(session.assignment().unwrap().mission_id, second_id);
    }

    #[test]
    fn generate_respects_vehicle_limit() {
        let mut session = square_session();
        session.finish().unwrap();
        let mut p = params(RolePolicy::Independent);
        p.vehicle_limit = Some(1);
        let (_, assignment) = session.generate(p, &pool(3)).unwrap();
        assert_eq!(assignment.vehicles.len(), 1);
    }

    #[test]
    fn generate_surfaces_assignment_validation() {
        let mut session = square_session();
        session.finish().unwrap();
        let err = session
            .generate(params(RolePolicy::LeaderFollower), &pool(1))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Assign(AssignError::InsufficientVehicles(1))
        );
        // Polygon preserved; session still planned.
        assert_eq!(session.state(), SessionState::Planned);
    }

    #[test]
    fn resume_planned_restores_persisted_polygon() {
        let mut session = MissionSession::new();
        session
            .resume_planned(vec![[0.0, 0.0], [0.0, 0.001], [0.001, 0.001]])
            .unwrap();
        assert_eq!(session.state(), SessionState::Planned);
        session
            .generate(params(RolePolicy::Independent), &pool(1))
            .unwrap();
    }
}
