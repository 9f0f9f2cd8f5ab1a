pub mod assign;
pub mod coverage;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod models;
pub mod session;

pub use assign::{assign, RolePolicy};
pub use coverage::{plan_coverage, SweepPath};
pub use error::{AssignError, PlanError, SessionError};
pub use fleet::{AcceptancePolicy, FleetStateTracker, ACTIVE_TIMEOUT_MS, DETECT_TIMEOUT_MS};
pub use models::{
    normalize_id, MissionAssignment, MissionRole, TelemetryRecord, VehicleMission, VehicleState,
    Waypoint,
};
pub use session::{GenerateParams, MissionSession, SessionState};
