//! Fleet-state reconciliation.
//!
//! Turns a raw, possibly-incomplete, possibly-out-of-order stream of
//! timestamped reports into a stable four-state classification. Acceptance
//! is sticky (an accepted vehicle never auto-expires); detection is not
//! (unaccepted vehicles that stop reporting are forgotten after the longer
//! timeout so the detected list does not grow unbounded).

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{TelemetryRecord, VehicleState};

/// Reports older than this mark an accepted vehicle inactive.
pub const ACTIVE_TIMEOUT_MS: i64 = 5_000;
/// Reports older than this evict an unaccepted vehicle entirely.
pub const DETECT_TIMEOUT_MS: i64 = 10_000;

/// How the tracker treats newly detected vehicles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptancePolicy {
    /// Auto-accept the first vehicle that ever reports while the
    /// acceptance set is empty. Off by default; operators normally
    /// accept vehicles explicitly.
    pub auto_accept_first: bool,
}

/// Owns the last-seen table, the acceptance set, and the operator's
/// current selection. All mutation goes through explicit operations;
/// classification is a pure function of this state plus `now`.
#[derive(Debug)]
pub struct FleetStateTracker {
    last_seen: HashMap<String, DateTime<Utc>>,
    accepted: BTreeSet<String>,
    selected: Option<String>,
    policy: AcceptancePolicy,
}

impl FleetStateTracker {
    pub fn new(policy: AcceptancePolicy) -> Self {
        Self {
            last_seen: HashMap::new(),
            accepted: BTreeSet::new(),
            selected: None,
            policy,
        }
    }

    /// Restore a tracker with a persisted acceptance set. Accepted ids
    /// with no report yet classify as inactive, not gone.
    pub fn with_accepted(policy: AcceptancePolicy, accepted: BTreeSet<String>) -> Self {
        Self {
            last_seen: HashMap::new(),
            accepted,
            selected: None,
            policy,
        }
    }

    /// Record a single normalized report. Out-of-order reports never move
    /// the last-seen timestamp backwards.
    ///
    /// Returns true if the acceptance set changed (auto-accept policy).
    pub fn observe(&mut self, record: &TelemetryRecord) -> bool {
        let seen = self
            .last_seen
            .entry(record.drone_id.clone())
            .or_insert(record.timestamp);
        if record.timestamp > *seen {
            *seen = record.timestamp;
        }
        if self.policy.auto_accept_first && self.accepted.is_empty() {
            return self.accept(&record.drone_id);
        }
        false
    }

    /// Ingest a full snapshot and classify every known id.
    ///
    /// The last-seen table is fully updated from the snapshot before any
    /// classification runs, so no vehicle is classified against a
    /// partially-updated table.
    pub fn ingest(
        &mut self,
        snapshot: &[TelemetryRecord],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, VehicleState> {
        for record in snapshot {
            self.observe(record);
        }
        self.classify_all(now)
    }

    /// Classify one identifier against `now`.
    pub fn classify(&self, id: &str, now: DateTime<Utc>) -> VehicleState {
        let accepted = self.accepted.contains(id);
        match self.last_seen.get(id) {
            None if accepted => VehicleState::Inactive,
            None => VehicleState::Gone,
            Some(seen) => {
                let age_ms = now.signed_duration_since(*seen).num_milliseconds();
                if accepted {
                    if age_ms <= ACTIVE_TIMEOUT_MS {
                        VehicleState::Active
                    } else {
                        VehicleState::Inactive
                    }
                } else if age_ms > DETECT_TIMEOUT_MS {
                    VehicleState::Gone
                } else {
                    VehicleState::Detected
                }
            }
        }
    }

    /// Classify every known id (reported or accepted). Ids that were never
    /// reported and never accepted are unknown and do not appear.
    pub fn classify_all(&self, now: DateTime<Utc>) -> BTreeMap<String, VehicleState> {
        let mut states = BTreeMap::new();
        for id in self.last_seen.keys() {
            states.insert(id.clone(), self.classify(id, now));
        }
        for id in &self.accepted {
            states
                .entry(id.clone())
                .or_insert_with(|| self.classify(id, now));
        }
        states
    }

    /// Drop last-seen entries for vehicles classified gone and return the
    /// evicted ids. Accepted vehicles are never evicted.
    pub fn evict_gone(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let gone: Vec<String> = self
            .last_seen
            .keys()
            .filter(|id| self.classify(id, now) == VehicleState::Gone)
            .cloned()
            .collect();
        for id in &gone {
            self.last_seen.remove(id);
        }
        gone
    }

    /// Add an id to the acceptance set. Idempotent; returns true if the
    /// set changed (callers persist on change).
    pub fn accept(&mut self, id: &str) -> bool {
        self.accepted.insert(id.to_string())
    }

    /// Remove an id from the acceptance set. Idempotent; clears the
    /// operator's selection if it pointed at the released vehicle.
    pub fn release(&mut self, id: &str) -> bool {
        let changed = self.accepted.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        changed
    }

    pub fn is_accepted(&self, id: &str) -> bool {
        self.accepted.contains(id)
    }

    /// Accepted ids in stable (lexicographic) order; this is the vehicle
    /// pool fed to mission assignment.
    pub fn accepted_ids(&self) -> Vec<String> {
        self.accepted.iter().cloned().collect()
    }

    /// Every id the tracker knows about, reported or accepted.
    pub fn known_ids(&self) -> BTreeSet<String> {
        let mut ids: BTreeSet<String> = self.last_seen.keys().cloned().collect();
        ids.extend(self.accepted.iter().cloned());
        ids
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.last_seen.contains_key(id) || self.accepted.contains(id)
    }

    pub fn select(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn last_seen(&self, id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(id).copied()
    }
}
