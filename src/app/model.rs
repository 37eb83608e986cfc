// Defines the core data structures for the application.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

/// One row of systemd unit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub load_state: String,   // e.g., "loaded", "not-found"
    pub active_state: String, // e.g., "active", "inactive", "failed"
    pub sub_state: String,    // e.g., "running", "dead", "exited"
}

impl ServiceRecord {
    pub fn new(
        name: impl Into<String>,
        load_state: impl Into<String>,
        active_state: impl Into<String>,
        sub_state: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            load_state: load_state.into(),
            active_state: active_state.into(),
            sub_state: sub_state.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active_state == "active" && self.sub_state == "running"
    }

    pub fn is_failed(&self) -> bool {
        self.active_state == "failed"
    }

    fn update_states(&mut self, other: ServiceRecord) {
        self.load_state = other.load_state;
        self.active_state = other.active_state;
        self.sub_state = other.sub_state;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    /// The systemctl verb for this action.
    pub fn verb(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceAction::Start => "Start",
            ServiceAction::Stop => "Stop",
            ServiceAction::Restart => "Restart",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            ServiceAction::Start => "Started",
            ServiceAction::Stop => "Stopped",
            ServiceAction::Restart => "Restarted",
        }
    }

    /// The single toggle action offered for a record: stop what is running,
    /// start everything else.
    pub fn toggle_for(record: &ServiceRecord) -> Self {
        if record.sub_state == "running" {
            ServiceAction::Stop
        } else {
            ServiceAction::Start
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for ServiceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(ServiceAction::Start),
            "stop" => Ok(ServiceAction::Stop),
            "restart" => Ok(ServiceAction::Restart),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Ordered, name-unique list of records as reported by the service manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<ServiceRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot in input order. A name seen twice keeps its first
    /// record.
    pub fn from_records(records: impl IntoIterator<Item = ServiceRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for record in records {
            if seen.insert(record.name.clone()) {
                kept.push(record);
            } else {
                warn!(unit = %record.name, "Duplicate unit in listing, keeping first");
            }
        }
        Self { records: kept }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ServiceRecord> {
        self.records.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }

    /// Replaces the states of the record named like `record`. Returns false
    /// and leaves the snapshot untouched if no such record exists.
    pub fn replace(&mut self, record: ServiceRecord) -> bool {
        match self.records.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => {
                existing.update_states(record);
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a ServiceRecord;
    type IntoIter = std::slice::Iter<'a, ServiceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
