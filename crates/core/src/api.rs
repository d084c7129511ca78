//! Request and error bodies exchanged with the automation service.

use serde::{Deserialize, Serialize};

use crate::model::ProcessStatus;

/// Body of `PATCH /process/{name}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessPatch {
    /// Requested status; only set by a toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessStatus>,
    /// Seconds per cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_time: Option<u64>,
}

impl ProcessPatch {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.cycle_time.is_none()
    }
}

/// Body of `PATCH /tasks/{name}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPatch {
    /// Run duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl TaskPatch {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.duration.is_none()
    }
}

/// Body of `POST /tasks/{name}`: always the empty object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartTaskRequest {}

/// Settings a user proposes for a process, in client-side units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSettings {
    /// Proposed seconds per cycle; `None` leaves it unchanged.
    pub cycle_time_seconds: Option<u64>,
}

/// Settings a user proposes for a task, in client-side units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSettings {
    /// Proposed run duration in seconds; `None` leaves it unchanged.
    pub duration_seconds: Option<u64>,
}

/// Error body returned by the service on 4xx responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Message or list of field problems.
    pub detail: ErrorDetail,
}

/// `detail` is a plain message for lookups and conflicts, and a list of
/// field problems for request validation failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// Lookup failures and conflicts.
    Message(String),
    /// Request validation failures.
    Items(Vec<ValidationDetail>),
}

/// One validation problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationDetail {
    /// Human readable description.
    pub msg: String,
    /// Path to the offending field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loc: Vec<serde_json::Value>,
}

/// Human readable form of a validation failure: every `msg`, comma separated.
pub fn join_messages(details: &[ValidationDetail]) -> String {
    details
        .iter()
        .map(|d| d.msg.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
