//! Wire records, statuses and snapshots exchanged with the automation service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CoreError;

/// Entity group. Doubles as the API path segment and the snapshot envelope key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// Cyclic processes.
    Processes,
    /// Run-once tasks.
    Tasks,
}

impl GroupKey {
    /// Every group, in display order.
    pub const ALL: [GroupKey; 2] = [GroupKey::Processes, GroupKey::Tasks];

    /// Path segment (`GET /{group}`) and envelope key of the snapshot body.
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKey::Processes => "processes",
            GroupKey::Tasks => "tasks",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side status of a process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Not started yet, or a status change is being applied.
    Init,
    /// Cycling.
    Running,
    /// Not cycling.
    Stopped,
}

impl ProcessStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Init => "init",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status a user may request for a process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DesiredStatus {
    /// Start cycling.
    Running,
    /// Stop cycling.
    Stopped,
}

impl DesiredStatus {
    /// Whether a freshly observed status confirms this request.
    ///
    /// `Init` is the marker the server reports while it applies a change, so it
    /// confirms either request.
    pub fn confirmed_by(self, observed: ProcessStatus) -> bool {
        match observed {
            ProcessStatus::Init => true,
            ProcessStatus::Running => self == DesiredStatus::Running,
            ProcessStatus::Stopped => self == DesiredStatus::Stopped,
        }
    }
}

impl From<DesiredStatus> for ProcessStatus {
    fn from(desired: DesiredStatus) -> Self {
        match desired {
            DesiredStatus::Running => ProcessStatus::Running,
            DesiredStatus::Stopped => ProcessStatus::Stopped,
        }
    }
}

/// Server-side status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Never started.
    Init,
    /// An instance is running.
    Running,
    /// The latest instance has finished.
    Finished,
}

impl TaskStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Init => "init",
            TaskStatus::Running => "running",
            TaskStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling mode of the refresh scheduler.
///
/// `Manual` is transient: a one-shot refresh is in flight and the previous
/// mode will be restored when it completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// No polling.
    #[default]
    Off,
    /// Recurring polling of every group.
    Auto,
    /// One-shot refresh in flight.
    Manual,
}

impl RefreshMode {
    /// Whether data is being (or about to be) fetched.
    pub fn is_refreshing(self) -> bool {
        match self {
            RefreshMode::Auto | RefreshMode::Manual => true,
            RefreshMode::Off => false,
        }
    }

    /// Status line shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            RefreshMode::Auto => "Monitoring",
            RefreshMode::Manual => "Refreshing",
            RefreshMode::Off => "Paused",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Process as listed by `GET /processes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Unique name.
    pub name: String,
    /// Status reported by the server.
    pub status: ProcessStatus,
    /// Seconds per cycle.
    pub cycle_time: u64,
    /// Cycles completed so far.
    #[serde(default)]
    pub cycles_completed: u64,
    /// `None` (or the sentinel instant) when no cycle has completed.
    #[serde(default)]
    pub last_cycle_dttm: Option<DateTime<Utc>>,
}

/// Task as listed by `GET /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Unique name.
    pub name: String,
    /// Status reported by the server.
    pub status: TaskStatus,
    /// Configured run duration in seconds.
    #[serde(default)]
    pub duration: u64,
    /// Start of the latest instance.
    #[serde(default)]
    pub start_dttm: Option<DateTime<Utc>>,
    /// End of the latest instance.
    #[serde(default)]
    pub finish_dttm: Option<DateTime<Utc>>,
    /// Most recent instance; the nil UUID until the task first runs.
    #[serde(default)]
    pub id: Uuid,
}

/// Full listing of one group, as returned by a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// Listing of `/processes`.
    Processes(Vec<ProcessRecord>),
    /// Listing of `/tasks`.
    Tasks(Vec<TaskRecord>),
}

impl Snapshot {
    /// Group this snapshot belongs to.
    pub fn group(&self) -> GroupKey {
        match self {
            Snapshot::Processes(_) => GroupKey::Processes,
            Snapshot::Tasks(_) => GroupKey::Tasks,
        }
    }

    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Processes(records) => records.len(),
            Snapshot::Tasks(records) => records.len(),
        }
    }

    /// True when the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a `{ "<group>": [record, ...] }` response body.
    pub fn from_envelope(group: GroupKey, mut body: Value) -> Result<Self, CoreError> {
        let records = body
            .get_mut(group.as_str())
            .map(Value::take)
            .ok_or(CoreError::MissingGroup(group))?;
        let decode = |source| CoreError::Decode { group, source };
        match group {
            GroupKey::Processes => serde_json::from_value(records)
                .map(Snapshot::Processes)
                .map_err(decode),
            GroupKey::Tasks => serde_json::from_value(records)
                .map(Snapshot::Tasks)
                .map_err(decode),
        }
    }
}
