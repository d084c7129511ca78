//! Entity models: last confirmed remote state plus an optional optimistic overlay.
//!
//! Overlays are only ever set here and only ever cleared by the reconciler in
//! [`crate::store`], on a snapshot that confirms them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::{ProcessPatch, ProcessSettings, TaskPatch, TaskSettings};
use crate::display::never;
use crate::model::{DesiredStatus, ProcessRecord, ProcessStatus, TaskRecord, TaskStatus};

/// Mirror of one remote process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntity {
    name: String,
    remote_status: ProcessStatus,
    desired_status: Option<DesiredStatus>,
    cycle_time_seconds: u64,
    cycles_completed: u64,
    last_cycle_at: DateTime<Utc>,
}

impl ProcessEntity {
    /// Build an entity from its first observed record, with no overlay.
    pub fn from_record(record: ProcessRecord) -> Self {
        Self {
            name: record.name,
            remote_status: record.status,
            desired_status: None,
            cycle_time_seconds: record.cycle_time,
            cycles_completed: record.cycles_completed,
            last_cycle_at: record.last_cycle_dttm.unwrap_or_else(never),
        }
    }

    /// Unique name, also the API path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last status confirmed by the server.
    pub fn remote_status(&self) -> ProcessStatus {
        self.remote_status
    }

    /// Pending toggle, if any.
    pub fn desired_status(&self) -> Option<DesiredStatus> {
        self.desired_status
    }

    /// The overlay when one is pending, the remote status otherwise.
    pub fn effective_status(&self) -> ProcessStatus {
        match self.desired_status {
            Some(desired) => desired.into(),
            None => self.remote_status,
        }
    }

    /// Confirmed seconds per cycle.
    pub fn cycle_time_seconds(&self) -> u64 {
        self.cycle_time_seconds
    }

    /// Cycles completed since the process was created.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Completion time of the last cycle; the sentinel [`never`] if none ran.
    pub fn last_cycle_at(&self) -> DateTime<Utc> {
        self.last_cycle_at
    }

    /// Effective status is `Running`.
    pub fn is_running(&self) -> bool {
        self.effective_status() == ProcessStatus::Running
    }

    /// Effective status is anything but `Running`.
    pub fn is_stopped(&self) -> bool {
        !self.is_running()
    }

    /// The server still reports `Init`.
    pub fn is_initial(&self) -> bool {
        self.remote_status == ProcessStatus::Init
    }

    /// A toggle has been requested and not yet confirmed.
    pub fn is_updating_status(&self) -> bool {
        self.desired_status.is_some()
    }

    /// Flip the effective status and return the patch that asks the server
    /// for it. The overlay is set before any request goes out.
    pub fn begin_toggle(&mut self) -> ProcessPatch {
        let desired = match self.effective_status() {
            ProcessStatus::Running => DesiredStatus::Stopped,
            ProcessStatus::Stopped | ProcessStatus::Init => DesiredStatus::Running,
        };
        self.desired_status = Some(desired);
        ProcessPatch {
            status: Some(desired.into()),
            cycle_time: None,
        }
    }

    /// Patch carrying only the proposed settings that differ from the
    /// confirmed values. Leaves the overlay alone.
    pub fn settings_patch(&self, settings: &ProcessSettings) -> ProcessPatch {
        ProcessPatch {
            status: None,
            cycle_time: settings
                .cycle_time_seconds
                .filter(|&v| v != self.cycle_time_seconds),
        }
    }

    pub(crate) fn absorb(&mut self, record: ProcessRecord) {
        self.remote_status = record.status;
        self.cycle_time_seconds = record.cycle_time;
        self.cycles_completed = record.cycles_completed;
        self.last_cycle_at = record.last_cycle_dttm.unwrap_or_else(never);
    }

    pub(crate) fn clear_desired_status(&mut self) {
        self.desired_status = None;
    }
}

/// Mirror of one remote task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntity {
    name: String,
    remote_status: TaskStatus,
    pending_instance_id: Option<Uuid>,
    duration_seconds: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    instance_id: Uuid,
}

impl TaskEntity {
    /// Build an entity from its first observed record, with no overlay.
    pub fn from_record(record: TaskRecord) -> Self {
        Self {
            name: record.name,
            remote_status: record.status,
            pending_instance_id: None,
            duration_seconds: record.duration,
            started_at: record.start_dttm.unwrap_or_else(never),
            finished_at: record.finish_dttm.unwrap_or_else(never),
            instance_id: record.id,
        }
    }

    /// Unique name, also the API path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last status confirmed by the server.
    pub fn remote_status(&self) -> TaskStatus {
        self.remote_status
    }

    /// Instance id observed when the pending start was requested.
    pub fn pending_instance_id(&self) -> Option<Uuid> {
        self.pending_instance_id
    }

    /// Confirmed run duration in seconds.
    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    /// Start of the latest instance; the sentinel if none ran.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End of the latest instance; the sentinel if none finished.
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Latest instance id; nil until the task first runs.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// An instance is running.
    pub fn is_running(&self) -> bool {
        self.remote_status == TaskStatus::Running
    }

    /// The latest instance has finished.
    pub fn is_finished(&self) -> bool {
        self.remote_status == TaskStatus::Finished
    }

    /// The task has never run.
    pub fn is_initial(&self) -> bool {
        self.remote_status == TaskStatus::Init
    }

    /// A start has been requested and no new instance observed yet.
    pub fn is_starting_instance(&self) -> bool {
        self.pending_instance_id.is_some()
    }

    /// Record the current instance id as pending. Returns `false`, changing
    /// nothing, while another start is still pending.
    pub fn begin_start(&mut self) -> bool {
        if self.is_starting_instance() {
            return false;
        }
        self.pending_instance_id = Some(self.instance_id);
        true
    }

    /// Patch carrying only the proposed duration when it differs from the
    /// confirmed value.
    pub fn settings_patch(&self, settings: &TaskSettings) -> TaskPatch {
        TaskPatch {
            duration: settings
                .duration_seconds
                .filter(|&v| v != self.duration_seconds),
        }
    }

    pub(crate) fn absorb(&mut self, record: TaskRecord) {
        self.remote_status = record.status;
        self.duration_seconds = record.duration;
        self.started_at = record.start_dttm.unwrap_or_else(never);
        self.finished_at = record.finish_dttm.unwrap_or_else(never);
        self.instance_id = record.id;
    }

    pub(crate) fn clear_pending_instance(&mut self) {
        self.pending_instance_id = None;
    }
}
