//! The imperative half of the mirror: fetch snapshots, send mutations.
//!
//! Every mutation sets its overlay synchronously before the request is
//! issued. Responses never clear an overlay; only a later snapshot does.

use std::future::Future;

use automator_core::api::{ProcessSettings, StartTaskRequest, TaskSettings};
use automator_core::{
    ApplyReport, EntityStore, GroupKey, Handle, ProcessEntity, ProcessRecord, Snapshot,
    TaskEntity, TaskRecord,
};
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::MirrorError;
use crate::transport::Transport;

/// Groups that refreshed and groups that failed in one [`Mirror::refresh_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: Vec<GroupKey>,
    pub failed: Vec<GroupKey>,
}

impl RefreshSummary {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Local entity store bound to a transport.
pub struct Mirror<T> {
    store: EntityStore,
    transport: T,
}

impl<T: Transport> Mirror<T> {
    pub fn new(transport: T) -> Self {
        Self {
            store: EntityStore::new(),
            transport,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one group's collection and merge it. On any failure the store
    /// is left exactly as it was.
    pub async fn refresh_group(&self, group: GroupKey) -> Result<ApplyReport, MirrorError> {
        let result = self.fetch_snapshot(group).await;
        match result {
            Ok(snapshot) => {
                let report = self.store.apply_snapshot(snapshot);
                debug!(
                    %group,
                    created = report.created,
                    updated = report.updated,
                    confirmed = report.confirmed,
                    "group refreshed"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(%group, error = %e, "error fetching group");
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self, group: GroupKey) -> Result<Snapshot, MirrorError> {
        let body = self.transport.get(group.as_str()).await?;
        Ok(Snapshot::from_envelope(group, body)?)
    }

    /// Refresh every group concurrently. A failing group does not affect the
    /// others; failures are logged and reported, never returned as an error.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let results = join_all(GroupKey::ALL.map(|group| async move {
            (group, self.refresh_group(group).await)
        }))
        .await;

        let mut summary = RefreshSummary::default();
        for (group, result) in results {
            match result {
                Ok(_) => summary.refreshed.push(group),
                Err(_) => summary.failed.push(group),
            }
        }
        summary
    }

    /// Flip the process's effective status, then ask the service for it.
    ///
    /// The overlay is set when this is called, before the returned future is
    /// first polled. A failed request leaves the overlay in place.
    pub fn toggle_status<'a>(
        &'a self,
        process: &Handle<ProcessEntity>,
    ) -> impl Future<Output = Result<ProcessRecord, MirrorError>> + Send + 'a {
        let (name, patch) = {
            let mut entity = process.write();
            let patch = entity.begin_toggle();
            (entity.name().to_owned(), patch)
        };
        info!(process = %name, status = ?patch.status, "toggling process");

        async move {
            let path = format!("process/{name}");
            match self.transport.patch(&path, &patch).await {
                Ok(body) => Ok(serde_json::from_value(body)?),
                Err(e) => {
                    warn!(process = %name, error = %e, "toggle request failed");
                    Err(e.into())
                }
            }
        }
    }

    /// Ask the service for a new task instance. The pending marker is set
    /// when this is called. Resolves to `Ok(None)` without sending anything
    /// while an earlier start is still unconfirmed.
    pub fn start_task_instance<'a>(
        &'a self,
        task: &Handle<TaskEntity>,
    ) -> impl Future<Output = Result<Option<TaskRecord>, MirrorError>> + Send + 'a {
        let name = {
            let mut entity = task.write();
            if entity.begin_start() {
                info!(task = %entity.name(), "starting task instance");
                Some(entity.name().to_owned())
            } else {
                debug!(task = %entity.name(), "start already pending");
                None
            }
        };

        async move {
            let Some(name) = name else {
                return Ok(None);
            };
            let path = format!("tasks/{name}");
            match self.transport.post(&path, &StartTaskRequest {}).await {
                Ok(body) => Ok(Some(serde_json::from_value(body)?)),
                Err(e) => {
                    warn!(task = %name, error = %e, "start request failed");
                    Err(e.into())
                }
            }
        }
    }

    /// Send the settings that differ from the confirmed values. The request
    /// goes out even when nothing differs.
    pub async fn update_process(
        &self,
        process: &Handle<ProcessEntity>,
        settings: &ProcessSettings,
    ) -> Result<ProcessRecord, MirrorError> {
        let (name, patch) = {
            let entity = process.read();
            (entity.name().to_owned(), entity.settings_patch(settings))
        };
        debug!(process = %name, ?patch, "updating process settings");

        let body = self
            .transport
            .patch(&format!("process/{name}"), &patch)
            .await
            .inspect_err(|e| warn!(process = %name, error = %e, "process update failed"))?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn update_task(
        &self,
        task: &Handle<TaskEntity>,
        settings: &TaskSettings,
    ) -> Result<TaskRecord, MirrorError> {
        let (name, patch) = {
            let entity = task.read();
            (entity.name().to_owned(), entity.settings_patch(settings))
        };
        debug!(task = %name, ?patch, "updating task settings");

        let body = self
            .transport
            .patch(&format!("tasks/{name}"), &patch)
            .await
            .inspect_err(|e| warn!(task = %name, error = %e, "task update failed"))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetch a single process and merge it as a one-record snapshot.
    pub async fn fetch_process(&self, name: &str) -> Result<Handle<ProcessEntity>, MirrorError> {
        let record: ProcessRecord = self.fetch_one(&format!("processes/{name}")).await?;
        self.store.apply_snapshot(Snapshot::Processes(vec![record]));
        self.store.process(name).ok_or_else(|| MirrorError::Unknown {
            group: GroupKey::Processes,
            name: name.to_owned(),
        })
    }

    /// Fetch a single task and merge it as a one-record snapshot.
    pub async fn fetch_task(&self, name: &str) -> Result<Handle<TaskEntity>, MirrorError> {
        let record: TaskRecord = self.fetch_one(&format!("tasks/{name}")).await?;
        self.store.apply_snapshot(Snapshot::Tasks(vec![record]));
        self.store.task(name).ok_or_else(|| MirrorError::Unknown {
            group: GroupKey::Tasks,
            name: name.to_owned(),
        })
    }

    async fn fetch_one<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R, MirrorError> {
        let body: Value = self.transport.get(path).await?;
        Ok(serde_json::from_value(body)?)
    }
}
