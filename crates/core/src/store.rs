//! Per-group entity collections and the snapshot reconciler.
//!
//! Entities are keyed by name, kept in first-seen order and never removed.
//! A merged record is written into the existing allocation, so a [`Handle`]
//! obtained earlier keeps observing fresh values.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::entity::{ProcessEntity, TaskEntity};
use crate::model::{GroupKey, ProcessRecord, Snapshot, TaskRecord};

/// Shared reference to a mirrored entity.
pub struct Handle<E>(Arc<RwLock<E>>);

impl<E> Handle<E> {
    fn new(entity: E) -> Self {
        Self(Arc::new(RwLock::new(entity)))
    }

    /// Lock for reading. Never hold the guard across an `.await`.
    pub fn read(&self) -> RwLockReadGuard<'_, E> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock for writing. Never hold the guard across an `.await`.
    pub fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same entity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<E: Clone> Handle<E> {
    /// Copy of the current state.
    pub fn get(&self) -> E {
        self.read().clone()
    }
}

impl<E> Clone for Handle<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: fmt::Debug> fmt::Debug for Handle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&*self.read()).finish()
    }
}

/// How an entity type is created from, and merged with, its wire record.
pub trait Reconcile: Sized {
    /// Wire record this entity is built from.
    type Record;

    /// Name identifying the record within its group.
    fn key(record: &Self::Record) -> &str;

    /// Build a fresh entity with no overlay.
    fn create(record: Self::Record) -> Self;

    /// Copy the remote-owned fields in place, then clear the overlay if the
    /// record confirms it. Returns `true` when an overlay was cleared.
    fn merge(&mut self, record: Self::Record) -> bool;
}

impl Reconcile for ProcessEntity {
    type Record = ProcessRecord;

    fn key(record: &ProcessRecord) -> &str {
        &record.name
    }

    fn create(record: ProcessRecord) -> Self {
        ProcessEntity::from_record(record)
    }

    fn merge(&mut self, record: ProcessRecord) -> bool {
        let observed = record.status;
        self.absorb(record);
        match self.desired_status() {
            Some(desired) if desired.confirmed_by(observed) => {
                self.clear_desired_status();
                true
            }
            _ => false,
        }
    }
}

impl Reconcile for TaskEntity {
    type Record = TaskRecord;

    fn key(record: &TaskRecord) -> &str {
        &record.name
    }

    fn create(record: TaskRecord) -> Self {
        TaskEntity::from_record(record)
    }

    // A start produces a new instance, so a changed id is the confirmation;
    // the status alone cannot tell an old finished run from a new one.
    fn merge(&mut self, record: TaskRecord) -> bool {
        self.absorb(record);
        match self.pending_instance_id() {
            Some(previous) if previous != self.instance_id() => {
                self.clear_pending_instance();
                true
            }
            _ => false,
        }
    }
}

/// Outcome counts of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records seen for the first time.
    pub created: usize,
    /// Records merged into an existing entity.
    pub updated: usize,
    /// Overlays cleared by this merge.
    pub confirmed: usize,
}

/// Ordered, name-indexed collection of one entity type.
pub struct Group<E> {
    inner: RwLock<GroupInner<E>>,
}

struct GroupInner<E> {
    order: Vec<Handle<E>>,
    index: HashMap<String, usize>,
}

impl<E> Default for Group<E> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(GroupInner {
                order: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }
}

impl<E: Reconcile> Group<E> {
    fn read(&self) -> RwLockReadGuard<'_, GroupInner<E>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle to the entity named `name`.
    pub fn get(&self, name: &str) -> Option<Handle<E>> {
        let inner = self.read();
        inner.index.get(name).map(|&pos| inner.order[pos].clone())
    }

    /// Handles in first-seen order.
    pub fn all(&self) -> Vec<Handle<E>> {
        self.read().order.clone()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    /// True when no entity is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge records in order. Names absent from `records` are left alone.
    pub fn merge(&self, records: Vec<E::Record>) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            let existing = inner.index.get(E::key(&record)).copied();
            match existing {
                Some(pos) => {
                    report.updated += 1;
                    if inner.order[pos].write().merge(record) {
                        report.confirmed += 1;
                    }
                }
                None => {
                    let name = E::key(&record).to_owned();
                    let pos = inner.order.len();
                    inner.order.push(Handle::new(E::create(record)));
                    inner.index.insert(name, pos);
                    report.created += 1;
                }
            }
        }
        report
    }
}

/// Local mirror of every entity group.
#[derive(Default)]
pub struct EntityStore {
    processes: Group<ProcessEntity>,
    tasks: Group<TaskEntity>,
}

impl EntityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one group's snapshot into the mirror.
    pub fn apply_snapshot(&self, snapshot: Snapshot) -> ApplyReport {
        match snapshot {
            Snapshot::Processes(records) => self.processes.merge(records),
            Snapshot::Tasks(records) => self.tasks.merge(records),
        }
    }

    /// Handle to the process named `name`.
    pub fn process(&self, name: &str) -> Option<Handle<ProcessEntity>> {
        self.processes.get(name)
    }

    /// Handle to the task named `name`.
    pub fn task(&self, name: &str) -> Option<Handle<TaskEntity>> {
        self.tasks.get(name)
    }

    /// Every process, in first-seen order.
    pub fn processes(&self) -> Vec<Handle<ProcessEntity>> {
        self.processes.all()
    }

    /// Every task, in first-seen order.
    pub fn tasks(&self) -> Vec<Handle<TaskEntity>> {
        self.tasks.all()
    }

    /// Number of entities known in `group`.
    pub fn len(&self, group: GroupKey) -> usize {
        match group {
            GroupKey::Processes => self.processes.len(),
            GroupKey::Tasks => self.tasks.len(),
        }
    }

    /// True when no group has any entity.
    pub fn is_empty(&self) -> bool {
        GroupKey::ALL.iter().all(|&g| self.len(g) == 0)
    }
}
