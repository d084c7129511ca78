#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and reconciliation logic for the automator mirror.
//!
//! This crate performs no I/O. Entity operations apply their optimistic half
//! locally and hand back the request body the caller must send; snapshots
//! fetched by the caller are merged through [`store::EntityStore`].

pub mod api;
pub mod display;
pub mod entity;
pub mod error;
pub mod model;
pub mod store;

pub use entity::{ProcessEntity, TaskEntity};
pub use error::CoreError;
pub use model::{
    DesiredStatus, GroupKey, ProcessRecord, ProcessStatus, RefreshMode, Snapshot, TaskRecord,
    TaskStatus,
};
pub use store::{ApplyReport, EntityStore, Handle};
