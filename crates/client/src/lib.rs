#![forbid(unsafe_code)]

//! Async shell around `automator-core`: HTTP transport, the mirror that
//! applies optimistic mutations and fetched snapshots, and the refresh
//! scheduler.

pub mod config;
pub mod error;
pub mod mirror;
pub mod scheduler;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ConfigError, MirrorError, TransportError};
pub use mirror::{Mirror, RefreshSummary};
pub use scheduler::RefreshScheduler;
pub use transport::{HttpTransport, Transport};
