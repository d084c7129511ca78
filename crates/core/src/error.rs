//! Errors raised by the core crate.

use thiserror::Error;

use crate::model::GroupKey;

/// Errors raised while decoding server payloads.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The body lacks the group's envelope key.
    #[error("snapshot body has no `{0}` key")]
    MissingGroup(GroupKey),
    /// A record could not be decoded.
    #[error("malformed {group} record: {source}")]
    Decode {
        /// Group being decoded.
        group: GroupKey,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}
