//! Named failure taxonomy for the freeze/unfreeze workflow.
//!
//! Every variant is fatal for the run. Callers propagate these through
//! `anyhow::Error` and can recover the variant with `downcast_ref`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrgUserError {
    /// The `sf` process could not be started, timed out, or could not
    /// authenticate against the org.
    #[error("remote org unavailable: {0}")]
    RemoteUnavailable(String),

    /// The org compiled or ran the snippet and reported a fault.
    #[error("remote execution failed: {0}")]
    RemoteExecutionFailed(String),

    /// Sentinel markers were missing or the payload did not decode.
    #[error("malformed execution log: {0}")]
    MalformedLog(String),

    #[error("invalid filter: {0}")]
    FilterConstruction(String),
}
