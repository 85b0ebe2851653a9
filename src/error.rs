//! Error types for pipeline runs
//!
//! Errors are classified by recoverability:
//! - Retryable: store backend failures, dispatch timeouts
//! - NonRetryable: validation failures, illegal state transitions
//!
//! Per-uid failures during fan-out never surface here; they are logged,
//! counted in the run summary, and the batch continues.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::CaseStatus;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error("Cannot run danger check from state '{from}'")]
    InvalidTransition { from: CaseStatus },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Returns true if retrying the run may succeed without operator
    /// intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Store(StoreError::Backend(_)))
    }
}
