//! Notification gateway port.
//!
//! Real transport (push, SMS, national-app integration) is out of
//! scope; the default gateway simulates delivery and always succeeds.
//! Delivery failure is data, not an error: the gateway reports an
//! outcome and the orchestrator records it on the alert.

use async_trait::async_trait;

use crate::types::Severity;

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub case_id: String,
    pub target: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    /// Transport detail for failed dispatches.
    pub detail: Option<String>,
}

impl DispatchOutcome {
    pub fn sent() -> Self {
        DispatchOutcome {
            status: DispatchStatus::Sent,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        DispatchOutcome {
            status: DispatchStatus::Failed,
            detail: Some(detail.into()),
        }
    }
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome;
}

/// Stand-in for the national notification API: logs the dispatch and
/// reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGateway;

#[async_trait]
impl NotificationGateway for SimulatedGateway {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        log::info!(
            "Dispatched {} notification for case {} to {}",
            request.severity,
            request.case_id,
            request.target
        );
        DispatchOutcome::sent()
    }
}
