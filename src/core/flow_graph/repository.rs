#![allow(clippy::result_large_err)] // Repository traits return FlowError for consistent diagnostics.

use crate::core::error::FlowError;
use crate::core::flow_graph::schema::Flow;
use crate::core::flow_graph::state::FlowExecution;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read access to stored flow definitions.
#[async_trait]
pub trait FlowRepository: Send + Sync + 'static {
    async fn get_flow(&self, id: &str) -> Result<Option<Flow>, FlowError>;

    /// Active flows for a tenant in stable storage order. Trigger matching
    /// relies on this order for its first-match-wins semantics.
    async fn list_active_flows(&self, tenant_id: &str) -> Result<Vec<Flow>, FlowError>;
}

/// Persistence for execution records. Every write must be an atomic
/// single-record operation; the executor checkpoints through `update` after
/// each node step.
#[async_trait]
pub trait ExecutionRepository: Send + Sync + 'static {
    async fn create(&self, execution: &FlowExecution) -> Result<(), FlowError>;

    async fn get(&self, id: Uuid) -> Result<Option<FlowExecution>, FlowError>;

    async fn update(&self, execution: &FlowExecution) -> Result<(), FlowError>;

    /// Running executions whose `resume_at` is at or before `now`. Used by
    /// the delay-recovery sweep after a process restart.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<FlowExecution>, FlowError>;
}
