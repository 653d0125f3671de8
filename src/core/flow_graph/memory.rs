//! In-memory repository and collaborator implementations. These back the
//! test suite and small single-process deployments; production embeds the
//! engine against real storage and messaging adapters.

#![allow(clippy::result_large_err)]

use crate::core::error::FlowError;
use crate::core::flow_graph::collaborators::{
    ContactService, ConversationService, HttpClient, MessageId, MessagingService,
    OutboundRequest, OutboundResponse,
};
use crate::core::flow_graph::repository::{ExecutionRepository, FlowRepository};
use crate::core::flow_graph::schema::{Flow, FlowStatus};
use crate::core::flow_graph::state::FlowExecution;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Flow storage preserving insertion order, which doubles as the stable
/// order trigger matching iterates in.
#[derive(Default)]
pub struct InMemoryFlowRepository {
    flows: RwLock<IndexMap<String, Flow>>,
}

impl InMemoryFlowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, flow: Flow) {
        self.flows.write().unwrap().insert(flow.id.clone(), flow);
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowRepository {
    async fn get_flow(&self, id: &str) -> Result<Option<Flow>, FlowError> {
        Ok(self.flows.read().unwrap().get(id).cloned())
    }

    async fn list_active_flows(&self, tenant_id: &str) -> Result<Vec<Flow>, FlowError> {
        Ok(self
            .flows
            .read()
            .unwrap()
            .values()
            .filter(|flow| flow.tenant_id == tenant_id && flow.status == FlowStatus::Active)
            .cloned()
            .collect())
    }
}

/// Execution storage with atomic single-record writes.
#[derive(Default)]
pub struct InMemoryExecutionRepository {
    executions: DashMap<Uuid, FlowExecution>,
    update_count: AtomicUsize,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update` calls observed. Tests use this to assert the
    /// executor checkpoints after every node step.
    pub fn updates(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn create(&self, execution: &FlowExecution) -> Result<(), FlowError> {
        if self.executions.contains_key(&execution.id) {
            return Err(FlowError::new(
                ErrorCategory::InternalError,
                format!("execution {} already exists", execution.id),
            )
            .with_code("FLW-REPO-001"));
        }
        self.executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FlowExecution>, FlowError> {
        Ok(self.executions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, execution: &FlowExecution) -> Result<(), FlowError> {
        if !self.executions.contains_key(&execution.id) {
            return Err(FlowError::new(
                ErrorCategory::ExecutionNotFound,
                format!("execution {} not found", execution.id),
            )
            .with_code("FLW-REPO-002"));
        }
        self.executions.insert(execution.id, execution.clone());
        self.update_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<FlowExecution>, FlowError> {
        Ok(self
            .executions
            .iter()
            .filter(|entry| {
                !entry.status.is_terminal()
                    && entry.resume_at.map(|at| at <= now).unwrap_or(false)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Messaging collaborator that records what would have been sent.
#[derive(Default)]
pub struct RecordingMessagingService {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessagingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingService for RecordingMessagingService {
    async fn send_outbound_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<MessageId, FlowError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((conversation_id.to_string(), text.to_string()));
        Ok(MessageId(format!("msg-{}", sent.len())))
    }
}

/// Contact collaborator recording every mutation.
#[derive(Default)]
pub struct RecordingContactService {
    updates: Mutex<Vec<(String, String, Map<String, Value>)>>,
    pub fail_next: AtomicUsize,
}

impl RecordingContactService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContactService for RecordingContactService {
    async fn update_contact(
        &self,
        tenant_id: &str,
        contact_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), FlowError> {
        if self.fail_next.load(Ordering::SeqCst) > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(FlowError::new(
                ErrorCategory::InternalError,
                "contact service unavailable",
            ));
        }
        self.updates.lock().unwrap().push((
            tenant_id.to_string(),
            contact_id.to_string(),
            fields.clone(),
        ));
        Ok(())
    }
}

/// Conversation collaborator recording assignments and tags.
#[derive(Default)]
pub struct RecordingConversationService {
    assignments: Mutex<Vec<(String, String, String)>>,
    tags: Mutex<Vec<(String, String, String)>>,
}

impl RecordingConversationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignments(&self) -> Vec<(String, String, String)> {
        self.assignments.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<(String, String, String)> {
        self.tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationService for RecordingConversationService {
    async fn assign_conversation(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        agent_id: &str,
    ) -> Result<(), FlowError> {
        self.assignments.lock().unwrap().push((
            tenant_id.to_string(),
            conversation_id.to_string(),
            agent_id.to_string(),
        ));
        Ok(())
    }

    async fn add_tag(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        tag: &str,
    ) -> Result<(), FlowError> {
        self.tags.lock().unwrap().push((
            tenant_id.to_string(),
            conversation_id.to_string(),
            tag.to_string(),
        ));
        Ok(())
    }
}

/// HTTP collaborator replaying a scripted queue of outcomes.
#[derive(Default)]
pub struct ScriptedHttpClient {
    outcomes: Mutex<VecDeque<Result<OutboundResponse, String>>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: Value) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Ok(OutboundResponse { status, body }));
    }

    pub fn push_transport_error(&self, message: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: OutboundRequest) -> Result<OutboundResponse, FlowError> {
        self.requests.lock().unwrap().push(request);
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => {
                Err(FlowError::new(ErrorCategory::HttpError, message).with_code("FLW-HTTP-002"))
            }
            None => Ok(OutboundResponse {
                status: 200,
                body: Value::Null,
            }),
        }
    }
}
