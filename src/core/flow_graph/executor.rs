#![allow(clippy::result_large_err)] // Executor returns FlowError to preserve full diagnostic context; boxing would discard run-time state.

use crate::core::config::{ConfigValidator, EngineConfig};
use crate::core::error::FlowError;
use crate::core::flow_graph::graph::FlowGraph;
use crate::core::flow_graph::handler::{HandlerContext, HandlerRegistry};
use crate::core::flow_graph::replay::{render_replay, ExecutionReplay};
use crate::core::flow_graph::repository::{ExecutionRepository, FlowRepository};
use crate::core::flow_graph::sandbox::{DryRunExecutor, SandboxReport};
use crate::core::flow_graph::schema::Flow;
use crate::core::flow_graph::state::{
    apply_patch, redact_value, ExecutionStatus, FlowExecution, LAST_USER_INPUT_KEY,
};
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

struct EngineInner {
    flows: Arc<dyn FlowRepository>,
    executions: Arc<dyn ExecutionRepository>,
    registry: HandlerRegistry,
    config: EngineConfig,
    // Single-writer discipline: two run-loop iterations for the same
    // execution id must never run concurrently.
    locks: DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
}

/// Drives flow executions through their lifecycle: start, run-loop, pause on
/// input, resume, delay continuations, cancellation. One persisted checkpoint
/// per node step, written before the next node is dispatched, so the last
/// fully-applied step is always recoverable after a crash.
#[derive(Clone)]
pub struct FlowEngine {
    inner: Arc<EngineInner>,
}

impl FlowEngine {
    pub fn new(
        flows: Arc<dyn FlowRepository>,
        executions: Arc<dyn ExecutionRepository>,
        registry: HandlerRegistry,
        config: EngineConfig,
    ) -> Result<Self, FlowError> {
        ConfigValidator::validate(&config)?;
        Ok(FlowEngine {
            inner: Arc::new(EngineInner {
                flows,
                executions,
                registry,
                config,
                locks: DashMap::new(),
            }),
        })
    }

    /// Start a new execution of `flow_id` against a conversation/contact.
    ///
    /// Fails synchronously with `FlowNotFound` or `FlowInvalid` before any
    /// record is created. Once the execution exists, run-loop failures are
    /// recorded on the execution and never surface as an `Err` here.
    pub async fn start_execution(
        &self,
        flow_id: &str,
        conversation_id: &str,
        contact_id: &str,
        initial_context: Value,
    ) -> Result<FlowExecution, FlowError> {
        let flow = self.load_flow(flow_id).await?;
        let graph = Arc::new(FlowGraph::compile(&flow.graph)?);
        let execution = FlowExecution::new(
            flow.id.clone(),
            graph.fingerprint().to_string(),
            conversation_id.to_string(),
            contact_id.to_string(),
            graph.start_node().id.clone(),
            initial_context,
        );
        self.inner.executions.create(&execution).await?;
        info!(
            execution_id = %execution.id,
            flow_id = %flow.id,
            conversation_id,
            "flow execution started"
        );

        let lock = self.lock_for(execution.id);
        let _guard = lock.lock().await;
        self.drive(&flow, graph, execution).await
    }

    /// Resume a paused execution with the user's reply. Only legal while
    /// PAUSED; anything else is `InvalidState` and leaves the execution
    /// untouched.
    pub async fn resume_execution(
        &self,
        execution_id: Uuid,
        user_input: &str,
    ) -> Result<FlowExecution, FlowError> {
        let lock = self.lock_for(execution_id);
        let _guard = lock.lock().await;

        let mut execution = self.load_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Paused {
            return Err(FlowError::new(
                ErrorCategory::InvalidState,
                format!(
                    "cannot resume execution in state {}",
                    execution.status.as_str()
                ),
            )
            .with_code("FLW-EXEC-004"));
        }

        apply_patch(
            &mut execution.context,
            &json!({ LAST_USER_INPUT_KEY: user_input }),
        );
        execution.status = ExecutionStatus::Running;
        self.persist(&execution).await?;
        debug!(execution_id = %execution.id, "execution resumed");

        let (flow, graph) = self.load_pinned(&execution).await?;
        self.drive(&flow, graph, execution).await
    }

    /// Cancel an execution. Terminal executions are left unchanged, making
    /// cancellation idempotent. A handler that is mid-flight is not
    /// interrupted; the run loop observes the cancellation after the handler
    /// returns.
    pub async fn cancel_execution(&self, execution_id: Uuid) -> Result<FlowExecution, FlowError> {
        // Deliberately does not take the run lock: cancelling must not wait
        // behind a long-running handler.
        let mut execution = self.load_execution(execution_id).await?;
        if execution.status.is_terminal() {
            return Ok(execution);
        }
        execution.status = ExecutionStatus::Failed;
        execution.error_message = Some("Cancelled by user".to_string());
        execution.completed_at = Some(Utc::now());
        execution.resume_at = None;
        self.persist(&execution).await?;
        info!(execution_id = %execution.id, "execution cancelled");
        Ok(execution)
    }

    pub async fn get_execution(&self, execution_id: Uuid) -> Result<FlowExecution, FlowError> {
        self.load_execution(execution_id).await
    }

    /// Render an execution's visited path against its flow graph for
    /// visualization.
    pub async fn get_execution_replay(
        &self,
        execution_id: Uuid,
    ) -> Result<ExecutionReplay, FlowError> {
        let execution = self.load_execution(execution_id).await?;
        let flow = self.load_flow(&execution.flow_id).await?;
        let graph = FlowGraph::compile(&flow.graph)?;
        Ok(render_replay(&execution, &graph))
    }

    /// Side-effect-free dry run for authoring-time testing.
    pub async fn test_flow_execution(
        &self,
        flow_id: &str,
        test_data: Value,
    ) -> Result<SandboxReport, FlowError> {
        let flow = self.load_flow(flow_id).await?;
        let graph = FlowGraph::compile(&flow.graph)?;
        Ok(DryRunExecutor::new(self.inner.config.sandbox_max_iterations).run(&flow, &graph, test_data))
    }

    /// Re-enter executions whose delay continuation is due. The in-process
    /// timer path normally handles this; the sweep exists so delays survive a
    /// process restart. Returns the ids that were driven.
    pub async fn run_due_continuations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, FlowError> {
        let due = self.inner.executions.list_due(now).await?;
        let continuations = due.into_iter().map(|execution| {
            let engine = self.clone();
            async move {
                let id = execution.id;
                match engine.continue_execution(id).await {
                    Ok(_) => Some(id),
                    Err(e) => {
                        warn!(execution_id = %id, error = %e, "delay continuation failed");
                        None
                    }
                }
            }
        });
        Ok(join_all(continuations).await.into_iter().flatten().collect())
    }

    /// Re-enter the run loop for an execution previously parked by a delay
    /// node. A no-op unless the execution is still RUNNING.
    async fn continue_execution(&self, execution_id: Uuid) -> Result<FlowExecution, FlowError> {
        let lock = self.lock_for(execution_id);
        let _guard = lock.lock().await;

        let mut execution = self.load_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Running {
            return Ok(execution);
        }
        execution.resume_at = None;
        self.persist(&execution).await?;

        let (flow, graph) = self.load_pinned(&execution).await?;
        self.drive(&flow, graph, execution).await
    }

    /// The run loop. One iteration = one node: locate, dispatch, merge the
    /// context patch, transition, checkpoint. Must be called with the
    /// per-execution lock held.
    async fn drive(
        &self,
        flow: &Flow,
        graph: Arc<FlowGraph>,
        mut execution: FlowExecution,
    ) -> Result<FlowExecution, FlowError> {
        loop {
            let Some(current_id) = execution.current_node_id.clone() else {
                return self.complete(execution).await;
            };
            let Some(node) = graph.node(&current_id) else {
                return self
                    .fail(
                        execution,
                        format!("node {} not found in flow graph", current_id),
                    )
                    .await;
            };
            let Some(handler) = self.inner.registry.get(node.kind) else {
                return self
                    .fail(
                        execution,
                        format!("no handler registered for node type {}", node.kind),
                    )
                    .await;
            };

            debug!(
                execution_id = %execution.id,
                node_id = %node.id,
                kind = %node.kind,
                "dispatching node"
            );
            let ctx = HandlerContext {
                execution_id: execution.id,
                tenant_id: flow.tenant_id.clone(),
                conversation_id: execution.conversation_id.clone(),
                contact_id: execution.contact_id.clone(),
                node: node.clone(),
                graph: Arc::clone(&graph),
                context: execution.context.clone(),
            };
            let result = match handler.execute(ctx).await {
                Ok(result) => result,
                Err(e) => return self.fail(execution, e.message).await,
            };

            if let Some(patch) = &result.context_patch {
                apply_patch(&mut execution.context, patch);
            }

            // A cancel issued while the handler was running must win over
            // this iteration's forward transition.
            if let Some(persisted) = self.inner.executions.get(execution.id).await? {
                if persisted.status.is_terminal() {
                    debug!(execution_id = %execution.id, "terminal state observed mid-step");
                    return Ok(persisted);
                }
            }

            if result.wait_for_input {
                execution.status = ExecutionStatus::Paused;
                execution.resume_at = None;
                self.persist(&execution).await?;
                debug!(execution_id = %execution.id, node_id = %current_id, "execution paused for input");
                return Ok(execution);
            }

            let Some(next) = result.next_node_id else {
                return self.complete(execution).await;
            };
            execution.current_node_id = Some(next.clone());
            execution.execution_path.push(next);

            if let Some(delay) = result.resume_after {
                execution.resume_at =
                    Some(Utc::now() + chrono::Duration::seconds(delay.as_secs() as i64));
                self.persist(&execution).await?;
                self.schedule_continuation(execution.id, delay);
                debug!(
                    execution_id = %execution.id,
                    delay_seconds = delay.as_secs(),
                    "execution parked on delay"
                );
                return Ok(execution);
            }

            execution.resume_at = None;
            // Checkpoint before the next node is dispatched.
            self.persist(&execution).await?;
        }
    }

    async fn complete(&self, mut execution: FlowExecution) -> Result<FlowExecution, FlowError> {
        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        execution.resume_at = None;
        self.persist(&execution).await?;
        info!(execution_id = %execution.id, "flow execution completed");
        Ok(execution)
    }

    async fn fail(
        &self,
        mut execution: FlowExecution,
        message: String,
    ) -> Result<FlowExecution, FlowError> {
        error!(execution_id = %execution.id, %message, "flow execution failed");
        execution.status = ExecutionStatus::Failed;
        execution.error_message = Some(message);
        execution.completed_at = Some(Utc::now());
        execution.resume_at = None;
        self.persist(&execution).await?;
        Ok(execution)
    }

    fn schedule_continuation(&self, execution_id: Uuid, delay: Duration) {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = engine.continue_execution(execution_id).await {
                warn!(execution_id = %execution_id, error = %e, "scheduled continuation failed");
            }
        });
    }

    fn lock_for(&self, execution_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .locks
            .entry(execution_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn persist(&self, execution: &FlowExecution) -> Result<(), FlowError> {
        let mut checkpoint = execution.clone();
        redact_value(&mut checkpoint.context, &self.inner.config.redact_keys);
        self.inner.executions.update(&checkpoint).await
    }

    async fn load_flow(&self, flow_id: &str) -> Result<Flow, FlowError> {
        self.inner.flows.get_flow(flow_id).await?.ok_or_else(|| {
            FlowError::new(
                ErrorCategory::FlowNotFound,
                format!("flow {} not found", flow_id),
            )
            .with_code("FLW-EXEC-005")
        })
    }

    async fn load_execution(&self, execution_id: Uuid) -> Result<FlowExecution, FlowError> {
        self.inner
            .executions
            .get(execution_id)
            .await?
            .ok_or_else(|| {
                FlowError::new(
                    ErrorCategory::ExecutionNotFound,
                    format!("execution {} not found", execution_id),
                )
                .with_code("FLW-EXEC-006")
            })
    }

    async fn load_pinned(
        &self,
        execution: &FlowExecution,
    ) -> Result<(Flow, Arc<FlowGraph>), FlowError> {
        let flow = self.load_flow(&execution.flow_id).await?;
        let graph = Arc::new(FlowGraph::compile(&flow.graph)?);
        if graph.fingerprint() != execution.flow_fingerprint {
            warn!(
                execution_id = %execution.id,
                flow_id = %flow.id,
                "flow graph changed since this execution started; continuing against the live graph"
            );
        }
        Ok((flow, graph))
    }
}
