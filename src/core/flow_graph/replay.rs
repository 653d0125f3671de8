use crate::core::flow_graph::graph::FlowGraph;
use crate::core::flow_graph::schema::NodeKind;
use crate::core::flow_graph::state::{ExecutionStatus, FlowExecution};
use serde::Serialize;
use uuid::Uuid;

/// One visited node rendered for visualization. Nodes deleted from the flow
/// since the execution ran are listed with `kind`/`name` absent.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStep {
    pub index: usize,
    pub node_id: String,
    pub kind: Option<NodeKind>,
    pub name: Option<String>,
}

/// An execution's path rendered against its flow graph.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReplay {
    pub execution_id: Uuid,
    pub flow_id: String,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub steps: Vec<ReplayStep>,
}

pub fn render_replay(execution: &FlowExecution, graph: &FlowGraph) -> ExecutionReplay {
    let steps = execution
        .execution_path
        .iter()
        .enumerate()
        .map(|(index, node_id)| {
            let node = graph.node(node_id);
            ReplayStep {
                index,
                node_id: node_id.clone(),
                kind: node.map(|n| n.kind),
                name: node.map(|n| n.name.clone()),
            }
        })
        .collect();
    ExecutionReplay {
        execution_id: execution.id,
        flow_id: execution.flow_id.clone(),
        status: execution.status,
        error_message: execution.error_message.clone(),
        steps,
    }
}
