use crate::core::error::FlowError;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::schema::NodeKind;
use async_trait::async_trait;

/// Terminal node: the run loop completes the execution.
pub struct EndHandler;

#[async_trait]
impl NodeHandler for EndHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::End
    }

    async fn execute(&self, _ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        Ok(NodeResult::complete())
    }
}
