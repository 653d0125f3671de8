use crate::core::error::FlowError;
use crate::core::flow_graph::handler::{HandlerContext, NodeHandler, NodeResult};
use crate::core::flow_graph::schema::NodeKind;
use async_trait::async_trait;

/// Entry node: no side effect, transitions along its single outgoing edge.
pub struct StartHandler;

#[async_trait]
impl NodeHandler for StartHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Start
    }

    async fn execute(&self, ctx: HandlerContext) -> Result<NodeResult, FlowError> {
        Ok(NodeResult::maybe_next(ctx.default_target()))
    }
}
