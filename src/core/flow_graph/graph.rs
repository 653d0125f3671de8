#![allow(clippy::result_large_err)] // Graph compilation returns FlowError to preserve the full list of validation findings.

use crate::core::error::FlowError;
use crate::core::flow_graph::schema::{Edge, FlowGraphDef, Node, NodeKind};
use crate::core::types::ErrorCategory;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Edge handle treated as the fallback branch when no explicit handle matched.
pub const DEFAULT_HANDLE: &str = "default";

/// Findings produced by [`validate_graph`]. Blocking findings prevent an
/// execution from starting; lint findings are surfaced to authors only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("flow graph has no start node")]
    MissingStart,
    #[error("flow graph has {0} start nodes, expected exactly one")]
    MultipleStart(usize),
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("edge {edge_id} references unknown node {node_id}")]
    DanglingEdge { edge_id: String, node_id: String },
    #[error("node {0} is not reachable from the start node")]
    UnreachableNode(String),
}

impl GraphError {
    /// Unreachable nodes are kept as a lint to match historical behavior;
    /// everything else blocks execution start.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, GraphError::UnreachableNode(_))
    }
}

/// Validated, index-backed view over a flow's nodes and edges.
pub struct FlowGraph {
    graph: StableDiGraph<Node, Edge>,
    indices: HashMap<String, NodeIndex>,
    start_id: String,
    fingerprint: String,
}

impl FlowGraph {
    /// Compile a raw graph definition. Fails with `FlowInvalid` when any
    /// blocking validation finding is present.
    pub fn compile(def: &FlowGraphDef) -> Result<FlowGraph, FlowError> {
        let findings = validate_graph(def);
        let blocking: Vec<&GraphError> = findings.iter().filter(|f| f.is_blocking()).collect();
        if !blocking.is_empty() {
            let summary = blocking
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(
                FlowError::new(ErrorCategory::FlowInvalid, summary).with_code("FLW-VAL-001")
            );
        }

        let mut graph = StableDiGraph::new();
        let mut indices = HashMap::new();
        for node in &def.nodes {
            let index = graph.add_node(node.clone());
            indices.insert(node.id.clone(), index);
        }
        for edge in &def.edges {
            let source = indices[&edge.source];
            let target = indices[&edge.target];
            graph.add_edge(source, target, edge.clone());
        }
        let start_id = def
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Start)
            .map(|n| n.id.clone())
            .expect("validated graph has a start node");

        Ok(FlowGraph {
            graph,
            indices,
            start_id,
            fingerprint: fingerprint_of(def)?,
        })
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.indices.get(id).map(|index| &self.graph[*index])
    }

    pub fn start_node(&self) -> &Node {
        self.node(&self.start_id)
            .expect("start node present in compiled graph")
    }

    /// All edges leaving `source_id`, in insertion order.
    pub fn outgoing(&self, source_id: &str) -> Vec<&Edge> {
        let Some(index) = self.indices.get(source_id) else {
            return Vec::new();
        };
        // petgraph yields most-recently-added first; authors expect declaration order.
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(*index, petgraph::Direction::Outgoing)
            .map(|e| (e.id(), e.weight()))
            .collect();
        edges.sort_by_key(|(index, _)| *index);
        edges.into_iter().map(|(_, edge)| edge).collect()
    }

    /// Resolve the edge a node should follow.
    ///
    /// With `handle = None` an untagged edge wins, falling back to an edge
    /// tagged `default`. With an explicit handle the tagged edge wins; the
    /// handle `default` additionally matches an untagged edge.
    pub fn edge_for_handle(&self, source_id: &str, handle: Option<&str>) -> Option<&Edge> {
        let edges = self.outgoing(source_id);
        match handle {
            None => edges
                .iter()
                .find(|e| e.source_handle.is_none())
                .or_else(|| {
                    edges
                        .iter()
                        .find(|e| e.source_handle.as_deref() == Some(DEFAULT_HANDLE))
                })
                .copied(),
            Some(handle) => edges
                .iter()
                .find(|e| e.source_handle.as_deref() == Some(handle))
                .or_else(|| {
                    if handle == DEFAULT_HANDLE {
                        edges.iter().find(|e| e.source_handle.is_none())
                    } else {
                        None
                    }
                })
                .copied(),
        }
    }

    /// Target node id of the edge this node follows by default, if any.
    pub fn default_target(&self, source_id: &str) -> Option<String> {
        self.edge_for_handle(source_id, None)
            .map(|e| e.target.clone())
    }

    /// SHA-256 of the canonical graph JSON; executions pin this at start so a
    /// later flow edit is detectable on resume.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

/// Run all structural checks over a raw graph definition, returning every
/// finding rather than stopping at the first.
pub fn validate_graph(def: &FlowGraphDef) -> Vec<GraphError> {
    let mut findings = Vec::new();

    let mut seen = HashMap::new();
    for node in &def.nodes {
        if seen.insert(node.id.clone(), ()).is_some() {
            findings.push(GraphError::DuplicateNodeId(node.id.clone()));
        }
    }

    let start_count = def.nodes.iter().filter(|n| n.kind == NodeKind::Start).count();
    match start_count {
        0 => findings.push(GraphError::MissingStart),
        1 => {}
        n => findings.push(GraphError::MultipleStart(n)),
    }

    for edge in &def.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen.contains_key(endpoint) {
                findings.push(GraphError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    // Reachability lint only runs on an otherwise well-formed graph.
    if findings.is_empty() {
        let mut graph: StableDiGraph<&str, ()> = StableDiGraph::new();
        let mut indices = HashMap::new();
        for node in &def.nodes {
            indices.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
        }
        for edge in &def.edges {
            graph.add_edge(indices[edge.source.as_str()], indices[edge.target.as_str()], ());
        }
        let start = def
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Start)
            .expect("start presence checked above");
        let mut reached = HashMap::new();
        let mut dfs = Dfs::new(&graph, indices[start.id.as_str()]);
        while let Some(index) = dfs.next(&graph) {
            reached.insert(graph[index], ());
        }
        for node in &def.nodes {
            if !reached.contains_key(node.id.as_str()) {
                findings.push(GraphError::UnreachableNode(node.id.clone()));
            }
        }
    }

    findings
}

fn fingerprint_of(def: &FlowGraphDef) -> Result<String, FlowError> {
    let bytes = serde_json::to_vec(def)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
