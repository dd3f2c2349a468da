//! Graph extraction engine for AtlasShift.
//!
//! [`GraphBuilder`] turns a batch of [`SourceModule`]s into a [`CodeGraph`]
//! using the heuristic extractors registered in [`ExtractorRegistry`].
//! [`import_graph::ImportGraph`] projects the `imports` edges for cycle search.

pub mod builder;
pub mod import_graph;
pub mod languages;
pub mod types;

pub use builder::GraphBuilder;
pub use languages::{Extractor, ExtractorRegistry};
pub use types::{
    CodeGraph, EdgeKind, GraphEdge, GraphNode, Metadata, NodeKind, SourceModule, module_node_id,
};

/// Error type for the graph engine.
///
/// Extraction itself never fails; errors only arise when decoding a graph
/// handed over by a collaborator.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Graph decode error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
