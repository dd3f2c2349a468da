// Import graph projection from a code graph.
//
// Keeps only `imports` edges, as a petgraph `DiGraph` with id ↔ index
// mapping. Every code-graph node is present so the cycle search covers
// disconnected components; dangling targets are added as leaves.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Control, DfsEvent, depth_first_search};

use crate::types::{CodeGraph, EdgeKind};

/// Module-level import graph.
#[derive(Debug)]
pub struct ImportGraph {
    pub graph: DiGraph<String, ()>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl ImportGraph {
    /// Project the `imports` edges of `code`.
    pub fn from_code_graph(code: &CodeGraph) -> Self {
        let mut graph = DiGraph::<String, ()>::with_capacity(code.node_count(), code.edge_count());
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::with_capacity(code.node_count());

        for id in code.nodes.keys() {
            let idx = graph.add_node(id.clone());
            id_to_index.insert(id.clone(), idx);
        }

        for edge in code.edges_of_kind(EdgeKind::Imports) {
            let src = intern(&mut graph, &mut id_to_index, &edge.source);
            let tgt = intern(&mut graph, &mut id_to_index, &edge.target);
            graph.add_edge(src, tgt, ());
        }

        Self { graph, id_to_index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// First import edge found that closes a cycle, as `(from, to)` ids.
    ///
    /// Depth-first search restarted from every unvisited node; an edge into
    /// a node still on the active stack is a back edge and therefore closes
    /// a cycle. Self-imports count. O(V + E).
    pub fn find_back_edge(&self) -> Option<(String, String)> {
        let found = depth_first_search(&self.graph, self.graph.node_indices(), |event| {
            if let DfsEvent::BackEdge(u, v) = event {
                return Control::Break((u, v));
            }
            Control::Continue
        });
        found
            .break_value()
            .map(|(u, v)| (self.graph[u].clone(), self.graph[v].clone()))
    }

    pub fn has_cycle(&self) -> bool {
        self.find_back_edge().is_some()
    }
}

fn intern(
    graph: &mut DiGraph<String, ()>,
    id_to_index: &mut HashMap<String, NodeIndex>,
    id: &str,
) -> NodeIndex {
    if let Some(&idx) = id_to_index.get(id) {
        return idx;
    }
    let idx = graph.add_node(id.to_string());
    id_to_index.insert(id.to_string(), idx);
    idx
}
