// Graph rewrites.
//
// A `Transformation` pairs descriptive fields with a `Rewrite`, a pure
// `&CodeGraph -> CodeGraph` function. Rewrites never mutate their input and
// never fail: a rewrite whose targets are absent returns an equal graph.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use atlas_graphs::{CodeGraph, GraphNode, Metadata, NodeKind, module_node_id};
use serde::{Deserialize, Serialize};

use crate::contracts::metadata_keys;

/// A pure rewrite of a whole code graph.
pub trait Rewrite: Send + Sync + fmt::Debug {
    fn apply(&self, graph: &CodeGraph) -> CodeGraph;
}

/// A named, shareable rewrite. Cloning shares the rewrite.
#[derive(Clone, Serialize)]
pub struct Transformation {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    rewrite: Arc<dyn Rewrite>,
}

impl Transformation {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        rewrite: impl Rewrite + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            rewrite: Arc::new(rewrite),
        }
    }

    pub fn apply(&self, graph: &CodeGraph) -> CodeGraph {
        self.rewrite.apply(graph)
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rewrite", &self.rewrite)
            .finish_non_exhaustive()
    }
}

fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn stamp(metadata: &mut Metadata, key: &str) {
    metadata.insert(key.to_string(), serde_json::Value::Bool(true));
}

// ── Rename ─────────────────────────────────────────────────────────

/// Replace the display name of one node. Name collisions are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub target: String,
    pub new_name: String,
}

impl Rewrite for Rename {
    fn apply(&self, graph: &CodeGraph) -> CodeGraph {
        let mut out = graph.clone();
        if let Some(node) = out.nodes.get_mut(&self.target) {
            node.name.clone_from(&self.new_name);
        }
        out
    }
}

pub fn rename(target: &str, new_name: &str) -> Transformation {
    Transformation::new(
        format!("rename-{}", unique_suffix()),
        format!("Rename {target}"),
        format!("Renames node {target} to {new_name}"),
        Rename {
            target: target.to_string(),
            new_name: new_name.to_string(),
        },
    )
}

// ── Move ───────────────────────────────────────────────────────────

/// Reassign one node's owning module. Edges are not re-pointed; every edge
/// touching the id is marked `moved`, even when no node carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub target: String,
    pub new_module_path: String,
}

impl Rewrite for Move {
    fn apply(&self, graph: &CodeGraph) -> CodeGraph {
        let mut out = graph.clone();
        if let Some(node) = out.nodes.get_mut(&self.target) {
            node.module_path.clone_from(&self.new_module_path);
        }
        for edge in out.edges.iter_mut().filter(|e| e.touches(&self.target)) {
            stamp(&mut edge.metadata, metadata_keys::MOVED);
        }
        out
    }
}

pub fn move_node(target: &str, new_module_path: &str) -> Transformation {
    Transformation::new(
        format!("move-{}", unique_suffix()),
        format!("Move {target}"),
        format!("Moves node {target} to {new_module_path}"),
        Move {
            target: target.to_string(),
            new_module_path: new_module_path.to_string(),
        },
    )
}

// ── ExtractModule ──────────────────────────────────────────────────

/// Synthesise a module at `path` and reassign every target to it.
///
/// Always adds exactly one node. If `module:<path>` is already taken the new
/// node gets the first free `module:<path>#<n>` id, n starting at 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractModule {
    pub targets: Vec<String>,
    pub path: String,
    pub name: String,
}

impl ExtractModule {
    fn fresh_module_id(&self, graph: &CodeGraph) -> String {
        let base = module_node_id(&self.path);
        if !graph.contains_node(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}#{n}"))
            .find(|id| !graph.contains_node(id))
            .unwrap_or(base)
    }
}

impl Rewrite for ExtractModule {
    fn apply(&self, graph: &CodeGraph) -> CodeGraph {
        let targets: HashSet<&str> = self.targets.iter().map(String::as_str).collect();
        let mut out = graph.clone();

        for node in out.nodes.values_mut() {
            if targets.contains(node.id.as_str()) {
                node.module_path.clone_from(&self.path);
            }
        }
        for edge in &mut out.edges {
            if targets.contains(edge.source.as_str()) || targets.contains(edge.target.as_str()) {
                stamp(&mut edge.metadata, metadata_keys::EXTRACTED);
            }
        }

        let mut metadata = Metadata::new();
        stamp(&mut metadata, metadata_keys::SYNTHESIZED);
        out.insert_node(GraphNode {
            id: self.fresh_module_id(graph),
            kind: NodeKind::Module,
            name: self.name.clone(),
            module_path: self.path.clone(),
            start_line: 1,
            end_line: 1,
            metadata,
        });
        out
    }
}

pub fn extract_module(targets: Vec<String>, path: &str, name: &str) -> Transformation {
    Transformation::new(
        format!("extract-module-{}", unique_suffix()),
        format!("Extract Module {name}"),
        format!("Extracts {} node(s) into new module {path}", targets.len()),
        ExtractModule {
            targets,
            path: path.to_string(),
            name: name.to_string(),
        },
    )
}
