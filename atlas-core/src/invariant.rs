// Invariant mining and validation.
//
// Invariants are a closed set of rule kinds; each kind maps to a pure
// evaluation function. Mining depends only on configuration, never on the
// graph's content, so re-mining always yields the same set.
#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;

use atlas_graphs::import_graph::ImportGraph;
use atlas_graphs::{CodeGraph, EdgeKind, NodeKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InvariantSection;
use crate::contracts::invariant_ids;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantClass {
    Structural,
    Dependency,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// The rule an invariant checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum InvariantKind {
    /// Every module node has a non-empty path.
    ModulePathsPresent,
    /// Fewer than `max_ratio` of all nodes are touched by no edge.
    NoOrphans { max_ratio: f64 },
    /// No cycle among `imports` edges.
    NoCircularImports,
    /// Every `imports` edge targets a node in the graph.
    ImportsResolve,
    /// Fewer than `max_unused_ratio` of functions lack an incoming `calls`
    /// edge. Holds trivially when there are no functions.
    FunctionsUsed { max_unused_ratio: f64 },
}

impl InvariantKind {
    /// Evaluate the rule. `None` means it holds; `Some` carries a short
    /// description of what failed.
    pub fn check(&self, graph: &CodeGraph) -> Option<String> {
        match *self {
            Self::ModulePathsPresent => check_module_paths(graph),
            Self::NoOrphans { max_ratio } => check_orphans(graph, max_ratio),
            Self::NoCircularImports => check_import_cycles(graph),
            Self::ImportsResolve => check_imports_resolve(graph),
            Self::FunctionsUsed { max_unused_ratio } => check_functions_used(graph, max_unused_ratio),
        }
    }

    pub fn holds(&self, graph: &CodeGraph) -> bool {
        self.check(graph).is_none()
    }
}

/// A named, severity-tagged rule over a code graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub id: String,
    pub class: InvariantClass,
    pub description: String,
    pub severity: Severity,
    pub kind: InvariantKind,
}

impl Invariant {
    fn new(
        id: &str,
        class: InvariantClass,
        description: &str,
        severity: Severity,
        kind: InvariantKind,
    ) -> Self {
        Self {
            id: id.to_string(),
            class,
            description: description.to_string(),
            severity,
            kind,
        }
    }

    pub fn holds(&self, graph: &CodeGraph) -> bool {
        self.kind.holds(graph)
    }
}

/// A failed invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub invariant: Invariant,
    pub message: String,
}

/// Outcome of [`validate`]. `valid` is false iff an error-severity
/// invariant failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.invariant.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.invariant.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Derives the invariant set for a graph.
#[derive(Debug, Clone, Default)]
pub struct InvariantMiner {
    thresholds: InvariantSection,
}

impl InvariantMiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: InvariantSection) -> Self {
        Self { thresholds }
    }

    /// The fixed invariant set: structural, then dependency, then semantic.
    pub fn mine(&self, _graph: &CodeGraph) -> Vec<Invariant> {
        vec![
            Invariant::new(
                invariant_ids::FILE_EXISTS,
                InvariantClass::Structural,
                "All module nodes must have valid paths",
                Severity::Error,
                InvariantKind::ModulePathsPresent,
            ),
            Invariant::new(
                invariant_ids::NO_ORPHANS,
                InvariantClass::Structural,
                "No orphaned nodes (all nodes should be connected)",
                Severity::Warning,
                InvariantKind::NoOrphans {
                    max_ratio: self.thresholds.max_orphan_ratio,
                },
            ),
            Invariant::new(
                invariant_ids::NO_CIRCULAR_IMPORTS,
                InvariantClass::Dependency,
                "No circular import dependencies",
                Severity::Error,
                InvariantKind::NoCircularImports,
            ),
            Invariant::new(
                invariant_ids::IMPORTS_RESOLVE,
                InvariantClass::Dependency,
                "All import targets must exist in the graph",
                Severity::Error,
                InvariantKind::ImportsResolve,
            ),
            Invariant::new(
                invariant_ids::FUNCTIONS_USED,
                InvariantClass::Semantic,
                "Functions should have call edges",
                Severity::Warning,
                InvariantKind::FunctionsUsed {
                    max_unused_ratio: self.thresholds.max_unused_function_ratio,
                },
            ),
        ]
    }
}

/// Evaluate every invariant against `graph`, collecting all failures.
pub fn validate(graph: &CodeGraph, invariants: &[Invariant]) -> ValidationReport {
    let violations: Vec<Violation> = invariants
        .iter()
        .filter_map(|inv| {
            inv.kind.check(graph).map(|detail| Violation {
                message: format!(
                    "Invariant {} violated: {} ({detail})",
                    inv.id, inv.description
                ),
                invariant: inv.clone(),
            })
        })
        .collect();

    let valid = !violations
        .iter()
        .any(|v| v.invariant.severity == Severity::Error);
    debug!(
        invariants = invariants.len(),
        violations = violations.len(),
        valid,
        "Validated graph"
    );

    ValidationReport { valid, violations }
}

// ── Rule evaluation ────────────────────────────────────────────────

fn check_module_paths(graph: &CodeGraph) -> Option<String> {
    let empty = graph
        .nodes_of_kind(NodeKind::Module)
        .filter(|n| n.module_path.is_empty())
        .count();
    (empty > 0).then(|| format!("{empty} module node(s) without a path"))
}

fn check_orphans(graph: &CodeGraph, max_ratio: f64) -> Option<String> {
    let total = graph.node_count();
    if total == 0 {
        return None;
    }
    let touched: HashSet<&str> = graph
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();
    let orphans = graph
        .nodes
        .keys()
        .filter(|id| !touched.contains(id.as_str()))
        .count();
    ((orphans as f64) >= max_ratio * total as f64)
        .then(|| format!("{orphans} of {total} nodes are orphaned"))
}

fn check_import_cycles(graph: &CodeGraph) -> Option<String> {
    ImportGraph::from_code_graph(graph)
        .find_back_edge()
        .map(|(from, to)| format!("import cycle closes at {from} -> {to}"))
}

fn check_imports_resolve(graph: &CodeGraph) -> Option<String> {
    let dangling: Vec<&str> = graph
        .edges_of_kind(EdgeKind::Imports)
        .filter(|e| !graph.contains_node(&e.target))
        .map(|e| e.target.as_str())
        .collect();
    match dangling.first() {
        None => None,
        Some(first) => Some(format!(
            "{} import(s) with missing targets, first: {first}",
            dangling.len()
        )),
    }
}

fn check_functions_used(graph: &CodeGraph, max_unused_ratio: f64) -> Option<String> {
    let functions: Vec<&str> = graph
        .nodes_of_kind(NodeKind::Function)
        .map(|n| n.id.as_str())
        .collect();
    if functions.is_empty() {
        return None;
    }
    let called: HashSet<&str> = graph
        .edges_of_kind(EdgeKind::Calls)
        .map(|e| e.target.as_str())
        .collect();
    let uncalled = functions.iter().filter(|id| !called.contains(*id)).count();
    ((uncalled as f64) >= max_unused_ratio * functions.len() as f64)
        .then(|| format!("{uncalled} of {} functions are never called", functions.len()))
}
