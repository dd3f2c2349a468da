use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use atlas_graphs::CodeGraph;

use crate::config::AtlasConfig;
use crate::invariant::{Invariant, InvariantMiner, ValidationReport, validate};
use crate::transform::Transformation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No violations of any severity after the step.
    Low,
    /// Only warning-severity violations after the step.
    Medium,
    /// Error-severity violations after the step. Produced only when the
    /// planner tolerates errors.
    High,
}

impl RiskLevel {
    fn from_report(report: &ValidationReport) -> Self {
        if report.is_clean() {
            Self::Low
        } else if report.valid {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub id: String,
    pub transformation: Transformation,
    /// Ids of steps that must be applied first.
    pub dependencies: Vec<String>,
    pub risk: RiskLevel,
}

/// An ordered, risk-annotated sequence of accepted steps plus the invariant
/// set they were checked against.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub id: String,
    pub steps: Vec<PlanStep>,
    pub invariants: Vec<Invariant>,
    pub created_at: DateTime<Utc>,
}

impl MigrationPlan {
    /// A plan with a fresh id stamped now.
    pub fn new(steps: Vec<PlanStep>, invariants: Vec<Invariant>) -> Self {
        Self {
            id: format!("plan-{}", uuid::Uuid::new_v4()),
            steps,
            invariants,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.steps.iter().map(|s| s.risk).max()
    }

    /// Apply every step in order, starting from `graph`.
    pub fn replay(&self, graph: &CodeGraph) -> CodeGraph {
        self.steps
            .iter()
            .fold(graph.clone(), |current, step| step.transformation.apply(&current))
    }
}

/// Greedy, order-preserving sequencer of candidate transformations.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    miner: InvariantMiner,
    tolerate_errors: bool,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            miner: InvariantMiner::with_thresholds(config.invariants.clone()),
            tolerate_errors: config.planner.tolerate_errors,
        }
    }

    #[must_use]
    pub fn tolerate_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_errors = tolerate;
        self
    }

    /// Sequence `candidates` against `graph`.
    ///
    /// Invariants are mined once from `graph`. Each candidate is applied to
    /// the current graph and validated; a candidate that leaves an error is
    /// dropped (or accepted as high risk when errors are tolerated). Accepted
    /// steps form a linear chain and advance the current graph. Never fails.
    #[instrument(skip_all, name = "plan", fields(candidates = candidates.len()))]
    pub fn plan(&self, graph: &CodeGraph, candidates: Vec<Transformation>) -> MigrationPlan {
        let invariants = self.miner.mine(graph);
        let mut steps: Vec<PlanStep> = Vec::new();
        let mut current = graph.clone();
        let mut skipped = 0usize;

        for transformation in candidates {
            let tentative = transformation.apply(&current);
            let report = validate(&tentative, &invariants);

            if !report.valid && !self.tolerate_errors {
                debug!(
                    transformation = %transformation.id,
                    errors = report.errors().count(),
                    "Skipping candidate that breaks an error invariant"
                );
                skipped += 1;
                continue;
            }

            let risk = RiskLevel::from_report(&report);
            let dependencies = steps.last().map(|s| vec![s.id.clone()]).unwrap_or_default();
            debug!(transformation = %transformation.id, ?risk, "Accepted candidate");
            steps.push(PlanStep {
                id: format!("step-{}", steps.len() + 1),
                transformation,
                dependencies,
                risk,
            });
            current = tentative;
        }

        let plan = MigrationPlan::new(steps, invariants);
        info!(
            plan = %plan.id,
            steps = plan.steps.len(),
            skipped,
            "Migration plan generated"
        );
        plan
    }
}
