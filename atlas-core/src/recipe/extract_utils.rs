use atlas_graphs::{CodeGraph, NodeKind};

use super::Recipe;
use crate::config::{AtlasConfig, ExtractUtilsConfig};
use crate::error::Result;
use crate::planner::{MigrationPlan, Planner};
use crate::transform::extract_module;

/// Extracts utility functions into a dedicated module.
///
/// A function counts as a utility when its lower-cased name contains any
/// configured pattern. All matches go into a single `ExtractModule`
/// candidate, sequenced through the [`Planner`].
#[derive(Debug, Clone, Default)]
pub struct ExtractUtilsRecipe {
    settings: ExtractUtilsConfig,
    planner: Planner,
}

impl ExtractUtilsRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AtlasConfig) -> Self {
        Self {
            settings: config.recipes.extract_utils.clone(),
            planner: Planner::from_config(config),
        }
    }

    fn is_utility(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.settings
            .patterns
            .iter()
            .any(|p| lower.contains(&p.to_lowercase()))
    }
}

impl Recipe for ExtractUtilsRecipe {
    fn id(&self) -> &str {
        "example-extract-utils"
    }

    fn name(&self) -> &str {
        "Extract Utilities"
    }

    fn description(&self) -> &str {
        "Extracts utility functions into a separate utils module"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn plan(&self, graph: &CodeGraph) -> Result<MigrationPlan> {
        let targets: Vec<String> = graph
            .nodes_of_kind(NodeKind::Function)
            .filter(|n| self.is_utility(&n.name))
            .map(|n| n.id.clone())
            .collect();

        let candidates = if targets.is_empty() {
            Vec::new()
        } else {
            vec![extract_module(
                targets,
                &self.settings.target_path,
                &self.settings.target_name,
            )]
        };
        Ok(self.planner.plan(graph, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::RiskLevel;
    use atlas_graphs::{GraphBuilder, SourceModule};

    fn graph_of(content: &str) -> CodeGraph {
        GraphBuilder::new().build(&[SourceModule::new("src/index.ts", content)])
    }

    #[test]
    fn matches_names_case_insensitively() {
        let recipe = ExtractUtilsRecipe::new();
        assert!(recipe.is_utility("formatUtil"));
        assert!(recipe.is_utility("HELPERfn"));
        assert!(recipe.is_utility("utilities"));
        assert!(!recipe.is_utility("doWork"));
    }

    #[test]
    fn groups_all_utilities_into_one_step() {
        let graph = graph_of(
            "function utilA() {}\nfunction helperB() {}\nfunction main() {}",
        );
        let plan = ExtractUtilsRecipe::new().plan(&graph).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].risk, RiskLevel::Medium);
        assert_eq!(plan.invariants.len(), 5);

        let after = plan.replay(&graph);
        assert_eq!(
            after.node("module:src/index.ts:function:utilA").unwrap().module_path,
            "src/utils.ts"
        );
        assert_eq!(
            after.node("module:src/index.ts:function:main").unwrap().module_path,
            "src/index.ts"
        );
        assert!(after.contains_node("module:src/utils.ts"));
    }

    #[test]
    fn no_utilities_means_no_steps() {
        let plan = ExtractUtilsRecipe::new()
            .plan(&graph_of("function doWork() {}"))
            .unwrap();
        assert!(plan.steps.is_empty());
        assert_eq!(plan.invariants.len(), 5);
    }

    #[test]
    fn configured_patterns_and_target_apply() {
        let config = AtlasConfig::from_toml_str(
            "[recipes.extract_utils]\ntarget_path = \"lib/shared.ts\"\ntarget_name = \"shared\"\npatterns = [\"Work\"]\n",
        )
        .unwrap();
        let recipe = ExtractUtilsRecipe::from_config(&config);
        let graph = graph_of("function doWork() {}");
        let after = recipe.plan(&graph).unwrap().replay(&graph);
        let module = after.node("module:lib/shared.ts").unwrap();
        assert_eq!(module.name, "shared");
    }
}
