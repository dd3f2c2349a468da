//! Recipes and the engine that runs them.
//!
//! A [`Recipe`] is the sole extension point for migration strategies: it
//! turns a [`CodeGraph`] into a [`MigrationPlan`]. [`RecipeEngine`] builds the
//! graph from source modules and hands it to the recipe.

mod extract_utils;

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use atlas_graphs::{CodeGraph, GraphBuilder, SourceModule};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::AtlasConfig;
use crate::error::{RecipeError, Result, panic_message};
use crate::planner::MigrationPlan;

pub use extract_utils::ExtractUtilsRecipe;

/// A named, versioned migration strategy.
pub trait Recipe: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn version(&self) -> &str;

    /// Produce a plan for `graph`. Recipes may sequence through
    /// [`crate::planner::Planner`] or apply their own logic.
    fn plan(&self, graph: &CodeGraph) -> Result<MigrationPlan>;
}

/// Outcome of [`RecipeEngine::validate_recipe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl RecipeValidation {
    /// Convert into a hard error when invalid.
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(RecipeError::Validation(self.errors).into())
        }
    }
}

/// Builds graphs and runs recipes against them.
#[derive(Debug, Default)]
pub struct RecipeEngine {
    builder: GraphBuilder,
}

impl RecipeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: GraphBuilder) -> Self {
        Self { builder }
    }

    /// Build the graph for `modules` and delegate to the recipe.
    #[instrument(skip_all, name = "recipe_execute", fields(recipe = recipe.id()))]
    pub fn execute(&self, recipe: &dyn Recipe, modules: &[SourceModule]) -> Result<MigrationPlan> {
        let graph = self.builder.build(modules);
        let plan = recipe.plan(&graph)?;
        info!(plan = %plan.id, steps = plan.steps.len(), "Recipe executed");
        Ok(plan)
    }

    /// Run the recipe end to end and report problems as strings.
    ///
    /// Never fails: recipe errors and recipe panics both become entries in
    /// `errors`.
    pub fn validate_recipe(&self, recipe: &dyn Recipe, modules: &[SourceModule]) -> RecipeValidation {
        let mut errors = Vec::new();
        match catch_unwind(AssertUnwindSafe(|| self.execute(recipe, modules))) {
            Ok(Ok(plan)) => {
                if plan.steps.is_empty() {
                    errors.push("Recipe produced no transformation steps".to_string());
                }
                if plan.invariants.is_empty() {
                    errors.push("Recipe produced no invariants".to_string());
                }
            }
            Ok(Err(e)) => errors.push(format!("Recipe execution failed: {e}")),
            Err(payload) => errors.push(format!(
                "Recipe execution failed: recipe panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
        if !errors.is_empty() {
            warn!(recipe = recipe.id(), ?errors, "Recipe validation failed");
        }
        RecipeValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Recipes available by id.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Arc<dyn Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in recipes, configured from `config`.
    pub fn builtin(config: &AtlasConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ExtractUtilsRecipe::from_config(config)));
        registry
    }

    /// Add a recipe, replacing any with the same id.
    pub fn register(&mut self, recipe: Arc<dyn Recipe>) {
        self.recipes.insert(recipe.id().to_string(), recipe);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Recipe>> {
        self.recipes
            .get(id)
            .cloned()
            .ok_or_else(|| RecipeError::Unknown(id.to_string()).into())
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
