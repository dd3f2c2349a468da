// Integration test utilities and fixtures for AtlasShift.

use std::path::Path;
use std::sync::Arc;

use atlas_core::job::{JobRunner, JobStatus};
use atlas_core::planner::MigrationPlan;
use atlas_core::progress::NoopListener;
use atlas_core::recipe::{Recipe, RecipeEngine};
use atlas_graphs::SourceModule;

/// Install a `fmt` subscriber once, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn ts(path: &str, content: &str) -> SourceModule {
    SourceModule::new(path, content).with_language("typescript")
}

/// The single-module project from the extract-utilities scenario.
pub fn util_helper_project() -> Vec<SourceModule> {
    vec![SourceModule::new(
        "index",
        "function utilHelper() { return 1; }",
    )]
}

/// Same shape as [`util_helper_project`] with nothing to extract.
pub fn do_work_project() -> Vec<SourceModule> {
    vec![SourceModule::new("index", "function doWork() { return 1; }")]
}

/// A small layered TypeScript app: entry point, services, models, helpers.
pub fn layered_app() -> Vec<SourceModule> {
    vec![
        ts(
            "src/index.ts",
            "import { UserService } from './services/user.ts';\nimport { formatHelper } from './lib/format.ts';\nimport express from 'express';\n\nexport async function main() {\n  const svc = new UserService();\n  console.log(formatHelper(svc.name()));\n}\n",
        ),
        ts(
            "src/services/user.ts",
            "import { User } from '../models/user.ts';\n\nexport class UserService extends BaseService {\n  name() {\n    return new User().name;\n  }\n}\n",
        ),
        ts(
            "src/models/user.ts",
            "export class User {\n  name = 'anon';\n}\n\nexport class Admin extends User {}\n",
        ),
        ts(
            "src/lib/format.ts",
            "export function formatHelper(s) {\n  return s.trim();\n}\n\nexport function stringUtil(s) {\n  return s;\n}\n",
        ),
    ]
}

/// Two modules importing each other.
pub fn cyclic_pair() -> Vec<SourceModule> {
    vec![
        ts("a.ts", "import { b } from './b.ts';\nexport const a = 1;\n"),
        ts("b.ts", "import { a } from './a.ts';\nexport const b = 2;\n"),
    ]
}

/// A temporary directory holding an `atlas.toml`.
#[derive(Debug)]
pub struct TestConfigDir {
    pub dir: tempfile::TempDir,
}

impl TestConfigDir {
    pub fn with_config(toml: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::write(dir.path().join("atlas.toml"), toml).expect("write atlas.toml");
        Self { dir }
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.path().join("atlas.toml")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Run `recipe` synchronously through a fresh engine.
pub fn run_recipe(recipe: &dyn Recipe, modules: &[SourceModule]) -> MigrationPlan {
    RecipeEngine::new()
        .execute(recipe, modules)
        .expect("recipe execution")
}

/// Start a job and wait for its terminal status.
pub async fn run_job(
    runner: &JobRunner,
    id: &str,
    recipe: Arc<dyn Recipe>,
    modules: Vec<SourceModule>,
) -> JobStatus {
    runner
        .start_job(id, recipe, modules, Arc::new(NoopListener))
        .expect("start job");
    wait_terminal(runner, id).await
}

/// Wait until job `id` reaches a terminal state.
pub async fn wait_terminal(runner: &JobRunner, id: &str) -> JobStatus {
    let mut rx = runner.subscribe(id).expect("subscribe");
    rx.wait_for(|s| s.status.is_terminal())
        .await
        .expect("job status channel")
        .clone()
}
