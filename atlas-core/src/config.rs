use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level AtlasShift configuration, matching `atlas.toml`.
///
/// Every section and field is optional; defaults reproduce the built-in
/// behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub invariants: InvariantSection,
    #[serde(default)]
    pub jobs: JobSection,
    #[serde(default)]
    pub recipes: RecipesSection,
}

impl AtlasConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ratio("invariants.max_orphan_ratio", self.invariants.max_orphan_ratio)?;
        check_ratio(
            "invariants.max_unused_function_ratio",
            self.invariants.max_unused_function_ratio,
        )?;
        let utils = &self.recipes.extract_utils;
        if utils.target_path.is_empty() {
            return Err(ConfigError::Invalid(
                "recipes.extract_utils.target_path must not be empty".into(),
            ));
        }
        if utils.patterns.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "recipes.extract_utils.patterns must not contain empty strings".into(),
            ));
        }
        Ok(())
    }
}

fn check_ratio(key: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{key} must be within 0.0..=1.0, got {value}"
        )))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// Accept candidates that break error-severity invariants, marking them
    /// high risk, instead of dropping them.
    pub tolerate_errors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvariantSection {
    /// `no-orphans` holds while the orphaned fraction stays below this.
    pub max_orphan_ratio: f64,
    /// `functions-used` holds while the uncalled fraction stays below this.
    pub max_unused_function_ratio: f64,
}

impl Default for InvariantSection {
    fn default() -> Self {
        Self {
            max_orphan_ratio: 0.1,
            max_unused_function_ratio: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSection {
    /// Simulated per-step application delay.
    pub step_delay_ms: u64,
}

impl JobSection {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for JobSection {
    fn default() -> Self {
        Self { step_delay_ms: 100 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipesSection {
    pub extract_utils: ExtractUtilsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractUtilsConfig {
    /// Path of the module utilities are extracted into.
    pub target_path: String,
    /// Display name of that module.
    pub target_name: String,
    /// Case-insensitive substrings that mark a function as a utility.
    pub patterns: Vec<String>,
}

impl Default for ExtractUtilsConfig {
    fn default() -> Self {
        Self {
            target_path: "src/utils.ts".into(),
            target_name: "utils".into(),
            patterns: vec!["util".into(), "helper".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AtlasConfig::from_toml_str("").unwrap();
        assert!(!config.planner.tolerate_errors);
        assert!((config.invariants.max_orphan_ratio - 0.1).abs() < f64::EPSILON);
        assert!((config.invariants.max_unused_function_ratio - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.jobs.step_delay(), Duration::from_millis(100));
        assert_eq!(config.recipes.extract_utils.target_path, "src/utils.ts");
        assert_eq!(config.recipes.extract_utils.patterns, ["util", "helper"]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AtlasConfig::from_toml_str(
            "[planner]\ntolerate_errors = true\n\n[jobs]\nstep_delay_ms = 5\n\n[recipes.extract_utils]\npatterns = [\"shared\"]\n",
        )
        .unwrap();
        assert!(config.planner.tolerate_errors);
        assert_eq!(config.jobs.step_delay_ms, 5);
        assert_eq!(config.recipes.extract_utils.patterns, ["shared"]);
        assert_eq!(config.recipes.extract_utils.target_name, "utils");
    }

    #[test]
    fn out_of_range_ratio_is_invalid() {
        let err = AtlasConfig::from_toml_str("[invariants]\nmax_orphan_ratio = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn empty_target_path_is_invalid() {
        let err =
            AtlasConfig::from_toml_str("[recipes.extract_utils]\ntarget_path = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn bad_syntax_is_a_parse_error() {
        let err = AtlasConfig::from_toml_str("[planner\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.toml");
        std::fs::write(&path, "[jobs]\nstep_delay_ms = 0\n").unwrap();
        assert_eq!(AtlasConfig::load(&path).unwrap().jobs.step_delay_ms, 0);

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            AtlasConfig::load(&missing),
            Err(ConfigError::NotFound(_))
        ));
    }
}
