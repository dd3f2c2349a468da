/// Top-level AtlasShift error type.
///
/// All fallible operations in `atlas-core` return [`Result<T, AtlasError>`](Result).
/// Invariant violations are not errors: they are reported as data by
/// [`crate::invariant::validate`].
#[derive(thiserror::Error, Debug)]
pub enum AtlasError {
    /// A recipe could not produce or validate a plan.
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    /// Job lifecycle request was rejected.
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the graph engine (graph decoding).
    #[error("Graph engine error: {0}")]
    Graph(#[from] atlas_graphs::GraphError),
}

/// Errors raised by recipes and the recipe engine.
#[derive(thiserror::Error, Debug)]
pub enum RecipeError {
    /// The recipe's planning function failed.
    #[error("Recipe {recipe} failed to plan: {message}")]
    Planning {
        /// Id of the failing recipe.
        recipe: String,
        /// Description of the failure.
        message: String,
    },

    /// Pre-flight validation reported problems.
    #[error("Recipe validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// No recipe is registered under this id.
    #[error("Unknown recipe: {0}")]
    Unknown(String),
}

/// Errors from job lifecycle requests.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    /// A job with this id is still pending or running.
    #[error("Job {0} is already running")]
    AlreadyRunning(String),

    /// No job with this id was ever started.
    #[error("Job not found: {0}")]
    NotFound(String),
}

/// Errors in AtlasShift configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Filesystem I/O error reading the configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Convenience alias for `Result<T, AtlasError>`.
pub type Result<T> = std::result::Result<T, AtlasError>;
