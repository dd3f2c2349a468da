//! Canonical cross-component strings: invariant ids, edge/node metadata keys
//! and job step labels.
//!
//! Transformations, the miner, recipes and status surfaces all refer to these
//! rather than repeating literals.

/// Ids of the mined invariant set.
pub mod invariant_ids {
    pub const FILE_EXISTS: &str = "file-exists";
    pub const NO_ORPHANS: &str = "no-orphans";
    pub const NO_CIRCULAR_IMPORTS: &str = "no-circular-imports";
    pub const IMPORTS_RESOLVE: &str = "imports-resolve";
    pub const FUNCTIONS_USED: &str = "functions-used";
}

/// Audit markers stamped by transformations.
pub mod metadata_keys {
    /// Edge touched a node relocated by `Move`.
    pub const MOVED: &str = "moved";
    /// Edge touched a node relocated by `ExtractModule`.
    pub const EXTRACTED: &str = "extracted";
    /// Module node created by `ExtractModule` rather than read from source.
    pub const SYNTHESIZED: &str = "synthesized";

    pub use atlas_graphs::builder::{
        META_LANGUAGE as LANGUAGE, META_UNRESOLVED_IMPORTS as UNRESOLVED_IMPORTS,
    };
}

/// `current_step` labels reported by the job pipeline.
pub mod job_steps {
    pub const VALIDATING: &str = "Validating recipe";
    pub const PLANNING: &str = "Generating migration plan";
    pub const APPLYING: &str = "Applying transformations";
    pub const COMPLETED: &str = "Completed";
    pub const CANCELLED: &str = "Cancelled";
}

/// Read a boolean marker from node or edge metadata.
pub fn has_marker(metadata: &atlas_graphs::Metadata, key: &str) -> bool {
    metadata
        .get(key)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_read_only_true_booleans() {
        let mut meta = atlas_graphs::Metadata::new();
        assert!(!has_marker(&meta, metadata_keys::MOVED));
        meta.insert(metadata_keys::MOVED.into(), serde_json::json!(true));
        meta.insert(metadata_keys::EXTRACTED.into(), serde_json::json!("yes"));
        assert!(has_marker(&meta, metadata_keys::MOVED));
        assert!(!has_marker(&meta, metadata_keys::EXTRACTED));
    }
}
