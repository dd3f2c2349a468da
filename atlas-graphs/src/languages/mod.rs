pub mod ecma;
mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

pub use helpers::{brace_block_end, line_count, line_of_offset, resolve_import_path};

use crate::SourceModule;

/// Trait implemented by each language's structural extractor.
///
/// Extractors see one module at a time and report what they recognised;
/// cross-module resolution happens in [`crate::GraphBuilder`]. A real parser
/// can replace the heuristic one behind this trait without touching
/// downstream components.
pub trait Extractor: Send + Sync + std::fmt::Debug {
    /// Extractor identifier (e.g., "ecma-heuristic").
    fn id(&self) -> &'static str;

    /// Language tags this extractor handles.
    fn language_tags(&self) -> &'static [&'static str];

    /// Extract declarations and import specifiers. Must not fail: text it
    /// cannot make sense of simply yields fewer items.
    fn extract(&self, module: &SourceModule) -> Extraction;
}

/// Raw, unresolved output of one extractor run over one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub imports: Vec<ImportRef>,
    pub functions: Vec<Declaration>,
    pub classes: Vec<Declaration>,
}

/// An import specifier as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub line: usize,
}

/// A named declaration with its estimated line span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Captured base name for `class X extends Y`.
    pub extends: Option<String>,
}

/// Registry of extractors keyed by language tag.
#[derive(Debug)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn Extractor>>,
    fallback: Arc<dyn Extractor>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        let ecma: Arc<dyn Extractor> = Arc::new(ecma::EcmaHeuristic);
        let mut reg = Self {
            extractors: HashMap::new(),
            fallback: Arc::clone(&ecma),
        };
        reg.register(ecma);
        reg
    }

    /// Register an extractor for all of its language tags, replacing any
    /// previous registration of the same tag.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for tag in extractor.language_tags() {
            self.extractors
                .insert((*tag).to_string(), Arc::clone(&extractor));
        }
    }

    /// Look up the extractor for a language tag; unknown or missing tags get
    /// the fallback.
    pub fn for_language(&self, tag: Option<&str>) -> Arc<dyn Extractor> {
        tag.and_then(|t| self.extractors.get(&t.to_ascii_lowercase()))
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    /// List all registered language tags.
    pub fn language_tags(&self) -> Vec<&str> {
        self.extractors.keys().map(String::as_str).collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
