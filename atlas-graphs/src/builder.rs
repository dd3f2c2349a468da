use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::languages::{ExtractorRegistry, line_count, resolve_import_path};
use crate::types::{
    CodeGraph, EdgeKind, GraphEdge, GraphNode, Metadata, NodeKind, SourceModule, module_node_id,
};

/// Metadata key for the module's language tag.
pub const META_LANGUAGE: &str = "language";
/// Metadata key for the number of imports that matched no module in the batch.
pub const META_UNRESOLVED_IMPORTS: &str = "unresolved_imports";

/// Builds a [`CodeGraph`] from a batch of source modules.
///
/// Holds no per-build state: every call starts from an empty graph, and the
/// output depends only on the input list and its order.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    registry: ExtractorRegistry,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: ExtractorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    #[instrument(skip_all, name = "graph_build", fields(modules = modules.len()))]
    pub fn build(&self, modules: &[SourceModule]) -> CodeGraph {
        let known_paths: HashSet<&str> = modules.iter().map(|m| m.path.as_str()).collect();
        let mut graph = CodeGraph::new();

        for module in modules {
            self.add_module(&mut graph, module, &known_paths);
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Graph build complete"
        );
        graph
    }

    fn add_module(&self, graph: &mut CodeGraph, module: &SourceModule, known_paths: &HashSet<&str>) {
        let module_id = module_node_id(&module.path);
        let extractor = self.registry.for_language(module.language.as_deref());
        let extraction = extractor.extract(module);

        let mut metadata = Metadata::new();
        if let Some(lang) = &module.language {
            metadata.insert(META_LANGUAGE.to_string(), serde_json::json!(lang));
        }

        // Imports: only targets inside this batch become edges
        let mut unresolved = 0usize;
        for import in &extraction.imports {
            let resolved = resolve_import_path(&import.specifier, &module.path);
            if known_paths.contains(resolved.as_str()) {
                graph.push_edge(GraphEdge::new(
                    module_id.clone(),
                    module_node_id(&resolved),
                    EdgeKind::Imports,
                ));
            } else {
                debug!(
                    module = %module.path,
                    specifier = %import.specifier,
                    line = import.line,
                    "Dropping unresolved import"
                );
                unresolved += 1;
            }
        }
        if unresolved > 0 {
            metadata.insert(
                META_UNRESOLVED_IMPORTS.to_string(),
                serde_json::json!(unresolved),
            );
        }

        graph.insert_node(GraphNode {
            id: module_id.clone(),
            kind: NodeKind::Module,
            name: module
                .path
                .rsplit('/')
                .next()
                .unwrap_or(&module.path)
                .to_string(),
            module_path: module.path.clone(),
            start_line: 1,
            end_line: line_count(&module.content),
            metadata,
        });

        for func in &extraction.functions {
            let id = format!("{module_id}:function:{}", func.name);
            graph.insert_node(GraphNode {
                id: id.clone(),
                kind: NodeKind::Function,
                name: func.name.clone(),
                module_path: module.path.clone(),
                start_line: func.start_line,
                end_line: func.end_line,
                metadata: Metadata::new(),
            });
            graph.push_edge(GraphEdge::new(module_id.clone(), id, EdgeKind::References));
        }

        for class in &extraction.classes {
            let id = format!("{module_id}:class:{}", class.name);
            graph.insert_node(GraphNode {
                id: id.clone(),
                kind: NodeKind::Class,
                name: class.name.clone(),
                module_path: module.path.clone(),
                start_line: class.start_line,
                end_line: class.end_line,
                metadata: Metadata::new(),
            });
            graph.push_edge(GraphEdge::new(
                module_id.clone(),
                id.clone(),
                EdgeKind::References,
            ));
            if let Some(base) = &class.extends {
                // Bare-name target; may not resolve to any node
                graph.push_edge(GraphEdge::new(id, format!("class:{base}"), EdgeKind::Extends));
            }
        }

        debug!(
            module = %module.path,
            extractor = extractor.id(),
            functions = extraction.functions.len(),
            classes = extraction.classes.len(),
            "Module extracted"
        );
    }
}
