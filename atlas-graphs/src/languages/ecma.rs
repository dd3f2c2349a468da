// Heuristic extractor for JavaScript/TypeScript sources.
//
// Pattern matching over raw text, not a parser. Known gaps:
// - braces inside strings, template literals and comments skew block ends;
// - commented-out declarations and imports are still picked up;
// - arrow functions, methods and `export default function` without a name
//   are not recognised;
// - class spans are a fixed ten-line placeholder.

use std::sync::LazyLock;

use regex::Regex;

use crate::SourceModule;

use super::helpers::{brace_block_end, line_of_offset};
use super::{Declaration, Extraction, Extractor, ImportRef};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"import\s+(?:(?:\{[^}]*\}|\*\s+as\s+\w+|\w+)(?:\s*,\s*(?:\{[^}]*\}|\*\s+as\s+\w+|\w+))*\s+from\s+)?['"]([^'"]+)['"]"#,
    )
    .expect("import pattern is valid")
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:export\s+)?(?:async\s+)?function\s+(\w+)\s*\([^)]*\)\s*\{")
        .expect("function pattern is valid")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:export\s+)?class\s+(\w+)(?:\s+extends\s+(\w+))?")
        .expect("class pattern is valid")
});

/// Placeholder span for class declarations.
const CLASS_SPAN_LINES: usize = 10;

#[derive(Debug)]
pub struct EcmaHeuristic;

impl Extractor for EcmaHeuristic {
    fn id(&self) -> &'static str {
        "ecma-heuristic"
    }

    fn language_tags(&self) -> &'static [&'static str] {
        &["typescript", "javascript", "tsx", "jsx", "ts", "js"]
    }

    fn extract(&self, module: &SourceModule) -> Extraction {
        let content = module.content.as_str();
        Extraction {
            imports: extract_imports(content),
            functions: extract_functions(content),
            classes: extract_classes(content),
        }
    }
}

fn extract_imports(content: &str) -> Vec<ImportRef> {
    IMPORT_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let spec = caps.get(1)?;
            Some(ImportRef {
                specifier: spec.as_str().to_string(),
                line: line_of_offset(content, whole.start()),
            })
        })
        .collect()
}

fn extract_functions(content: &str) -> Vec<Declaration> {
    let lines: Vec<&str> = content.split('\n').collect();
    FUNCTION_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let start_line = line_of_offset(content, whole.start());
            Some(Declaration {
                name: name.as_str().to_string(),
                start_line,
                end_line: brace_block_end(&lines, start_line),
                extends: None,
            })
        })
        .collect()
}

fn extract_classes(content: &str) -> Vec<Declaration> {
    CLASS_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let start_line = line_of_offset(content, whole.start());
            Some(Declaration {
                name: name.as_str().to_string(),
                start_line,
                end_line: start_line + CLASS_SPAN_LINES,
                extends: caps.get(2).map(|m| m.as_str().to_string()),
            })
        })
        .collect()
}
