mod collect;

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use twn::FlattenOptions;

use crate::collect::CallCollector;

/// Package name that must be imported before a file is scanned.
pub const LIBRARY_NAME: &str = "tailwind-nested";

/// Name of the runtime helper whose calls are extracted.
pub const FUNCTION_NAME: &str = "twn";

/// File extensions that are scanned for `twn(...)` calls.
pub const SOURCE_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    pub function_name: String,
    pub library: String,
    pub flatten: FlattenOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            function_name: FUNCTION_NAME.into(),
            library: LIBRARY_NAME.into(),
            flatten: FlattenOptions::default(),
        }
    }
}

/// Recovers the class names `twn(...)` calls produce at runtime, without running any code.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract every class token from the `twn(...)` calls in `source`.
    ///
    /// Base strings are split into single classes; selector objects are
    /// flattened with `twn::flatten_selectors`. Files with an unknown
    /// extension, files that don't import the library and files that fail
    /// to parse all yield an empty set.
    pub fn extract(&self, source: &str, id: &str) -> BTreeSet<String> {
        if !is_source_file(id) || !source.contains(self.options.library.as_str()) {
            return BTreeSet::new();
        }
        let source_type = match SourceType::from_path(id) {
            Ok(source_type) => source_type,
            Err(_) => return BTreeSet::new(),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.scan(source, id, source_type))) {
            Ok(classes) => classes,
            Err(_) => {
                tracing::warn!(file = id, "Parser panicked, skipping file");
                BTreeSet::new()
            }
        }
    }

    fn scan(&self, source: &str, id: &str, source_type: SourceType) -> BTreeSet<String> {
        let allocator = Allocator::default();
        let result = Parser::new(&allocator, source, source_type).parse();

        if result.panicked || !result.errors.is_empty() {
            let message = result
                .errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unrecoverable syntax error".into());
            tracing::warn!(
                file = id,
                errors = result.errors.len(),
                "Failed to parse {id}: {message}"
            );
            return BTreeSet::new();
        }

        let mut collector = CallCollector::new(&self.options);
        collector.visit_program(&result.program);

        if !collector.imports_library {
            tracing::debug!(file = id, "{} is mentioned but never imported", self.options.library);
            return BTreeSet::new();
        }
        tracing::debug!(
            file = id,
            calls = collector.calls,
            classes = collector.classes.len(),
            "Extracted twn classes"
        );
        collector.classes
    }
}

/// Extract with the default function name, library and flatten options.
pub fn extract(source: &str, id: &str) -> BTreeSet<String> {
    Extractor::default().extract(source, id)
}

/// Whether `id` ends in one of [`SOURCE_EXTENSIONS`].
pub fn is_source_file(id: &str) -> bool {
    Path::new(id)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
