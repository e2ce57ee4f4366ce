use std::collections::BTreeSet;

use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression, ObjectExpression, ObjectPropertyKind, PropertyKey,
    PropertyKind,
};
use oxc_ast_visit::{walk, Visit};
use twn::{SelectorTree, SelectorValue};

use crate::ExtractOptions;

/// Walks a parsed program, recording whether the library is imported and
/// the classes produced by every `twn(...)` call.
pub(crate) struct CallCollector<'o> {
    options: &'o ExtractOptions,
    pub imports_library: bool,
    pub calls: usize,
    pub classes: BTreeSet<String>,
}

impl<'o> CallCollector<'o> {
    pub fn new(options: &'o ExtractOptions) -> Self {
        Self {
            options,
            imports_library: false,
            calls: 0,
            classes: BTreeSet::new(),
        }
    }

    /// `tailwind-nested` and `tailwind-nested/vite` both count.
    fn note_module(&mut self, specifier: &str) {
        let library = self.options.library.as_str();
        let matches = specifier == library
            || specifier
                .strip_prefix(library)
                .is_some_and(|rest| rest.starts_with('/'));
        if matches {
            self.imports_library = true;
        }
    }

    fn collect_call(&mut self, call: &CallExpression<'_>) {
        self.calls += 1;
        let mut args = call.arguments.iter().map(|arg| arg.as_expression());

        if let Some(Some(base)) = args.next() {
            if let Some(base) = static_string(base) {
                self.classes
                    .extend(base.split_whitespace().map(str::to_string));
            }
        }

        if let Some(Some(selectors)) = args.next() {
            if let Expression::ObjectExpression(object) = selectors.get_inner_expression() {
                let tree = tree_from_object(object);
                self.classes
                    .extend(twn::flatten_selectors(&tree, &self.options.flatten));
            }
        }
    }
}

impl<'a> Visit<'a> for CallCollector<'_> {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.note_module(it.source.value.as_str());
        walk::walk_import_declaration(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.note_module(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.note_module(it.source.value.as_str());
        walk::walk_export_all_declaration(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Some(specifier) = static_string(&it.source) {
            self.note_module(specifier);
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        // Only bare identifiers: `ns.twn(...)` is someone else's function.
        if let Expression::Identifier(callee) = &it.callee {
            let name = callee.name.as_str();
            if name == self.options.function_name {
                self.collect_call(it);
            } else if name == "require" {
                if let Some(Argument::StringLiteral(specifier)) = it.arguments.first() {
                    self.note_module(specifier.value.as_str());
                }
            }
        }
        walk::walk_call_expression(self, it);
    }
}

/// A string literal or a template literal without `${}`.
fn static_string<'e>(expr: &'e Expression<'_>) -> Option<&'e str> {
    match expr.get_inner_expression() {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .and_then(|quasi| quasi.value.cooked.as_ref())
            .map(|cooked| cooked.as_str()),
        _ => None,
    }
}

/// Rebuild the literal structure of an object expression as a [`SelectorTree`].
///
/// Spreads, computed keys, methods and getters are left out of the tree. A
/// value that is not a literal becomes [`SelectorValue::Empty`], so it still
/// overrides an earlier literal under the same key.
fn tree_from_object(object: &ObjectExpression<'_>) -> SelectorTree {
    let mut tree = SelectorTree::new();
    for property in &object.properties {
        let ObjectPropertyKind::ObjectProperty(prop) = property else {
            continue;
        };
        if prop.computed || prop.method || !matches!(prop.kind, PropertyKind::Init) {
            continue;
        }
        let Some(key) = property_key(&prop.key) else {
            continue;
        };
        let value = selector_value(&prop.value).unwrap_or_else(|| {
            tracing::debug!(key = %key, "Skipping non-literal selector value");
            SelectorValue::Empty
        });
        tree.insert(key, value);
    }
    tree
}

fn property_key(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(ident) => Some(ident.name.to_string()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        PropertyKey::NumericLiteral(num) => Some(num.value.to_string()),
        _ => None,
    }
}

fn selector_value(expr: &Expression<'_>) -> Option<SelectorValue> {
    match expr.get_inner_expression() {
        Expression::ObjectExpression(object) => Some(SelectorValue::Nested(tree_from_object(object))),
        Expression::NullLiteral(_) => Some(SelectorValue::Empty),
        Expression::BooleanLiteral(lit) if !lit.value => Some(SelectorValue::Empty),
        Expression::Identifier(ident) if ident.name.as_str() == "undefined" => {
            Some(SelectorValue::Empty)
        }
        other => static_string(other).map(SelectorValue::from),
    }
}
