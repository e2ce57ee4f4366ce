mod tree;

use serde::{Deserialize, Serialize};

pub use tree::{SelectorTree, SelectorValue};

/// The key meaning "this same element": its classes take the enclosing prefix
/// and it never shows up as a path segment.
pub const ROOT_KEY: &str = "&";

/// Joins selector path segments and the final class name.
pub const DELIMITER: char = ':';

/// Order in which keys of a [`SelectorTree`] are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOrder {
    /// Keys in the order they were written.
    #[default]
    Insertion,
    /// Keys sorted by byte order at every nesting level.
    Alphabetical,
}

/// What to do with `&` when there is no enclosing prefix (`{ "&": "p-4" }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKeyPolicy {
    /// Emit the classes unprefixed, like base classes.
    #[default]
    BaseClass,
    /// Drop the classes.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlattenOptions {
    pub key_order: KeyOrder,
    pub root_key: RootKeyPolicy,
}

/// Flatten a base class string and a selector tree into class tokens.
///
/// The trimmed base string comes first as a single token, followed by one
/// `path:class` token per class in the tree.
///
/// ```
/// use twn::{flatten, SelectorTree};
///
/// let tree = SelectorTree::new().with(
///     "hover",
///     SelectorTree::new().with("&", "bg-red-200").with("span", "text-white"),
/// );
/// assert_eq!(
///     flatten(Some("bg-red-100"), Some(&tree)),
///     vec!["bg-red-100", "hover:bg-red-200", "hover:span:text-white"],
/// );
/// ```
pub fn flatten(base: Option<&str>, tree: Option<&SelectorTree>) -> Vec<String> {
    flatten_with(base, tree, &FlattenOptions::default())
}

/// Like [`flatten`], with an explicit key order and top-level `&` policy.
pub fn flatten_with(
    base: Option<&str>,
    tree: Option<&SelectorTree>,
    options: &FlattenOptions,
) -> Vec<String> {
    let mut classes = Vec::new();
    if let Some(base) = base.map(str::trim).filter(|b| !b.is_empty()) {
        classes.push(base.to_string());
    }
    if let Some(tree) = tree {
        walk(tree, "", options, &mut classes);
    }
    classes
}

/// Flatten only the selector tree, without a base string.
pub fn flatten_selectors(tree: &SelectorTree, options: &FlattenOptions) -> Vec<String> {
    let mut classes = Vec::new();
    walk(tree, "", options, &mut classes);
    classes
}

/// The runtime helper: flattened tokens joined by single spaces.
///
/// `twn(Some("px-4"), Some(&SelectorTree::new().with("hover", "bg-blue-600")))`
/// returns `"px-4 hover:bg-blue-600"`.
pub fn twn(base: Option<&str>, tree: Option<&SelectorTree>) -> String {
    flatten(base, tree).join(" ")
}

fn walk(tree: &SelectorTree, prefix: &str, options: &FlattenOptions, out: &mut Vec<String>) {
    let mut entries: Vec<(&str, &SelectorValue)> = tree.iter().collect();
    if options.key_order == KeyOrder::Alphabetical {
        entries.sort_by(|a, b| a.0.cmp(b.0));
    }

    for (key, value) in entries {
        if value.is_empty() {
            continue;
        }
        // `&` is transparent: neither its classes nor its children get a segment for it.
        let target = if key == ROOT_KEY {
            prefix.to_string()
        } else if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}{DELIMITER}{key}")
        };

        match value {
            SelectorValue::Classes(classes) => {
                for class in classes.split_whitespace() {
                    push_class(&target, class, options, out);
                }
            }
            SelectorValue::Nested(child) => walk(child, &target, options, out),
            SelectorValue::Empty => {}
        }
    }
}

fn push_class(prefix: &str, class: &str, options: &FlattenOptions, out: &mut Vec<String>) {
    if !prefix.is_empty() {
        out.push(format!("{prefix}{DELIMITER}{class}"));
        return;
    }
    match options.root_key {
        RootKeyPolicy::BaseClass => out.push(class.to_string()),
        RootKeyPolicy::Ignore => {}
    }
}

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = twn)]
pub fn twn_json(base: Option<String>, selectors_json: Option<String>) -> Result<String, JsValue> {
    let tree = match selectors_json.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            let value: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| JsValue::from_str(&format!("Invalid selectors JSON: {e}")))?;
            SelectorTree::from_json(&value)
        }
        _ => None,
    };
    Ok(twn(base.as_deref(), tree.as_ref()))
}
