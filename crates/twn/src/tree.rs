use serde_json::Value;

/// A value attached to a selector key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectorValue {
    /// Space-separated class names, e.g. `"bg-red-200 text-white"`.
    Classes(String),
    /// A nested set of selectors, e.g. `{ "&": "...", "span": "..." }`.
    Nested(SelectorTree),
    /// `undefined`, `null`, `false` or anything else that contributes no classes.
    #[default]
    Empty,
}

impl SelectorValue {
    /// Whether this value is skipped during flattening.
    ///
    /// Blank strings and trees with no keys are empty. A tree whose children are
    /// all empty is not, but flattening it still produces nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            SelectorValue::Classes(classes) => classes.trim().is_empty(),
            SelectorValue::Nested(tree) => tree.is_empty(),
            SelectorValue::Empty => true,
        }
    }

    /// Convert a JSON value: strings become classes, objects nest, everything else is empty.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => SelectorValue::Classes(s.clone()),
            Value::Object(_) => SelectorTree::from_json(value)
                .map(SelectorValue::Nested)
                .unwrap_or_default(),
            _ => SelectorValue::Empty,
        }
    }
}

impl From<&str> for SelectorValue {
    fn from(classes: &str) -> Self {
        SelectorValue::Classes(classes.to_string())
    }
}

impl From<String> for SelectorValue {
    fn from(classes: String) -> Self {
        SelectorValue::Classes(classes)
    }
}

impl From<SelectorTree> for SelectorValue {
    fn from(tree: SelectorTree) -> Self {
        SelectorValue::Nested(tree)
    }
}

impl<T: Into<SelectorValue>> From<Option<T>> for SelectorValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// An insertion-ordered mapping from selector key to [`SelectorValue`].
///
/// Re-inserting an existing key replaces its value but keeps its position,
/// the same way a JS object literal with a duplicated key behaves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectorTree {
    entries: Vec<(String, SelectorValue)>,
}

impl SelectorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert: `SelectorTree::new().with("hover", "bg-red-200")`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SelectorValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SelectorValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SelectorValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectorValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a tree from a JSON object, keeping the object's key order.
    ///
    /// Returns `None` when `value` is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mut tree = SelectorTree::new();
        for (key, value) in map {
            tree.insert(key.clone(), SelectorValue::from_json(value));
        }
        Some(tree)
    }
}

impl<K: Into<String>, V: Into<SelectorValue>> FromIterator<(K, V)> for SelectorTree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = SelectorTree::new();
        for (key, value) in iter {
            tree.insert(key, value);
        }
        tree
    }
}
