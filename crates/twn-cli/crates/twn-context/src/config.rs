use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use twn_plugin::PluginOptions;

/// The parts of `package.json` the CLI cares about.
///
/// Plugin settings live under an optional `"twn"` key:
///
/// ```json
/// { "name": "app", "twn": { "entryPolicy": "firstWins", "extract": { "flatten": { "keyOrder": "alphabetical" } } } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub twn: PluginOptions,
}

impl PackageConfig {
    /// Whether `package` is listed in `dependencies` or `devDependencies`.
    pub fn depends_on(&self, package: &str) -> bool {
        self.dependencies.contains_key(package) || self.dev_dependencies.contains_key(package)
    }
}
