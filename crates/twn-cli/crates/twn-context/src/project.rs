use crate::config::PackageConfig;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use twn_plugin::TwnPlugin;

/// Directories never descended into while collecting sources.
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", ".git"];

/// A loaded project: the directory holding `package.json` and its config.
#[derive(Debug, Clone)]
pub struct TwnProject {
    pub root: PathBuf,
    pub config: PackageConfig,
}

/// A stylesheet the plugin rewrote during [`TwnProject::transform_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedFile {
    pub id: String,
    pub code: String,
}

impl TwnProject {
    /// Load a project from the given directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let pkg_path = dir.join("package.json");
        if !pkg_path.exists() {
            bail!("No package.json found in {}", dir.display());
        }
        let pkg_raw = fs::read_to_string(&pkg_path).context("Failed to read package.json")?;
        let config: PackageConfig =
            serde_json::from_str(&pkg_raw).context("Failed to parse package.json")?;
        if !config.depends_on(twn_plugin::LIBRARY_NAME) {
            tracing::warn!("package.json does not list {} as a dependency", twn_plugin::LIBRARY_NAME);
        }
        Ok(Self {
            root: dir.to_path_buf(),
            config,
        })
    }

    /// Load a project from the current working directory.
    pub fn load_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load(&cwd)
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// A fresh plugin session configured from the `"twn"` section.
    pub fn plugin(&self) -> Result<TwnPlugin> {
        TwnPlugin::new(self.config.twn.clone()).context("Invalid twn.cssEntryPattern in package.json")
    }

    /// Collect scripts and stylesheets under `src/`.
    ///
    /// Keys are absolute paths, matching the module ids a bundler would pass.
    pub fn collect_files(&self) -> Result<BTreeMap<String, String>> {
        let src_dir = self.src_dir();
        if !src_dir.exists() {
            bail!("No src/ directory found.");
        }
        let mut files = BTreeMap::new();
        collect_files_recursive(&src_dir, &mut files)?;
        Ok(files)
    }

    /// Run every collected file through `plugin`: all scripts first, then all
    /// stylesheets, so the entry sees the complete class set.
    ///
    /// Directives already present in stylesheets are dropped first so the
    /// output reflects the current sources.
    pub fn transform_all(
        &self,
        plugin: &mut TwnPlugin,
        files: &BTreeMap<String, String>,
    ) -> Vec<TransformedFile> {
        let (styles, scripts): (Vec<_>, Vec<_>) =
            files.iter().partition(|(id, _)| id.ends_with(".css"));

        for (id, code) in scripts {
            plugin.transform(code, id);
        }

        let mut transformed = Vec::new();
        for (id, code) in styles {
            let code = twn_plugin::strip_directive(code);
            if let Some(code) = plugin.transform(&code, id) {
                transformed.push(TransformedFile {
                    id: id.clone(),
                    code,
                });
            }
        }
        transformed
    }
}

/// Whether the dev watcher and the collector care about `path`.
pub fn is_watched_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js" | "jsx" | "ts" | "tsx" | "css")
    )
}

fn collect_files_recursive(dir: &Path, files: &mut BTreeMap<String, String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                continue;
            }
            collect_files_recursive(&path, files)?;
        } else if is_watched_file(&path) {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            files.insert(path.to_string_lossy().replace('\\', "/"), content);
        }
    }
    Ok(())
}
