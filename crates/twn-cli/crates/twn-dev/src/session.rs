use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use twn_context::project::TwnProject;
use twn_plugin::TwnPlugin;

/// One long-lived plugin instance shared by the watcher and the HTTP handlers.
///
/// Transforms are serialized through the mutex; `version` bumps every time
/// the class set grows.
pub struct DevSession {
    project: TwnProject,
    plugin: Mutex<TwnPlugin>,
    version: AtomicU64,
}

impl DevSession {
    /// Create the session and run the initial scan of `src/`.
    pub fn start(project: TwnProject) -> Result<Self> {
        let mut plugin = project.plugin()?;
        let files = project.collect_files()?;
        project.transform_all(&mut plugin, &files);
        tracing::info!(
            files = files.len(),
            classes = plugin.classes().len(),
            "Initial scan complete"
        );
        Ok(Self {
            project,
            plugin: Mutex::new(plugin),
            version: AtomicU64::new(0),
        })
    }

    pub fn project(&self) -> &TwnProject {
        &self.project
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Feed a changed file through the plugin. Returns `true` when new classes appeared.
    pub fn on_change(&self, path: &Path) -> Result<bool> {
        let code = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let id = path.to_string_lossy().replace('\\', "/");
        let code = if id.ends_with(".css") {
            twn_plugin::strip_directive(&code)
        } else {
            code
        };

        let mut plugin = self.lock();
        let before = plugin.classes().len();
        plugin.transform(&code, &id);
        let grew = plugin.classes().len() > before;
        if grew {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(grew)
    }

    /// `{ "version", "entry", "classes" }` for the current state.
    pub fn snapshot(&self) -> Value {
        let plugin = self.lock();
        json!({
            "version": self.version(),
            "entry": plugin.css_entry(),
            "classes": plugin.classes(),
        })
    }

    /// The CSS entry as it reads on disk, with a fresh directive prepended.
    ///
    /// `None` until a stylesheet importing Tailwind has been seen.
    /// Blocks on file I/O; call it from `spawn_blocking` inside a runtime.
    pub fn entry_css(&self) -> Result<Option<String>> {
        let Some(entry) = self.lock().css_entry().map(str::to_string) else {
            return Ok(None);
        };
        // The lock is released while reading.
        let code = fs::read_to_string(&entry).with_context(|| format!("Failed to read {entry}"))?;
        let code = twn_plugin::strip_directive(&code);
        Ok(Some(self.lock().inject(&code).unwrap_or(code)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TwnPlugin> {
        // A panic mid-transform leaves the class set intact; keep serving it.
        self.plugin.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
