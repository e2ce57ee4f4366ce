use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use twn_context::project::is_watched_file;

/// Start watching `src/` for script and stylesheet changes.
///
/// Every created or modified `.js`, `.jsx`, `.ts`, `.tsx` or `.css` path is
/// sent through `tx`; the caller decides what to do with it.
pub fn start(project_dir: &Path, tx: mpsc::UnboundedSender<PathBuf>) -> Result<impl Watcher> {
    let src_dir = project_dir.join("src");

    let mut watcher =
        notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("File watcher error: {e}");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for path in event.paths {
                if is_watched_file(&path) && !is_vendored(&path) {
                    let _ = tx.send(path);
                }
            }
        })?;

    if src_dir.exists() {
        watcher.watch(&src_dir, RecursiveMode::Recursive)?;
    }

    Ok(watcher)
}

fn is_vendored(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}
