use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Marks a file as changed so a dev-server watcher picks it up again.
pub trait Toucher: Send + Sync {
    /// Must not block the caller and must not panic; failures are only logged.
    fn touch(&self, path: &Path);
}

/// Updates the modification time on a detached blocking task.
///
/// Runs on tokio's blocking pool when called inside a runtime, on a plain
/// thread otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsToucher;

impl Toucher for FsToucher {
    fn touch(&self, path: &Path) {
        let path = path.to_path_buf();
        let job = move || {
            if let Err(e) = touch_file(&path) {
                tracing::warn!(file = %path.display(), "Failed to touch CSS entry: {e}");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                std::thread::spawn(job);
            }
        }
    }
}

/// Set the modification time of an existing file to now, without changing its contents.
pub fn touch_file(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().append(true).open(path)?;
    file.set_modified(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_touch_file_updates_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.css");
        fs::write(&path, "@import \"tailwindcss\";\n").unwrap();

        let old = UNIX_EPOCH + Duration::from_secs(1_000_000);
        fs::File::options()
            .append(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        touch_file(&path).unwrap();

        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified > old);
        assert_eq!(fs::read_to_string(&path).unwrap(), "@import \"tailwindcss\";\n");
    }

    #[test]
    fn test_touch_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(touch_file(&dir.path().join("missing.css")).is_err());
    }
}
