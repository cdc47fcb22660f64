//! Live reload for the read-only viewer.
//!
//! Watches the parent directory of one file (editors often save by
//! replacing the file) and reports a change once events have been quiet
//! for the debounce delay.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::editor::DelayedTask;

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    pending: DelayedTask<()>,
}

impl FileWatcher {
    /// Start watching `path`.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created or the
    /// directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce_ms: u64) -> notify::Result<Self> {
        // OS events carry canonical paths.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        debug!(root = %watch_root.display(), target = %target_path.display(), "watching");

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            pending: DelayedTask::new(debounce_ms),
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Drain pending events; true once a change has settled.
    pub fn take_change_ready(&mut self, now_ms: u64) -> bool {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => self.pending.queue((), now_ms),
                Ok(ev) => debug!(kind = ?ev.kind, paths = ?ev.paths, "ignoring unrelated event"),
                Err(err) => warn!(%err, "watch error"),
            }
        }
        self.pending.take_ready(now_ms).is_some()
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn event_for(path: PathBuf) -> Event {
        Event {
            kind: EventKind::Any,
            paths: vec![path],
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_directory_event_is_relevant() {
        let dir = tempdir().unwrap();
        let canonical_dir = dir.path().canonicalize().unwrap();
        let path = canonical_dir.join("page.html");
        std::fs::write(&path, "<p>hi</p>").unwrap();
        let watcher = FileWatcher::new(&path, 10).unwrap();
        assert!(watcher.is_relevant(&event_for(canonical_dir)));
    }

    #[test]
    fn test_sibling_file_is_not_relevant() {
        let dir = tempdir().unwrap();
        let canonical_dir = dir.path().canonicalize().unwrap();
        let path = canonical_dir.join("page.html");
        std::fs::write(&path, "<p>hi</p>").unwrap();
        let watcher = FileWatcher::new(&path, 10).unwrap();
        assert!(!watcher.is_relevant(&event_for(canonical_dir.join("other.html"))));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        assert_eq!(watch_root_for(Path::new("page.html")), PathBuf::from("."));
    }

    #[test]
    fn test_real_file_modification_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("watched.html");
        std::fs::write(&path, "<p>before</p>").unwrap();
        let mut watcher = FileWatcher::new(&path, 50).unwrap();

        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "<p>after</p>").unwrap();

        let start = Instant::now();
        let deadline = Duration::from_secs(5);
        let mut detected = false;
        while start.elapsed() < deadline {
            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap();
            if watcher.take_change_ready(now_ms) {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(detected, "modification should be reported within 5 seconds");
    }
}
