//! Picks up renames made by other processes, such as a separate
//! `spaceman rename` invocation, by watching the names file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, DebouncedEventKind, new_debouncer};
use tracing::{info, trace, warn};

use super::space_observer::{self, Event};

const DEBOUNCE: Duration = Duration::from_millis(250);

pub struct NameWatcher {
    file: PathBuf,
    observer_tx: space_observer::Sender,
}

impl NameWatcher {
    pub fn new(file: PathBuf, observer_tx: space_observer::Sender) -> Self {
        Self { file, observer_tx }
    }

    /// Runs until the observer goes away. Errors only come from setting up
    /// the watch.
    pub async fn run(self) -> notify::Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DebouncedEvent>();

        let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for e in events {
                    if e.kind == DebouncedEventKind::Any {
                        let _ = tx.send(e);
                    }
                }
            }
            Err(e) => warn!("name watcher: {e}"),
        })?;

        // Watch the directory so the file being replaced by rename is seen.
        let Some(dir) = self.file.parent().filter(|p| !p.as_os_str().is_empty()) else {
            warn!("names file {:?} has no parent directory; not watching", self.file);
            return Ok(());
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("could not create {dir:?}: {e}");
        }
        debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
        info!("watching {:?}", dir);

        while let Some(event) = rx.recv().await {
            if !is_relevant(&self.file, &event.path) {
                continue;
            }
            trace!("names file changed: {:?}", event.path);
            if self.observer_tx.try_send(Event::NamesFileChanged).is_err() {
                break;
            }
        }

        Ok(())
    }
}

fn is_relevant(file: &Path, event_path: &Path) -> bool {
    if event_path == file {
        return true;
    }
    // The watched directory may be reported through a different but
    // equivalent path, e.g. behind a symlink.
    event_path.file_name().is_some_and(|n| Some(n) == file.file_name())
}
