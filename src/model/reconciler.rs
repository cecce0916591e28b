//! Turns window server snapshots into a numbered list of [`Space`]s.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use super::name_store::{NameMap, NameRecord, NameStore};
use super::space::{DEFAULT_DESKTOP_NAME, Space, fullscreen_default_name};
use crate::sys::display_server::{DisplayRecord, DisplayServer, SpaceId, SpaceRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The window server returned nothing usable. Prior state is kept and the
    /// next trigger retries.
    #[error("display server snapshot unavailable")]
    Unavailable,
    /// No display has a current space we can resolve. Seen transiently while
    /// the window server switches spaces.
    #[error("can't find current space")]
    NoActiveSpace,
}

/// The part of a snapshot the poller compares: which spaces exist and which
/// are current. Cheap to compute, no names involved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDigest {
    pub space_ids: BTreeSet<SpaceId>,
    /// Current space of every display, in display order.
    pub active_ids: Vec<SpaceId>,
}

impl SnapshotDigest {
    pub fn of(displays: &[DisplayRecord]) -> Self {
        SnapshotDigest {
            space_ids: displays
                .iter()
                .flat_map(|d| d.spaces.iter().map(|s| s.managed_space_id))
                .collect(),
            active_ids: displays.iter().map(|d| d.active_space_id).collect(),
        }
    }
}

pub struct SpaceStateReconciler<D, N> {
    display_server: D,
    names: N,
    last_digest: Option<SnapshotDigest>,
}

impl<D: DisplayServer, N: NameStore> SpaceStateReconciler<D, N> {
    pub fn new(display_server: D, names: N) -> Self {
        Self {
            display_server,
            names,
            last_digest: None,
        }
    }

    pub fn names(&self) -> &N {
        &self.names
    }

    pub fn into_names(self) -> N {
        self.names
    }

    pub fn last_digest(&self) -> Option<&SnapshotDigest> {
        self.last_digest.as_ref()
    }

    /// Runs a full pass. On error nothing is mutated and nothing is saved.
    #[instrument(level = "debug", skip(self))]
    pub fn reconcile(&mut self) -> Result<Vec<Space>, ReconcileError> {
        let displays = self.display_server.snapshot().ok_or(ReconcileError::Unavailable)?;
        if displays.is_empty() {
            return Err(ReconcileError::Unavailable);
        }
        check_active_spaces(&displays)?;

        let saved = self.names.load();
        let mut builder = SpaceBuilder {
            display_server: &self.display_server,
            saved: &saved,
            next_number: 1,
        };
        let spaces: Vec<Space> = displays.iter().flat_map(|d| builder.build_display(d)).collect();

        self.persist_names(&spaces);
        self.last_digest = Some(SnapshotDigest::of(&displays));
        trace!(count = spaces.len(), "reconciled spaces");
        Ok(spaces)
    }

    /// Fetches a snapshot and reduces it to a digest, without resolving
    /// names. `None` if the window server returned nothing usable.
    pub fn sample_digest(&self) -> Option<SnapshotDigest> {
        let displays = self.display_server.snapshot()?;
        if displays.is_empty() {
            return None;
        }
        Some(SnapshotDigest::of(&displays))
    }

    /// Whether `digest` differs from what the last successful pass saw.
    pub fn has_changed(&self, digest: &SnapshotDigest) -> bool {
        self.last_digest.as_ref() != Some(digest)
    }

    /// Merges the fresh numbering into what is stored now rather than what
    /// was loaded at the start of the pass, so a rename written by another
    /// process in between survives. Stored names win over built ones.
    fn persist_names(&self, spaces: &[Space]) {
        let stored = self.names.load();
        let mut updated = stored.clone();
        for space in spaces {
            updated
                .entry(space.space_id.clone())
                .and_modify(|r| r.space_number = space.space_number)
                .or_insert_with(|| NameRecord {
                    space_number: space.space_number,
                    space_name: space.space_name.clone(),
                });
        }
        if updated == stored {
            return;
        }
        if let Err(e) = self.names.save(&updated) {
            warn!("failed to save space names: {e}");
        }
    }
}

fn check_active_spaces(displays: &[DisplayRecord]) -> Result<(), ReconcileError> {
    if displays.iter().any(|d| d.active_space_id == SpaceId::INVALID) {
        warn!("can't find current space");
        return Err(ReconcileError::NoActiveSpace);
    }
    let resolvable = displays
        .iter()
        .any(|d| d.spaces.iter().any(|s| s.managed_space_id == d.active_space_id));
    if !resolvable {
        warn!("can't find current space: no display lists its active space");
        return Err(ReconcileError::NoActiveSpace);
    }
    Ok(())
}

struct SpaceBuilder<'a, D> {
    display_server: &'a D,
    saved: &'a NameMap,
    next_number: u32,
}

impl<D: DisplayServer> SpaceBuilder<'_, D> {
    fn build_display(&mut self, display: &DisplayRecord) -> Vec<Space> {
        let mut last_desktop = 0;
        let mut spaces = Vec::with_capacity(display.spaces.len());

        for record in &display.spaces {
            let is_full_screen = record.is_full_screen_tile;
            let desktop_number = if is_full_screen {
                None
            } else {
                last_desktop += 1;
                Some(last_desktop)
            };

            let space_id = record.managed_space_id.to_string();
            let space_name = match self.saved.get(&space_id) {
                Some(saved) => saved.space_name.clone(),
                None => self.default_name(record),
            };

            spaces.push(Space {
                display_id: display.display_id.clone(),
                space_id,
                space_name,
                space_number: self.next_number,
                desktop_number,
                is_current_space: record.managed_space_id == display.active_space_id,
                is_full_screen,
            });
            self.next_number += 1;
        }

        spaces
    }

    fn default_name(&self, record: &SpaceRecord) -> String {
        if !record.is_full_screen_tile {
            return DEFAULT_DESKTOP_NAME.to_string();
        }
        let app_name = record.owner_pid.and_then(|pid| self.display_server.app_name(pid));
        if app_name.is_none() {
            debug!(space = %record.managed_space_id, "fullscreen owner not resolvable");
        }
        fullscreen_default_name(app_name.as_deref())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;

    use nix::libc::pid_t;
    use serde_json::{Value, json};

    use crate::model::name_store::{NameMap, NameStore, NameStoreError};
    use crate::sys::display_server::DisplayServer;

    /// Loads nothing and refuses every write, like a names file on a
    /// read-only volume.
    #[derive(Default)]
    pub struct ReadOnlyNameStore {
        pub save_attempts: Cell<usize>,
    }

    impl NameStore for ReadOnlyNameStore {
        fn load(&self) -> NameMap {
            NameMap::new()
        }

        fn save(&self, _names: &NameMap) -> Result<(), NameStoreError> {
            self.save_attempts.set(self.save_attempts.get() + 1);
            Err(NameStoreError::Io {
                path: PathBuf::from("/read-only/space_names.ron"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        }
    }

    /// A scripted window server. Counts every snapshot request.
    #[derive(Default)]
    pub struct FakeDisplayServer {
        pub table: RefCell<Option<Value>>,
        pub apps: HashMap<pid_t, String>,
        pub fetches: Cell<usize>,
    }

    impl FakeDisplayServer {
        pub fn new(table: Value) -> Self {
            Self {
                table: RefCell::new(Some(table)),
                ..Default::default()
            }
        }

        pub fn set(&self, table: Value) {
            self.table.replace(Some(table));
        }

        pub fn fail(&self) {
            self.table.replace(None);
        }
    }

    impl DisplayServer for FakeDisplayServer {
        fn managed_display_spaces(&self) -> Option<Value> {
            self.fetches.set(self.fetches.get() + 1);
            self.table.borrow().clone()
        }

        fn app_name(&self, pid: pid_t) -> Option<String> {
            self.apps.get(&pid).cloned()
        }
    }

    /// `(id, fullscreen owner)` pairs; `Some(pid)` marks a fullscreen tile.
    pub fn display(id: &str, active: i64, spaces: &[(i64, Option<i64>)]) -> Value {
        let spaces: Vec<Value> = spaces
            .iter()
            .map(|&(sid, owner)| match owner {
                Some(pid) => json!({
                    "ManagedSpaceID": sid,
                    "TileLayoutManager": { "Age": 1 },
                    "pid": pid,
                }),
                None => json!({ "ManagedSpaceID": sid, "type": 0 }),
            })
            .collect();
        json!({
            "Display Identifier": id,
            "Current Space": { "ManagedSpaceID": active },
            "Spaces": spaces,
        })
    }

    /// Display A: 1 (desktop, current), 2 (fullscreen Terminal).
    /// Display B: 3 (desktop, current).
    pub fn two_displays() -> Value {
        json!([
            display("A", 1, &[(1, None), (2, Some(100))]),
            display("B", 3, &[(3, None)]),
        ])
    }
}
