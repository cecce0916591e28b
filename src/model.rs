pub mod changes;
pub mod name_store;
pub mod reconciler;
pub mod space;

pub use changes::{ChangeTracker, SpaceChanges};
pub use name_store::{FileNameStore, MemoryNameStore, NameMap, NameRecord, NameStore};
pub use reconciler::{ReconcileError, SnapshotDigest, SpaceStateReconciler};
pub use space::Space;
