//! Database index reconciliation.
//!
//! The index maps a container id to the databases last fetched for it. Every
//! fetch covers exactly one container, so merging replaces that container's
//! entry and leaves the rest alone.

use crate::model::{DatabaseContainer, SqlDatabase};
use std::collections::{HashMap, HashSet};

/// Databases per container id.
pub type DatabaseIndex = HashMap<String, Vec<SqlDatabase>>;

/// Replace or insert the entry for `container_id`.
pub fn reconcile(existing: &DatabaseIndex, container_id: &str, fresh: Vec<SqlDatabase>) -> DatabaseIndex {
    let mut index = existing.clone();
    index.insert(container_id.to_string(), fresh);
    index
}

/// [`reconcile`] for a fetched record.
pub fn reconcile_record(existing: &DatabaseIndex, record: DatabaseContainer) -> DatabaseIndex {
    reconcile(existing, &record.container_id, record.databases)
}

/// Drop entries whose container is no longer listed. Returns the removed ids.
pub fn prune<'a>(index: &mut DatabaseIndex, live_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let live: HashSet<&str> = live_ids.into_iter().collect();
    let stale: Vec<String> = index
        .keys()
        .filter(|id| !live.contains(id.as_str()))
        .cloned()
        .collect();

    for id in &stale {
        index.remove(id);
    }
    stale
}
