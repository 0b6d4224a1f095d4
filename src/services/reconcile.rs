//! Add/update/delete planning for a reconciliation pass.
//!
//! Pure diffing by external identifier; nothing here touches storage.

use crate::db::tracked::TrackedItem;
use std::collections::{BTreeSet, HashSet};

/// What a pass must change to make local storage mirror the remote set.
#[derive(Debug)]
pub struct ReconcilePlan<T: TrackedItem> {
    /// Remote items with no local row.
    pub to_add: Vec<T>,

    /// Remote items that already have a local row.
    pub to_update: Vec<T>,

    /// Local keys absent from the remote set, sorted.
    pub to_delete: Vec<T::Key>,
}

impl<T: TrackedItem> ReconcilePlan<T> {
    /// Diff the local key set against the filtered remote items.
    ///
    /// Remote order is preserved. When the remote returns the same key more
    /// than once, the first occurrence wins.
    pub fn build(local: impl IntoIterator<Item = T::Key>, remote: Vec<T>) -> Self {
        let local: BTreeSet<T::Key> = local.into_iter().collect();
        let mut seen = HashSet::with_capacity(remote.len());
        let mut to_add = Vec::new();
        let mut to_update = Vec::new();

        for item in remote {
            let key = item.key();
            if !seen.insert(key.clone()) {
                log::warn!("Ignoring duplicate remote item {} in {}", key, T::TABLE);
                continue;
            }

            if local.contains(&key) {
                to_update.push(item);
            } else {
                to_add.push(item);
            }
        }

        let to_delete = local.into_iter().filter(|k| !seen.contains(k)).collect();

        Self {
            to_add,
            to_update,
            to_delete,
        }
    }

    /// Keys of the items to update.
    pub fn update_keys(&self) -> Vec<T::Key> {
        self.to_update.iter().map(TrackedItem::key).collect()
    }

    /// Whether the pass has nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}
