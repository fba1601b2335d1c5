//! Result aggregation: the single writer of a batch's result map.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::types::{DownloadStatus, Event, ItemId};

/// Result of one unit: the item and its terminal status.
pub(super) type UnitResult = (ItemId, DownloadStatus);

/// Terminal status of every item in a batch run, keyed by item identity.
///
/// Handed to the caller only after every item has been recorded, so it never
/// contains partial or provisional entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultMap {
    entries: HashMap<ItemId, DownloadStatus>,
}

impl ResultMap {
    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Record the terminal status for `id`.
    ///
    /// Returns `false` and keeps the first entry if `id` was already recorded or
    /// the status is not terminal.
    pub(super) fn record(&mut self, id: ItemId, status: DownloadStatus) -> bool {
        if !status.is_terminal() {
            tracing::warn!(item_id = %id, status = %status, "Refusing to record a transient status");
            return false;
        }
        match self.entries.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => {
                tracing::warn!(item_id = %id, "Item already recorded, keeping first result");
                false
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(status);
                true
            }
        }
    }

    /// Number of recorded items
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch had no items
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Terminal status of `id`
    pub fn get(&self, id: &ItemId) -> Option<&DownloadStatus> {
        self.entries.get(id)
    }

    /// Whether `id` was part of the batch
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterate over all entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &DownloadStatus)> {
        self.entries.iter()
    }

    /// Number of items that completed
    pub fn completed_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_completed()).count()
    }

    /// Number of items that failed
    pub fn failed_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_failed()).count()
    }

    /// Failed items with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&ItemId, &str)> {
        self.entries
            .iter()
            .filter_map(|(id, status)| status.failure_reason().map(|reason| (id, reason)))
    }

    /// Take the underlying map
    pub fn into_inner(self) -> HashMap<ItemId, DownloadStatus> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a ResultMap {
    type Item = (&'a ItemId, &'a DownloadStatus);
    type IntoIter = std::collections::hash_map::Iter<'a, ItemId, DownloadStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Drain unit results into `map` until every sender is dropped.
///
/// This task is the only writer of the map; units never touch it directly.
pub(super) async fn collect_results(
    mut map: ResultMap,
    mut result_rx: mpsc::Receiver<UnitResult>,
    event_tx: broadcast::Sender<Event>,
) -> ResultMap {
    while let Some((id, status)) = result_rx.recv().await {
        tracing::debug!(item_id = %id, status = %status, "Recording item result");
        if map.record(id, status.clone()) {
            event_tx.send(Event::ItemResolved { id, status }).ok();
        }
    }
    map
}
