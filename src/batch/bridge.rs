//! Callback-to-future bridge for a single download operation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, oneshot};

use crate::types::{DownloadStatus, Event, ItemId};

/// Something that can be downloaded.
///
/// `begin_download` starts the operation and returns without waiting for it. The
/// operation reports through `on_status`: any number of transient statuses, then
/// exactly one terminal status. The callback may be cloned and invoked from any
/// thread or task.
pub trait Downloadable: Send + Sync {
    /// Stable identity of the item, unique within a batch
    fn id(&self) -> ItemId;

    /// Start the download, reporting progress and the outcome through `on_status`
    fn begin_download(&self, on_status: StatusCallback);
}

/// Handle a download operation reports its statuses through.
#[derive(Clone)]
pub struct StatusCallback {
    inner: Arc<dyn Fn(DownloadStatus) + Send + Sync>,
}

impl StatusCallback {
    /// Wrap a closure as a status callback
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(DownloadStatus) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Report a status
    pub fn call(&self, status: DownloadStatus) {
        (self.inner)(status)
    }
}

impl std::fmt::Debug for StatusCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCallback").finish_non_exhaustive()
    }
}

/// Shared count of status invocations discarded after resolution.
#[derive(Clone, Debug, Default)]
pub struct DiscardedUpdates(Arc<AtomicU64>);

impl DiscardedUpdates {
    /// Number of invocations discarded so far
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// State shared between the bridge and every clone of its callback.
///
/// Dropping the last callback drops `sender`, which lets the bridge observe that
/// the operation was abandoned.
struct Slot {
    id: ItemId,
    resolved: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<DownloadStatus>>>,
    discarded: DiscardedUpdates,
    observer: Option<broadcast::Sender<Event>>,
}

impl Slot {
    fn deliver(&self, status: DownloadStatus) {
        if !status.is_terminal() {
            // Forwarded under the sender lock, so no progress event can follow the
            // terminal status handed to the receiver
            let guard = self
                .sender
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if self.resolved.load(Ordering::Acquire) {
                drop(guard);
                self.discard(&status);
            } else if let Some(observer) = &self.observer {
                // No subscribers is fine
                observer
                    .send(Event::Progress {
                        id: self.id,
                        status,
                    })
                    .ok();
            }
            return;
        }

        // Exactly-once guard: only the first terminal status wins the swap
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.discard(&status);
            return;
        }

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sender) = sender {
            // Receiver is gone if the unit already gave up (timeout, cancellation)
            if sender.send(status).is_err() {
                tracing::debug!(item_id = %self.id, "Terminal status arrived after the bridge was dropped");
            }
        }
    }

    fn discard(&self, status: &DownloadStatus) {
        self.discarded.0.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            item_id = %self.id,
            status = %status,
            "Discarding status reported after resolution"
        );
    }
}

/// One-shot awaitable for the terminal status of a single download.
///
/// Resolves with the first terminal status reported through [`callback`](Self::callback).
/// Later invocations, terminal or not, are discarded. If every clone of the callback
/// is dropped before a terminal status arrives the bridge resolves as failed; if a
/// callback stays alive but is never invoked, the bridge never resolves.
pub struct StatusBridge {
    id: ItemId,
    slot: Arc<Slot>,
    receiver: oneshot::Receiver<DownloadStatus>,
}

impl StatusBridge {
    /// Create an unattached bridge for `id`
    pub fn new(id: ItemId) -> Self {
        Self::build(id, None)
    }

    /// Create a bridge that forwards transient statuses to `observer`
    pub fn with_observer(id: ItemId, observer: broadcast::Sender<Event>) -> Self {
        Self::build(id, Some(observer))
    }

    fn build(id: ItemId, observer: Option<broadcast::Sender<Event>>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(Slot {
            id,
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            discarded: DiscardedUpdates::default(),
            observer,
        });
        Self { id, slot, receiver }
    }

    /// Create a bridge for `item` and start its download
    pub fn start(item: &dyn Downloadable, observer: Option<broadcast::Sender<Event>>) -> Self {
        let bridge = Self::build(item.id(), observer);
        item.begin_download(bridge.callback());
        bridge
    }

    /// Item this bridge resolves for
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Callback to hand to the download operation
    pub fn callback(&self) -> StatusCallback {
        let slot = Arc::clone(&self.slot);
        StatusCallback::new(move |status| slot.deliver(status))
    }

    /// Counter of invocations discarded after resolution
    pub fn discarded(&self) -> DiscardedUpdates {
        self.slot.discarded.clone()
    }

    /// Whether a terminal status has already been delivered
    pub fn is_resolved(&self) -> bool {
        self.slot.resolved.load(Ordering::Acquire)
    }

    /// Wait for the terminal status
    pub async fn resolve(self) -> DownloadStatus {
        let StatusBridge { id, slot, receiver } = self;
        // Only callbacks may keep the sender alive from here on
        drop(slot);

        match receiver.await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(item_id = %id, "All status callbacks dropped before a terminal status");
                DownloadStatus::failed(crate::types::REASON_ABANDONED)
            }
        }
    }
}

impl std::fmt::Debug for StatusBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBridge")
            .field("id", &self.id)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}
