//! Per-item unit of work: bridge one download and hand its terminal status to the collector.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::types::{DownloadStatus, Event, ItemId};

use super::aggregate::UnitResult;
use super::bridge::{Downloadable, StatusBridge};

/// Lifecycle of a unit. Every unit walks the states in order, none skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnitState {
    Spawned,
    /// Bridge started; also passed through by units cancelled before starting one
    AwaitingBridge,
    TerminalReceived,
    Recorded,
}

impl UnitState {
    /// The only legal successor of this state
    pub(crate) fn next(self) -> Option<UnitState> {
        match self {
            UnitState::Spawned => Some(UnitState::AwaitingBridge),
            UnitState::AwaitingBridge => Some(UnitState::TerminalReceived),
            UnitState::TerminalReceived => Some(UnitState::Recorded),
            UnitState::Recorded => None,
        }
    }
}

/// Tracks and traces a unit's state transitions.
pub(crate) struct UnitTracker {
    id: ItemId,
    state: UnitState,
}

impl UnitTracker {
    pub(crate) fn new(id: ItemId) -> Self {
        tracing::debug!(item_id = %id, state = ?UnitState::Spawned, "Unit spawned");
        Self {
            id,
            state: UnitState::Spawned,
        }
    }

    pub(crate) fn state(&self) -> UnitState {
        self.state
    }

    /// Move to the next state; returns the new state
    pub(crate) fn advance(&mut self) -> UnitState {
        let next = self.state.next();
        debug_assert!(next.is_some(), "unit {} advanced past Recorded", self.id);
        if let Some(next) = next {
            tracing::debug!(item_id = %self.id, from = ?self.state, to = ?next, "Unit transition");
            self.state = next;
        }
        self.state
    }

    /// Leave `Spawned` for a unit cancelled while queued for a permit.
    ///
    /// No bridge exists on this path; `AwaitingBridge` is passed through so the unit
    /// still records its result through the same states as every other unit.
    pub(crate) fn pass_through_unstarted(&mut self) -> UnitState {
        debug_assert_eq!(self.state, UnitState::Spawned);
        tracing::debug!(
            item_id = %self.id,
            "Unit cancelled while queued for a permit, download never started"
        );
        self.advance()
    }
}

/// Parameters for running one unit
pub(super) struct UnitParams {
    /// Item to download
    pub(super) item: Arc<dyn Downloadable>,
    /// Channel to the collector
    pub(super) result_tx: mpsc::Sender<UnitResult>,
    /// Progress observer (None when progress forwarding is disabled)
    pub(super) observer: Option<broadcast::Sender<Event>>,
    /// Cancellation token for the whole run
    pub(super) cancel_token: CancellationToken,
    /// Optional per-item timeout
    pub(super) timeout: Option<Duration>,
    /// Optional concurrency bound shared by the run
    pub(super) permits: Option<Arc<Semaphore>>,
}

/// Run one unit: start the download, await its terminal status, hand it to the collector.
///
/// Cancellation and timeout still produce a terminal status, so the collector always
/// receives exactly one result per unit unless the unit panics.
pub(super) async fn run_unit(params: UnitParams) {
    let UnitParams {
        item,
        result_tx,
        observer,
        cancel_token,
        timeout,
        permits,
    } = params;
    let id = item.id();
    let mut tracker = UnitTracker::new(id);

    let status = match acquire_permit(permits, &cancel_token).await {
        Some(_permit) => {
            let bridge = StatusBridge::start(item.as_ref(), observer);
            tracker.advance();
            await_terminal(id, bridge, &cancel_token, timeout).await
        }
        None => {
            tracker.pass_through_unstarted();
            DownloadStatus::cancelled()
        }
    };
    tracker.advance();

    if let Err(e) = result_tx.send((id, status)).await {
        tracing::error!(item_id = %id, state = ?tracker.state(), error = %e, "Collector gone before unit could record its result");
        return;
    }
    tracker.advance();
}

/// Wait for a permit if the run is bounded. Returns `None` if cancelled first.
async fn acquire_permit(
    permits: Option<Arc<Semaphore>>,
    cancel_token: &CancellationToken,
) -> Option<Option<tokio::sync::OwnedSemaphorePermit>> {
    let Some(permits) = permits else {
        return Some(None);
    };
    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => None,
        permit = permits.acquire_owned() => permit.ok().map(Some),
    }
}

/// Race the bridge against cancellation and the optional timeout.
async fn await_terminal(
    id: ItemId,
    bridge: StatusBridge,
    cancel_token: &CancellationToken,
    timeout: Option<Duration>,
) -> DownloadStatus {
    let resolution = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, bridge.resolve()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(item_id = %id, timeout_ms = limit.as_millis() as u64, "Item timed out");
                    DownloadStatus::timed_out(limit)
                }
            },
            None => bridge.resolve().await,
        }
    };

    tokio::select! {
        status = resolution => status,
        _ = cancel_token.cancelled() => {
            tracing::warn!(item_id = %id, "Unit cancelled before item settled");
            DownloadStatus::cancelled()
        }
    }
}
