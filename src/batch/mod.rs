//! Batch download coordination split into focused submodules:
//! - [`bridge`] - Callback-to-future bridge for one download
//! - [`unit`] - Per-item unit of work and its state machine
//! - [`aggregate`] - Result map and the single collector that writes it

mod aggregate;
mod bridge;
mod unit;


pub use aggregate::ResultMap;
pub use bridge::{DiscardedUpdates, Downloadable, StatusBridge, StatusCallback};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::library::Playable;
use crate::types::{DownloadStatus, Event, ItemId, REASON_NOT_DOWNLOADABLE};

use aggregate::collect_results;
use unit::{UnitParams, run_unit};

/// One input slot of a batch run.
enum BatchEntry {
    /// Item with the download capability
    Download(Arc<dyn Downloadable>),
    /// Library entry without the download capability; recorded as failed without a unit
    Unsupported(ItemId),
}

impl BatchEntry {
    fn id(&self) -> ItemId {
        match self {
            BatchEntry::Download(item) => item.id(),
            BatchEntry::Unsupported(id) => *id,
        }
    }
}

/// Runs batches of downloads concurrently and joins their terminal statuses.
///
/// Each call to [`run`](Self::run) spawns one tokio task per item, waits for all of
/// them, and returns a [`ResultMap`] with exactly one terminal status per item. A failed
/// item never cancels its siblings. Cloning is cheap; clones share the event channel
/// and shutdown state.
#[derive(Clone)]
pub struct BatchCoordinator {
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
    /// Parent of every run's cancellation token
    cancel_token: CancellationToken,
    /// Cleared by shutdown; new runs are rejected afterwards
    accepting_new: Arc<AtomicBool>,
}

impl BatchCoordinator {
    /// Create a coordinator after validating `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(config.event_buffer);
        Ok(Self {
            config: Arc::new(config),
            event_tx,
            cancel_token: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribe to batch, progress and resolution events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Whether new runs are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Stop accepting runs and cancel every run in flight.
    ///
    /// Outstanding items of in-flight runs are recorded as failed with reason
    /// `cancelled`, so those runs still return complete maps.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down batch coordinator");
        self.accepting_new.store(false, Ordering::SeqCst);
        self.cancel_token.cancel();
    }

    /// Download every item concurrently and return the terminal status of each.
    ///
    /// Suspends until all items have settled. Item failures are recorded in the map;
    /// the run itself only fails for structural reasons (duplicate identities, no
    /// runtime, a panicking unit, shutdown).
    pub async fn run(&self, items: Vec<Arc<dyn Downloadable>>) -> Result<ResultMap> {
        let entries = items.into_iter().map(BatchEntry::Download).collect();
        self.run_entries(entries).await
    }

    /// Download every downloadable entry of a mixed library.
    ///
    /// Entries without the download capability are recorded as failed with reason
    /// `item is not downloadable` instead of aborting the batch.
    pub async fn run_library(&self, items: &[Arc<dyn Playable>]) -> Result<ResultMap> {
        let entries = items
            .iter()
            .map(|item| {
                let id = item.info().id;
                match Arc::clone(item).as_downloadable() {
                    Some(downloadable) => BatchEntry::Download(downloadable),
                    None => BatchEntry::Unsupported(id),
                }
            })
            .collect();
        self.run_entries(entries).await
    }

    async fn run_entries(&self, entries: Vec<BatchEntry>) -> Result<ResultMap> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }
        ensure_unique(&entries)?;

        let expected = entries.len();
        if expected == 0 {
            tracing::debug!("Empty batch, nothing to spawn");
            return Ok(ResultMap::default());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        tracing::info!(items = expected, "Starting batch");
        self.event_tx
            .send(Event::BatchStarted {
                items: expected,
                started_at: chrono::Utc::now(),
            })
            .ok();

        let run_token = self.cancel_token.child_token();
        // Cancels outstanding units if the caller drops this future mid-run
        let drop_guard = run_token.clone().drop_guard();
        let permits = self
            .config
            .max_concurrent
            .map(|limit| Arc::new(Semaphore::new(limit)));
        let observer = self
            .config
            .forward_progress
            .then(|| self.event_tx.clone());

        let (result_tx, result_rx) = mpsc::channel(expected);
        let mut map = ResultMap::with_capacity(expected);
        let units = FuturesUnordered::new();

        for entry in entries {
            match entry {
                BatchEntry::Unsupported(id) => {
                    tracing::warn!(item_id = %id, "Item has no download capability, recording as failed");
                    let status = DownloadStatus::failed(REASON_NOT_DOWNLOADABLE);
                    // Collector has not started yet, so this is still the only writer
                    map.record(id, status.clone());
                    self.event_tx.send(Event::ItemResolved { id, status }).ok();
                }
                BatchEntry::Download(item) => {
                    let id = item.id();
                    let handle = runtime.spawn(run_unit(UnitParams {
                        item,
                        result_tx: result_tx.clone(),
                        observer: observer.clone(),
                        cancel_token: run_token.clone(),
                        timeout: self.config.item_timeout,
                        permits: permits.clone(),
                    }));
                    units.push(handle.map(move |joined| (id, joined)));
                }
            }
        }
        // Collector finishes once every unit has dropped its sender
        drop(result_tx);

        let (map, unit_failure) = tokio::join!(
            collect_results(map, result_rx, self.event_tx.clone()),
            supervise_units(units, &run_token),
        );
        drop_guard.disarm();

        if let Some(err) = unit_failure {
            return Err(err);
        }
        if map.len() != expected {
            return Err(Error::IncompleteBatch {
                expected,
                recorded: map.len(),
            });
        }

        let completed = map.completed_count();
        let failed = map.failed_count();
        tracing::info!(items = expected, completed, failed, "Batch complete");
        self.event_tx
            .send(Event::BatchComplete {
                completed,
                failed,
                finished_at: chrono::Utc::now(),
            })
            .ok();

        Ok(map)
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("config", &self.config)
            .field("accepting_new", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

/// Reject batches that name the same item twice.
fn ensure_unique(entries: &[BatchEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let id = entry.id();
        if !seen.insert(id) {
            return Err(Error::DuplicateItem(id));
        }
    }
    Ok(())
}

/// Await every unit task. On the first panic or abort, cancel the rest of the run
/// and report that unit; the remaining units still drain so no task outlives the run.
async fn supervise_units<F>(
    mut units: FuturesUnordered<F>,
    run_token: &CancellationToken,
) -> Option<Error>
where
    F: std::future::Future<Output = (ItemId, std::result::Result<(), tokio::task::JoinError>)>,
{
    let mut first_failure = None;
    while let Some((id, joined)) = units.next().await {
        if let Err(e) = joined {
            tracing::error!(item_id = %id, error = %e, "Download unit failed");
            if first_failure.is_none() {
                run_token.cancel();
                first_failure = Some(Error::UnitFailed {
                    id,
                    message: e.to_string(),
                });
            }
        }
    }
    first_failure
}
