//! Downloadable test doubles and library fixtures

use std::sync::{Arc, Mutex};
use std::time::Duration;

use media_dl::{
    BasicInfo, DownloadStatus, Downloadable, ItemId, MediaType, Movie, Playable,
    ScriptedTransport, Song, StatusCallback,
};

/// Item that reports a fixed sequence of statuses after a delay.
pub struct ScriptedItem {
    id: ItemId,
    delay: Duration,
    statuses: Vec<DownloadStatus>,
}

impl ScriptedItem {
    /// Completes after `delay`
    pub fn completing(delay: Duration) -> Arc<Self> {
        Self::reporting(delay, vec![DownloadStatus::Completed])
    }

    /// Fails with `reason` after `delay`
    pub fn failing(delay: Duration, reason: &str) -> Arc<Self> {
        Self::reporting(delay, vec![DownloadStatus::failed(reason)])
    }

    /// Reports `statuses` in order after `delay`
    pub fn reporting(delay: Duration, statuses: Vec<DownloadStatus>) -> Arc<Self> {
        Arc::new(Self {
            id: ItemId::new(),
            delay,
            statuses,
        })
    }
}

impl Downloadable for ScriptedItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn begin_download(&self, on_status: StatusCallback) {
        let delay = self.delay;
        let statuses = self.statuses.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for status in statuses {
                on_status.call(status);
            }
        });
    }
}

/// Item that keeps its callback but never reports anything.
#[derive(Default)]
pub struct SilentItem {
    id: ItemId,
    parked: Mutex<Vec<StatusCallback>>,
}

impl SilentItem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Downloadable for SilentItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn begin_download(&self, on_status: StatusCallback) {
        self.parked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(on_status);
    }
}

/// Item that drops its callback without ever reporting.
pub struct AbandoningItem {
    id: ItemId,
}

impl AbandoningItem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { id: ItemId::new() })
    }
}

impl Downloadable for AbandoningItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn begin_download(&self, on_status: StatusCallback) {
        on_status.call(DownloadStatus::Pending);
    }
}

/// Song served by a scripted transport that completes after `latency`
pub fn song(title: &str, artist: &str, latency: Duration) -> Arc<Song> {
    Arc::new(Song::new(
        BasicInfo::new(title, MediaType::Audio),
        Duration::from_secs(300),
        artist,
        format!("https://example.com/{}.mp3", title.to_lowercase().replace(' ', "-"))
            .parse()
            .unwrap(),
        Arc::new(ScriptedTransport::completing(latency)),
    ))
}

/// Movie (never downloadable)
pub fn movie(title: &str) -> Arc<Movie> {
    Arc::new(Movie::new(
        BasicInfo::new(title, MediaType::Video),
        Duration::from_secs(9000),
        "Christopher Nolan",
    ))
}

/// The library from the media example: two songs around a movie
pub fn mixed_library() -> Vec<Arc<dyn Playable>> {
    vec![
        song("Bohemian Rhapsody", "Queen", Duration::from_millis(30)) as Arc<dyn Playable>,
        movie("Inception") as Arc<dyn Playable>,
        song("Stairway to Heaven", "Led Zeppelin", Duration::from_millis(10)) as Arc<dyn Playable>,
    ]
}
