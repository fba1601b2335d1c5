//! Media library model: playable items, some of which can also be downloaded.
//!
//! The download capability is discovered through [`Playable::as_downloadable`], so a
//! mixed library can be handed to
//! [`BatchCoordinator::run_library`](crate::BatchCoordinator::run_library) and the
//! items that cannot be downloaded are reported individually rather than breaking the
//! batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use url::Url;

use crate::batch::{Downloadable, StatusCallback};
use crate::transport::Transport;
use crate::types::{BasicInfo, ItemId};

/// Something that can be played.
pub trait Playable: Send + Sync {
    /// Identity and metadata
    fn info(&self) -> &BasicInfo;

    /// Running time
    fn duration(&self) -> Duration;

    /// Whether playback is in progress
    fn is_playing(&self) -> bool;

    /// Start playback
    fn play(&self);

    /// Stop playback
    fn stop(&self);

    /// Title with media type, e.g. `Bohemian Rhapsody (audio)`
    fn display_title(&self) -> String {
        let info = self.info();
        format!("{} ({})", info.title, info.media_type)
    }

    /// The download capability of this item, if it has one
    fn as_downloadable(self: Arc<Self>) -> Option<Arc<dyn Downloadable>> {
        None
    }
}

/// A playable item that can also be downloaded.
pub trait MediaItem: Playable + Downloadable {
    /// Performing artist
    fn artist(&self) -> &str;
}

/// A downloadable track.
pub struct Song {
    info: BasicInfo,
    duration: Duration,
    artist: String,
    remote_url: Url,
    playing: AtomicBool,
    transport: Arc<dyn Transport>,
}

impl Song {
    /// Create a song fetched from `remote_url` through `transport`
    pub fn new(
        info: BasicInfo,
        duration: Duration,
        artist: impl Into<String>,
        remote_url: Url,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            info,
            duration,
            artist: artist.into(),
            remote_url,
            playing: AtomicBool::new(false),
            transport,
        }
    }

    /// Where the song is downloaded from
    pub fn remote_url(&self) -> &Url {
        &self.remote_url
    }
}

impl Playable for Song {
    fn info(&self) -> &BasicInfo {
        &self.info
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
        tracing::info!(item_id = %self.info.id, title = %self.info.title, artist = %self.artist, "Playing song");
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        tracing::info!(item_id = %self.info.id, title = %self.info.title, "Stopped song");
    }

    fn as_downloadable(self: Arc<Self>) -> Option<Arc<dyn Downloadable>> {
        Some(self)
    }
}

impl Downloadable for Song {
    fn id(&self) -> ItemId {
        self.info.id
    }

    fn begin_download(&self, on_status: StatusCallback) {
        tracing::debug!(item_id = %self.info.id, url = %self.remote_url, "Starting song download");
        self.transport.fetch(&self.remote_url, on_status);
    }
}

impl MediaItem for Song {
    fn artist(&self) -> &str {
        &self.artist
    }
}

impl std::fmt::Debug for Song {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Song")
            .field("info", &self.info)
            .field("duration", &self.duration)
            .field("artist", &self.artist)
            .field("remote_url", &self.remote_url.as_str())
            .field("playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}

/// A film. Playable, not downloadable.
#[derive(Debug)]
pub struct Movie {
    info: BasicInfo,
    duration: Duration,
    director: String,
    playing: AtomicBool,
}

impl Movie {
    /// Create a movie
    pub fn new(info: BasicInfo, duration: Duration, director: impl Into<String>) -> Self {
        Self {
            info,
            duration,
            director: director.into(),
            playing: AtomicBool::new(false),
        }
    }

    /// Director
    pub fn director(&self) -> &str {
        &self.director
    }
}

impl Playable for Movie {
    fn info(&self) -> &BasicInfo {
        &self.info
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
        tracing::info!(item_id = %self.info.id, title = %self.info.title, director = %self.director, "Playing movie");
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        tracing::info!(item_id = %self.info.id, title = %self.info.title, "Stopped movie");
    }
}

/// Start playback of every item in order
pub fn start_playback(items: &[Arc<dyn Playable>]) {
    tracing::info!(items = items.len(), "Starting library playback");
    for item in items {
        item.play();
    }
}

/// Items matching `predicate`, in library order
pub fn filter_library<F>(items: &[Arc<dyn Playable>], predicate: F) -> Vec<Arc<dyn Playable>>
where
    F: Fn(&dyn Playable) -> bool,
{
    items
        .iter()
        .filter(|item| predicate(item.as_ref()))
        .cloned()
        .collect()
}
