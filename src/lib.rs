//! # media-dl
//!
//! Concurrent batch download coordinator for media libraries.
//!
//! Download operations in a media library report through callbacks: some progress
//! updates, then one terminal status. media-dl turns each of those operations into a
//! single awaitable result ([`StatusBridge`]), runs one task per item, and joins
//! everything into a [`ResultMap`] keyed by item identity ([`BatchCoordinator`]).
//!
//! - **Exactly-once** - each item settles with its first terminal status; extra
//!   callbacks are discarded
//! - **Fork-join** - a run returns only when every item has settled, and one failed
//!   item never cancels the others
//! - **Event-driven** - progress and resolutions are broadcast to subscribers
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use media_dl::{BasicInfo, BatchCoordinator, Config, Downloadable, MediaType, Song};
//! use media_dl::transport::ScriptedTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = BatchCoordinator::new(Config::default())?;
//!
//!     let song = Song::new(
//!         BasicInfo::new("Bohemian Rhapsody", MediaType::Audio),
//!         Duration::from_secs(355),
//!         "Queen",
//!         "https://example.com/bohemian.mp3".parse()?,
//!         Arc::new(ScriptedTransport::completing(Duration::from_secs(1))),
//!     );
//!
//!     let items: Vec<Arc<dyn Downloadable>> = vec![Arc::new(song)];
//!     let results = coordinator.run(items).await?;
//!     for (id, status) in &results {
//!         println!("{id}: {status}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch coordination: bridge, units, aggregation
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Media library model
pub mod library;
/// Transport abstraction and simulated transport
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use batch::{
    BatchCoordinator, DiscardedUpdates, Downloadable, ResultMap, StatusBridge, StatusCallback,
};
pub use config::Config;
pub use error::{Error, Result};
pub use library::{MediaItem, Movie, Playable, Song, filter_library, start_playback};
pub use transport::{ScriptStep, ScriptedTransport, Transport};
pub use types::{BasicInfo, DownloadStatus, Event, ItemId, MediaType};
