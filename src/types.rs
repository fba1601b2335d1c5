//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Failure reason recorded when a run is cancelled before an item settles
pub const REASON_CANCELLED: &str = "cancelled";

/// Failure reason recorded when every status callback is dropped before a terminal status
pub const REASON_ABANDONED: &str = "download abandoned without a terminal status";

/// Failure reason recorded for library entries without the download capability
pub const REASON_NOT_DOWNLOADABLE: &str = "item is not downloadable";

/// Unique identifier for a downloadable item
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new random ItemId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ItemId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ItemId> for Uuid {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Status reported by a download operation
///
/// `Completed` and `Failed` are terminal; `Pending` and `Downloading` are transient
/// and may be reported any number of times before the terminal status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Accepted but not started
    Pending,
    /// Transfer in progress
    Downloading {
        /// Fraction transferred (0.0 to 1.0)
        progress: f64,
    },
    /// Transfer finished successfully
    Completed,
    /// Transfer failed
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

impl DownloadStatus {
    /// Create a `Downloading` status, clamping `progress` into `[0, 1]` (NaN becomes 0)
    pub fn downloading(progress: f64) -> Self {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        DownloadStatus::Downloading { progress }
    }

    /// Create a `Failed` status with the given reason
    pub fn failed(reason: impl Into<String>) -> Self {
        DownloadStatus::Failed {
            reason: reason.into(),
        }
    }

    /// Status recorded for items whose unit was cancelled
    pub fn cancelled() -> Self {
        Self::failed(REASON_CANCELLED)
    }

    /// Status recorded for items that did not settle within `timeout`
    pub fn timed_out(timeout: Duration) -> Self {
        Self::failed(format!("timed out after {}ms", timeout.as_millis()))
    }

    /// Whether no further updates are expected after this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed { .. }
        )
    }

    /// Whether this is the `Completed` status
    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadStatus::Completed)
    }

    /// Whether this is a `Failed` status
    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadStatus::Failed { .. })
    }

    /// Failure reason, if this is a `Failed` status
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DownloadStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Pending => write!(f, "pending"),
            DownloadStatus::Downloading { progress } => {
                write!(f, "downloading ({:.0}%)", progress * 100.0)
            }
            DownloadStatus::Completed => write!(f, "completed"),
            DownloadStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Media kind of a library item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Music, podcasts
    Audio,
    /// Films, clips
    Video,
    /// Books, transcripts
    Text,
}

impl MediaType {
    /// Lowercase name used in display titles
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Text => "text",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and descriptive metadata shared by every library item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    /// Stable identity, also used as the batch aggregation key
    pub id: ItemId,
    /// Title
    pub title: String,
    /// Media kind
    pub media_type: MediaType,
}

impl BasicInfo {
    /// Create metadata with a fresh identity
    pub fn new(title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: ItemId::new(),
            title: title.into(),
            media_type,
        }
    }
}

/// Event emitted by the batch coordinator
///
/// Consumers subscribe via [`crate::BatchCoordinator::subscribe`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A batch run started
    BatchStarted {
        /// Number of input items
        items: usize,
        /// When the run started
        started_at: DateTime<Utc>,
    },

    /// Transient status forwarded from a download operation
    Progress {
        /// Item ID
        id: ItemId,
        /// The transient status (`pending` or `downloading`)
        status: DownloadStatus,
    },

    /// An item reached its terminal status
    ItemResolved {
        /// Item ID
        id: ItemId,
        /// The terminal status
        status: DownloadStatus,
    },

    /// Every item of a batch run has been recorded
    BatchComplete {
        /// Items that completed
        completed: usize,
        /// Items that failed
        failed: usize,
        /// When the run finished
        finished_at: DateTime<Utc>,
    },
}
