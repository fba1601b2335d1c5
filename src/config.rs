//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Largest accepted event channel capacity
///
/// The broadcast channel allocates its whole ring buffer up front, rounded up to a
/// power of two.
pub const MAX_EVENT_BUFFER: usize = 1 << 20;

/// Configuration for [`BatchCoordinator`](crate::BatchCoordinator)
///
/// Every field has a default, so `{}` is a valid JSON configuration. The defaults
/// reproduce the plain fork-join behavior: every unit runs at once and waits
/// indefinitely for its item's terminal status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of downloads in flight at once (None = unbounded)
    ///
    /// One unit is still spawned per item; units beyond the bound wait for a
    /// permit before starting their download.
    #[serde(default)]
    pub max_concurrent: Option<usize>,

    /// Per-item timeout in milliseconds (None = wait indefinitely)
    ///
    /// An item that has not reached a terminal status when the timeout expires
    /// is recorded as failed.
    #[serde(default, with = "optional_duration_ms_serde")]
    pub item_timeout: Option<Duration>,

    /// Capacity of the event broadcast channel (default: 1024, at most [`MAX_EVENT_BUFFER`])
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Forward transient statuses to subscribers as progress events (default: true)
    #[serde(default = "default_true")]
    pub forward_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            item_timeout: None,
            event_buffer: default_event_buffer(),
            forward_progress: true,
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent must be at least 1 when set".to_string(),
                key: Some("max_concurrent".to_string()),
            });
        }
        if let Some(limit) = self.max_concurrent
            && limit > Semaphore::MAX_PERMITS
        {
            return Err(Error::Config {
                message: format!(
                    "max_concurrent must be at most {} (got {limit})",
                    Semaphore::MAX_PERMITS
                ),
                key: Some("max_concurrent".to_string()),
            });
        }
        if self.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be at least 1".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        if self.event_buffer > MAX_EVENT_BUFFER {
            return Err(Error::Config {
                message: format!(
                    "event_buffer must be at most {MAX_EVENT_BUFFER} (got {})",
                    self.event_buffer
                ),
                key: Some("event_buffer".to_string()),
            });
        }
        if self.item_timeout == Some(Duration::ZERO) {
            return Err(Error::Config {
                message: "item_timeout must be positive when set".to_string(),
                key: Some("item_timeout".to_string()),
            });
        }
        Ok(())
    }
}

fn default_event_buffer() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

// Optional Duration serialization helper (milliseconds)
mod optional_duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
