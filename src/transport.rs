//! Transport abstraction behind [`Song`](crate::library::Song) downloads.
//!
//! The network side of a download is a black box to this crate. A [`Transport`]
//! receives a URL and a [`StatusCallback`] and reports through it however it likes.
//! [`ScriptedTransport`] replays a fixed sequence of statuses with simulated latency,
//! which is enough for demos and tests.

use std::time::Duration;

use url::Url;

use crate::batch::StatusCallback;
use crate::types::DownloadStatus;

/// Callback-driven download operation for a remote URL.
pub trait Transport: Send + Sync {
    /// Start fetching `url`, reporting through `on_status`.
    ///
    /// Must return without waiting for the transfer and must eventually report
    /// exactly one terminal status.
    fn fetch(&self, url: &Url, on_status: StatusCallback);
}

/// One scripted status, reported `delay` after the previous step.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptStep {
    /// Delay after the previous step (or after the fetch started)
    pub delay: Duration,
    /// Status to report
    pub status: DownloadStatus,
}

impl ScriptStep {
    /// Step reported after `delay`
    pub fn after(delay: Duration, status: DownloadStatus) -> Self {
        Self { delay, status }
    }

    /// Step reported without delay
    pub fn now(status: DownloadStatus) -> Self {
        Self::after(Duration::ZERO, status)
    }
}

/// Simulated transport that replays a script on the tokio runtime.
///
/// Steps with zero delay are reported synchronously from `fetch`, so a script that
/// starts with a progress update delivers it before `fetch` returns.
#[derive(Clone, Debug)]
pub struct ScriptedTransport {
    script: Vec<ScriptStep>,
}

impl ScriptedTransport {
    /// Transport that replays `script` verbatim
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self { script }
    }

    /// Half-way progress right away, completion after `latency`
    pub fn completing(latency: Duration) -> Self {
        Self::new(vec![
            ScriptStep::now(DownloadStatus::downloading(0.5)),
            ScriptStep::after(latency, DownloadStatus::Completed),
        ])
    }

    /// Half-way progress right away, failure with `reason` after `latency`
    pub fn failing(latency: Duration, reason: impl Into<String>) -> Self {
        Self::new(vec![
            ScriptStep::now(DownloadStatus::downloading(0.5)),
            ScriptStep::after(latency, DownloadStatus::failed(reason)),
        ])
    }

    /// Scripted steps
    pub fn script(&self) -> &[ScriptStep] {
        &self.script
    }
}

impl Transport for ScriptedTransport {
    fn fetch(&self, url: &Url, on_status: StatusCallback) {
        tracing::debug!(url = %url, steps = self.script.len(), "Starting scripted transfer");

        let mut steps = self.script.iter().cloned().peekable();
        while let Some(step) = steps.next_if(|step| step.delay.is_zero()) {
            on_status.call(step.status);
        }
        let remaining: Vec<ScriptStep> = steps.collect();
        if remaining.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    for step in remaining {
                        tokio::time::sleep(step.delay).await;
                        on_status.call(step.status);
                    }
                });
            }
            Err(_) => {
                tracing::error!(url = %url, "No tokio runtime for scripted transfer");
                on_status.call(DownloadStatus::failed("no async runtime for transfer"));
            }
        }
    }
}
