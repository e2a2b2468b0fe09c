// ABOUTME: Fixed-interval progress poller for a submitted analysis job
// ABOUTME: Runs as a cancellable task and streams progress updates to the caller

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::remote::{ProgressResponse, RemoteClient, ResultsView};

/// Delay between polls while the job is running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Delay before retrying after a failed poll.
pub const DEFAULT_ERROR_INTERVAL: Duration = Duration::from_millis(1000);
/// Percent added to the display after a failed poll.
pub const DEFAULT_ERROR_INCREMENT: u8 = 5;
/// Faked progress never goes past this value.
pub const DEFAULT_ERROR_CAP: u8 = 95;

/// Anything that can report the progress of a job by id.
pub trait ProgressSource: Send + Sync + 'static {
    fn fetch_progress(
        &self,
        upload_id: &str,
    ) -> impl Future<Output = Result<ProgressResponse>> + Send;
}

impl ProgressSource for RemoteClient {
    fn fetch_progress(
        &self,
        upload_id: &str,
    ) -> impl Future<Output = Result<ProgressResponse>> + Send {
        self.get_progress(upload_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub error_interval: Duration,
    pub error_increment: u8,
    pub error_cap: u8,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            error_interval: DEFAULT_ERROR_INTERVAL,
            error_increment: DEFAULT_ERROR_INCREMENT,
            error_cap: DEFAULT_ERROR_CAP,
        }
    }
}

impl PollerConfig {
    /// Displayed percent after a failed poll.
    ///
    /// Keeps the bar moving during outages without ever claiming completion.
    pub fn degraded_percent(&self, current: u8) -> u8 {
        current
            .saturating_add(self.error_increment)
            .min(self.error_cap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// The server answered; `percent` is its value, clamped to 0..=100.
    Reported {
        percent: u8,
        status: Option<String>,
    },
    /// The poll failed and the displayed value was nudged forward.
    Degraded { percent: u8, error: String },
    /// The job finished and produced a result.
    Complete { xray_id: String },
}

impl ProgressUpdate {
    pub fn percent(&self) -> u8 {
        match self {
            ProgressUpdate::Reported { percent, .. } => *percent,
            ProgressUpdate::Degraded { percent, .. } => *percent,
            ProgressUpdate::Complete { .. } => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Navigate to `path` on the analysis server.
    Complete { xray_id: String, path: String },
    /// Progress hit 100 without an `xray_id`; nothing to navigate to.
    MissingResultId,
    /// Stopped through the handle before the job finished.
    Cancelled { percent: u8 },
}

fn display_percent(reported: i64) -> u8 {
    reported.clamp(0, 100) as u8
}

pub struct ProgressPoller<S> {
    source: Arc<S>,
    config: PollerConfig,
    view: ResultsView,
}

impl<S> Clone for ProgressPoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            config: self.config,
            view: self.view,
        }
    }
}

impl<S: ProgressSource> ProgressPoller<S> {
    pub fn new(source: Arc<S>, config: PollerConfig) -> Self {
        Self {
            source,
            config,
            view: ResultsView::Xray,
        }
    }

    pub fn with_view(mut self, view: ResultsView) -> Self {
        self.view = view;
        self
    }

    /// Start polling `upload_id` on a background task.
    pub fn spawn(&self, upload_id: String) -> PollHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move { poller.run(upload_id, tx, task_cancel).await });

        PollHandle {
            updates: rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// Poll until the job completes or `cancel` fires.
    ///
    /// Only one request is in flight at a time: the next one is scheduled
    /// after the previous one resolves. Failed polls never stop the loop.
    pub async fn run(
        &self,
        upload_id: String,
        updates: mpsc::UnboundedSender<ProgressUpdate>,
        cancel: CancellationToken,
    ) -> PollOutcome {
        let mut percent: u8 = 0;
        let mut last_reported: Option<i64> = None;

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(upload_id = %upload_id, percent, "Progress polling cancelled");
                    return PollOutcome::Cancelled { percent };
                }
                result = self.source.fetch_progress(&upload_id) => result,
            };

            let delay = match fetched {
                Ok(report) => {
                    if let Some(previous) = last_reported {
                        if report.progress < previous {
                            tracing::warn!(
                                upload_id = %upload_id,
                                previous,
                                reported = report.progress,
                                "Server reported lower progress than before"
                            );
                        }
                    }
                    last_reported = Some(report.progress);
                    percent = display_percent(report.progress);

                    if report.progress >= 100 {
                        return match report.xray_id {
                            Some(xray_id) => {
                                let path = self.view.path(&xray_id);
                                tracing::info!(upload_id = %upload_id, xray_id = %xray_id, path = %path, "Analysis complete");
                                let _ = updates.send(ProgressUpdate::Complete {
                                    xray_id: xray_id.clone(),
                                });
                                PollOutcome::Complete { xray_id, path }
                            }
                            None => {
                                tracing::error!(upload_id = %upload_id, "Progress reached 100 without an xray_id");
                                PollOutcome::MissingResultId
                            }
                        };
                    }

                    tracing::debug!(upload_id = %upload_id, percent, status = ?report.status, "Progress update");
                    let _ = updates.send(ProgressUpdate::Reported {
                        percent,
                        status: report.status,
                    });
                    self.config.interval
                }
                Err(e) => {
                    percent = self.config.degraded_percent(percent);
                    let error = format!("{:#}", e);
                    tracing::debug!(upload_id = %upload_id, percent, error = %error, "Error checking progress");
                    let _ = updates.send(ProgressUpdate::Degraded { percent, error });
                    self.config.error_interval
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(upload_id = %upload_id, percent, "Progress polling cancelled");
                    return PollOutcome::Cancelled { percent };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Handle to a running poller. Dropping it cancels the task.
pub struct PollHandle {
    updates: mpsc::UnboundedReceiver<ProgressUpdate>,
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
    _guard: DropGuard,
}

impl PollHandle {
    /// Next update, or `None` once the poller has stopped.
    pub async fn next_update(&mut self) -> Option<ProgressUpdate> {
        self.updates.recv().await
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the poller to stop and return how it ended.
    pub async fn finish(self) -> Result<PollOutcome> {
        self.task.await.context("Progress poller task failed")
    }
}
