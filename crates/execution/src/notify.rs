//! Cycle result notifications.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, info, warn};

use crate::error::Outcome;
use crate::report::CycleResult;

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The HTTP request could not be sent
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The receiver answered with a non-success status
    #[error("webhook rejected notification (status {status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },
}

/// Receives the result of every cycle that attempted at least one project.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    /// Deliver one cycle result.
    async fn emit(&self, result: &CycleResult) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

#[async_trait]
impl NotificationEmitter for NullEmitter {
    async fn emit(&self, _result: &CycleResult) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes each project outcome as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn emit(&self, result: &CycleResult) -> Result<(), NotifyError> {
        info!(
            cycle_id = %result.cycle_id,
            attempted = result.attempted,
            succeeded = result.succeeded,
            skipped = result.skipped,
            failed = result.failed,
            "Cycle summary"
        );
        for report in &result.reports {
            let reason = report.reason.as_deref().unwrap_or("");
            match report.outcome {
                Outcome::Failed => warn!(
                    cycle_id = %result.cycle_id,
                    project_id = %report.project_id,
                    outcome = %report.outcome,
                    reason,
                    "Project outcome"
                ),
                _ => info!(
                    cycle_id = %result.cycle_id,
                    project_id = %report.project_id,
                    outcome = %report.outcome,
                    roles = ?report.roles,
                    reason,
                    "Project outcome"
                ),
            }
        }
        Ok(())
    }
}

/// POSTs the JSON cycle result to a chat webhook.
#[derive(Debug, Clone)]
pub struct WebhookEmitter {
    client: Client,
    url: String,
}

impl WebhookEmitter {
    /// Create an emitter for `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationEmitter for WebhookEmitter {
    async fn emit(&self, result: &CycleResult) -> Result<(), NotifyError> {
        debug!(url = %self.url, reports = result.reports.len(), "Posting cycle result");

        let response = self.client.post(&self.url).json(result).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}
