//! Notification sink port.
//!
//! The engine treats notifications as fire-and-forget: a failed send is
//! logged and never retried here (queueing and retry live in the
//! collaborator behind the sink). Implementations must be cheap to call
//! from the settlement loop.

use async_trait::async_trait;
use paydrift_types::{PaydriftError, Result};
use serde_json::json;

/// Best-effort outbound messaging to a user or the operator audience.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a message. At-least-once from the collaborator's
    /// perspective; the engine only logs failures.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;

    /// Sink name for logging/debugging.
    fn sink_name(&self) -> &'static str;
}

/// Sink that writes messages to the structured log.
///
/// Useful for local runs and as a stand-in where no relay is wired.
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(recipient, subject, body_len = body.len(), "notification");
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "tracing"
    }
}

/// Sink that POSTs messages to an HTTP relay (the mail service lives
/// behind it).
pub struct WebhookSink {
    http: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    /// Build a sink targeting `endpoint`, with a bounded timeout.
    ///
    /// # Errors
    /// Returns [`PaydriftError::Configuration`] if the HTTP client cannot
    /// be constructed.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PaydriftError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let payload = json!({
            "recipient": recipient,
            "subject": subject,
            "body": body,
        });
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaydriftError::GatewayTimeout
                } else {
                    PaydriftError::GatewayRequest {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !resp.status().is_success() {
            return Err(PaydriftError::GatewayRejected {
                reason: format!("relay answered HTTP {}", resp.status().as_u16()),
            });
        }
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "webhook"
    }
}
