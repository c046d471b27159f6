//! Best-effort delivery of finished payloads to the backend.
//!
//! [`dispatch`] hands a payload to a background task and returns at once.
//! Delivery failures are logged there and never reach the workflow caller.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WebhookConfig;
use crate::error::{PipelineError, Result};

/// Which callback a payload goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    Inspection,
    Diagnosis,
}

impl NotifyTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyTarget::Inspection => "inspection",
            NotifyTarget::Diagnosis => "diagnosis",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, target: NotifyTarget, payload: &Value) -> Result<()>;
}

/// POSTs payloads as JSON to the configured backend callbacks.
pub struct WebhookNotifier {
    client: reqwest::Client,
    inspection_url: String,
    diagnosis_url: String,
    timeout_ms: u64,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PipelineError::Config {
                message: format!("Failed to build webhook client: {}", e),
            })?;
        Ok(Self {
            client,
            inspection_url: config.inspection_url(),
            diagnosis_url: config.diagnosis_url(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn url_for(&self, target: NotifyTarget) -> &str {
        match target {
            NotifyTarget::Inspection => &self.inspection_url,
            NotifyTarget::Diagnosis => &self.diagnosis_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, target: NotifyTarget, payload: &Value) -> Result<()> {
        let url = self.url_for(target);
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout {
                        operation: format!("{} webhook", target.as_str()),
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    PipelineError::Notification {
                        message: format!("POST {} failed: {}", url, e),
                    }
                }
            })?;
        resp.error_for_status()
            .map_err(|e| PipelineError::Notification {
                message: format!("POST {} rejected: {}", url, e),
            })?;
        Ok(())
    }
}

/// Accepts everything and sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn deliver(&self, target: NotifyTarget, _payload: &Value) -> Result<()> {
        debug!(target = target.as_str(), "webhooks disabled, skipping delivery");
        Ok(())
    }
}

/// Deliver `payload` on a background task; failure is logged, never returned.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    target: NotifyTarget,
    correlation_id: String,
    payload: Value,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.deliver(target, &payload).await {
            Ok(()) => info!(
                correlation_id = %correlation_id,
                stage = "notify",
                target = target.as_str(),
                "webhook delivered"
            ),
            Err(e) => warn!(
                correlation_id = %correlation_id,
                stage = "notify",
                target = target.as_str(),
                "webhook delivery failed: {}",
                e
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn deliver(&self, _target: NotifyTarget, _payload: &Value) -> Result<()> {
            Err(PipelineError::Notification {
                message: "backend down".into(),
            })
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let handle = dispatch(
            Arc::new(Failing),
            NotifyTarget::Inspection,
            "insp-1".into(),
            serde_json::json!({}),
        );
        assert!(handle.await.is_ok());
    }

    #[test]
    fn urls_are_joined_per_target() {
        let notifier = WebhookNotifier::new(&WebhookConfig {
            backend_base_url: "http://127.0.0.1:9000/".into(),
            ..WebhookConfig::default()
        })
        .unwrap();
        assert_eq!(
            notifier.url_for(NotifyTarget::Diagnosis),
            "http://127.0.0.1:9000/api/v1/webhooks/diagnosis-complete"
        );
    }
}
