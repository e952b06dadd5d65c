//! HTTP analytics collector client.

use async_trait::async_trait;
use serde_json::json;

use crate::error::NotifyError;

use super::{ActionTracker, AnalyticsSink};

/// Posts tracking calls as JSON to a collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, body: serde_json::Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed {
                sink: "http".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                sink: "http".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn record_click(
        &self,
        cta_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.post(json!({"type": "click", "id": cta_id, "context": context}))
            .await
    }

    async fn record_form_submit(
        &self,
        form_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.post(json!({"type": "form_submit", "id": form_id, "context": context}))
            .await
    }
}

#[async_trait]
impl ActionTracker for HttpAnalyticsSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn record_action(
        &self,
        action_name: &str,
        page_path: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        self.post(json!({
            "type": "action",
            "id": action_name,
            "page": page_path,
            "context": metadata,
        }))
        .await
    }
}
