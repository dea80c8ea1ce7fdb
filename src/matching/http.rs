//! HTTP-backed implementation of the semantic-resolution capability.
//!
//! Posts the structured [`SemanticRequest`] to a configured endpoint and
//! deserializes the response into a [`SemanticResolution`]. Prompt
//! construction, model choice, and retries all live on the other side of
//! the endpoint; this client only speaks the capability contract, with a
//! bounded timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::semantic::{SemanticRequest, SemanticResolution, SemanticResolver};
use crate::error::SemanticError;

/// Configuration for [`HttpSemanticResolver`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticHttpConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl SemanticHttpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

/// Reqwest-based client for a remote semantic-resolution service.
#[derive(Debug, Clone)]
pub struct HttpSemanticResolver {
    config: SemanticHttpConfig,
    client: Client,
}

impl HttpSemanticResolver {
    pub fn new(config: SemanticHttpConfig) -> Result<Self, SemanticError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SemanticError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SemanticResolver for HttpSemanticResolver {
    async fn resolve(&self, request: SemanticRequest) -> Result<SemanticResolution, SemanticError> {
        debug!(
            field = request.field.id,
            candidates = request.candidate_templates.len(),
            "escalating annotation to semantic resolution"
        );

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SemanticError::Timeout {
                    timeout_ms: self.config.timeout_seconds * 1000,
                }
            } else {
                SemanticError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "semantic resolution endpoint returned error");
            return Err(SemanticError::Transport(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        response
            .json::<SemanticResolution>()
            .await
            .map_err(|e| SemanticError::Malformed(e.to_string()))
    }
}
