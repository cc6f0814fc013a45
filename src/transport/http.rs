// src/transport/http.rs
//! HTTP batch delivery

use crate::auth::AccessTokenProvider;
use crate::transport::{BatchTransport, DeliveryOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Keepalive sends race page teardown; bound them hard.
const KEEPALIVE_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Delivers batches with one POST per flush.
///
/// Credentials are attached here, not in the engine: the current bearer
/// token (when one exists) and the project id header travel with every
/// request.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            project_id: project_id.into(),
            tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn deliver(&self, body: String, keepalive: bool) -> DeliveryOutcome {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("x-beacon-project-id", &self.project_id)
            .body(body);

        if let Some(token) = self.tokens.access_token().await {
            request = request.bearer_auth(token);
        }
        if keepalive {
            request = request.timeout(KEEPALIVE_SEND_TIMEOUT);
        }

        match request.send().await {
            Ok(response) => DeliveryOutcome::Delivered {
                status: response.status().as_u16(),
            },
            Err(e) => DeliveryOutcome::NoResponse {
                reason: e.to_string(),
            },
        }
    }
}
