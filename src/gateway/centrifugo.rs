use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ForwardError, RealtimeGateway};
use crate::config::GatewayConfig;
use crate::models::TickEvent;

/// Server API command envelope
#[derive(Debug, Serialize)]
struct PublishCommand<'a> {
    method: &'static str,
    params: PublishParams<'a>,
}

#[derive(Debug, Serialize)]
struct PublishParams<'a> {
    channel: &'a str,
    data: &'a TickEvent,
}

/// Reply body; a successful status can still carry an error object
#[derive(Debug, Default, Deserialize)]
struct ApiReply {
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Centrifugo HTTP server API client
#[derive(Debug, Clone)]
pub struct CentrifugoGateway {
    client: Client,
    api_url: String,
    api_key: String,
}

impl CentrifugoGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ForwardError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RealtimeGateway for CentrifugoGateway {
    async fn publish(&self, channel: &str, event: &TickEvent) -> Result<(), ForwardError> {
        let command = PublishCommand {
            method: "publish",
            params: PublishParams {
                channel,
                data: event,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("apikey {}", self.api_key))
            .json(&command)
            .send()
            .await
            .map_err(|e| ForwardError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ForwardError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ForwardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Empty or non-JSON bodies on a 2xx are treated as success
        let reply: ApiReply = serde_json::from_str(&body).unwrap_or_default();
        if let Some(error) = reply.error {
            return Err(ForwardError::Rejected {
                code: error.code,
                message: error.message,
            });
        }

        tracing::trace!("Published {} to channel {}", event.stock, channel);
        Ok(())
    }
}
