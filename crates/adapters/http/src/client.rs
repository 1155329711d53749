//! reqwest-backed relay controller.

use std::collections::HashMap;
use std::time::Duration;

use relayhub_app::ports::RelayController;
use relayhub_domain::error::CommandError;
use relayhub_domain::id::RelayId;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use crate::config::HttpRelayConfig;
use crate::error::HttpRelayError;

/// Header carrying the internal API key.
pub const API_KEY_HEADER: &str = "X-Internal-API-Key";

#[derive(Debug, Deserialize)]
struct CommandReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// [`RelayController`] over the relay REST API.
#[derive(Debug, Clone)]
pub struct HttpRelayController {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRelayController {
    /// Build a controller from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpRelayError::Client`] if the TLS backend cannot be initialised.
    pub fn new(config: &HttpRelayConfig) -> Result<Self, HttpRelayError> {
        let client = Client::builder()
            .user_agent(concat!("relayhub/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(HttpRelayError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: Some(config.api_key.clone()).filter(|key| !key.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn command(
        &self,
        id: &RelayId,
        state: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), HttpRelayError> {
        let request_err = |source| HttpRelayError::Request {
            relay_id: id.to_string(),
            source,
        };

        let mut request = self.request(Method::POST, &format!("/io/{id}/state/{state}"));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpRelayError::Status {
                relay_id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let reply: CommandReply = response.json().await.map_err(request_err)?;
        if reply.status != "success" {
            return Err(HttpRelayError::Rejected {
                relay_id: id.to_string(),
                message: reply.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        tracing::debug!(relay_id = %id, state, "relay API accepted command");
        Ok(())
    }

    async fn state(&self, id: &RelayId) -> Result<bool, HttpRelayError> {
        let request_err = |source| HttpRelayError::Request {
            relay_id: id.to_string(),
            source,
        };

        let response = self
            .request(Method::GET, "/io/relays/state")
            .send()
            .await
            .map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpRelayError::Status {
                relay_id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let mut states: HashMap<String, serde_json::Value> =
            response.json().await.map_err(request_err)?;
        let value = states
            .remove(id.as_str())
            .ok_or_else(|| HttpRelayError::MissingRelay {
                relay_id: id.to_string(),
            })?;

        if let Some(on) = value.as_bool() {
            return Ok(on);
        }
        if let Some(level) = value.as_i64() {
            return Ok(level != 0);
        }
        Err(HttpRelayError::InvalidState {
            relay_id: id.to_string(),
            value,
        })
    }
}

impl RelayController for HttpRelayController {
    async fn set_on(&self, id: &RelayId) -> Result<(), CommandError> {
        Ok(self.command(id, "on", None).await?)
    }

    async fn set_off(&self, id: &RelayId) -> Result<(), CommandError> {
        Ok(self.command(id, "off", None).await?)
    }

    async fn pulse(&self, id: &RelayId, duration: Duration) -> Result<(), CommandError> {
        let body = serde_json::json!({ "duration": duration.as_secs_f64() });
        Ok(self.command(id, "pulse", Some(body)).await?)
    }

    async fn get_state(&self, id: &RelayId) -> Result<bool, CommandError> {
        Ok(self.state(id).await?)
    }
}
