//! HTTP relay controller configuration.

use serde::Deserialize;

/// Connection settings for the relay REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpRelayConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Value of the `X-Internal-API-Key` header; not sent when empty.
    pub api_key: String,
    /// Accept self-signed certificates from the relay host.
    pub accept_invalid_certs: bool,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpRelayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://host.docker.internal/api".to_string(),
            api_key: String::new(),
            accept_invalid_certs: true,
            request_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = HttpRelayConfig::default();
        assert_eq!(config.base_url, "https://host.docker.internal/api");
        assert!(config.api_key.is_empty());
        assert!(config.accept_invalid_certs);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"base_url = "https://10.0.0.2/api""#;
        let config: HttpRelayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "https://10.0.0.2/api");
        assert!(config.accept_invalid_certs);
        assert_eq!(config.request_timeout_secs, 5);
    }
}
