//! Blocking HTTP transport built on reqwest
//!
//! Every call opens a fresh connection: the pool keeps no idle connections.
//! Recording typically happens once per host request and draining from cron,
//! so a cached connection would usually be stale by the time it is reused.

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Value};

use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::error::{Error, Result};
use crate::types::HttpMethod;

use super::{form, RawResponse, Transport};

/// [`Transport`] talking to the real API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
    base_url: String,
    host: String,
}

impl HttpTransport {
    /// Build the transport for `config`
    ///
    /// Fails if the API key cannot be sent as a header value.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(config.api_key())
                .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
        );

        let http_client = HttpClient::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .pool_max_idle_per_host(0)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url(),
            host: config.host().to_string(),
        })
    }

    /// API root requests are sent below
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: HttpMethod,
        path: &str,
        data: &Map<String, Value>,
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);

        let request = match method {
            HttpMethod::Post => self
                .http_client
                .post(&url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form::encode(data)),
            other => self.http_client.request(to_method(other), &url),
        };

        let response = request
            .send()
            .map_err(|e| Error::Transport(format!("{} for host {}", e, self.host)))?;

        // The status alone decides delivery; a body that fails to arrive
        // must not turn an accepted event into a queued duplicate
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_else(|e| {
            tracing::warn!(%url, status, error = %e, "Failed to read response body");
            String::new()
        });

        tracing::debug!(%method, %url, status, "API request completed");

        Ok(RawResponse { status, body })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use tempfile::TempDir;

    fn config(options: ClientOptions) -> (TempDir, ClientConfig) {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::resolve("uc_test", options.with_log_dir(dir.path())).unwrap();
        (dir, config)
    }

    #[test]
    fn test_transport_uses_config_base_url() {
        let (_dir, config) = config(ClientOptions::default().with_host("127.0.0.1").with_port(9));
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9/api/v1");
    }

    #[test]
    fn test_transport_rejects_invalid_api_key() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::resolve(
            "bad\nkey",
            ClientOptions::default().with_log_dir(dir.path()),
        )
        .unwrap();
        assert!(matches!(HttpTransport::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_method(HttpMethod::Get), Method::GET);
        assert_eq!(to_method(HttpMethod::Delete), Method::DELETE);
    }
}
