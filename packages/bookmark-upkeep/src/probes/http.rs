//! Reqwest-backed probe transport.
//!
//! Sends HEAD first and retries with GET when the server rejects HEAD
//! (405 / 501). Redirects are never followed by the client; the caller
//! walks the chain through [`crate::traits::follow_redirects`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::UpkeepConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::traits::probe::{HttpProbe, ProbeResponse};

/// Production [`HttpProbe`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestProbe {
    /// Build a client from the probe settings.
    pub fn new(config: &UpkeepConfig) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.probe_timeout,
        })
    }

    /// Use a preconfigured client. It must not follow redirects.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn request(&self, method: Method, url: &Url) -> ProbeResult<ProbeResponse> {
        let response = self
            .client
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            location,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout {
                after: self.timeout,
            }
        } else {
            ProbeError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn send(&self, url: &Url) -> ProbeResult<ProbeResponse> {
        let response = self.request(Method::HEAD, url).await?;

        let head_rejected = response.status == StatusCode::METHOD_NOT_ALLOWED.as_u16()
            || response.status == StatusCode::NOT_IMPLEMENTED.as_u16();
        if head_rejected {
            debug!(url = %url, status = response.status, "HEAD rejected, retrying with GET");
            return self.request(Method::GET, url).await;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = UpkeepConfig::default().with_probe_timeout(Duration::from_secs(2));
        let probe = ReqwestProbe::new(&config).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();

        let err = probe.send(&url).await.unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Network(_) | ProbeError::Timeout { .. }
        ));
    }
}
