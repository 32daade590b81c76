//! HTTP probe transport.
//!
//! A probe issues one request and reports the status and `Location` header
//! without following redirects. Redirect handling lives in
//! [`follow_redirects`] so callers can see every hop and cap the chain.

use async_trait::async_trait;
use url::Url;

use crate::error::{ProbeError, ProbeResult};

/// Status and redirect target of a single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub location: Option<String>,
}

impl ProbeResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            location: Some(location.into()),
        }
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// One-shot HTTP transport with redirects disabled.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Send a single request to `url`.
    async fn send(&self, url: &Url) -> ProbeResult<ProbeResponse>;
}

/// Result of walking a redirect chain to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectChain {
    /// Response to the original URL
    pub first: ProbeResponse,

    /// Last URL requested
    pub final_url: Url,

    pub final_status: u16,

    /// Redirects followed
    pub hops: usize,
}

/// Follow `Location` headers from `start` until a non-redirect response.
///
/// Fails with `TooManyRedirects` once `max_hops` redirects have been
/// followed and the server still answers with another one.
pub async fn follow_redirects<P>(probe: &P, start: &Url, max_hops: usize) -> ProbeResult<RedirectChain>
where
    P: HttpProbe + ?Sized,
{
    let first = probe.send(start).await?;
    continue_redirects(probe, start, first, max_hops).await
}

/// Like [`follow_redirects`], for a caller that already holds the response
/// to `start`.
pub async fn continue_redirects<P>(
    probe: &P,
    start: &Url,
    first: ProbeResponse,
    max_hops: usize,
) -> ProbeResult<RedirectChain>
where
    P: HttpProbe + ?Sized,
{
    let mut current = start.clone();
    let mut response = first.clone();
    let mut hops = 0;

    while response.is_redirect() {
        let Some(location) = response.location.as_deref() else {
            break;
        };
        if hops >= max_hops {
            return Err(ProbeError::TooManyRedirects { hops });
        }

        current = current
            .join(location)
            .map_err(|e| ProbeError::Network(format!("invalid redirect target `{location}`: {e}")))?;
        hops += 1;
        response = probe.send(&current).await?;
    }

    Ok(RedirectChain {
        first,
        final_url: current,
        final_status: response.status,
        hops,
    })
}
