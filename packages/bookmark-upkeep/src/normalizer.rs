//! URL canonicalization and variation matching.
//!
//! Canonical form:
//! - `http` and `https` both become `https`
//! - host is lowercased and a leading `www.` is removed
//! - default ports are dropped, other ports kept
//! - one trailing slash is stripped from the path (the root path becomes empty)
//! - known tracking query parameters are removed, the rest keep their order
//! - the fragment is dropped
//!
//! The variation set toggles scheme, `www.` and a trailing slash around the
//! canonical components. Two URLs match when their canonical forms are equal
//! or their variation sets intersect.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::NormalizeError;
use crate::traits::probe::{follow_redirects, HttpProbe};
use crate::types::bookmark::Bookmark;

/// Query parameters removed during normalization. `utm_*` is matched by prefix.
pub const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "yclid", "_hsenc",
    "_hsmi", "ref_src",
];

/// Hosts treated as link shorteners.
pub const SHORTENER_HOSTS: &[&str] = &[
    "bit.ly",
    "t.co",
    "goo.gl",
    "tinyurl.com",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "rebrand.ly",
    "cutt.ly",
    "shorturl.at",
    "lnkd.in",
    "youtu.be",
    "tiny.cc",
    "rb.gy",
    "t.ly",
];

/// Hop cap for short-URL expansion.
pub const MAX_EXPANSION_HOPS: usize = 5;

/// How two URLs were found to be equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlMatch {
    /// Canonical forms are identical
    Exact,
    /// Variation sets overlap
    Variation,
}

impl UrlMatch {
    pub fn score(&self) -> f64 {
        match self {
            Self::Exact => 1.0,
            Self::Variation => 0.9,
        }
    }
}

/// Comparable form of a URL. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    pub original: String,
    pub normalized: String,
    pub variations: BTreeSet<String>,
    pub is_short_url: bool,
    pub expanded_url: Option<String>,
}

impl NormalizedUrl {
    /// Compare against another normalized URL.
    pub fn matches(&self, other: &NormalizedUrl) -> Option<UrlMatch> {
        if self.normalized == other.normalized {
            Some(UrlMatch::Exact)
        } else if !self.variations.is_disjoint(&other.variations) {
            Some(UrlMatch::Variation)
        } else {
            None
        }
    }
}

/// Parse a URL, requiring a scheme and a non-empty host.
pub fn parse_url(raw: &str) -> Result<Url, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::malformed(raw, "empty URL"));
    }

    let url = Url::parse(trimmed).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => NormalizeError::malformed(raw, "missing scheme"),
        other => NormalizeError::malformed(raw, other.to_string()),
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(NormalizeError::malformed(raw, "missing host")),
    }
}

/// Canonicalize `raw` and compute its variation set.
pub fn normalize(raw: &str) -> Result<NormalizedUrl, NormalizeError> {
    let url = parse_url(raw)?;
    let parts = UrlParts::from_url(&url)?;

    Ok(NormalizedUrl {
        original: raw.to_string(),
        normalized: parts.canonical(),
        variations: parts.variations(),
        is_short_url: SHORTENER_HOSTS.contains(&parts.host.as_str()),
        expanded_url: None,
    })
}

/// Bookmarks in `corpus` whose URL matches `candidate`, in corpus order.
///
/// Entries with unparseable URLs are skipped.
pub fn find_similar_urls<'a>(
    candidate: &NormalizedUrl,
    corpus: &'a [Bookmark],
) -> Vec<(&'a Bookmark, UrlMatch)> {
    corpus
        .iter()
        .filter_map(|bookmark| {
            let other = normalize(&bookmark.url).ok()?;
            candidate.matches(&other).map(|m| (bookmark, m))
        })
        .collect()
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonical components a normalized URL is assembled from.
struct UrlParts {
    scheme: String,
    host: String,
    /// Host has a registrable name, so a `www.` form exists
    is_domain: bool,
    port: Option<u16>,
    /// Path with one trailing slash removed
    path: String,
    /// `?a=b&c=d` or empty
    query: String,
}

impl UrlParts {
    fn from_url(url: &Url) -> Result<Self, NormalizeError> {
        let scheme = match url.scheme() {
            "http" | "https" => "https".to_string(),
            other => other.to_ascii_lowercase(),
        };

        let host = url
            .host_str()
            .ok_or_else(|| NormalizeError::malformed(url.as_str(), "missing host"))?
            .to_ascii_lowercase();
        let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);

        let path = url.path();
        let path = path.strip_suffix('/').unwrap_or(path).to_string();

        let kept: Vec<&str> = url
            .query()
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let key = pair.split('=').next().unwrap_or("");
                !is_tracking_param(key)
            })
            .collect();
        let query = if kept.is_empty() {
            String::new()
        } else {
            format!("?{}", kept.join("&"))
        };

        Ok(Self {
            scheme,
            host,
            is_domain: url.domain().is_some(),
            port: url.port(),
            path,
            query,
        })
    }

    fn assemble(&self, scheme: &str, host: &str, path: &str) -> String {
        let port = self.port.map(|p| format!(":{p}")).unwrap_or_default();
        format!("{scheme}://{host}{port}{path}{}", self.query)
    }

    fn canonical(&self) -> String {
        self.assemble(&self.scheme, &self.host, &self.path)
    }

    fn variations(&self) -> BTreeSet<String> {
        let schemes: Vec<&str> = if self.scheme == "https" {
            vec!["http", "https"]
        } else {
            vec![self.scheme.as_str()]
        };

        let www = format!("www.{}", self.host);
        let hosts: Vec<&str> = if self.is_domain {
            vec![self.host.as_str(), www.as_str()]
        } else {
            vec![self.host.as_str()]
        };

        let slashed = format!("{}/", self.path);
        let paths = [self.path.as_str(), slashed.as_str()];

        let mut out = BTreeSet::new();
        for scheme in &schemes {
            for host in &hosts {
                for path in &paths {
                    out.insert(self.assemble(scheme, host, path));
                }
            }
        }
        out
    }
}

/// Normalizer with optional short-URL expansion.
///
/// Expansion is best effort: any transport failure just leaves
/// `expanded_url` empty.
#[derive(Clone)]
pub struct UrlNormalizer {
    probe: Option<Arc<dyn HttpProbe>>,
    max_hops: usize,
    timeout: Duration,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self {
            probe: None,
            max_hops: MAX_EXPANSION_HOPS,
            timeout: Duration::from_secs(10),
        }
    }
}

impl UrlNormalizer {
    /// Normalizer that never touches the network.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Normalizer that expands short URLs through `probe`.
    pub fn with_probe(probe: Arc<dyn HttpProbe>, timeout: Duration) -> Self {
        Self {
            probe: Some(probe),
            max_hops: MAX_EXPANSION_HOPS,
            timeout,
        }
    }

    pub fn normalize(&self, raw: &str) -> Result<NormalizedUrl, NormalizeError> {
        normalize(raw)
    }

    /// Normalize and, for known shorteners, resolve the destination.
    pub async fn normalize_with_expansion(&self, raw: &str) -> Result<NormalizedUrl, NormalizeError> {
        let mut normalized = normalize(raw)?;
        if normalized.is_short_url {
            normalized.expanded_url = self.expand(raw).await;
        }
        Ok(normalized)
    }

    /// Follow redirects from `raw` and return where they end.
    ///
    /// `None` when no probe is configured, the chain did not redirect, or the
    /// chain failed.
    pub async fn expand(&self, raw: &str) -> Option<String> {
        let probe = self.probe.as_ref()?;
        let url = parse_url(raw).ok()?;

        let chain = tokio::time::timeout(
            self.timeout,
            follow_redirects(probe.as_ref(), &url, self.max_hops),
        )
        .await;

        match chain {
            Ok(Ok(chain)) if chain.hops > 0 => Some(chain.final_url.to_string()),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                debug!(url = %raw, error = %e, "Short URL expansion failed");
                None
            }
            Err(_) => {
                debug!(url = %raw, "Short URL expansion timed out");
                None
            }
        }
    }
}

impl std::fmt::Debug for UrlNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlNormalizer")
            .field("expands", &self.probe.is_some())
            .field("max_hops", &self.max_hops)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form() {
        let n = normalize("HTTP://WWW.Example.COM/Docs/?utm_source=x&page=2#top").unwrap();
        assert_eq!(n.normalized, "https://example.com/Docs?page=2");
    }

    #[test]
    fn test_root_path_collapses() {
        assert_eq!(normalize("https://a.com/").unwrap().normalized, "https://a.com");
        assert_eq!(normalize("http://a.com").unwrap().normalized, "https://a.com");
    }

    #[test]
    fn test_variations_cover_scheme_www_and_slash() {
        let n = normalize("https://a.com/x").unwrap();
        for v in [
            "http://a.com/x",
            "https://a.com/x/",
            "http://www.a.com/x/",
            "https://www.a.com/x",
        ] {
            assert!(n.variations.contains(v), "missing {v}");
        }
        assert_eq!(n.variations.len(), 8);
    }

    #[test]
    fn test_ip_hosts_get_no_www_variation() {
        let n = normalize("http://127.0.0.1:8080/").unwrap();
        assert_eq!(n.normalized, "https://127.0.0.1:8080");
        assert_eq!(n.variations.len(), 4);
    }

    #[test]
    fn test_double_slash_is_a_variation_match() {
        let a = normalize("https://a.com/x/").unwrap();
        let b = normalize("https://a.com/x//").unwrap();
        assert_ne!(a.normalized, b.normalized);
        assert_eq!(a.matches(&b), Some(UrlMatch::Variation));
    }

    #[test]
    fn test_missing_scheme_or_host_is_malformed() {
        assert!(normalize("a.com/page").is_err());
        assert!(normalize("").is_err());
        assert!(normalize("mailto:someone@example.com").is_err());
        assert!(normalize("http://").is_err());
    }

    #[test]
    fn test_short_url_detection() {
        assert!(normalize("https://bit.ly/abc").unwrap().is_short_url);
        assert!(normalize("http://www.bit.ly/abc").unwrap().is_short_url);
        assert!(!normalize("https://example.com/abc").unwrap().is_short_url);
    }
}
