//! Integration tests for URL normalization and short-URL expansion.

use std::sync::Arc;
use std::time::Duration;

use bookmark_upkeep::normalizer::find_similar_urls;
use bookmark_upkeep::{normalize, Bookmark, MockProbeClient, NormalizeError, UrlMatch, UrlNormalizer};

#[test]
fn test_scheme_www_and_trailing_slash_normalize_equal() {
    let bases = [
        ("a.com", ""),
        ("docs.rs", "/tokio/latest"),
        ("example.org", "/path/to/page"),
        ("example.org:8443", "/admin"),
    ];

    for (host, path) in bases {
        let expected = normalize(&format!("https://{host}{path}")).unwrap().normalized;
        for scheme in ["http", "https", "HTTP"] {
            for www in ["", "www.", "WWW."] {
                for slash in ["", "/"] {
                    let url = format!("{scheme}://{www}{host}{path}{slash}");
                    assert_eq!(normalize(&url).unwrap().normalized, expected, "for {url}");
                }
            }
        }
    }
}

#[test]
fn test_malformed_inputs() {
    for raw in ["", "   ", "a.com", "/relative/path", "mailto:me@example.com", "http://"] {
        let err = normalize(raw).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedUrl { .. }), "for {raw:?}");
    }
}

#[test]
fn test_tracking_params_removed_and_order_kept() {
    let n = normalize("https://a.com/search?q=rust&utm_source=news&fbclid=abc&page=2&UTM_Medium=x")
        .unwrap();
    assert_eq!(n.normalized, "https://a.com/search?q=rust&page=2");

    let only_tracking = normalize("https://a.com/?gclid=1&utm_campaign=launch").unwrap();
    assert_eq!(only_tracking.normalized, "https://a.com");
}

#[test]
fn test_ports_and_fragments() {
    assert_eq!(normalize("http://a.com:80/x").unwrap().normalized, "https://a.com/x");
    assert_eq!(normalize("https://a.com:443/x").unwrap().normalized, "https://a.com/x");
    assert_eq!(normalize("https://a.com:8080/x").unwrap().normalized, "https://a.com:8080/x");
    assert_eq!(normalize("https://a.com/x#section").unwrap().normalized, "https://a.com/x");
}

#[test]
fn test_find_similar_urls_matches_variations() {
    let corpus = vec![
        Bookmark::new(1, "http://a.com", ""),
        Bookmark::new(2, "https://www.a.com/", ""),
        Bookmark::new(3, "https://b.com", ""),
        Bookmark::new(4, "not a url", ""),
    ];
    let candidate = normalize("https://a.com").unwrap();

    let matches = find_similar_urls(&candidate, &corpus);
    let ids: Vec<i64> = matches.iter().map(|(b, _)| b.id.as_i64()).collect();

    assert_eq!(ids, vec![1, 2]);
    assert!(matches.iter().all(|(_, m)| *m == UrlMatch::Exact));
}

#[tokio::test]
async fn test_short_url_expansion() {
    let probe = MockProbeClient::new().with_redirect(
        "https://bit.ly/abc",
        301,
        "https://example.com/article",
    );
    let normalizer = UrlNormalizer::with_probe(Arc::new(probe), Duration::from_secs(5));

    let n = normalizer.normalize_with_expansion("https://bit.ly/abc").await.unwrap();
    assert!(n.is_short_url);
    assert_eq!(n.expanded_url.as_deref(), Some("https://example.com/article"));
}

#[tokio::test]
async fn test_expansion_is_best_effort() {
    let probe = MockProbeClient::new()
        .with_failure("https://bit.ly/dead", "dns lookup failed")
        .with_redirect("https://bit.ly/loop", 302, "https://bit.ly/loop");
    let normalizer = UrlNormalizer::with_probe(Arc::new(probe), Duration::from_secs(5));

    let dead = normalizer.normalize_with_expansion("https://bit.ly/dead").await.unwrap();
    assert!(dead.is_short_url);
    assert!(dead.expanded_url.is_none());

    let looping = normalizer.normalize_with_expansion("https://bit.ly/loop").await.unwrap();
    assert!(looping.expanded_url.is_none());
}

#[tokio::test]
async fn test_non_short_urls_are_not_probed() {
    let probe = Arc::new(MockProbeClient::new());
    let normalizer = UrlNormalizer::with_probe(probe.clone(), Duration::from_secs(5));

    let n = normalizer.normalize_with_expansion("https://example.com/page").await.unwrap();
    assert!(!n.is_short_url);
    assert!(n.expanded_url.is_none());
    assert_eq!(probe.call_count(), 0);
}
