//! Integration tests for duplicate detection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bookmark_upkeep::{
    Bookmark, BookmarkId, DuplicateAnalyzer, MemoryBookmarkRepository, MockProbeClient,
    UpkeepConfig, UpkeepError, UpkeepService,
};

fn sample_corpus() -> Vec<Bookmark> {
    vec![
        Bookmark::new(1, "http://a.com", ""),
        Bookmark::new(2, "https://a.com/", ""),
        Bookmark::new(3, "http://b.com", ""),
    ]
}

fn service_over(bookmarks: Vec<Bookmark>, probe: MockProbeClient) -> UpkeepService<MemoryBookmarkRepository> {
    let repo = Arc::new(MemoryBookmarkRepository::with_bookmarks(bookmarks));
    UpkeepService::new(repo, Arc::new(probe), UpkeepConfig::default()).unwrap()
}

#[tokio::test]
async fn test_find_all_duplicates_on_sample_corpus() {
    let svc = service_over(sample_corpus(), MockProbeClient::new());

    let groups = svc.find_all_duplicates().await.unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.primary.id, BookmarkId::new(1));
    assert_eq!(group.duplicate_ids(), vec![BookmarkId::new(2)]);
    assert_eq!(group.confidence, 1.0);
    assert!(!group.reason.is_empty());
}

#[test]
fn test_groups_partition_matched_bookmarks() {
    let corpus = vec![
        Bookmark::new(1, "https://a.com/x", "Alpha"),
        Bookmark::new(2, "http://www.a.com/x/", "Beta"),
        Bookmark::new(3, "https://c.com", "Rust Book"),
        Bookmark::new(4, "https://a.com/x?utm_source=mail", "Gamma"),
        Bookmark::new(5, "https://d.com", "rust book "),
        Bookmark::new(6, "https://e.com", "Unrelated"),
        Bookmark::new(7, "https://c.com/", "Other"),
    ];

    let groups = DuplicateAnalyzer::new().find_groups(&corpus);

    let mut seen = HashSet::new();
    for group in &groups {
        assert!(!group.duplicates.is_empty());
        assert!(seen.insert(group.primary.id));
        for dup in &group.duplicates {
            assert!(seen.insert(dup.id), "bookmark {} in two groups", dup.id);
        }
        assert!((0.0..=1.0).contains(&group.confidence));
    }
    assert!(!seen.contains(&BookmarkId::new(6)));

    assert_eq!(groups[0].primary.id, BookmarkId::new(1));
    assert_eq!(
        groups[0].duplicate_ids(),
        vec![BookmarkId::new(2), BookmarkId::new(4)]
    );

    // Bookmark 3 claims 5 by title and 7 by URL
    assert_eq!(groups[1].primary.id, BookmarkId::new(3));
    assert_eq!(
        groups[1].duplicate_ids(),
        vec![BookmarkId::new(5), BookmarkId::new(7)]
    );
    // Title-only match pulls the group confidence down
    assert!((groups[1].confidence - 0.3).abs() < 1e-9);
    assert!(groups[1].reason.contains("identical title"));
    assert!(groups[1].reason.contains("same normalized URL"));
}

#[test]
fn test_first_claim_wins() {
    // 2 matches both 1 (by URL) and 3 (by title); 1 claims it first
    let corpus = vec![
        Bookmark::new(1, "https://a.com", "First"),
        Bookmark::new(2, "https://www.a.com", "Shared Title"),
        Bookmark::new(3, "https://z.com", "Shared Title"),
    ];

    let groups = DuplicateAnalyzer::new().find_groups(&corpus);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].primary.id, BookmarkId::new(1));
    assert_eq!(groups[0].duplicate_ids(), vec![BookmarkId::new(2)]);
}

#[test]
fn test_variation_overlap_scores_below_exact() {
    let corpus = vec![
        Bookmark::new(1, "https://a.com/docs/", ""),
        Bookmark::new(2, "https://a.com/docs//", ""),
    ];

    let groups = DuplicateAnalyzer::new().find_groups(&corpus);
    assert_eq!(groups.len(), 1);
    assert!((groups[0].confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_check_for_duplicates_finds_variation_match() {
    let svc = service_over(sample_corpus(), MockProbeClient::new());

    let result = svc.check_for_duplicates("https://a.com", "A").await.unwrap();

    assert!(!result.has_exact_duplicate);
    assert!(result.exact_match.is_none());
    assert!(result.has_similar_bookmarks);
    assert!(result.confidence >= 0.9);

    let ids: Vec<BookmarkId> = result.similar.iter().map(|s| s.bookmark.id).collect();
    assert_eq!(ids, vec![BookmarkId::new(1), BookmarkId::new(2)]);
    assert!(!result.recommendations.is_empty());
}

#[tokio::test]
async fn test_check_for_duplicates_exact_url() {
    let svc = service_over(sample_corpus(), MockProbeClient::new());

    let result = svc.check_for_duplicates("http://b.com", "").await.unwrap();

    assert!(result.has_exact_duplicate);
    assert_eq!(result.exact_match.unwrap().id, BookmarkId::new(3));
    assert_eq!(result.confidence, 1.0);
    assert!(result.recommendations[0].contains("already exists"));
}

#[tokio::test]
async fn test_exact_and_normalized_paths_can_disagree() {
    // Query-string difference: no exact URL hit, no normalized match either
    let svc = service_over(
        vec![Bookmark::new(1, "https://a.com/page?id=1", "")],
        MockProbeClient::new(),
    );

    let result = svc.check_for_duplicates("https://a.com/page?id=2", "").await.unwrap();
    assert!(!result.has_exact_duplicate);
    assert!(!result.has_similar_bookmarks);
    assert_eq!(result.confidence, 0.0);

    // Tracking-only difference: no exact hit, but a normalized match
    let result = svc
        .check_for_duplicates("https://a.com/page?id=1&utm_source=feed", "")
        .await
        .unwrap();
    assert!(!result.has_exact_duplicate);
    assert!(result.has_similar_bookmarks);
}

#[tokio::test(start_paused = true)]
async fn test_short_url_candidate_matches_expanded_destination() {
    let probe = MockProbeClient::new()
        .with_redirect("https://bit.ly/xyz", 301, "https://www.example.com/article/")
        .with_delay("https://bit.ly/xyz", Duration::from_millis(100));
    let svc = service_over(
        vec![Bookmark::new(1, "https://example.com/article", "Article")],
        probe,
    );

    let result = svc.check_for_duplicates("https://bit.ly/xyz", "").await.unwrap();

    assert!(result.has_similar_bookmarks);
    assert_eq!(result.similar[0].bookmark.id, BookmarkId::new(1));
    assert!(result.similar[0].reason.contains("expanded"));
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("expands to https://www.example.com/article/")));
}

#[tokio::test]
async fn test_check_for_duplicates_rejects_bad_input() {
    let svc = service_over(sample_corpus(), MockProbeClient::new());

    for url in ["", "   ", "no-scheme.com"] {
        let err = svc.check_for_duplicates(url, "x").await.unwrap_err();
        assert!(matches!(err, UpkeepError::InvalidInput { .. }), "for {url:?}");
    }
}

#[tokio::test]
async fn test_concurrent_scans_are_serialized() {
    let svc = service_over(sample_corpus(), MockProbeClient::new());

    let (a, b) = tokio::join!(svc.find_all_duplicates(), svc.find_all_duplicates());
    assert_eq!(a.unwrap(), b.unwrap());
}
