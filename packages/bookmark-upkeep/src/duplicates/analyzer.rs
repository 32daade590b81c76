//! Pairwise duplicate scoring over a loaded corpus.
//!
//! Two signals, combined as a weighted sum:
//!
//! | Signal | Weight | Score |
//! |--------|--------|-------|
//! | URL    | 0.7    | 1.0 identical canonical form, 0.9 variation overlap |
//! | Title  | 0.3    | 1.0 equal (trimmed, case-insensitive), 0.8 containment |
//!
//! A URL match on its own is always enough, so its confidence never drops
//! below the URL score. A title-only match is kept as a low-confidence
//! heuristic.
//!
//! The full scan compares every unprocessed pair and is O(n²).

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::normalizer::{find_similar_urls, normalize, NormalizedUrl, UrlMatch};
use crate::types::bookmark::{Bookmark, BookmarkId};
use crate::types::duplicate::{DuplicateCheckResult, DuplicateGroup, SimilarBookmark};

pub const URL_WEIGHT: f64 = 0.7;
pub const TITLE_WEIGHT: f64 = 0.3;

/// Both titles must be longer than this for a containment match.
pub const MIN_CONTAINED_TITLE_LEN: usize = 10;

/// Corpus size above which a full scan logs a warning.
pub const QUADRATIC_SCAN_WARN_THRESHOLD: usize = 10_000;

const TITLE_EXACT: f64 = 1.0;
const TITLE_CONTAINED: f64 = 0.8;

/// Title similarity in [0, 1]. Empty titles carry no signal.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return TITLE_EXACT;
    }

    let long_enough =
        a.chars().count() > MIN_CONTAINED_TITLE_LEN && b.chars().count() > MIN_CONTAINED_TITLE_LEN;
    if long_enough && (a.contains(&b) || b.contains(&a)) {
        TITLE_CONTAINED
    } else {
        0.0
    }
}

/// Scores for one candidate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub url_match: Option<UrlMatch>,
    pub title: f64,
}

impl PairScore {
    pub fn new(url_match: Option<UrlMatch>, title: f64) -> Self {
        Self { url_match, title }
    }

    pub fn url(&self) -> f64 {
        self.url_match.map(|m| m.score()).unwrap_or(0.0)
    }

    pub fn is_match(&self) -> bool {
        self.url() > 0.0 || self.title > 0.0
    }

    pub fn confidence(&self) -> f64 {
        let weighted = URL_WEIGHT * self.url() + TITLE_WEIGHT * self.title;
        weighted.max(self.url()).clamp(0.0, 1.0)
    }

    pub fn reason(&self) -> String {
        let url = match self.url_match {
            Some(UrlMatch::Exact) => Some("same normalized URL"),
            Some(UrlMatch::Variation) => Some("URL variation (scheme, www or trailing slash)"),
            None => None,
        };
        let title = if self.title >= TITLE_EXACT {
            Some("identical title")
        } else if self.title > 0.0 {
            Some("similar title")
        } else {
            None
        };

        match (url, title) {
            (Some(u), Some(t)) => format!("{u} and {t}"),
            (Some(u), None) => u.to_string(),
            (None, Some(t)) => t.to_string(),
            (None, None) => "no match".to_string(),
        }
    }
}

fn score_pair(
    a: Option<&NormalizedUrl>,
    b: Option<&NormalizedUrl>,
    a_title: &str,
    b_title: &str,
) -> PairScore {
    let url_match = match (a, b) {
        (Some(a), Some(b)) => a.matches(b),
        _ => None,
    };
    PairScore::new(url_match, title_similarity(a_title, b_title))
}

/// Stronger of two URL matches.
fn best_match(a: Option<UrlMatch>, b: Option<UrlMatch>) -> Option<UrlMatch> {
    match (a, b) {
        (Some(UrlMatch::Exact), _) | (_, Some(UrlMatch::Exact)) => Some(UrlMatch::Exact),
        (Some(m), _) | (_, Some(m)) => Some(m),
        (None, None) => None,
    }
}

/// Groups bookmarks that likely point at the same resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateAnalyzer;

impl DuplicateAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Partition matching bookmarks into groups, first claim wins.
    ///
    /// `bookmarks` is scanned in the given order; each group's primary is
    /// its earliest member. A bookmark appears in at most one group.
    pub fn find_groups(&self, bookmarks: &[Bookmark]) -> Vec<DuplicateGroup> {
        let n = bookmarks.len();
        if n > QUADRATIC_SCAN_WARN_THRESHOLD {
            warn!(
                bookmarks = n,
                threshold = QUADRATIC_SCAN_WARN_THRESHOLD,
                "Duplicate scan compares every pair; large corpus will be slow"
            );
        }

        let normalized: Vec<Option<NormalizedUrl>> =
            bookmarks.iter().map(|b| normalize(&b.url).ok()).collect();
        let mut processed = vec![false; n];
        let mut groups = Vec::new();

        for i in 0..n {
            if processed[i] {
                continue;
            }

            let mut duplicates = Vec::new();
            let mut confidence: f64 = 1.0;
            let mut reasons: IndexSet<String> = IndexSet::new();

            for j in (i + 1)..n {
                if processed[j] {
                    continue;
                }

                let score = score_pair(
                    normalized[i].as_ref(),
                    normalized[j].as_ref(),
                    &bookmarks[i].title,
                    &bookmarks[j].title,
                );
                if !score.is_match() {
                    continue;
                }

                processed[j] = true;
                confidence = confidence.min(score.confidence());
                reasons.insert(score.reason());
                duplicates.push(bookmarks[j].clone());
            }

            if duplicates.is_empty() {
                continue;
            }
            processed[i] = true;

            debug!(
                primary_id = %bookmarks[i].id,
                duplicates = duplicates.len(),
                confidence,
                "Found duplicate group"
            );

            groups.push(DuplicateGroup {
                primary: bookmarks[i].clone(),
                duplicates,
                confidence,
                reason: reasons.into_iter().collect::<Vec<_>>().join("; "),
            });
        }

        groups
    }

    /// Score a prospective bookmark against the corpus.
    ///
    /// `exact` is the result of an exact-URL lookup, done separately from
    /// the normalized matching; the two may disagree.
    pub fn check_candidate(
        &self,
        candidate: &NormalizedUrl,
        title: &str,
        corpus: &[Bookmark],
        exact: Option<Bookmark>,
    ) -> DuplicateCheckResult {
        let url_matches = |target: &NormalizedUrl| -> HashMap<BookmarkId, UrlMatch> {
            find_similar_urls(target, corpus)
                .into_iter()
                .map(|(bookmark, m)| (bookmark.id, m))
                .collect()
        };
        let direct_matches = url_matches(candidate);
        let expanded_matches = candidate
            .expanded_url
            .as_deref()
            .and_then(|url| normalize(url).ok())
            .map(|expanded| url_matches(&expanded))
            .unwrap_or_default();

        let mut similar: Vec<SimilarBookmark> = corpus
            .iter()
            .filter_map(|bookmark| {
                let direct = direct_matches.get(&bookmark.id).copied();
                let via_expansion = expanded_matches.get(&bookmark.id).copied();

                let score = PairScore::new(
                    best_match(direct, via_expansion),
                    title_similarity(title, &bookmark.title),
                );
                if !score.is_match() {
                    return None;
                }

                let mut reason = score.reason();
                if direct.is_none() && via_expansion.is_some() {
                    reason.push_str(" (via expanded short URL)");
                }
                Some(SimilarBookmark {
                    bookmark: bookmark.clone(),
                    confidence: score.confidence(),
                    reason,
                })
            })
            .collect();
        similar.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let confidence = if exact.is_some() {
            1.0
        } else {
            similar.iter().map(|s| s.confidence).fold(0.0, f64::max)
        };

        let mut recommendations = Vec::new();
        if let Some(existing) = &exact {
            recommendations.push(format!(
                "A bookmark with this exact URL already exists (id {})",
                existing.id
            ));
        }
        if candidate.is_short_url {
            match &candidate.expanded_url {
                Some(target) => recommendations.push(format!(
                    "This short URL expands to {target}; consider saving the destination instead"
                )),
                None => recommendations
                    .push("This looks like a short URL but its destination could not be resolved".to_string()),
            }
        }
        if exact.is_none() && !similar.is_empty() {
            recommendations.push(format!(
                "Found {} similar bookmark(s); consider merging or updating an existing one instead",
                similar.len()
            ));
        }

        DuplicateCheckResult {
            has_exact_duplicate: exact.is_some(),
            exact_match: exact,
            has_similar_bookmarks: !similar.is_empty(),
            similar,
            confidence,
            recommendations,
        }
    }
}
