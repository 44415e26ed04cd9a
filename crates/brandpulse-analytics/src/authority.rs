//! Citation-source authority scoring from domain tables plus URL heuristics.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Url;
use serde::Deserialize;

use crate::cache::{cache_key, TtlCache};
use crate::error::AnalyticsError;

const EXACT_DOMAINS: &[(&str, f64)] = &[
    ("wikipedia.org", 0.9),
    ("github.com", 0.85),
    ("arxiv.org", 0.88),
    ("nih.gov", 0.95),
    ("ncbi.nlm.nih.gov", 0.95),
    ("who.int", 0.93),
    ("nature.com", 0.92),
    ("science.org", 0.92),
    ("ieee.org", 0.88),
    ("acm.org", 0.87),
    ("reuters.com", 0.88),
    ("apnews.com", 0.87),
    ("bbc.co.uk", 0.85),
    ("nytimes.com", 0.85),
    ("stackoverflow.com", 0.8),
    ("medium.com", 0.55),
    ("reddit.com", 0.45),
    ("quora.com", 0.4),
];

const SUFFIX_BUCKETS: &[(&str, f64)] = &[
    (".gov", 0.9),
    (".mil", 0.85),
    (".edu", 0.85),
    (".ac.uk", 0.85),
    (".int", 0.85),
    (".org", 0.75),
    (".io", 0.6),
    (".com", 0.6),
    (".co", 0.55),
    (".net", 0.55),
    (".info", 0.4),
    (".biz", 0.35),
];

const DEFAULT_AUTHORITY: f64 = 0.5;

const HTTPS_BONUS: f64 = 0.05;
const SCHOLARLY_PATH_BONUS: f64 = 0.1;
const GOV_PATH_BONUS: f64 = 0.1;
const EDU_PATH_BONUS: f64 = 0.08;
const INSTITUTION_KEYWORD_BONUS: f64 = 0.05;
const COMMUNITY_KEYWORD_PENALTY: f64 = 0.1;

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(doi\.org/|\b10\.\d{4,9}/\S+)").expect("valid doi regex"));
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[a-z][a-z0-9+.-]*://").expect("valid scheme regex"));
static ARXIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv\.org/(abs|pdf)/\d{4}\.\d{4,5}").expect("valid arxiv regex")
});

#[derive(Debug, Clone, Deserialize)]
struct SuffixBucket {
    suffix: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct AuthorityTableFile {
    #[serde(default)]
    exact: HashMap<String, f64>,
    #[serde(default)]
    suffixes: Vec<SuffixBucket>,
    #[serde(default = "default_authority")]
    default: f64,
}

fn default_authority() -> f64 {
    DEFAULT_AUTHORITY
}

/// Domain score table. Suffix buckets are checked longest-first.
#[derive(Debug, Clone)]
pub struct AuthorityTable {
    exact: HashMap<String, f64>,
    suffixes: Vec<(String, f64)>,
    default_score: f64,
}

impl Default for AuthorityTable {
    fn default() -> Self {
        Self::new(
            EXACT_DOMAINS
                .iter()
                .map(|(d, s)| ((*d).to_string(), *s))
                .collect(),
            SUFFIX_BUCKETS
                .iter()
                .map(|(d, s)| ((*d).to_string(), *s))
                .collect(),
            DEFAULT_AUTHORITY,
        )
    }
}

impl AuthorityTable {
    #[must_use]
    pub fn new(
        exact: HashMap<String, f64>,
        mut suffixes: Vec<(String, f64)>,
        default_score: f64,
    ) -> Self {
        suffixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            exact: exact
                .into_iter()
                .map(|(d, s)| (d.to_lowercase(), s))
                .collect(),
            suffixes: suffixes
                .into_iter()
                .map(|(d, s)| (d.to_lowercase(), s))
                .collect(),
            default_score,
        }
    }

    /// Parse a table from YAML (`exact: {domain: score}`, `suffixes: [{suffix, score}]`, `default`).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the document does not parse or
    /// any score lies outside `[0, 1]`.
    pub fn from_yaml_str(content: &str) -> Result<Self, AnalyticsError> {
        let file: AuthorityTableFile = serde_yaml::from_str(content).map_err(|e| {
            AnalyticsError::validation(
                "INVALID_AUTHORITY_TABLE",
                format!("invalid authority table: {e}"),
            )
        })?;

        let out_of_range = file
            .exact
            .values()
            .chain(file.suffixes.iter().map(|b| &b.score))
            .chain(std::iter::once(&file.default))
            .any(|s| !(0.0..=1.0).contains(s));
        if out_of_range {
            return Err(AnalyticsError::validation(
                "INVALID_AUTHORITY_TABLE",
                "authority scores must lie in [0, 1]",
            ));
        }

        Ok(Self::new(
            file.exact,
            file.suffixes
                .into_iter()
                .map(|b| (b.suffix, b.score))
                .collect(),
            file.default,
        ))
    }

    /// Base score for a hostname before heuristic adjustments.
    #[must_use]
    pub fn base_score(&self, domain: &str) -> f64 {
        let bare = domain.strip_prefix("www.").unwrap_or(domain);
        if let Some(score) = self.exact.get(domain).or_else(|| self.exact.get(bare)) {
            return *score;
        }
        self.suffixes
            .iter()
            .find(|(suffix, _)| domain.ends_with(suffix.as_str()))
            .map_or(self.default_score, |(_, score)| *score)
    }
}

/// Hostname of `source`, or the lowercased raw source when it does not parse.
#[must_use]
pub fn normalize_domain(source: &str) -> String {
    let trimmed = source.trim();
    let with_scheme = if SCHEME_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&with_scheme) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => trimmed.to_lowercase(),
        },
        Err(_) => trimmed.to_lowercase(),
    }
}

fn heuristic_adjustment(source: &str) -> f64 {
    let lower = source.trim().to_lowercase();
    let mut adjustment = 0.0;

    if lower.starts_with("https://") {
        adjustment += HTTPS_BONUS;
    }
    if DOI_RE.is_match(&lower) || ARXIV_RE.is_match(&lower) {
        adjustment += SCHOLARLY_PATH_BONUS;
    }
    if lower.contains(".gov/") {
        adjustment += GOV_PATH_BONUS;
    }
    if lower.contains(".edu/") {
        adjustment += EDU_PATH_BONUS;
    }
    if ["research", "institute", "foundation"]
        .iter()
        .any(|k| lower.contains(k))
    {
        adjustment += INSTITUTION_KEYWORD_BONUS;
    }
    if ["blog", "forum"].iter().any(|k| lower.contains(k)) {
        adjustment -= COMMUNITY_KEYWORD_PENALTY;
    }

    adjustment
}

/// Authority of `source` in `[0, 1]`, uncached.
#[must_use]
pub fn compute_authority(table: &AuthorityTable, source: &str) -> f64 {
    let domain = normalize_domain(source);
    (table.base_score(&domain) + heuristic_adjustment(source)).clamp(0.0, 1.0)
}

/// Cached authority scoring keyed by a hash of the source string.
pub struct AuthorityScorer {
    table: AuthorityTable,
    cache: TtlCache<f64>,
    ttl: Duration,
}

impl AuthorityScorer {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    #[must_use]
    pub fn new(table: AuthorityTable, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            table,
            cache: TtlCache::new(capacity),
            ttl,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache<f64> {
        &self.cache
    }

    /// Score a citation source.
    ///
    /// # Errors
    ///
    /// Returns a `MISSING_SOURCE` validation error for a blank source.
    pub async fn score(&self, source: &str) -> Result<f64, AnalyticsError> {
        if source.trim().is_empty() {
            return Err(AnalyticsError::validation(
                "MISSING_SOURCE",
                "citation source must be non-empty",
            ));
        }

        let key = cache_key("authority", source);
        self.cache
            .get_or_set(&key, self.ttl, || async {
                Ok::<_, AnalyticsError>(compute_authority(&self.table, source))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn scorer() -> AuthorityScorer {
        AuthorityScorer::new(
            AuthorityTable::default(),
            NonZeroUsize::new(32).unwrap(),
            AuthorityScorer::DEFAULT_TTL,
        )
    }

    #[test]
    fn normalizes_bare_domains_and_urls() {
        assert_eq!(normalize_domain("GitHub.com/rust-lang"), "github.com");
        assert_eq!(normalize_domain("https://en.wikipedia.org/wiki/Rust"), "en.wikipedia.org");
        assert_eq!(normalize_domain("http://[::1"), "http://[::1");
    }

    #[test]
    fn scheme_inside_query_string_is_not_a_scheme() {
        let source = "example.com/go?to=https://other.org";
        assert_eq!(normalize_domain(source), "example.com");
        let score = compute_authority(&AuthorityTable::default(), source);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn exact_match_beats_suffix() {
        let table = AuthorityTable::default();
        assert!(approx(table.base_score("github.com"), 0.85));
        assert!(approx(table.base_score("www.github.com"), 0.85));
        assert!(approx(table.base_score("example.com"), 0.6));
        assert!(approx(table.base_score("example.zzz"), DEFAULT_AUTHORITY));
    }

    #[test]
    fn longest_suffix_wins() {
        let table = AuthorityTable::default();
        assert!(approx(table.base_score("ox.ac.uk"), 0.85));
    }

    #[test]
    fn bare_domain_gets_no_https_bonus() {
        assert!(approx(compute_authority(&AuthorityTable::default(), "github.com"), 0.85));
        assert!(approx(
            compute_authority(&AuthorityTable::default(), "https://github.com"),
            0.9
        ));
    }

    #[test]
    fn university_research_page_is_clamped() {
        let score = compute_authority(&AuthorityTable::default(), "https://mit.edu/research/x");
        // .edu 0.85 + https 0.05 + .edu/ 0.08 + research 0.05, clamped.
        assert!(score >= 0.85);
        assert!(approx(score, 1.0));
    }

    #[test]
    fn doi_and_arxiv_paths_get_bonus() {
        let table = AuthorityTable::default();
        let doi = compute_authority(&table, "http://example.com/10.1000/xyz123");
        assert!(approx(doi, 0.7), "got {doi}");
        let arxiv = compute_authority(&table, "http://arxiv.org/abs/2101.00001");
        assert!(approx(arxiv, 0.98), "got {arxiv}");
    }

    #[test]
    fn blogs_and_forums_are_penalized() {
        let score = compute_authority(&AuthorityTable::default(), "http://blog.example.com/post");
        assert!(approx(score, 0.5), "got {score}");
    }

    #[test]
    fn gov_path_bonus() {
        let score = compute_authority(&AuthorityTable::default(), "http://cdc.gov/page");
        assert!(approx(score, 1.0), "got {score}");
    }

    #[test]
    fn yaml_table_overrides_defaults() {
        let table = AuthorityTable::from_yaml_str(
            "exact:\n  acme.com: 0.2\nsuffixes:\n  - suffix: .example\n    score: 0.7\ndefault: 0.3\n",
        )
        .unwrap();
        assert!(approx(table.base_score("acme.com"), 0.2));
        assert!(approx(table.base_score("shop.example"), 0.7));
        assert!(approx(table.base_score("github.com"), 0.3));
    }

    #[test]
    fn yaml_table_rejects_out_of_range_scores() {
        let err = AuthorityTable::from_yaml_str("exact:\n  acme.com: 1.5\n").unwrap_err();
        assert_eq!(err.code(), "INVALID_AUTHORITY_TABLE");
    }

    #[tokio::test]
    async fn blank_source_is_rejected() {
        let err = scorer().score("  ").await.unwrap_err();
        assert_eq!(err.code(), "MISSING_SOURCE");
    }

    #[tokio::test]
    async fn score_is_cached() {
        let scorer = scorer();
        let a = scorer.score("https://nih.gov/study").await.unwrap();
        let b = scorer.score("https://nih.gov/study").await.unwrap();
        assert!(approx(a, b));
        assert_eq!(scorer.cache().misses(), 1);
        assert_eq!(scorer.cache().hits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn score_is_stable_across_expiry() {
        let scorer = AuthorityScorer::new(
            AuthorityTable::default(),
            NonZeroUsize::new(4).unwrap(),
            Duration::from_secs(5),
        );
        let before = scorer.score("https://github.com/rust-lang/rust").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        let after = scorer.score("https://github.com/rust-lang/rust").await.unwrap();
        assert!(approx(before, after));
        assert_eq!(scorer.cache().misses(), 2);
    }
}
