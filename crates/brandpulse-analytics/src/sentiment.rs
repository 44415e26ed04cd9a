//! Lexicon sentiment scorer with per-aspect breakdown.
//!
//! `score = (pos - neg) / (pos + neg)` and
//! `magnitude = (pos + neg) / total_words * 5`. Aspects reuse the ratio over
//! the sentences that mention one of the aspect's keywords.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{cache_key, TtlCache};
use crate::error::AnalyticsError;

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "awesome",
    "outstanding",
    "fantastic",
    "wonderful",
    "best",
    "better",
    "love",
    "loved",
    "like",
    "recommend",
    "recommended",
    "reliable",
    "fast",
    "easy",
    "intuitive",
    "helpful",
    "impressive",
    "innovative",
    "leading",
    "trusted",
    "affordable",
    "quality",
    "positive",
    "superior",
    "efficient",
    "powerful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "poor",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "worse",
    "hate",
    "hated",
    "dislike",
    "slow",
    "buggy",
    "broken",
    "unreliable",
    "expensive",
    "overpriced",
    "difficult",
    "confusing",
    "disappointing",
    "disappointed",
    "frustrating",
    "useless",
    "lacking",
    "negative",
    "inferior",
    "problem",
    "problems",
    "issue",
    "issues",
    "failure",
];

const ASPECTS: &[(&str, &[&str])] = &[
    (
        "performance",
        &["performance", "speed", "fast", "slow", "latency", "responsive"],
    ),
    (
        "quality",
        &["quality", "build", "durable", "reliable", "craftsmanship", "materials"],
    ),
    (
        "usability",
        &["usability", "interface", "intuitive", "easy", "design", "ux"],
    ),
    (
        "value",
        &["price", "value", "cost", "affordable", "expensive", "worth"],
    ),
    (
        "support",
        &["support", "service", "help", "helpful", "customer", "documentation"],
    ),
];

/// Sentiment for one named aspect of the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectSentiment {
    pub topic: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Polarity in `[-1.0, 1.0]`.
    pub score: f64,
    pub magnitude: f64,
    pub aspects: Vec<AspectSentiment>,
}

impl SentimentResult {
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            magnitude: 0.0,
            aspects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Aspect {
    pub topic: String,
    pub keywords: Vec<String>,
}

/// Word lists driving [`SentimentLexicon::score_text`]. All entries are lowercase.
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentLexicon {
    pub positive: HashSet<String>,
    pub negative: HashSet<String>,
    #[serde(default)]
    pub aspects: Vec<Aspect>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().map(|w| (*w).to_string()).collect(),
            negative: NEGATIVE_WORDS.iter().map(|w| (*w).to_string()).collect(),
            aspects: ASPECTS
                .iter()
                .map(|(topic, keywords)| Aspect {
                    topic: (*topic).to_string(),
                    keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// Split text into lowercase words. Apostrophes inside a word are kept.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(positive: usize, negative: usize) -> f64 {
    let total = positive + negative;
    if total == 0 {
        return 0.0;
    }
    (positive as f64 - negative as f64) / total as f64
}

impl SentimentLexicon {
    /// Parse a lexicon from YAML (`positive: [...]`, `negative: [...]`, `aspects: [...]`).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Validation`] if the document does not parse.
    pub fn from_yaml_str(content: &str) -> Result<Self, AnalyticsError> {
        let mut lexicon: Self = serde_yaml::from_str(content).map_err(|e| {
            AnalyticsError::validation("INVALID_LEXICON", format!("invalid lexicon: {e}"))
        })?;
        lexicon.positive = lexicon.positive.iter().map(|w| w.to_lowercase()).collect();
        lexicon.negative = lexicon.negative.iter().map(|w| w.to_lowercase()).collect();
        for aspect in &mut lexicon.aspects {
            for keyword in &mut aspect.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        Ok(lexicon)
    }

    fn tally<'a>(&self, words: impl IntoIterator<Item = &'a String>) -> (usize, usize) {
        words.into_iter().fold((0, 0), |(pos, neg), w| {
            if self.positive.contains(w) {
                (pos + 1, neg)
            } else if self.negative.contains(w) {
                (pos, neg + 1)
            } else {
                (pos, neg)
            }
        })
    }

    /// Score `text` without caching.
    #[must_use]
    pub fn score_text(&self, text: &str) -> SentimentResult {
        let all_words = words(text);
        if all_words.is_empty() {
            return SentimentResult::neutral();
        }

        let (positive, negative) = self.tally(&all_words);
        if positive + negative == 0 {
            return SentimentResult::neutral();
        }

        #[allow(clippy::cast_precision_loss)]
        let magnitude = (positive + negative) as f64 / all_words.len() as f64 * 5.0;

        SentimentResult {
            score: ratio(positive, negative),
            magnitude,
            aspects: self.aspects_of(text, &all_words),
        }
    }

    fn aspects_of(&self, text: &str, all_words: &[String]) -> Vec<AspectSentiment> {
        let present: HashSet<&str> = all_words.iter().map(String::as_str).collect();
        let sentence_words: Vec<Vec<String>> = sentences(text).map(words).collect();

        self.aspects
            .iter()
            .filter(|aspect| aspect.keywords.iter().any(|k| present.contains(k.as_str())))
            .map(|aspect| {
                let (pos, neg) = sentence_words
                    .iter()
                    .filter(|sw| sw.iter().any(|w| aspect.keywords.contains(w)))
                    .map(|sw| self.tally(sw))
                    .fold((0, 0), |(p, n), (sp, sn)| (p + sp, n + sn));
                AspectSentiment {
                    topic: aspect.topic.clone(),
                    score: ratio(pos, neg),
                }
            })
            .collect()
    }
}

/// Cached sentiment analysis keyed by a hash of the input text.
pub struct SentimentAnalyzer {
    lexicon: SentimentLexicon,
    cache: TtlCache<SentimentResult>,
    ttl: Duration,
}

impl SentimentAnalyzer {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    #[must_use]
    pub fn new(lexicon: SentimentLexicon, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            lexicon,
            cache: TtlCache::new(capacity),
            ttl,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &TtlCache<SentimentResult> {
        &self.cache
    }

    /// Analyze `text`. Blank text is neutral and never reaches the cache.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Analysis`] if scoring produces a non-finite value.
    pub async fn analyze(&self, text: &str) -> Result<SentimentResult, AnalyticsError> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::neutral());
        }

        let key = cache_key("sentiment", text);
        self.cache
            .get_or_set(&key, self.ttl, || async {
                let result = self.lexicon.score_text(text);
                if !result.score.is_finite() || !result.magnitude.is_finite() {
                    return Err(AnalyticsError::analysis(
                        "sentiment",
                        format!(
                            "non-finite score {} / magnitude {}",
                            result.score, result.magnitude
                        ),
                    ));
                }
                Ok(result)
            })
            .await
    }
}

#[cfg(test)]
#[path = "sentiment_test.rs"]
mod tests;
