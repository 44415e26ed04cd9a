//! Share of voice and composite ranking across competitors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

const COUNT_WEIGHT: f64 = 0.3;
const POSITION_WEIGHT: f64 = 0.4;
const SENTIMENT_WEIGHT: f64 = 0.3;

/// One competitor appearance in a language-model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMention {
    pub name: String,
    /// 1-based list position, `1..=10`.
    pub position: u8,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorStat {
    pub name: String,
    pub mention_count: usize,
    pub average_position: f64,
    pub average_sentiment: f64,
    pub share_of_voice: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCompetitor {
    #[serde(flatten)]
    pub stat: CompetitorStat,
    pub score: f64,
}

#[derive(Default)]
struct Tally {
    count: usize,
    position_sum: f64,
    sentiment_sum: f64,
}

fn validate(mentions: &[CompetitorMention]) -> Result<(), AnalyticsError> {
    for mention in mentions {
        if mention.name.trim().is_empty() {
            return Err(AnalyticsError::validation(
                "MISSING_COMPETITOR_NAME",
                "competitor name must be non-empty",
            ));
        }
        if !(1..=10).contains(&mention.position) {
            return Err(AnalyticsError::validation(
                "INVALID_POSITION",
                format!(
                    "position {} for {} is outside 1..=10",
                    mention.position, mention.name
                ),
            ));
        }
        if !(-1.0..=1.0).contains(&mention.sentiment) {
            return Err(AnalyticsError::validation(
                "INVALID_SENTIMENT",
                format!(
                    "sentiment {} for {} is outside [-1, 1]",
                    mention.sentiment, mention.name
                ),
            ));
        }
    }
    Ok(())
}

/// Fold mention records into per-competitor statistics keyed by name.
///
/// # Errors
///
/// Returns a validation error for an empty name, an out-of-range position or
/// sentiment, a zero `total_responses` with non-empty input, or a competitor
/// with more mentions than `total_responses`.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(
    mentions: &[CompetitorMention],
    total_responses: usize,
) -> Result<HashMap<String, CompetitorStat>, AnalyticsError> {
    validate(mentions)?;
    if mentions.is_empty() {
        return Ok(HashMap::new());
    }
    if total_responses == 0 {
        return Err(AnalyticsError::validation(
            "INVALID_TOTAL_RESPONSES",
            "total responses must be positive when mentions are supplied",
        ));
    }

    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    for mention in mentions {
        let tally = tallies.entry(mention.name.as_str()).or_default();
        tally.count += 1;
        tally.position_sum += f64::from(mention.position);
        tally.sentiment_sum += mention.sentiment;
    }

    if let Some((name, tally)) = tallies.iter().find(|(_, t)| t.count > total_responses) {
        return Err(AnalyticsError::validation(
            "INVALID_TOTAL_RESPONSES",
            format!(
                "{name} has {} mentions but only {total_responses} responses were analyzed",
                tally.count
            ),
        ));
    }

    let total = total_responses as f64;
    Ok(tallies
        .into_iter()
        .map(|(name, tally)| {
            let count = tally.count as f64;
            let stat = CompetitorStat {
                name: name.to_string(),
                mention_count: tally.count,
                average_position: tally.position_sum / count,
                average_sentiment: tally.sentiment_sum / count,
                share_of_voice: count / total * 100.0,
            };
            (stat.name.clone(), stat)
        })
        .collect())
}

/// Weighted composite of count, average position and normalized sentiment, times 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn composite_score(stat: &CompetitorStat) -> f64 {
    let sentiment = (stat.average_sentiment + 1.0) / 2.0;
    (stat.mention_count as f64 * COUNT_WEIGHT
        + stat.average_position * POSITION_WEIGHT
        + sentiment * SENTIMENT_WEIGHT)
        * 100.0
}

/// Order competitors by composite score, highest first; equal scores sort by name.
#[must_use]
pub fn rank(stats: impl IntoIterator<Item = CompetitorStat>) -> Vec<RankedCompetitor> {
    let mut ranked: Vec<RankedCompetitor> = stats
        .into_iter()
        .map(|stat| RankedCompetitor {
            score: composite_score(&stat),
            stat,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.stat.name.cmp(&b.stat.name))
    });
    ranked
}

/// `100 * (1 - rank_index / total)` for `brand` in `ranked`, or 0 when absent.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn relative_position(brand: &str, ranked: &[RankedCompetitor]) -> f64 {
    ranked
        .iter()
        .position(|r| r.stat.name.eq_ignore_ascii_case(brand))
        .map_or(0.0, |idx| {
            100.0 * (1.0 - idx as f64 / ranked.len() as f64)
        })
}
