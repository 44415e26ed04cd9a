//! Brand-name occurrence detection and the 0-100 prominence score.

use serde::Serialize;

const FREQUENCY_CAP: f64 = 50.0;
const FREQUENCY_WEIGHT: f64 = 25.0;
const PROMINENCE_CAP: f64 = 100.0;

/// Brand occurrences found in one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionScan {
    pub mention_count: usize,
    /// Token index of each match, in text order.
    pub positions: Vec<usize>,
    pub total_tokens: usize,
    pub prominence: f64,
}

fn normalize_token(raw: &str) -> String {
    raw.replace('\u{2019}', "'")
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .trim_end_matches('\'')
        .to_string()
}

fn surface_forms(brand: &str) -> [String; 5] {
    let lower = brand.to_lowercase();
    [
        brand.to_string(),
        lower.clone(),
        brand.to_uppercase(),
        format!("{brand}'s"),
        format!("{lower}'s"),
    ]
}

/// Scan `text` for `brand` as exact, lowercase, uppercase or possessive forms.
///
/// Multi-word brands match consecutive tokens. A blank brand never matches.
#[must_use]
pub fn detect_mentions(text: &str, brand: &str) -> MentionScan {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(normalize_token)
        .collect();
    let brand_words: Vec<&str> = brand.split_whitespace().collect();
    let width = brand_words.len();

    let mut positions = Vec::new();
    if width > 0 && tokens.len() >= width {
        let forms = surface_forms(&brand_words.join(" "));
        let mut idx = 0;
        while idx + width <= tokens.len() {
            let window = tokens[idx..idx + width].join(" ");
            if forms.iter().any(|form| *form == window) {
                positions.push(idx);
                idx += width;
            } else {
                idx += 1;
            }
        }
    }

    MentionScan {
        mention_count: positions.len(),
        prominence: prominence_score(&positions, tokens.len()),
        positions,
        total_tokens: tokens.len(),
    }
}

/// `min(log10(n + 1) * 25, 50)` plus the mean positional weight scaled to 0-50.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn prominence_score(positions: &[usize], total_tokens: usize) -> f64 {
    if positions.is_empty() || total_tokens == 0 {
        return 0.0;
    }

    let count = positions.len() as f64;
    let frequency = ((count + 1.0).log10() * FREQUENCY_WEIGHT).min(FREQUENCY_CAP);

    let total = total_tokens as f64;
    let position_sum: f64 = positions
        .iter()
        .map(|&idx| (100.0 - idx as f64 / total * 100.0).max(0.0))
        .sum();
    let position = position_sum / count / 2.0;

    (frequency + position).min(PROMINENCE_CAP)
}
