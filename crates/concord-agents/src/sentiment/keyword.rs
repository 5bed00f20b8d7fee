use concord_models::Direction;

// Whole words only, with their common inflections spelled out.
const POSITIVE_TERMS: &[&str] = &[
    "beat", "beats", "bullish", "exceed", "exceeded", "exceeds", "expand", "expanded",
    "expanding", "expansion", "gain", "gained", "gains", "grew", "grow", "growing", "grows",
    "growth", "improve", "improved", "improvement", "improves", "outperform", "outperformed",
    "profit", "profitable", "profits", "rallied", "rally", "record", "rebound", "rebounded",
    "recover", "recovered", "recovery", "robust", "soar", "soared", "strong", "stronger",
    "surge", "surged", "upgrade", "upgraded",
];

const NEGATIVE_TERMS: &[&str] = &[
    "bankrupt", "bankruptcy", "bearish", "decline", "declined", "declines", "declining",
    "default", "defaulted", "downgrade", "downgraded", "drop", "dropped", "drops", "fall",
    "falling", "falls", "fell", "lawsuit", "lawsuits", "layoff", "layoffs", "loss", "losses",
    "miss", "missed", "misses", "plunge", "plunged", "recession", "slump", "slumped",
    "underperform", "underperformed", "warn", "warned", "warning", "weak", "weaker", "weakness",
];

/// Ratio beyond which the keyword balance counts as directional.
const DIRECTION_THRESHOLD: f64 = 0.2;

/// Count-based fallback scorer over a fixed financial vocabulary.
///
/// Confidence stays inside 0.55..=0.65: keyword counts are a weak signal.
pub fn score(text: &str) -> (Direction, f64) {
    let (positive, negative) = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .fold((0usize, 0usize), |(pos, neg), word| {
            let is_pos = POSITIVE_TERMS.contains(&word.as_str());
            let is_neg = NEGATIVE_TERMS.contains(&word.as_str());
            (pos + usize::from(is_pos), neg + usize::from(is_neg))
        });

    let total = positive + negative;
    if total == 0 {
        return (Direction::Neutral, 0.55);
    }

    let ratio = (positive as f64 - negative as f64) / total as f64;
    let direction = if ratio > DIRECTION_THRESHOLD {
        Direction::Bullish
    } else if ratio < -DIRECTION_THRESHOLD {
        Direction::Bearish
    } else {
        Direction::Neutral
    };
    (direction, 0.55 + 0.10 * ratio.abs())
}
