//! Text sentiment scoring: text → (direction, confidence).
//!
//! The lexicon analyzer is the primary path. When it cannot be loaded the
//! scorer falls back to keyword counting. The choice is made once, when the
//! scorer is built, and callers see the same output shape either way.

pub mod keyword;
pub mod lexicon;

use std::path::Path;

use concord_models::{Direction, SentimentConfig, SentimentStrategy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SentimentError;
pub use lexicon::LexiconAnalyzer;

/// Output of [`SentimentScorer::score`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SentimentScore {
    pub direction: Direction,
    pub confidence: f64,
    /// Normalized compound score; `None` when the keyword fallback ran.
    pub compound: Option<f64>,
}

fn lerp(lo: f64, hi: f64, t: f64) -> f64 {
    lo + (hi - lo) * t.clamp(0.0, 1.0)
}

/// Map a compound score in [-1, 1] to a direction and confidence.
///
/// | compound            | direction | confidence    |
/// |---------------------|-----------|---------------|
/// | c >= 0.75           | bullish   | 0.77 ..= 0.85 |
/// | 0.50 <= c < 0.75    | bullish   | 0.70 .. 0.77  |
/// | 0.05 <= c < 0.50    | bullish   | 0.57 .. 0.70  |
/// | -0.05 < c < 0.05    | neutral   | 0.60          |
/// | -0.50 < c <= -0.05  | bearish   | 0.57 .. 0.68  |
/// | c <= -0.50          | bearish   | 0.68 ..= 0.80 |
///
/// Confidence is linear in |c| inside each bucket.
pub fn map_compound(compound: f64) -> (Direction, f64) {
    let c = if compound.is_nan() {
        0.0
    } else {
        compound.clamp(-1.0, 1.0)
    };
    let magnitude = c.abs();

    if c >= 0.75 {
        (Direction::Bullish, lerp(0.77, 0.85, (magnitude - 0.75) / 0.25))
    } else if c >= 0.50 {
        (Direction::Bullish, lerp(0.70, 0.77, (magnitude - 0.50) / 0.25))
    } else if c >= 0.05 {
        (Direction::Bullish, lerp(0.57, 0.70, (magnitude - 0.05) / 0.45))
    } else if c > -0.05 {
        (Direction::Neutral, 0.60)
    } else if c > -0.50 {
        (Direction::Bearish, lerp(0.57, 0.68, (magnitude - 0.05) / 0.45))
    } else {
        (Direction::Bearish, lerp(0.68, 0.80, (magnitude - 0.50) / 0.50))
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Lexicon(LexiconAnalyzer),
    Keyword,
}

/// Sentiment scorer with its strategy fixed at construction.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    strategy: Strategy,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::lexicon(LexiconAnalyzer::builtin())
    }
}

impl SentimentScorer {
    pub fn lexicon(analyzer: LexiconAnalyzer) -> Self {
        Self {
            strategy: Strategy::Lexicon(analyzer),
        }
    }

    pub fn keyword() -> Self {
        Self {
            strategy: Strategy::Keyword,
        }
    }

    /// Resolve the scoring strategy from configuration.
    ///
    /// `Auto` degrades to keyword counting when a configured lexicon file
    /// cannot be loaded; `Lexicon` treats that as an error.
    pub fn from_config(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let scorer = match (config.strategy, config.lexicon_path.as_deref()) {
            (SentimentStrategy::Keyword, _) => Self::keyword(),
            (SentimentStrategy::Lexicon, Some(path)) => {
                Self::lexicon(LexiconAnalyzer::from_file(Path::new(path))?)
            }
            (SentimentStrategy::Lexicon | SentimentStrategy::Auto, None) => Self::default(),
            (SentimentStrategy::Auto, Some(path)) => {
                match LexiconAnalyzer::from_file(Path::new(path)) {
                    Ok(analyzer) => Self::lexicon(analyzer),
                    Err(e) => {
                        warn!(error = %e, "Lexicon unavailable, falling back to keyword sentiment");
                        Self::keyword()
                    }
                }
            }
        };
        info!(strategy = scorer.strategy_name(), "Sentiment scorer ready");
        Ok(scorer)
    }

    pub fn strategy_name(&self) -> &'static str {
        match self.strategy {
            Strategy::Lexicon(_) => "lexicon",
            Strategy::Keyword => "keyword",
        }
    }

    pub fn score(&self, text: &str) -> SentimentScore {
        match &self.strategy {
            Strategy::Lexicon(analyzer) => {
                let compound = analyzer.compound(text);
                let (direction, confidence) = map_compound(compound);
                SentimentScore {
                    direction,
                    confidence,
                    compound: Some(compound),
                }
            }
            Strategy::Keyword => {
                let (direction, confidence) = keyword::score(text);
                SentimentScore {
                    direction,
                    confidence,
                    compound: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn negation_yields_opposite_directions() {
        let scorer = SentimentScorer::default();
        let good = scorer.score("This is good");
        let not_good = scorer.score("This is not good");
        assert_eq!(good.direction, Direction::Bullish);
        assert_eq!(not_good.direction, Direction::Bearish);
    }

    #[test]
    fn exclaimed_growth_is_strongly_bullish() {
        let score = SentimentScorer::default().score("Exceptional growth!!!");
        assert_eq!(score.direction, Direction::Bullish);
        assert!((0.77..=0.85).contains(&score.confidence), "{score:?}");
    }

    #[test]
    fn mapping_bucket_edges() {
        let cases = [
            (1.0, Direction::Bullish, 0.85),
            (0.75, Direction::Bullish, 0.77),
            (0.50, Direction::Bullish, 0.70),
            (0.05, Direction::Bullish, 0.57),
            (0.0, Direction::Neutral, 0.60),
            (-0.04, Direction::Neutral, 0.60),
            (-0.05, Direction::Bearish, 0.57),
            (-0.50, Direction::Bearish, 0.68),
            (-1.0, Direction::Bearish, 0.80),
        ];
        for (compound, expected_direction, expected_confidence) in cases {
            let (direction, confidence) = map_compound(compound);
            assert_eq!(direction, expected_direction, "compound {compound}");
            assert!(approx(confidence, expected_confidence), "compound {compound}: {confidence}");
        }
    }

    #[test]
    fn mapping_interpolates_within_bucket() {
        let (direction, confidence) = map_compound(0.875);
        assert_eq!(direction, Direction::Bullish);
        assert!(approx(confidence, 0.81));

        let (direction, confidence) = map_compound(-0.75);
        assert_eq!(direction, Direction::Bearish);
        assert!(approx(confidence, 0.74));
    }

    #[test]
    fn mapping_handles_nan_and_overflow() {
        assert_eq!(map_compound(f64::NAN), (Direction::Neutral, 0.60));
        let (direction, confidence) = map_compound(3.0);
        assert_eq!(direction, Direction::Bullish);
        assert!(approx(confidence, 0.85));
    }

    #[test]
    fn keyword_fallback_keeps_shape() {
        let scorer = SentimentScorer::keyword();
        let score = scorer.score("Profits surged");
        assert_eq!(score.direction, Direction::Bullish);
        assert!(score.compound.is_none());
        assert!((0.55..=0.65).contains(&score.confidence));
    }

    #[test]
    fn auto_falls_back_when_lexicon_missing() {
        let config = SentimentConfig {
            strategy: SentimentStrategy::Auto,
            lexicon_path: Some("/nonexistent/vader_lexicon.txt".to_string()),
        };
        let scorer = SentimentScorer::from_config(&config).unwrap();
        assert_eq!(scorer.strategy_name(), "keyword");
    }

    #[test]
    fn explicit_lexicon_with_missing_file_fails() {
        let config = SentimentConfig {
            strategy: SentimentStrategy::Lexicon,
            lexicon_path: Some("/nonexistent/vader_lexicon.txt".to_string()),
        };
        assert!(SentimentScorer::from_config(&config).is_err());
    }

    #[test]
    fn default_config_uses_builtin_lexicon() {
        let scorer = SentimentScorer::from_config(&SentimentConfig::default()).unwrap();
        assert_eq!(scorer.strategy_name(), "lexicon");
    }
}
