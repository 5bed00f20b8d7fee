//! Valence-lexicon analyzer in the style of VADER.
//!
//! Scores each token from a lexicon of valences on a -4..4 scale, adjusts for
//! nearby boosters, negators, "but" contrast, ALL-CAPS emphasis and trailing
//! punctuation, then normalizes the sum into a compound score in [-1, 1].

use std::collections::HashMap;
use std::path::Path;

use crate::error::SentimentError;

const BOOSTER_INCREMENT: f64 = 0.293;
const BOOSTER_DECREMENT: f64 = -0.293;
const CAPS_EMPHASIS: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_WEIGHT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const QUESTION_WEIGHT: f64 = 0.18;
const MAX_QUESTION_EMPHASIS: f64 = 0.96;
const NORMALIZATION_ALPHA: f64 = 15.0;
/// Booster influence by distance: one, two and three tokens back.
const BOOSTER_DECAY: [f64; 3] = [1.0, 0.95, 0.9];

const BUILTIN_LEXICON: &[(&str, f64)] = &[
    // general
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 2.7),
    ("exceptional", 2.9),
    ("outstanding", 3.0),
    ("amazing", 2.8),
    ("impressive", 2.3),
    ("positive", 2.3),
    ("solid", 1.5),
    ("strong", 2.0),
    ("stronger", 2.1),
    ("healthy", 1.7),
    ("happy", 2.7),
    ("optimistic", 2.2),
    ("confident", 2.2),
    ("success", 2.7),
    ("successful", 2.8),
    ("win", 2.8),
    ("wins", 2.7),
    ("improve", 1.9),
    ("improved", 2.1),
    ("improving", 1.8),
    ("improvement", 2.0),
    ("better", 1.9),
    ("best", 3.2),
    ("bad", -2.5),
    ("poor", -2.1),
    ("terrible", -2.9),
    ("awful", -2.8),
    ("horrible", -2.5),
    ("disappointing", -2.2),
    ("disappointed", -1.9),
    ("negative", -2.7),
    ("weak", -1.9),
    ("weaker", -1.9),
    ("worse", -2.1),
    ("worst", -3.1),
    ("fail", -2.5),
    ("failed", -2.3),
    ("failure", -2.3),
    ("concern", -1.4),
    ("concerns", -1.5),
    ("worried", -1.2),
    ("worry", -1.9),
    ("fear", -2.2),
    ("fears", -1.9),
    ("uncertain", -1.2),
    ("uncertainty", -1.4),
    ("problem", -1.7),
    ("problems", -1.7),
    ("crisis", -3.1),
    ("scandal", -2.8),
    ("fraud", -2.8),
    ("pessimistic", -1.9),
    ("struggle", -1.9),
    ("struggling", -2.0),
    ("trouble", -1.7),
    // finance
    ("growth", 1.6),
    ("grow", 1.5),
    ("growing", 1.5),
    ("profit", 1.9),
    ("profits", 1.9),
    ("profitable", 2.1),
    ("gain", 2.0),
    ("gains", 1.8),
    ("beat", 1.6),
    ("beats", 1.6),
    ("surge", 1.9),
    ("surged", 2.0),
    ("soar", 2.2),
    ("soared", 2.3),
    ("rally", 1.8),
    ("rallied", 1.8),
    ("record", 1.2),
    ("upgrade", 1.8),
    ("upgraded", 1.9),
    ("outperform", 2.0),
    ("outperformed", 2.0),
    ("bullish", 2.2),
    ("boom", 1.8),
    ("expansion", 1.3),
    ("exceed", 1.6),
    ("exceeded", 1.8),
    ("robust", 1.9),
    ("resilient", 1.7),
    ("dividend", 0.8),
    ("buyback", 1.0),
    ("innovative", 1.8),
    ("opportunity", 1.6),
    ("recovery", 1.5),
    ("rebound", 1.5),
    ("loss", -1.9),
    ("losses", -2.0),
    ("decline", -1.6),
    ("declined", -1.6),
    ("declining", -1.7),
    ("drop", -1.4),
    ("dropped", -1.5),
    ("fall", -1.4),
    ("fell", -1.5),
    ("plunge", -2.4),
    ("plunged", -2.5),
    ("slump", -2.1),
    ("miss", -1.5),
    ("missed", -1.6),
    ("misses", -1.5),
    ("downgrade", -1.8),
    ("downgraded", -1.9),
    ("underperform", -1.9),
    ("bearish", -2.2),
    ("recession", -2.3),
    ("bankruptcy", -3.0),
    ("default", -2.1),
    ("lawsuit", -1.8),
    ("layoffs", -2.1),
    ("layoff", -2.0),
    ("debt", -1.0),
    ("volatile", -1.2),
    ("volatility", -1.0),
    ("risk", -1.1),
    ("risky", -1.6),
    ("writedown", -1.9),
    ("impairment", -1.7),
    ("dilution", -1.3),
    ("investigation", -1.6),
    ("warning", -1.8),
    ("shortfall", -1.9),
    ("headwinds", -1.4),
    ("tailwinds", 1.4),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT),
    ("completely", BOOSTER_INCREMENT),
    ("considerably", BOOSTER_INCREMENT),
    ("decidedly", BOOSTER_INCREMENT),
    ("deeply", BOOSTER_INCREMENT),
    ("enormously", BOOSTER_INCREMENT),
    ("especially", BOOSTER_INCREMENT),
    ("exceptionally", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("hugely", BOOSTER_INCREMENT),
    ("incredibly", BOOSTER_INCREMENT),
    ("majorly", BOOSTER_INCREMENT),
    ("more", BOOSTER_INCREMENT),
    ("most", BOOSTER_INCREMENT),
    ("particularly", BOOSTER_INCREMENT),
    ("remarkably", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("significantly", BOOSTER_INCREMENT),
    ("so", BOOSTER_INCREMENT),
    ("substantially", BOOSTER_INCREMENT),
    ("sharply", BOOSTER_INCREMENT),
    ("totally", BOOSTER_INCREMENT),
    ("tremendously", BOOSTER_INCREMENT),
    ("very", BOOSTER_INCREMENT),
    ("almost", BOOSTER_DECREMENT),
    ("barely", BOOSTER_DECREMENT),
    ("hardly", BOOSTER_DECREMENT),
    ("less", BOOSTER_DECREMENT),
    ("little", BOOSTER_DECREMENT),
    ("marginally", BOOSTER_DECREMENT),
    ("moderately", BOOSTER_DECREMENT),
    ("partly", BOOSTER_DECREMENT),
    ("scarcely", BOOSTER_DECREMENT),
    ("slightly", BOOSTER_DECREMENT),
    ("somewhat", BOOSTER_DECREMENT),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "nowhere", "neither", "nor", "without", "cannot",
    "cant", "dont", "doesnt", "didnt", "isnt", "arent", "wasnt", "werent", "wont", "wouldnt",
    "shouldnt", "couldnt", "hasnt", "havent", "hadnt", "aint", "lacks", "lacking",
];

struct Token {
    lower: String,
    all_caps: bool,
}

/// Compound-valence analyzer over a word lexicon.
#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    lexicon: HashMap<String, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconAnalyzer {
    /// Analyzer over the embedded general + financial lexicon.
    pub fn builtin() -> Self {
        Self::with_lexicon(
            BUILTIN_LEXICON
                .iter()
                .map(|&(word, valence)| (word.to_string(), valence))
                .collect(),
        )
    }

    pub fn with_lexicon(lexicon: HashMap<String, f64>) -> Self {
        Self {
            lexicon,
            boosters: BOOSTERS.iter().copied().collect(),
        }
    }

    /// Load a VADER-format file: `token<TAB>mean_valence[<TAB>...]` per line.
    /// Unparseable lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self, SentimentError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| SentimentError::LexiconIo {
            path: display.clone(),
            source,
        })?;

        let lexicon: HashMap<String, f64> = contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let word = fields.next()?.trim();
                let valence = fields.next()?.trim().parse::<f64>().ok()?;
                (!word.is_empty() && valence.is_finite()).then(|| (word.to_lowercase(), valence))
            })
            .collect();

        if lexicon.is_empty() {
            return Err(SentimentError::EmptyLexicon(display));
        }
        Ok(Self::with_lexicon(lexicon))
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    /// Normalized compound score in [-1, 1].
    pub fn compound(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }
        let mixed_case = tokens.iter().any(|t| t.all_caps) && tokens.iter().any(|t| !t.all_caps);

        let mut valences: Vec<f64> = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            valences.push(self.token_valence(&tokens, i, token, mixed_case));
        }

        if let Some(pivot) = tokens.iter().position(|t| t.lower == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *v *= 0.5;
                } else if i > pivot {
                    *v *= 1.5;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        let emphasis = punctuation_emphasis(text);
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }

        (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    }

    fn token_valence(&self, tokens: &[Token], i: usize, token: &Token, mixed_case: bool) -> f64 {
        if self.boosters.contains_key(token.lower.as_str()) {
            return 0.0;
        }
        let Some(&base) = self.lexicon.get(&token.lower) else {
            return 0.0;
        };

        let mut valence = base;
        if token.all_caps && mixed_case {
            valence += CAPS_EMPHASIS * valence.signum();
        }

        for (distance, decay) in BOOSTER_DECAY.iter().enumerate() {
            let Some(prev) = i.checked_sub(distance + 1).map(|j| &tokens[j]) else {
                break;
            };
            if let Some(&scalar) = self.boosters.get(prev.lower.as_str()) {
                let mut boost = scalar * valence.signum();
                if prev.all_caps && mixed_case {
                    boost += CAPS_EMPHASIS * valence.signum();
                }
                valence += boost * decay;
            }
        }

        let negated = (1..=3)
            .filter_map(|back| i.checked_sub(back))
            .any(|j| is_negator(&tokens[j].lower));
        if negated {
            valence *= NEGATION_SCALAR;
        }
        valence
    }
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

fn tokenize(text: &str) -> Vec<Token> {
    // Typographic apostrophes count as plain ones, so "isn’t" negates.
    text.replace(['\u{2018}', '\u{2019}'], "'")
        .split_whitespace()
        .filter_map(|raw| {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
            let word = word.trim_matches('\'');
            if word.is_empty() {
                return None;
            }
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            let all_caps = letters.len() > 1 && letters.iter().all(|c| c.is_uppercase());
            Some(Token {
                lower: word.to_lowercase(),
                all_caps,
            })
        })
        .collect()
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();
    let question_emphasis = if questions > 1 {
        (questions as f64 * QUESTION_WEIGHT).min(MAX_QUESTION_EMPHASIS)
    } else {
        0.0
    };
    exclamations as f64 * EXCLAMATION_WEIGHT + question_emphasis
}
