use std::collections::BTreeMap;

use concord_models::{AgentOutcome, ConsensusResult, Direction};

/// Tie-break order for the dominant direction. A split vote resolves to
/// neutral when neutral is among the tied directions, otherwise bullish wins
/// over bearish.
pub const TIE_BREAK_ORDER: [Direction; 3] =
    [Direction::Neutral, Direction::Bullish, Direction::Bearish];

/// Reduce a run's outcomes into a consensus. Failures are counted, not weighed.
///
/// - `distribution`: successes per direction (all three directions listed)
/// - `agreement`: share of successes matching the dominant direction, 0 with none
/// - `confidence`: mean confidence of the agents that agree with the dominant
///   direction, so a confident majority is not diluted by dissenters
///
/// The result depends only on the multiset of successful signals, not on
/// their order.
pub fn aggregate(outcomes: &[AgentOutcome]) -> ConsensusResult {
    let mut distribution: BTreeMap<Direction, usize> =
        Direction::ALL.iter().map(|&d| (d, 0)).collect();
    let mut confidence_sums: BTreeMap<Direction, f64> =
        Direction::ALL.iter().map(|&d| (d, 0.0)).collect();
    let mut failed = 0usize;

    for outcome in outcomes {
        match outcome {
            AgentOutcome::Success(signal) => {
                *distribution.entry(signal.direction()).or_default() += 1;
                *confidence_sums.entry(signal.direction()).or_default() += signal.confidence();
            }
            AgentOutcome::Failure(_) => failed += 1,
        }
    }

    let total: usize = distribution.values().sum();
    if total == 0 {
        return ConsensusResult {
            signal: Direction::Neutral,
            confidence: 0.0,
            agreement: 0.0,
            distribution,
            failed,
        };
    }

    let max_count = distribution.values().copied().max().unwrap_or(0);
    let dominant = TIE_BREAK_ORDER
        .iter()
        .copied()
        .find(|d| distribution.get(d).copied() == Some(max_count))
        .unwrap_or(Direction::Neutral);

    let confidence = confidence_sums.get(&dominant).copied().unwrap_or(0.0) / max_count as f64;

    ConsensusResult {
        signal: dominant,
        confidence: confidence.clamp(0.0, 1.0),
        agreement: max_count as f64 / total as f64,
        distribution,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_models::{FailureKind, Signal};

    fn ok(direction: Direction, confidence: f64) -> AgentOutcome {
        AgentOutcome::Success(Signal::new(direction, confidence, "test").unwrap())
    }

    fn failed() -> AgentOutcome {
        AgentOutcome::failure(FailureKind::Analysis, "broken", "boom")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_is_neutral_zero() {
        let result = aggregate(&[]);
        assert_eq!(result.signal, Direction::Neutral);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.agreement, 0.0);
        assert_eq!(result.successes(), 0);
        assert_eq!(result.distribution.len(), 3);
    }

    #[test]
    fn all_failed_is_neutral_zero_with_failure_count() {
        let result = aggregate(&[failed(), failed()]);
        assert_eq!(result.signal, Direction::Neutral);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.agreement, 0.0);
        assert_eq!(result.failed, 2);
    }

    #[test]
    fn three_to_one_bullish() {
        let result = aggregate(&[
            ok(Direction::Bullish, 0.8),
            ok(Direction::Bullish, 0.6),
            ok(Direction::Bearish, 0.9),
            ok(Direction::Bullish, 0.7),
        ]);
        assert_eq!(result.signal, Direction::Bullish);
        assert!(approx(result.agreement, 0.75));
        assert!(approx(result.confidence, 0.7));
        assert_eq!(result.distribution[&Direction::Bullish], 3);
        assert_eq!(result.distribution[&Direction::Bearish], 1);
        assert_eq!(result.distribution[&Direction::Neutral], 0);
    }

    #[test]
    fn bullish_bearish_tie_resolves_bullish() {
        let result = aggregate(&[
            ok(Direction::Bearish, 0.9),
            ok(Direction::Bullish, 0.6),
            ok(Direction::Bearish, 0.9),
            ok(Direction::Bullish, 0.8),
        ]);
        assert_eq!(result.signal, Direction::Bullish);
        assert!(approx(result.agreement, 0.5));
        assert!(approx(result.confidence, 0.7));
    }

    #[test]
    fn tie_including_neutral_resolves_neutral() {
        let result = aggregate(&[
            ok(Direction::Bullish, 0.9),
            ok(Direction::Neutral, 0.5),
            ok(Direction::Bearish, 0.9),
        ]);
        assert_eq!(result.signal, Direction::Neutral);
        assert!(approx(result.confidence, 0.5));
    }

    #[test]
    fn failures_are_excluded() {
        let result = aggregate(&[failed(), ok(Direction::Bearish, 0.64), failed()]);
        assert_eq!(result.signal, Direction::Bearish);
        assert!(approx(result.agreement, 1.0));
        assert!(approx(result.confidence, 0.64));
        assert_eq!(result.failed, 2);
        assert_eq!(result.successes(), 1);
    }

    #[test]
    fn invariant_under_reordering() {
        let outcomes = vec![
            ok(Direction::Bullish, 0.8),
            failed(),
            ok(Direction::Neutral, 0.6),
            ok(Direction::Bullish, 0.65),
            ok(Direction::Bearish, 0.7),
        ];
        let forward = aggregate(&outcomes);

        let mut reversed = outcomes.clone();
        reversed.reverse();
        let mut rotated = outcomes.clone();
        rotated.rotate_left(2);

        for other in [aggregate(&reversed), aggregate(&rotated)] {
            assert_eq!(other.signal, forward.signal);
            assert_eq!(other.distribution, forward.distribution);
            assert!(approx(other.agreement, forward.agreement));
            assert!(approx(other.confidence, forward.confidence));
        }
    }
}
