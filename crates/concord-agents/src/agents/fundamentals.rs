use std::sync::Arc;

use async_trait::async_trait;
use concord_models::{Dataset, Direction, Signal};
use serde_json::json;

use crate::agent::Agent;
use crate::confidence::{CalibrationContext, ConfidenceCalculator, IdealRange};
use crate::error::AgentError;

/// One balance-sheet check: inside `ideal` votes bullish, a red flag votes bearish.
struct Check {
    field: &'static str,
    ideal: IdealRange,
    red_flag: fn(f64) -> bool,
}

const PE_RATIO: &str = "pe_ratio";

fn checks() -> [Check; 4] {
    [
        Check {
            field: "return_on_equity",
            ideal: IdealRange::at_least(0.15),
            red_flag: |v| v < 0.05,
        },
        Check {
            field: "debt_to_equity",
            ideal: IdealRange::at_most(0.5),
            red_flag: |v| v > 1.5,
        },
        Check {
            field: "revenue_growth",
            ideal: IdealRange::at_least(0.10),
            red_flag: |v| v < 0.0,
        },
        Check {
            field: PE_RATIO,
            ideal: IdealRange::new(10.0, 20.0),
            red_flag: |v| v <= 0.0 || v > 35.0,
        },
    ]
}

/// Net vote share beyond which the reading is directional.
const DIRECTION_THRESHOLD: f64 = 0.25;
/// P/E values outside this band are treated as data errors or outliers.
const PE_PLAUSIBLE: (f64, f64) = (0.0, 100.0);

/// Scores profitability, leverage, growth and valuation metrics.
pub struct FundamentalsAgent {
    name: String,
    calculator: Arc<dyn ConfidenceCalculator>,
}

impl FundamentalsAgent {
    pub fn new(name: &str, calculator: Arc<dyn ConfidenceCalculator>) -> Self {
        Self {
            name: name.to_string(),
            calculator,
        }
    }
}

#[async_trait]
impl Agent for FundamentalsAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, subject_id: &str, dataset: &Dataset) -> Result<Signal, AgentError> {
        let checks = checks();
        let mut votes = serde_json::Map::new();
        let mut net = 0i32;
        let mut present = 0usize;

        for check in &checks {
            let Some(value) = dataset.metric(check.field) else {
                continue;
            };
            present += 1;
            let vote = if check.ideal.distance(value) == 0.0 {
                1
            } else if (check.red_flag)(value) {
                -1
            } else {
                0
            };
            net += vote;
            votes.insert(check.field.to_string(), json!({ "value": value, "vote": vote }));
        }

        if present == 0 {
            return Err(AgentError::missing_field(
                "return_on_equity, debt_to_equity, revenue_growth or pe_ratio",
            ));
        }

        let share = f64::from(net) / present as f64;
        let direction = if share > DIRECTION_THRESHOLD {
            Direction::Bullish
        } else if share < -DIRECTION_THRESHOLD {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let raw = 0.5 + 0.4 * share.abs();

        let fields: Vec<&str> = checks.iter().map(|c| c.field).collect();
        let mut context = CalibrationContext::new().with_completeness(dataset.completeness(&fields));
        if let Some(pe) = dataset.metric(PE_RATIO) {
            // Valuation anchors the distance term: a P/E ten points out halves proximity.
            context = context
                .with_metric(pe, IdealRange::new(10.0, 20.0), 10.0)
                .with_plausible(PE_PLAUSIBLE.0, PE_PLAUSIBLE.1);
        }
        let confidence = self.calculator.calibrate(raw, &context);

        let reasoning = format!(
            "{subject_id}: {present} of {} fundamentals checked, net vote {net:+} ({direction})",
            checks.len()
        );
        Ok(Signal::new(direction, confidence, reasoning)?
            .with_metadata("checks", serde_json::Value::Object(votes))
            .with_metadata("raw_confidence", json!(raw)))
    }
}
