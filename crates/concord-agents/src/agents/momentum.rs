use std::sync::Arc;

use async_trait::async_trait;
use concord_models::{Dataset, Direction, Signal};
use serde_json::json;

use crate::agent::Agent;
use crate::confidence::{CalibrationContext, ConfidenceCalculator};
use crate::error::AgentError;

const CLOSE: &str = "close";
const VOLUME: &str = "volume";
/// Deviation from the moving average treated as flat.
const FLAT_BAND: f64 = 0.01;
/// Deviations beyond this are more likely bad data than momentum.
const PLAUSIBLE_DEVIATION: (f64, f64) = (-0.5, 0.5);

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Price trend: last close against a simple moving average, checked
/// against the volume trend.
pub struct MomentumAgent {
    name: String,
    window: usize,
    calculator: Arc<dyn ConfidenceCalculator>,
}

impl MomentumAgent {
    pub fn new(name: &str, calculator: Arc<dyn ConfidenceCalculator>) -> Self {
        Self {
            name: name.to_string(),
            window: 5,
            calculator,
        }
    }

    /// Moving-average length in closes; at least 2.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(2);
        self
    }

    /// Whether recent volume (latest half) exceeds the earlier half.
    fn volume_rising(&self, dataset: &Dataset) -> Option<bool> {
        let volumes = dataset.series_values(VOLUME)?;
        if volumes.len() < 2 {
            return None;
        }
        let (earlier, recent) = volumes.split_at(volumes.len() / 2);
        Some(mean(recent) > mean(earlier))
    }
}

#[async_trait]
impl Agent for MomentumAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, subject_id: &str, dataset: &Dataset) -> Result<Signal, AgentError> {
        let closes = dataset
            .series_values(CLOSE)
            .ok_or_else(|| AgentError::missing_field(CLOSE))?;
        if closes.len() < self.window {
            return Err(AgentError::Analysis(format!(
                "momentum needs at least {} closes, got {}",
                self.window,
                closes.len()
            )));
        }

        let sma = mean(&closes[closes.len() - self.window..]);
        if sma <= 0.0 {
            return Err(AgentError::Analysis(format!(
                "non-positive moving average {sma} for {subject_id}"
            )));
        }
        let last = closes[closes.len() - 1];
        let deviation = (last - sma) / sma;

        let direction = if deviation > FLAT_BAND {
            Direction::Bullish
        } else if deviation < -FLAT_BAND {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let raw = if direction == Direction::Neutral {
            0.5
        } else {
            0.5 + (deviation.abs() * 5.0).min(0.4)
        };

        let volume_rising = self.volume_rising(dataset);
        let mut context = CalibrationContext::new()
            .with_completeness(dataset.completeness(&[CLOSE, VOLUME]))
            .with_plausible(PLAUSIBLE_DEVIATION.0, PLAUSIBLE_DEVIATION.1);
        context.metric = Some(deviation);
        if direction != Direction::Neutral {
            if let Some(rising) = volume_rising {
                context = context.with_corroboration(rising);
            }
        }
        let confidence = self.calculator.calibrate(raw, &context);

        let reasoning = format!(
            "{subject_id} last close {last:.2} is {:+.1}% vs {}-period average {sma:.2}{}",
            deviation * 100.0,
            self.window,
            match volume_rising {
                Some(true) => ", on rising volume",
                Some(false) => ", on fading volume",
                None => "",
            }
        );
        Ok(Signal::new(direction, confidence, reasoning)?
            .with_metadata("deviation", json!(deviation))
            .with_metadata("sma", json!(sma))
            .with_metadata("volume_rising", json!(volume_rising)))
    }
}
